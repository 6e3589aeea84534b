//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `hardware`     | SensorPort         | PIR GPIO                    |
//! |                | AudioPort          | DFPlayer over UART          |
//! |                | MotorPort          | H-bridge GPIO + LEDC        |
//! |                | LightPort          | LEDC lamp channels          |
//! | `log_sink`     | EventSink          | Serial / console log        |
//! | `time`         | Clock              | esp_timer + async-io-mini   |
//! |                |                    | or a virtual test clock     |

pub mod hardware;
pub mod log_sink;
pub mod time;
