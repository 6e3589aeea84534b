//! Actuator and sensor drivers, hardware initialisation, serial helpers.

pub mod dfplayer;
pub mod hw_init;
pub mod lamp;
pub mod motor;
pub mod pir;
pub mod serial;
pub mod stop_switch;
