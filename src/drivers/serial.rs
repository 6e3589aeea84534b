//! Serial port abstraction for the audio module link.
//!
//! Concrete implementations:
//! - [`UartPort`]: ESP-IDF UART driver (no-op on the host)
//! - [`NullSerial`]: discards writes, never reads
//!
//! The DFPlayer driver is generic over `SerialPort`, so tests can hand it a
//! recording port and inspect the exact bytes on the wire.

use crate::drivers::hw_init;
use crate::error::DriverError;

/// Byte-oriented serial channel.
pub trait SerialPort {
    /// Error type for this port.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` buffered bytes.  Returns 0 if nothing is
    /// waiting (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data`.  Returns the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;
}

/// UART peripheral configured by [`hw_init::init_peripherals`].
pub struct UartPort {
    port: i32,
}

impl UartPort {
    pub fn new(port: i32) -> Self {
        Self { port }
    }
}

impl SerialPort for UartPort {
    type Error = DriverError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DriverError> {
        Ok(hw_init::uart_read(self.port, buf))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        hw_init::uart_write(self.port, data)
    }
}

/// A port that discards all writes and never reads.
pub struct NullSerial;

impl SerialPort for NullSerial {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }
}
