//! Serial port configuration
//!
//! A [`SerialConfig`] holds everything `SerialPort::setup` needs: the line
//! format, the two buffer capacities and the read timeout. With the `serde`
//! feature it can be persisted as postcard bytes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tether_hal::{BaudError, DataBits, Parity, StopBits, UartConfig};

use crate::ring::CapacityError;

/// Buffer capacity used when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Default baud rate
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// How long blocking reads wait for data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReadTimeout {
    /// Wait forever
    #[default]
    Never,
    /// Give up after this many wait iterations without data
    Polls(u32),
}

/// Serial port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialConfig {
    /// Baud rate and frame format
    pub line: UartConfig,
    /// Receive buffer capacity in bytes
    pub rx_capacity: usize,
    /// Transmit buffer capacity in bytes
    pub tx_capacity: usize,
    pub read_timeout: ReadTimeout,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BAUDRATE)
    }
}

impl SerialConfig {
    /// 8N1 at `baudrate` with default buffers, reads never time out
    pub const fn new(baudrate: u32) -> Self {
        Self {
            line: UartConfig::new(baudrate),
            rx_capacity: DEFAULT_BUFFER_SIZE,
            tx_capacity: DEFAULT_BUFFER_SIZE,
            read_timeout: ReadTimeout::Never,
        }
    }

    pub const fn with_buffers(mut self, rx_capacity: usize, tx_capacity: usize) -> Self {
        self.rx_capacity = rx_capacity;
        self.tx_capacity = tx_capacity;
        self
    }

    pub const fn with_format(
        mut self,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Self {
        self.line.data_bits = data_bits;
        self.line.parity = parity;
        self.line.stop_bits = stop_bits;
        self
    }

    pub const fn with_read_timeout(mut self, read_timeout: ReadTimeout) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Errors from `SerialPort::setup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    /// Receive buffer capacity exceeds the port's storage
    ReceiveCapacity(CapacityError),
    /// Transmit buffer capacity exceeds the port's storage
    TransmitCapacity(CapacityError),
    /// The peripheral cannot produce the baud rate
    Baud(BaudError),
}

impl From<BaudError> for SetupError {
    fn from(e: BaudError) -> Self {
        SetupError::Baud(e)
    }
}

/// A blocking read ran out of its poll budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
}

#[cfg(feature = "serde")]
impl SerialConfig {
    /// Largest postcard encoding of a configuration
    pub const MAX_SERIALIZED_SIZE: usize = 48;

    /// Serialize into `buf`, returning the number of bytes used
    pub fn to_postcard(&self, buf: &mut [u8]) -> Result<usize, ConfigError> {
        let bytes = postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)?;
        Ok(bytes.len())
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)
    }
}
