//! UART serial communication abstractions
//!
//! Provides the register-level interface the interrupt-driven serial driver
//! needs from a chip, plus the line configuration it programs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// UART peripheral
///
/// A byte-oriented serial unit with one data register, a "byte received"
/// condition, a "ready to transmit" condition and interrupts for both.
///
/// All methods take `&self`: the same peripheral is touched from the
/// foreground and from interrupt handlers, and register access is volatile
/// by nature. Implementations provide whatever interior mutability they need.
pub trait UartPeripheral {
    /// Power the unit up, program frame format and baud divisor, enable the
    /// receiver and transmitter and their completion interrupts
    ///
    /// Fails without touching the hardware if the baud rate cannot be
    /// derived from the peripheral clock.
    fn configure(&self, config: &UartConfig) -> Result<(), BaudError>;

    /// Power the unit down and disable its interrupts
    fn shutdown(&self);

    /// Reprogram the baud rate divisor only
    fn set_baudrate(&self, baudrate: u32) -> Result<(), BaudError>;

    /// Read the data register
    ///
    /// Reading clears the "byte received" condition.
    fn read_data(&self) -> u8;

    /// Write the data register, starting transmission of `byte`
    fn write_data(&self, byte: u8);

    /// Whether a received byte is waiting in the data register
    fn is_rx_ready(&self) -> bool;

    /// Whether the data register can accept the next byte
    fn is_tx_ready(&self) -> bool;

    /// Re-enable the transmit-ready interrupt after a kick-start
    ///
    /// Only needed by peripherals that mask the interrupt when the
    /// transmitter goes idle.
    fn arm_transmit(&self) {}
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (character size)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::new(115_200)
    }
}

impl UartConfig {
    /// 8N1 at the given baud rate
    pub const fn new(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Bits on the wire per character, start bit included
    pub const fn frame_bits(&self) -> u32 {
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        };
        1 + self.data_bits.bits() as u32 + parity + self.stop_bits.bits() as u32
    }

    /// Baud rate divisor for a clock of `clock_hz` sampled `oversampling`
    /// times per bit, rounded to nearest
    ///
    /// Returns the register value, i.e. `round(clock / (oversampling * baud)) - 1`.
    pub fn baud_divisor(&self, clock_hz: u32, oversampling: u32) -> Result<u32, BaudError> {
        if self.baudrate == 0 || oversampling == 0 {
            return Err(BaudError::Zero);
        }
        let ticks = u64::from(self.baudrate) * u64::from(oversampling);
        let rounded = (u64::from(clock_hz) + ticks / 2) / ticks;
        if rounded == 0 {
            return Err(BaudError::TooFast);
        }
        u32::try_from(rounded - 1).map_err(|_| BaudError::TooSlow)
    }
}

/// Baud rate cannot be derived from the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudError {
    /// Baud rate or oversampling is zero
    Zero,
    /// Requested rate exceeds what the clock can produce
    TooFast,
    /// Divisor does not fit the register
    TooSlow,
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    /// Character width in bits
    pub const fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    pub const fn bits(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}
