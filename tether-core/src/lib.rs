//! Interrupt-driven serial transport
//!
//! This crate contains the parts of the transport that run on the target
//! but do not depend on a particular chip:
//!
//! - [`RingBuffer`] - byte FIFO shared between foreground and interrupts
//! - [`SerialPort`] - buffered UART driver with kick-started transmission
//! - [`InterruptTable`] - routes interrupt vectors to registered ports
//! - Stream adaptors so `&SerialPort` works with
//!   [`MessageCodec`](tether_protocol::MessageCodec), `embedded-io` and
//!   `core::fmt`
//!
//! Chip support comes from a [`UartPeripheral`](tether_hal::UartPeripheral)
//! implementation; the critical sections come from whatever
//! `critical-section` implementation the binary links.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the other modules see its macros
mod fmt;

pub mod interrupt;
pub mod ring;
pub mod serial;

pub use interrupt::{InterruptSource, InterruptTable, RegisterError, SerialInterrupts};
pub use ring::{CapacityError, RingBuffer};
pub use serial::{
    ConfigError, ReadTimeout, SerialConfig, SerialPort, SetupError, Timeout, DEFAULT_BAUDRATE,
    DEFAULT_BUFFER_SIZE,
};
