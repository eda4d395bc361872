//! Tether Hardware Abstraction Layer
//!
//! This crate defines the peripheral interface that the buffered serial
//! driver in `tether-core` is written against. Chip-specific crates implement
//! [`UartPeripheral`] for their register blocks, so the same driver and
//! protocol code runs on any board.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (composition root)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tether-core (SerialPort, RingBuffer)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tether-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ tether-hal-   │       │  sim::SimUart │
//! │   atmega      │       │  (host tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartPeripheral`] - Byte-wide data register, status and interrupt control
//! - [`relax::Relax`] - What a blocking wait does between polls

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod relax;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use relax::{Relax, Spin};
#[cfg(feature = "cortex-m")]
pub use relax::WaitForInterrupt;
pub use uart::{BaudError, DataBits, Parity, StopBits, UartConfig, UartPeripheral};
