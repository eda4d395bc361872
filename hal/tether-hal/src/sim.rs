//! Simulated UART for host-side testing
//!
//! [`SimUart`] behaves like a UART whose transmitter is always ready. Bytes
//! written to it are recorded on a "wire" that tests can inspect, and bytes
//! can be injected into its data register to emulate reception. Interrupts
//! are not generated; the test calls the driver's handlers itself.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

use crate::uart::{BaudError, UartConfig, UartPeripheral};

/// Number of transmitted bytes the simulator records
pub const SIM_WIRE_CAPACITY: usize = 1024;

struct SimState {
    config: Option<UartConfig>,
    powered: bool,
    rx_data: Option<u8>,
    wire: Vec<u8, SIM_WIRE_CAPACITY>,
    arm_count: usize,
}

/// Simulated UART peripheral
pub struct SimUart {
    state: Mutex<RefCell<SimState>>,
}

impl Default for SimUart {
    fn default() -> Self {
        Self::new()
    }
}

impl SimUart {
    /// Create a powered-down, unconfigured simulator
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(SimState {
                config: None,
                powered: false,
                rx_data: None,
                wire: Vec::new(),
                arm_count: 0,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Place a byte in the data register, as if it had just been received
    ///
    /// An unread previous byte is overwritten (hardware overrun).
    pub fn inject(&self, byte: u8) {
        self.with(|s| s.rx_data = Some(byte));
    }

    /// Bytes written so far, clearing the record
    pub fn take_wire(&self) -> Vec<u8, SIM_WIRE_CAPACITY> {
        self.with(|s| core::mem::take(&mut s.wire))
    }

    /// Bytes written so far
    pub fn wire(&self) -> Vec<u8, SIM_WIRE_CAPACITY> {
        self.with(|s| s.wire.clone())
    }

    /// Last configuration programmed, if any
    pub fn config(&self) -> Option<UartConfig> {
        self.with(|s| s.config)
    }

    pub fn is_powered(&self) -> bool {
        self.with(|s| s.powered)
    }

    /// How often the transmit interrupt was re-armed
    pub fn arm_count(&self) -> usize {
        self.with(|s| s.arm_count)
    }
}

impl UartPeripheral for SimUart {
    fn configure(&self, config: &UartConfig) -> Result<(), BaudError> {
        if config.baudrate == 0 {
            return Err(BaudError::Zero);
        }
        self.with(|s| {
            s.config = Some(*config);
            s.powered = true;
        });
        Ok(())
    }

    fn shutdown(&self) {
        self.with(|s| s.powered = false);
    }

    fn set_baudrate(&self, baudrate: u32) -> Result<(), BaudError> {
        if baudrate == 0 {
            return Err(BaudError::Zero);
        }
        self.with(|s| {
            let mut config = s.config.unwrap_or_default();
            config.baudrate = baudrate;
            s.config = Some(config);
        });
        Ok(())
    }

    fn read_data(&self) -> u8 {
        self.with(|s| s.rx_data.take().unwrap_or(0))
    }

    fn write_data(&self, byte: u8) {
        // A full record drops the byte; tests size their traffic below it
        self.with(|s| {
            let _ = s.wire.push(byte);
        });
    }

    fn is_rx_ready(&self) -> bool {
        self.with(|s| s.rx_data.is_some())
    }

    fn is_tx_ready(&self) -> bool {
        true
    }

    fn arm_transmit(&self) {
        self.with(|s| s.arm_count += 1);
    }
}
