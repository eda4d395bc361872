//! Interrupt-driven buffered serial port
//!
//! [`SerialPort`] sits between a [`UartPeripheral`] and the application:
//!
//! ```text
//!   hardware ──RX IRQ──► on_receive ──► rx ring ──► get_byte / read_byte
//!   hardware ◄─TX IRQ─── on_transmit ◄─ tx ring ◄── send_bytes
//! ```
//!
//! The foreground produces into the transmit ring and consumes from the
//! receive ring; the interrupt handlers do the opposite. Each ring therefore
//! has one producer and one consumer, and the ring's own critical sections
//! are the only locking needed.
//!
//! The transmit direction is either idle or transmitting. When a write lands
//! on an idle port, `send_bytes` pushes the first byte to the hardware itself
//! ("kick-start"); from then on each transmit interrupt feeds the next byte,
//! until one finds the ring empty and marks the port idle again.

mod config;
mod io;

use core::cell::Cell;
use core::marker::PhantomData;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use tether_hal::{BaudError, Relax, Spin, UartPeripheral};

use crate::ring::RingBuffer;

pub use config::{
    ConfigError, ReadTimeout, SerialConfig, SetupError, Timeout, DEFAULT_BAUDRATE,
    DEFAULT_BUFFER_SIZE,
};

/// Buffered serial port over a UART peripheral
///
/// `RX` and `TX` reserve the storage of the two rings; the capacities in
/// use are chosen by [`setup`](Self::setup). `W` decides what a blocking
/// read does while it waits.
///
/// All methods take `&self`, so a port can be a `static` shared between the
/// foreground and its interrupt vectors.
pub struct SerialPort<P, const RX: usize, const TX: usize, W = Spin> {
    peripheral: P,
    rx: RingBuffer<RX>,
    tx: RingBuffer<TX>,
    rx_overflow: AtomicBool,
    tx_overflow: AtomicBool,
    tx_idle: AtomicBool,
    config: Mutex<Cell<SerialConfig>>,
    _wait: PhantomData<fn() -> W>,
}

impl<P, const RX: usize, const TX: usize, W> SerialPort<P, RX, TX, W> {
    /// Wrap `peripheral`; call [`setup`](Self::setup) before any I/O
    pub const fn new(peripheral: P) -> Self {
        Self {
            peripheral,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            rx_overflow: AtomicBool::new(false),
            tx_overflow: AtomicBool::new(false),
            tx_idle: AtomicBool::new(true),
            config: Mutex::new(Cell::new(
                SerialConfig::new(DEFAULT_BAUDRATE).with_buffers(RX, TX),
            )),
            _wait: PhantomData,
        }
    }

    /// The underlying peripheral
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Configuration of the last successful setup
    pub fn config(&self) -> SerialConfig {
        critical_section::with(|cs| self.config.borrow(cs).get())
    }

    /// Last received byte was dropped because the receive buffer was full
    pub fn receive_overflow(&self) -> bool {
        self.rx_overflow.load(Ordering::Relaxed)
    }

    /// Last `send_bytes` dropped bytes because the transmit buffer was full
    pub fn transmit_overflow(&self) -> bool {
        self.tx_overflow.load(Ordering::Relaxed)
    }

    pub fn receive_buffer_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn transmit_buffer_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Bytes waiting to be read
    pub fn receive_buffer_len(&self) -> usize {
        self.rx.size()
    }

    /// Free space in the receive buffer
    pub fn receive_buffer_available(&self) -> usize {
        self.rx.available_size()
    }

    /// Free space in the transmit buffer
    pub fn transmit_buffer_available(&self) -> usize {
        self.tx.available_size()
    }

    /// Whether the transmit interrupt chain is running
    pub fn is_transmitting(&self) -> bool {
        !self.tx_idle.load(Ordering::Acquire)
    }

    /// Discard unread received bytes
    pub fn flush_receive_buffer(&self) {
        self.rx.clear();
    }

    /// Discard bytes not yet handed to the hardware
    pub fn flush_transmit_buffer(&self) {
        self.tx.clear();
    }

    /// Non-blocking read
    pub fn try_get_byte(&self) -> Option<u8> {
        self.rx.try_pop_front()
    }
}

impl<P: UartPeripheral, const RX: usize, const TX: usize, W: Relax> SerialPort<P, RX, TX, W> {
    /// Size both buffers, program the line and enable the interrupts
    ///
    /// Buffered data is discarded and both overflow flags are cleared. On
    /// error the port must be set up again before use.
    pub fn setup(&self, config: &SerialConfig) -> Result<(), SetupError> {
        self.rx
            .resize(config.rx_capacity)
            .map_err(SetupError::ReceiveCapacity)?;
        self.tx
            .resize(config.tx_capacity)
            .map_err(SetupError::TransmitCapacity)?;
        self.rx_overflow.store(false, Ordering::Relaxed);
        self.tx_overflow.store(false, Ordering::Relaxed);
        self.tx_idle.store(true, Ordering::Release);

        self.peripheral.configure(&config.line)?;
        critical_section::with(|cs| self.config.borrow(cs).set(*config));

        info!(
            "serial: {} baud, rx {} bytes, tx {} bytes",
            config.line.baudrate,
            config.rx_capacity,
            config.tx_capacity
        );
        Ok(())
    }

    /// Power the peripheral down and disable its interrupts
    ///
    /// Buffered data is kept. A later `setup` brings the port back.
    pub fn reset(&self) {
        self.peripheral.shutdown();
        self.tx_idle.store(true, Ordering::Release);
    }

    /// Reprogram the baud rate, keeping everything else
    pub fn set_baudrate(&self, baudrate: u32) -> Result<(), BaudError> {
        self.peripheral.set_baudrate(baudrate)?;
        critical_section::with(|cs| {
            let cell = self.config.borrow(cs);
            let mut config = cell.get();
            config.line.baudrate = baudrate;
            cell.set(config);
        });
        Ok(())
    }

    /// Wait for a byte and return it
    ///
    /// Blocks forever if nothing arrives. Interrupts stay enabled while
    /// waiting.
    pub fn get_byte(&self) -> u8 {
        loop {
            if let Some(byte) = self.rx.try_pop_front() {
                return byte;
            }
            W::relax();
        }
    }

    /// Fill `dest` with received bytes, in arrival order, blocking until
    /// all have arrived
    pub fn get_bytes(&self, dest: &mut [u8]) {
        for slot in dest.iter_mut() {
            *slot = self.get_byte();
        }
    }

    /// Wait for a byte, honoring the configured read timeout
    pub fn read_byte(&self) -> Result<u8, Timeout> {
        match self.config().read_timeout {
            ReadTimeout::Never => Ok(self.get_byte()),
            ReadTimeout::Polls(budget) => {
                let mut polls = 0;
                loop {
                    if let Some(byte) = self.rx.try_pop_front() {
                        return Ok(byte);
                    }
                    if polls == budget {
                        return Err(Timeout);
                    }
                    polls += 1;
                    W::relax();
                }
            }
        }
    }

    /// Fill `dest` like [`get_bytes`](Self::get_bytes), honoring the read
    /// timeout for each byte
    pub fn read_bytes(&self, dest: &mut [u8]) -> Result<(), Timeout> {
        for slot in dest.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }

    /// Queue `data` for transmission
    ///
    /// Bytes that do not fit are dropped. Returns `false` and sets the
    /// transmit overflow flag if any were; a call that queues everything
    /// clears the flag. An idle transmitter is started with the first
    /// queued byte.
    pub fn send_bytes(&self, data: &[u8]) -> bool {
        let mut dropped = 0usize;
        for &byte in data {
            if !self.tx.push_back(byte) {
                dropped += 1;
            }
        }

        self.kick_transmit();

        let overflow = dropped > 0;
        self.tx_overflow.store(overflow, Ordering::Relaxed);
        if overflow {
            warn!("serial: transmit overflow, dropped {} bytes", dropped);
        }
        !overflow
    }

    fn kick_transmit(&self) {
        if !self.tx_idle.load(Ordering::Acquire) {
            return;
        }
        // A byte from before a reset may still occupy the data register
        while !self.peripheral.is_tx_ready() {
            core::hint::spin_loop();
        }
        critical_section::with(|_| {
            if !self.tx_idle.load(Ordering::Acquire) {
                return;
            }
            if let Some(byte) = self.tx.try_pop_front() {
                self.tx_idle.store(false, Ordering::Release);
                self.peripheral.write_data(byte);
                self.peripheral.arm_transmit();
            }
        });
    }

    /// Wait until the transmit chain has gone idle
    ///
    /// The last byte may still be in the hardware shift register.
    pub fn wait_transmit_idle(&self) {
        while self.is_transmitting() {
            W::relax();
        }
    }

    /// Receive interrupt handler
    ///
    /// Always reads the data register, which clears the interrupt
    /// condition. The byte is dropped and the receive overflow flag set if
    /// the buffer is full; a stored byte clears the flag.
    pub fn on_receive(&self) {
        let byte = self.peripheral.read_data();
        let pushed = self.rx.push_back(byte);
        self.rx_overflow.store(!pushed, Ordering::Relaxed);
    }

    /// Transmit interrupt handler
    ///
    /// Hands the next queued byte to the hardware, or marks the port idle
    /// when there is none.
    pub fn on_transmit(&self) {
        critical_section::with(|_| match self.tx.try_pop_front() {
            Some(byte) => self.peripheral.write_data(byte),
            None => self.tx_idle.store(true, Ordering::Release),
        });
    }
}
