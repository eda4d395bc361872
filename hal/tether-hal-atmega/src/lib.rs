//! ATmega640/1280/2560 USART backend
//!
//! Implements [`tether_hal::UartPeripheral`] for the four USART units of the
//! ATmega640 family by volatile access to their memory-mapped registers.
//!
//! Each unit occupies the same 7-byte layout:
//!
//! ```text
//! base+0  UCSRnA  status       RXC(7) TXC(6) UDRE(5)
//! base+1  UCSRnB  control      RXCIE(7) TXCIE(6) UDRIE(5) RXEN(4) TXEN(3) UCSZ2(2)
//! base+2  UCSRnC  frame        UPM1:0(5:4) USBS(3) UCSZ1:0(2:1)
//! base+4  UBRRnL  baud divisor, low byte
//! base+5  UBRRnH  baud divisor, high nibble
//! base+6  UDRn    data
//! ```
//!
//! The composition root binds the `USARTn_RX` and `USARTn_TX` vectors to the
//! port's handlers and enables global interrupts after setup.

#![cfg_attr(not(test), no_std)]

use core::ptr::{read_volatile, write_volatile};

use tether_hal::{BaudError, DataBits, Parity, StopBits, UartConfig, UartPeripheral};

/// Default CPU clock of the reference board
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

/// Largest value the 12-bit UBRR register holds
pub const UBRR_MAX: u16 = 0x0FFF;

const PRR0: usize = 0x64;
const PRR1: usize = 0x65;

const UCSRA: usize = 0;
const UCSRB: usize = 1;
const UCSRC: usize = 2;
const UBRRL: usize = 4;
const UBRRH: usize = 5;
const UDR: usize = 6;

// UCSRnA
const RXC: u8 = 1 << 7;
const UDRE: u8 = 1 << 5;

// UCSRnB
const RXCIE: u8 = 1 << 7;
const TXCIE: u8 = 1 << 6;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
const UCSZ2: u8 = 1 << 2;

/// One USART register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Usart {
    base: usize,
    prr: usize,
    prr_bit: u8,
    clock_hz: u32,
}

/// USART0 (PE0/PE1)
pub const USART0: Usart = Usart::new(0xC0, PRR0, 1);
/// USART1 (PD2/PD3)
pub const USART1: Usart = Usart::new(0xC8, PRR1, 0);
/// USART2 (PH0/PH1)
pub const USART2: Usart = Usart::new(0xD0, PRR1, 1);
/// USART3 (PJ0/PJ1)
pub const USART3: Usart = Usart::new(0x130, PRR1, 2);

impl Usart {
    const fn new(base: usize, prr: usize, prr_bit: u8) -> Self {
        Self {
            base,
            prr,
            prr_bit,
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }

    /// Same unit, clocked at `clock_hz`
    pub const fn with_clock(self, clock_hz: u32) -> Self {
        Self { clock_hz, ..self }
    }

    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn read(&self, offset: usize) -> u8 {
        // SAFETY: the block addresses are the datasheet's data-space
        // locations of the USART registers; byte reads have no side effect
        // beyond the documented ones (reading UDR pops the receive FIFO).
        unsafe { read_volatile((self.base + offset) as *const u8) }
    }

    fn write(&self, offset: usize, value: u8) {
        // SAFETY: see `read`.
        unsafe { write_volatile((self.base + offset) as *mut u8, value) }
    }

    fn modify_prr(&self, set: bool) {
        // PRR1 is shared by three units and may be touched by other drivers
        critical_section::with(|_| {
            let reg = self.prr as *mut u8;
            // SAFETY: PRR0/PRR1 are the power reduction registers at their
            // datasheet data-space addresses.
            unsafe {
                let value = read_volatile(reg);
                let value = if set {
                    value | (1 << self.prr_bit)
                } else {
                    value & !(1 << self.prr_bit)
                };
                write_volatile(reg, value);
            }
        });
    }

    fn write_ubrr(&self, ubrr: u16) {
        let [low, high] = ubrr.to_le_bytes();
        // High byte first: writing UBRRnL latches the new divisor
        self.write(UBRRH, high);
        self.write(UBRRL, low);
    }
}

/// UBRR value for normal-speed (16x oversampling) asynchronous mode
pub fn ubrr(clock_hz: u32, baudrate: u32) -> Result<u16, BaudError> {
    let divisor = UartConfig::new(baudrate).baud_divisor(clock_hz, 16)?;
    u16::try_from(divisor)
        .ok()
        .filter(|&value| value <= UBRR_MAX)
        .ok_or(BaudError::TooSlow)
}

/// UCSRnC value for a line configuration (asynchronous mode)
pub const fn ucsrc_bits(config: &UartConfig) -> u8 {
    let parity: u8 = match config.parity {
        Parity::None => 0b00,
        Parity::Even => 0b10,
        Parity::Odd => 0b11,
    };
    let stop: u8 = match config.stop_bits {
        StopBits::One => 0,
        StopBits::Two => 1,
    };
    (parity << 4) | (stop << 3) | ((char_size(config.data_bits) & 0x03) << 1)
}

/// UCSRnB value: receiver, transmitter and both completion interrupts enabled
pub const fn ucsrb_bits(config: &UartConfig) -> u8 {
    let ucsz2 = if char_size(config.data_bits) & 0x04 != 0 {
        UCSZ2
    } else {
        0
    };
    RXCIE | TXCIE | RXEN | TXEN | ucsz2
}

const fn char_size(bits: DataBits) -> u8 {
    match bits {
        DataBits::Five => 0b000,
        DataBits::Six => 0b001,
        DataBits::Seven => 0b010,
        DataBits::Eight => 0b011,
    }
}

impl UartPeripheral for Usart {
    fn configure(&self, config: &UartConfig) -> Result<(), BaudError> {
        let ubrr = ubrr(self.clock_hz, config.baudrate)?;

        self.modify_prr(false);
        self.write(UCSRC, ucsrc_bits(config));
        self.write_ubrr(ubrr);
        self.write(UCSRB, ucsrb_bits(config));
        Ok(())
    }

    fn shutdown(&self) {
        let control = self.read(UCSRB);
        self.write(UCSRB, control & !(RXCIE | TXCIE));
        self.modify_prr(true);
    }

    fn set_baudrate(&self, baudrate: u32) -> Result<(), BaudError> {
        self.write_ubrr(ubrr(self.clock_hz, baudrate)?);
        Ok(())
    }

    fn read_data(&self) -> u8 {
        self.read(UDR)
    }

    fn write_data(&self, byte: u8) {
        self.write(UDR, byte);
    }

    fn is_rx_ready(&self) -> bool {
        self.read(UCSRA) & RXC != 0
    }

    fn is_tx_ready(&self) -> bool {
        self.read(UCSRA) & UDRE != 0
    }
}
