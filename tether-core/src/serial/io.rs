//! Stream adaptors for `&SerialPort`
//!
//! - [`ByteSource`]/[`ByteSink`] so a [`MessageCodec`](tether_protocol::MessageCodec)
//!   can run over the port
//! - `embedded_io::Read`/`Write` for generic drivers
//! - `core::fmt::Write` for formatted text output
//!
//! They are implemented for shared references, so a `static` port is used
//! through `let mut port = &PORT;`.

use core::convert::Infallible;

use tether_hal::{Relax, UartPeripheral};
use tether_protocol::{ByteSink, ByteSource, Overflow};

use super::{SerialPort, Timeout};

impl<P: UartPeripheral, const RX: usize, const TX: usize, W: Relax> ByteSource
    for &SerialPort<P, RX, TX, W>
{
    type Error = Timeout;

    fn read_byte(&mut self) -> Result<u8, Timeout> {
        (**self).read_byte()
    }
}

impl<P: UartPeripheral, const RX: usize, const TX: usize, W: Relax> ByteSink
    for &SerialPort<P, RX, TX, W>
{
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Overflow> {
        if self.send_bytes(data) {
            Ok(())
        } else {
            Err(Overflow)
        }
    }

    fn available(&self) -> usize {
        self.transmit_buffer_available()
    }
}

impl<P, const RX: usize, const TX: usize, W> embedded_io::ErrorType
    for &SerialPort<P, RX, TX, W>
{
    type Error = Infallible;
}

impl<P: UartPeripheral, const RX: usize, const TX: usize, W: Relax> embedded_io::Read
    for &SerialPort<P, RX, TX, W>
{
    /// Blocks for the first byte, then takes whatever else is buffered
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };
        *first = self.get_byte();
        let mut n = 1;
        for slot in rest {
            match self.try_get_byte() {
                Some(byte) => *slot = byte,
                None => break,
            }
            n += 1;
        }
        Ok(n)
    }
}

impl<P: UartPeripheral, const RX: usize, const TX: usize, W: Relax> embedded_io::Write
    for &SerialPort<P, RX, TX, W>
{
    /// Blocks until at least one byte fits, then queues as much as fits
    ///
    /// Returns `Ok(0)` on a port set up without a transmit buffer.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        if buf.is_empty() || self.tx.capacity() == 0 {
            return Ok(0);
        }
        loop {
            let free = self.transmit_buffer_available();
            if free > 0 {
                let n = free.min(buf.len());
                self.send_bytes(&buf[..n]);
                return Ok(n);
            }
            W::relax();
        }
    }

    /// Waits for the transmit chain to go idle
    fn flush(&mut self) -> Result<(), Infallible> {
        self.wait_transmit_idle();
        Ok(())
    }
}

impl<P: UartPeripheral, const RX: usize, const TX: usize, W: Relax> core::fmt::Write
    for &SerialPort<P, RX, TX, W>
{
    /// Fails if the text did not fit the transmit buffer
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if self.send_bytes(s.as_bytes()) {
            Ok(())
        } else {
            Err(core::fmt::Error)
        }
    }
}
