//! Byte source and sink abstractions
//!
//! The codec only needs to pull single bytes from a stream and push byte
//! runs into a bounded outgoing buffer. The serial driver implements both;
//! [`SliceSource`] and `heapless::Vec` implement them for host-side use.

use heapless::Vec;

/// A stream of incoming bytes
pub trait ByteSource {
    /// Error reported when no byte can be produced
    type Error;

    /// Read the next byte, blocking until one is available
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Fill `buf` with the next `buf.len()` bytes, in arrival order
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }
}

/// A bounded buffer of outgoing bytes
pub trait ByteSink {
    /// Queue `data`
    ///
    /// Bytes that do not fit are dropped, the rest are queued in order.
    /// Returns `Err(Overflow)` if anything was dropped.
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Overflow>;

    /// Free space, in bytes
    fn available(&self) -> usize;
}

/// Bytes were dropped because the sink was full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow;

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    type Error = T::Error;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        (**self).read_byte()
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Overflow> {
        (**self).write_bytes(data)
    }

    fn available(&self) -> usize {
        (**self).available()
    }
}

impl<const N: usize> ByteSink for Vec<u8, N> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Overflow> {
        let mut result = Ok(());
        for &byte in data {
            if self.push(byte).is_err() {
                result = Err(Overflow);
            }
        }
        result
    }

    fn available(&self) -> usize {
        N - self.len()
    }
}

/// The source ran out of bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndOfInput;

/// Reads bytes from a slice
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceSource<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Number of bytes read so far
    pub const fn consumed(&self) -> usize {
        self.position
    }

    /// Bytes not read yet
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }
}

impl ByteSource for SliceSource<'_> {
    type Error = EndOfInput;

    fn read_byte(&mut self) -> Result<u8, EndOfInput> {
        let byte = *self.data.get(self.position).ok_or(EndOfInput)?;
        self.position += 1;
        Ok(byte)
    }
}
