//! Two-accumulator running checksum
//!
//! `c1` is the wrapping sum of all bytes, `c2` the wrapping sum of every
//! intermediate `c1`. Unlike a plain sum, `c2` depends on byte order, so
//! transposed bytes are detected.

/// Streaming checksum accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Checksum {
    c1: u8,
    c2: u8,
}

impl Checksum {
    pub const fn new() -> Self {
        Self { c1: 0, c2: 0 }
    }

    /// Accumulate one byte
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.c1 = self.c1.wrapping_add(byte);
        self.c2 = self.c2.wrapping_add(self.c1);
    }

    /// Accumulate a run of bytes, in order
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    /// The two checksum bytes, `[c1, c2]`, as they appear on the wire
    pub const fn finish(&self) -> [u8; 2] {
        [self.c1, self.c2]
    }
}

/// Checksum of a complete byte sequence
pub fn checksum(bytes: &[u8]) -> [u8; 2] {
    let mut sum = Checksum::new();
    sum.update(bytes);
    sum.finish()
}
