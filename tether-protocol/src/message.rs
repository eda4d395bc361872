//! Message layout
//!
//! A message is a 4-byte header followed by the payload:
//!
//! ```text
//! ┌───────┬────┬────────────┬──────────────────┐
//! │ CLASS │ ID │ LENGTH(LE) │ PAYLOAD          │
//! │ 1B    │ 1B │ 2B         │ LENGTH bytes     │
//! └───────┴────┴────────────┴──────────────────┘
//! ```
//!
//! On the wire it is preceded by the 2-byte signature and followed by the
//! 2-byte checksum of header and payload.

/// Signature length on the wire
pub const SIGNATURE_LEN: usize = 2;

/// Header length (CLASS, ID, LENGTH)
pub const HEADER_LEN: usize = 4;

/// Checksum length on the wire
pub const CHECKSUM_LEN: usize = 2;

/// Bytes a frame adds around a message (signature + checksum)
pub const FRAME_OVERHEAD: usize = SIGNATURE_LEN + CHECKSUM_LEN;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Errors building a message or frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer cannot hold the result
    BufferTooSmall,
    /// Payload longer than the length field can describe
    PayloadTooLarge,
}

/// Message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Message class
    pub class: u8,
    /// Message identifier within the class
    pub id: u8,
    /// Payload length in bytes
    pub length: u16,
}

impl Header {
    pub const fn new(class: u8, id: u8, length: u16) -> Self {
        Self { class, id, length }
    }

    /// Header bytes as they appear in a message
    pub const fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [lo, hi] = self.length.to_le_bytes();
        [self.class, self.id, lo, hi]
    }

    /// Parse the first four bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [class, id, lo, hi, ..] => Some(Self {
                class,
                id,
                length: u16::from_le_bytes([lo, hi]),
            }),
            _ => None,
        }
    }

    /// Header plus payload length
    pub const fn message_len(&self) -> usize {
        HEADER_LEN + self.length as usize
    }
}

/// A message viewed as class, id and borrowed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message<'a> {
    pub class: u8,
    pub id: u8,
    pub payload: &'a [u8],
}

impl<'a> Message<'a> {
    pub const fn new(class: u8, id: u8, payload: &'a [u8]) -> Self {
        Self { class, id, payload }
    }

    /// View a received message (header followed by payload)
    ///
    /// Returns `None` if `bytes` is shorter than the header says.
    /// Bytes past the declared payload are ignored.
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        let header = Header::parse(bytes)?;
        let payload = bytes.get(HEADER_LEN..header.message_len())?;
        Some(Self {
            class: header.class,
            id: header.id,
            payload,
        })
    }

    pub fn header(&self) -> Result<Header, EncodeError> {
        let length = u16::try_from(self.payload.len()).map_err(|_| EncodeError::PayloadTooLarge)?;
        Ok(Header::new(self.class, self.id, length))
    }

    /// Header plus payload length
    pub const fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Write header and payload into `out`
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, EncodeError> {
        let header = self.header()?;
        let len = self.encoded_len();
        let out = out.get_mut(..len).ok_or(EncodeError::BufferTooSmall)?;
        out[..HEADER_LEN].copy_from_slice(&header.to_bytes());
        out[HEADER_LEN..].copy_from_slice(self.payload);
        Ok(len)
    }
}
