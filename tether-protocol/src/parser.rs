//! Incremental message parser
//!
//! Frame format:
//! - SIGNATURE (2 bytes): caller-chosen synchronization pattern
//! - CLASS, ID (1 byte each)
//! - LENGTH (2 bytes, little-endian): payload length
//! - PAYLOAD (LENGTH bytes)
//! - CHECKSUM (2 bytes): two-accumulator sum of CLASS..PAYLOAD
//!
//! The parser hunts for the signature with a two-byte sliding window, so any
//! amount of noise before a frame is skipped. After every completed or
//! failed frame it starts hunting again with an empty window.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::message::{CHECKSUM_LEN, HEADER_LEN};

/// What to do with a frame whose payload does not fit the output buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OversizePolicy {
    /// Fail right after the header, leaving payload and checksum in the
    /// stream
    ///
    /// The next hunt scans those bytes for a signature, so a payload that
    /// happens to contain one is taken for a frame. The checksum normally
    /// rejects such a false match.
    #[default]
    Abort,
    /// Skip the payload and checksum, then fail
    Discard,
}

/// Codec configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodecConfig {
    pub oversize: OversizePolicy,
}

/// A frame was found but rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Header plus payload would not fit the output buffer
    Oversize {
        /// Declared payload length
        length: u16,
        /// Output buffer size
        capacity: usize,
    },
    /// Received checksum differs from the computed one
    ChecksumMismatch {
        expected: [u8; 2],
        received: [u8; 2],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Sliding the window over the stream, holding its first byte
    Hunting { previous: Option<u8> },
    /// Reading CLASS, ID, LENGTH
    Header { filled: usize },
    /// Reading payload bytes into the output buffer
    Payload { filled: usize },
    /// Reading the two checksum bytes
    Checksum { first: Option<u8> },
    /// Skipping an oversize payload and its checksum
    Discarding { remaining: usize, capacity: usize },
}

/// State machine for parsing incoming messages
#[derive(Debug, Clone)]
pub struct MessageParser {
    signature: [u8; 2],
    oversize: OversizePolicy,
    state: ParseState,
    header: [u8; HEADER_LEN],
    length: u16,
    checksum: Checksum,
    hunted: usize,
}

impl MessageParser {
    /// Create a parser looking for `signature`
    pub const fn new(signature: [u8; 2], config: CodecConfig) -> Self {
        Self {
            signature,
            oversize: config.oversize,
            state: ParseState::Hunting { previous: None },
            header: [0; HEADER_LEN],
            length: 0,
            checksum: Checksum::new(),
            hunted: 0,
        }
    }

    /// Drop any partial frame and hunt for the next signature
    pub fn reset(&mut self) {
        self.state = ParseState::Hunting { previous: None };
        self.checksum = Checksum::new();
        self.hunted = 0;
    }

    /// Whether the parser is between frames
    pub fn is_hunting(&self) -> bool {
        matches!(self.state, ParseState::Hunting { .. })
    }

    /// Feed a single byte to the parser
    ///
    /// `msg` receives header and payload; pass the same buffer for every
    /// byte of a frame. Its length is the largest message accepted.
    ///
    /// Returns `Ok(Some(len))` when a valid message of `len` bytes (header
    /// plus payload) is complete in `msg[..len]`, `Ok(None)` when more bytes
    /// are needed, or `Err` when a frame was rejected.
    pub fn feed(&mut self, byte: u8, msg: &mut [u8]) -> Result<Option<usize>, FrameError> {
        match self.state {
            ParseState::Hunting { previous } => {
                self.hunted = self.hunted.saturating_add(1);
                if previous == Some(self.signature[0]) && byte == self.signature[1] {
                    if self.hunted > 2 {
                        trace!("resync: skipped {} bytes", self.hunted - 2);
                    }
                    self.hunted = 0;
                    self.checksum = Checksum::new();
                    self.state = ParseState::Header { filled: 0 };
                } else {
                    self.state = ParseState::Hunting {
                        previous: Some(byte),
                    };
                }
                Ok(None)
            }
            ParseState::Header { filled } => {
                self.header[filled] = byte;
                self.checksum.push(byte);
                let filled = filled + 1;
                if filled < HEADER_LEN {
                    self.state = ParseState::Header { filled };
                    return Ok(None);
                }

                self.length = u16::from_le_bytes([self.header[2], self.header[3]]);
                if let Some(dst) = msg.get_mut(..HEADER_LEN) {
                    dst.copy_from_slice(&self.header);
                }

                let capacity = msg.len();
                if HEADER_LEN + usize::from(self.length) > capacity {
                    warn!(
                        "oversize frame: length {} exceeds buffer of {}",
                        self.length,
                        capacity
                    );
                    return match self.oversize {
                        OversizePolicy::Abort => {
                            self.reset();
                            Err(FrameError::Oversize {
                                length: self.length,
                                capacity,
                            })
                        }
                        OversizePolicy::Discard => {
                            self.state = ParseState::Discarding {
                                remaining: usize::from(self.length) + CHECKSUM_LEN,
                                capacity,
                            };
                            Ok(None)
                        }
                    };
                }

                self.state = if self.length == 0 {
                    ParseState::Checksum { first: None }
                } else {
                    ParseState::Payload { filled: 0 }
                };
                Ok(None)
            }
            ParseState::Payload { filled } => {
                let Some(slot) = msg.get_mut(HEADER_LEN + filled) else {
                    // Buffer shrank between calls
                    let capacity = msg.len();
                    self.reset();
                    return Err(FrameError::Oversize {
                        length: self.length,
                        capacity,
                    });
                };
                *slot = byte;
                self.checksum.push(byte);
                let filled = filled + 1;
                self.state = if filled == usize::from(self.length) {
                    ParseState::Checksum { first: None }
                } else {
                    ParseState::Payload { filled }
                };
                Ok(None)
            }
            ParseState::Checksum { first: None } => {
                self.state = ParseState::Checksum { first: Some(byte) };
                Ok(None)
            }
            ParseState::Checksum { first: Some(first) } => {
                let expected = self.checksum.finish();
                let received = [first, byte];
                self.reset();
                if expected != received {
                    warn!(
                        "checksum mismatch: expected {}, received {}",
                        expected,
                        received
                    );
                    return Err(FrameError::ChecksumMismatch { expected, received });
                }
                Ok(Some(HEADER_LEN + usize::from(self.length)))
            }
            ParseState::Discarding {
                remaining,
                capacity,
            } => {
                if remaining > 1 {
                    self.state = ParseState::Discarding {
                        remaining: remaining - 1,
                        capacity,
                    };
                    return Ok(None);
                }
                self.reset();
                Err(FrameError::Oversize {
                    length: self.length,
                    capacity,
                })
            }
        }
    }
}
