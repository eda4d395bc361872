//! Checksummed binary message framing
//!
//! This crate turns a continuous byte stream into discrete messages and
//! back. It knows nothing about the transport: anything implementing
//! [`ByteSource`] and [`ByteSink`] can carry frames.
//!
//! # Frame layout
//!
//! ```text
//! ┌───────────┬───────┬────┬────────────┬─────────┬──────────┐
//! │ SIGNATURE │ CLASS │ ID │ LENGTH(LE) │ PAYLOAD │ CHECKSUM │
//! │ 2B        │ 1B    │ 1B │ 2B         │ LENGTH  │ 2B       │
//! └───────────┴───────┴────┴────────────┴─────────┴──────────┘
//! ```
//!
//! The checksum covers CLASS through PAYLOAD. The receiver resynchronizes
//! by scanning for the signature, so a lost or corrupted frame costs only
//! that frame.
//!
//! Delivery is best effort. There are no acknowledgements, retransmission
//! or sequence numbers.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the other modules see its macros
mod fmt;

pub mod checksum;
pub mod codec;
pub mod io;
pub mod message;
pub mod parser;

pub use checksum::{checksum, Checksum};
pub use codec::{MessageCodec, ReceiveError};
pub use io::{ByteSink, ByteSource, EndOfInput, Overflow, SliceSource};
pub use message::{
    EncodeError, Header, Message, CHECKSUM_LEN, FRAME_OVERHEAD, HEADER_LEN, MAX_PAYLOAD_LEN,
    SIGNATURE_LEN,
};
pub use parser::{CodecConfig, FrameError, MessageParser, OversizePolicy};
