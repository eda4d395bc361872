//! Blocking message send and receive over a byte stream

use crate::checksum::checksum;
use crate::io::{ByteSink, ByteSource, Overflow};
use crate::message::{EncodeError, FRAME_OVERHEAD, SIGNATURE_LEN};
use crate::parser::{CodecConfig, FrameError, MessageParser, OversizePolicy};

/// Why `receive` returned without a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError<E> {
    /// A frame was found but rejected; call `receive` again to resynchronize
    Frame(FrameError),
    /// The byte source failed
    Source(E),
}

impl<E> ReceiveError<E> {
    /// Whether the stream lost framing and the next receive rescans it
    pub fn is_desync(&self) -> bool {
        matches!(self, ReceiveError::Frame(_))
    }
}

impl<E> From<FrameError> for ReceiveError<E> {
    fn from(e: FrameError) -> Self {
        ReceiveError::Frame(e)
    }
}

/// Message framing with a fixed signature
///
/// Sending is fire-and-forget: there is no acknowledgement or retry, and
/// lost or corrupted frames are only handled by the receiver rescanning for
/// the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageCodec {
    signature: [u8; SIGNATURE_LEN],
    config: CodecConfig,
}

impl MessageCodec {
    /// Codec with the default configuration
    pub const fn new(signature: [u8; SIGNATURE_LEN]) -> Self {
        Self::with_config(
            signature,
            CodecConfig {
                oversize: OversizePolicy::Abort,
            },
        )
    }

    pub const fn with_config(signature: [u8; SIGNATURE_LEN], config: CodecConfig) -> Self {
        Self { signature, config }
    }

    pub const fn signature(&self) -> [u8; SIGNATURE_LEN] {
        self.signature
    }

    pub const fn config(&self) -> CodecConfig {
        self.config
    }

    /// A fresh incremental parser for this codec's frames
    pub const fn parser(&self) -> MessageParser {
        MessageParser::new(self.signature, self.config)
    }

    /// Frame and queue `msg` (header plus payload)
    ///
    /// Writes signature, message and checksum, each even if an earlier part
    /// did not fit. Returns `Err(Overflow)` if the sink dropped any byte;
    /// use [`can_send`](Self::can_send) first to avoid partial frames.
    pub fn send<K: ByteSink + ?Sized>(&self, sink: &mut K, msg: &[u8]) -> Result<(), Overflow> {
        let signature = sink.write_bytes(&self.signature);
        let body = sink.write_bytes(msg);
        let trailer = sink.write_bytes(&checksum(msg));
        signature.and(body).and(trailer)
    }

    /// Wait for the next valid message and copy it into `msg`
    ///
    /// Skips everything up to the next signature, then reads header,
    /// payload and checksum. `msg.len()` is the largest message accepted.
    /// Returns the message length (header plus payload).
    ///
    /// A rejected frame ends the call with [`ReceiveError::Frame`]. With
    /// [`OversizePolicy::Abort`] an oversize
    /// frame's payload stays in the stream and the next call scans it.
    pub fn receive<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        msg: &mut [u8],
    ) -> Result<usize, ReceiveError<S::Error>> {
        let mut parser = self.parser();
        loop {
            let byte = source.read_byte().map_err(ReceiveError::Source)?;
            if let Some(len) = parser.feed(byte, msg)? {
                return Ok(len);
            }
        }
    }

    /// Whether a message of `msg_len` bytes (header plus payload) fits the
    /// sink together with signature and checksum
    pub fn can_send<K: ByteSink + ?Sized>(&self, sink: &K, msg_len: usize) -> bool {
        sink.available() >= msg_len.saturating_add(FRAME_OVERHEAD)
    }

    /// Write the complete frame for `msg` into `out`
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, msg: &[u8], out: &mut [u8]) -> Result<usize, EncodeError> {
        let len = msg.len() + FRAME_OVERHEAD;
        let out = out.get_mut(..len).ok_or(EncodeError::BufferTooSmall)?;
        let (signature, rest) = out.split_at_mut(SIGNATURE_LEN);
        let (body, trailer) = rest.split_at_mut(msg.len());
        signature.copy_from_slice(&self.signature);
        body.copy_from_slice(msg);
        trailer.copy_from_slice(&checksum(msg));
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{EndOfInput, SliceSource};
    use crate::message::{Message, HEADER_LEN};
    use heapless::Vec;
    use proptest::prelude::*;

    const SIG: [u8; 2] = [0xAA, 0x55];

    fn frame_for(codec: &MessageCodec, msg: &[u8]) -> std::vec::Vec<u8> {
        let mut out = vec![0u8; msg.len() + FRAME_OVERHEAD];
        let len = codec.encode(msg, &mut out).unwrap();
        assert_eq!(len, out.len());
        out
    }

    #[test]
    fn test_end_to_end_scenario() {
        let codec = MessageCodec::new(SIG);
        let mut body = [0u8; 16];
        let body_len = Message::new(0x01, 0x02, &[0x10, 0x20, 0x30])
            .encode(&mut body)
            .unwrap();
        assert_eq!(&body[..body_len], &[0x01, 0x02, 0x03, 0x00, 0x10, 0x20, 0x30]);

        let mut wire = Vec::<u8, 32>::new();
        assert_eq!(codec.send(&mut wire, &body[..body_len]), Ok(()));
        assert_eq!(
            wire.as_slice(),
            &[0xAA, 0x55, 0x01, 0x02, 0x03, 0x00, 0x10, 0x20, 0x30, 0x66, 0xC2]
        );

        let mut source = SliceSource::new(&wire);
        let mut msg = [0u8; 11];
        assert_eq!(codec.receive(&mut source, &mut msg), Ok(7));
        assert_eq!(&msg[..7], &[0x01, 0x02, 0x03, 0x00, 0x10, 0x20, 0x30]);
        assert!(source.remaining().is_empty());
    }

    #[test]
    fn test_send_reports_overflow_but_writes_what_fits() {
        let codec = MessageCodec::new(SIG);
        let mut wire = Vec::<u8, 6>::new();
        let msg = [0x01, 0x02, 0x01, 0x00, 0x99];
        assert!(!codec.can_send(&wire, msg.len()));
        assert_eq!(codec.send(&mut wire, &msg), Err(Overflow));
        assert_eq!(wire.as_slice(), &[0xAA, 0x55, 0x01, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_can_send_counts_signature_and_checksum() {
        let codec = MessageCodec::new(SIG);
        let wire = Vec::<u8, 11>::new();
        assert!(codec.can_send(&wire, 7));
        assert!(!codec.can_send(&wire, 8));
        assert!(!codec.can_send(&wire, usize::MAX));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let codec = MessageCodec::new(SIG);
        let mut out = [0u8; 7];
        assert_eq!(
            codec.encode(&[1, 2, 0, 0], &mut out),
            Err(EncodeError::BufferTooSmall)
        );
    }

    #[test]
    fn test_receive_source_exhausted() {
        let codec = MessageCodec::new(SIG);
        let mut source = SliceSource::new(&[0x00, 0xAA, 0x55, 0x01]);
        let mut msg = [0u8; 16];
        assert_eq!(
            codec.receive(&mut source, &mut msg),
            Err(ReceiveError::Source(EndOfInput))
        );
    }

    #[test]
    fn test_false_signature_recovers_on_next_receive() {
        let codec = MessageCodec::new(SIG);
        let good = frame_for(&codec, &[0x01, 0x02, 0x01, 0x00, 0x42]);

        // Noise that looks like a signature followed by a huge length
        let mut stream = vec![0xAA, 0x55, 0x09, 0x09, 0xFF, 0x00];
        stream.extend_from_slice(&good);

        let mut source = SliceSource::new(&stream);
        let mut msg = [0u8; 32];
        let first = codec.receive(&mut source, &mut msg);
        assert_eq!(
            first,
            Err(ReceiveError::Frame(FrameError::Oversize {
                length: 0xFF,
                capacity: 32
            }))
        );
        assert!(first.unwrap_err().is_desync());
        // Abort leaves everything after the bogus header in the stream
        assert_eq!(source.consumed(), 6);

        assert_eq!(codec.receive(&mut source, &mut msg), Ok(5));
        assert_eq!(&msg[..5], &[0x01, 0x02, 0x01, 0x00, 0x42]);
    }

    #[test]
    fn test_oversize_abort_leaves_payload_in_stream() {
        let codec = MessageCodec::new(SIG);
        let frame = frame_for(&codec, &[0x01, 0x02, 0x04, 0x00, 1, 2, 3, 4]);
        let mut source = SliceSource::new(&frame);
        let mut msg = [0u8; 6];
        let result = codec.receive(&mut source, &mut msg);
        assert!(matches!(
            result,
            Err(ReceiveError::Frame(FrameError::Oversize { length: 4, .. }))
        ));
        assert_eq!(source.consumed(), 2 + HEADER_LEN);
        assert_eq!(source.remaining(), &frame[6..]);
    }

    #[test]
    fn test_oversize_discard_consumes_whole_frame() {
        let codec = MessageCodec::with_config(
            SIG,
            CodecConfig {
                oversize: OversizePolicy::Discard,
            },
        );
        let big = frame_for(&codec, &[0x01, 0x02, 0x04, 0x00, 1, 2, 3, 4]);
        let small = frame_for(&codec, &[0x03, 0x04, 0x00, 0x00]);
        let mut stream = big.clone();
        stream.extend_from_slice(&small);

        let mut source = SliceSource::new(&stream);
        let mut msg = [0u8; 6];
        assert!(codec.receive(&mut source, &mut msg).is_err());
        assert_eq!(source.consumed(), big.len());
        assert_eq!(codec.receive(&mut source, &mut msg), Ok(4));
        assert_eq!(&msg[..4], &[0x03, 0x04, 0x00, 0x00]);
    }

    #[test]
    fn test_checksum_mismatch_consumes_checksum() {
        let codec = MessageCodec::new(SIG);
        let mut frame = frame_for(&codec, &[0x01, 0x02, 0x01, 0x00, 0x42]);
        frame[6] ^= 0x01;
        let mut source = SliceSource::new(&frame);
        let mut msg = [0u8; 16];
        let result = codec.receive(&mut source, &mut msg);
        assert!(matches!(
            result,
            Err(ReceiveError::Frame(FrameError::ChecksumMismatch { .. }))
        ));
        assert!(source.remaining().is_empty());
    }

    #[test]
    fn test_corrupted_length_is_rejected() {
        let codec = MessageCodec::new(SIG);
        let mut frame = frame_for(&codec, &[0x01, 0x02, 0x03, 0x00, 0x10, 0x20, 0x30]);
        // LENGTH 3 -> 2: checksum bytes are read from payload[2] and c1
        frame[4] ^= 0x01;
        let mut source = SliceSource::new(&frame);
        let mut msg = [0u8; 16];
        assert!(codec.receive(&mut source, &mut msg).is_err());
    }

    fn message() -> impl Strategy<Value = std::vec::Vec<u8>> {
        (any::<u8>(), any::<u8>(), proptest::collection::vec(any::<u8>(), 0..64)).prop_map(
            |(class, id, payload)| {
                let mut body = vec![0u8; HEADER_LEN + payload.len()];
                Message::new(class, id, &payload).encode(&mut body).unwrap();
                body
            },
        )
    }

    proptest! {
        #[test]
        fn prop_roundtrip(sig in any::<[u8; 2]>(), body in message()) {
            let codec = MessageCodec::new(sig);
            let frame = frame_for(&codec, &body);

            let mut source = SliceSource::new(&frame);
            let mut msg = [0u8; HEADER_LEN + 64];
            prop_assert_eq!(codec.receive(&mut source, &mut msg), Ok(body.len()));
            prop_assert_eq!(&msg[..body.len()], body.as_slice());
        }

        #[test]
        fn prop_single_byte_corruption_detected(
            body in message(),
            index in any::<prop::sample::Index>(),
            delta in 1u8..=255,
        ) {
            let codec = MessageCodec::new(SIG);
            let mut frame = frame_for(&codec, &body);
            // Any byte after the signature except the length field
            let candidates: std::vec::Vec<usize> = (SIGNATURE_LEN..frame.len())
                .filter(|&i| i != 4 && i != 5)
                .collect();
            let target = candidates[index.index(candidates.len())];
            frame[target] = frame[target].wrapping_add(delta);

            let mut source = SliceSource::new(&frame);
            let mut msg = [0u8; HEADER_LEN + 64];
            let result = codec.receive(&mut source, &mut msg);
            prop_assert!(
                matches!(result, Err(ReceiveError::Frame(FrameError::ChecksumMismatch { .. }))),
                "corruption at {} not detected: {:?}",
                target,
                result
            );
        }

        #[test]
        fn prop_resync_after_garbage(
            garbage in proptest::collection::vec(any::<u8>(), 0..128),
            body in message(),
        ) {
            prop_assume!(!garbage.windows(2).any(|w| w == SIG));

            let codec = MessageCodec::new(SIG);
            let frame = frame_for(&codec, &body);
            let mut stream = garbage.clone();
            stream.extend_from_slice(&frame);

            let mut source = SliceSource::new(&stream);
            let mut msg = [0u8; HEADER_LEN + 64];
            prop_assert_eq!(codec.receive(&mut source, &mut msg), Ok(body.len()));
            prop_assert_eq!(&msg[..body.len()], body.as_slice());
            prop_assert_eq!(source.consumed(), stream.len());
        }
    }
}
