use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::marker::{is_marker, END, ESCAPE, START};

/// Default limit on the length of one encoded frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Number of bytes `payload` occupies on the wire once framed.
///
/// Two markers plus one extra byte for every payload byte that needs escaping.
pub fn encoded_len(payload: &[u8]) -> usize {
    let escaped = payload.iter().filter(|&&b| is_marker(b)).count();
    2 + payload.len() + escaped
}

/// Encode a payload into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌───────┬──────────────────────────────────────────┬───────┐
/// │ START │ payload, each START/END/ESCAPE byte `d`  │  END  │
/// │ 0x01  │ replaced by ESCAPE (0x1B) followed by !d │ 0x1A  │
/// └───────┴──────────────────────────────────────────┴───────┘
/// ```
///
/// Every byte sequence is encodable, including the empty one.
pub fn encode_packet_into(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(encoded_len(payload));
    dst.put_u8(START);
    for &byte in payload {
        if is_marker(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(!byte);
        } else {
            dst.put_u8(byte);
        }
    }
    dst.put_u8(END);
}

/// Encode a payload into a freshly allocated packet.
pub fn encode_packet(payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(encoded_len(payload));
    encode_packet_into(payload, &mut dst);
    dst.freeze()
}

/// Reverse the byte stuffing of a frame interior (the bytes between START and END).
///
/// Returns `None` if the interior ends on an unresolved `ESCAPE`.
pub fn unescape(stuffed: &[u8]) -> Option<Bytes> {
    let mut payload = BytesMut::with_capacity(stuffed.len());
    let mut escape = false;

    for &byte in stuffed {
        if escape {
            escape = false;
            payload.put_u8(!byte);
        } else if byte == ESCAPE {
            escape = true;
        } else {
            payload.put_u8(byte);
        }
    }

    if escape {
        return None;
    }
    Some(payload.freeze())
}

/// Extracts frames from a receive buffer.
///
/// A frame runs from the first START to the first END after it. Bytes that
/// cannot belong to any frame are dropped eagerly: the whole buffer when it
/// holds no START, otherwise everything before the first START.
///
/// A frame longer than `max_frame_size` (markers included) is reported as one
/// [`DecodeError::FrameTooLarge`] once its END arrives. Its bytes are not kept
/// while it is pending: as soon as the pending part passes the limit the
/// decoder switches to skipping up to END. The outcome only depends on the
/// frame's length, never on how the stream was chunked.
#[derive(Debug, Clone, Default)]
pub struct PacketDecoder {
    config: FrameConfig,
    /// Bytes of an oversized frame dropped so far, while skipping to its END.
    discarded: Option<usize>,
}

impl PacketDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            discarded: None,
        }
    }

    /// Extract the next frame from `src`.
    ///
    /// Returns `None` if the buffer doesn't contain a complete frame yet. On
    /// `Some`, the frame and every byte before it have been consumed from
    /// `src`, whether the frame decoded or not.
    pub fn decode(&mut self, src: &mut BytesMut) -> Option<DecodeResult> {
        let max = self.config.max_frame_size;

        if let Some(discarded) = self.discarded {
            let Some(end) = src.iter().position(|&b| b == END) else {
                self.discarded = Some(discarded + src.len());
                src.clear();
                return None; // Need more data
            };
            src.advance(end + 1);
            self.discarded = None;
            return Some(Err(too_large(discarded + end + 1, max)));
        }

        let Some(start) = src.iter().position(|&b| b == START) else {
            if !src.is_empty() {
                trace!(len = src.len(), "discarding bytes outside any frame");
                src.clear();
            }
            return None; // Need more data
        };

        let Some(offset) = src[start + 1..].iter().position(|&b| b == END) else {
            if start > 0 {
                trace!(len = start, "discarding bytes before START");
                src.advance(start);
            }
            if src.len() > max {
                debug!(pending = src.len(), max, "frame over limit, skipping to END");
                self.discarded = Some(src.len());
                src.clear();
            }
            return None; // Need more data
        };
        let end = start + 1 + offset;

        if start > 0 {
            trace!(len = start, "discarding bytes before START");
        }
        let consumed = src.split_to(end + 1);
        let frame = &consumed[start..];

        if frame.len() > max {
            return Some(Err(too_large(frame.len(), max)));
        }

        match unescape(&frame[1..frame.len() - 1]) {
            Some(payload) => {
                trace!(frame_len = frame.len(), payload_len = payload.len(), "frame decoded");
                Some(Ok(payload))
            }
            None => {
                warn!(frame_len = frame.len(), "dropping frame with trailing escape");
                Some(Err(DecodeError::MalformedFrame { len: frame.len() }))
            }
        }
    }

    /// Whether an oversized frame is being skipped and its END hasn't arrived.
    pub fn is_discarding(&self) -> bool {
        self.discarded.is_some()
    }

    /// Forget an oversized frame being skipped.
    pub fn reset(&mut self) {
        self.discarded = None;
    }

    /// Update the frame length limit.
    ///
    /// A frame already being skipped is still reported when its END arrives.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

fn too_large(size: usize, max: usize) -> DecodeError {
    warn!(size, max, "dropping oversized frame");
    DecodeError::FrameTooLarge { size, max }
}

/// Configuration for packet reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum length in bytes of one encoded frame, START and END included.
    /// Default: 16 MiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(buf: &mut BytesMut) -> Option<DecodeResult> {
        PacketDecoder::new().decode(buf)
    }

    #[test]
    fn test_escape_vector() {
        let packet = encode_packet(&[0x01, 0x1A, 0x1B]);
        assert_eq!(
            packet.as_ref(),
            &[START, ESCAPE, 0xFE, ESCAPE, 0xE5, ESCAPE, 0xE4, END]
        );

        let mut buf = BytesMut::from(packet.as_ref());
        let payload = decode(&mut buf)
            .unwrap()
            .unwrap();
        assert_eq!(payload.as_ref(), &[0x01, 0x1A, 0x1B]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let packet = encode_packet(b"");
        assert_eq!(packet.as_ref(), &[START, END]);

        let mut buf = BytesMut::from(packet.as_ref());
        let payload = decode(&mut buf)
            .unwrap()
            .unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let payloads: [&[u8]; 4] = [b"", b"plain", &[START, END, ESCAPE], &[0x00, 0x1B, 0xFF]];
        for payload in payloads {
            assert_eq!(encoded_len(payload), encode_packet(payload).len());
        }
        assert_eq!(encoded_len(&[START, END, ESCAPE]), 8);
    }

    #[test]
    fn test_encode_appends() {
        let mut buf = BytesMut::from(&b"xx"[..]);
        encode_packet_into(b"a", &mut buf);
        assert_eq!(buf.as_ref(), &[b'x', b'x', START, b'a', END]);
    }

    #[test]
    fn test_all_byte_values_roundtrip() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let packet = encode_packet(&payload);

        // Markers only at the boundaries.
        let interior = &packet[1..packet.len() - 1];
        assert!(!interior.contains(&START));
        assert!(!interior.contains(&END));

        let mut buf = BytesMut::from(packet.as_ref());
        let decoded = decode(&mut buf)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_decode_incomplete() {
        let mut buf = BytesMut::from(&[START, b'a', b'b'][..]);
        assert!(decode(&mut buf).is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_noise_without_start_is_dropped() {
        let mut buf = BytesMut::from(&[0xFF, END, 0x42][..]);
        assert!(decode(&mut buf).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_noise_before_partial_frame_is_dropped() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, START, b'a'][..]);
        assert!(decode(&mut buf).is_none());
        assert_eq!(buf.as_ref(), &[START, b'a']);
    }

    #[test]
    fn test_trailing_escape_is_malformed() {
        let mut buf = BytesMut::from(&[START, ESCAPE, END, 0x33][..]);
        let result = decode(&mut buf).unwrap();
        assert_eq!(result, Err(DecodeError::MalformedFrame { len: 3 }));
        assert_eq!(buf.as_ref(), &[0x33]);
    }

    #[test]
    fn test_unescape_rejects_trailing_escape() {
        assert!(unescape(&[b'a', ESCAPE]).is_none());
        assert_eq!(unescape(&[ESCAPE, 0xFE]).unwrap().as_ref(), &[START]);
    }

    #[test]
    fn test_oversized_pending_frame_is_skipped_to_end() {
        let mut decoder = PacketDecoder::with_config(FrameConfig { max_frame_size: 4 });
        let mut buf = BytesMut::from(&[START, 2, 3, 4, 5, 6][..]);

        assert!(decoder.decode(&mut buf).is_none());
        assert!(buf.is_empty());
        assert!(decoder.is_discarding());

        buf.extend_from_slice(&[7, END, START, b'o', b'k', END]);
        let result = decoder.decode(&mut buf).unwrap();
        assert_eq!(result, Err(DecodeError::FrameTooLarge { size: 8, max: 4 }));
        assert!(!decoder.is_discarding());

        let payload = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(payload.as_ref(), b"ok");
    }

    #[test]
    fn test_start_inside_oversized_frame_is_skipped() {
        let mut decoder = PacketDecoder::with_config(FrameConfig { max_frame_size: 4 });
        let mut buf = BytesMut::from(&[START, 7, 7, 7, 7, START, b'o'][..]);
        assert!(decoder.decode(&mut buf).is_none());

        buf.extend_from_slice(&[END]);
        let result = decoder.decode(&mut buf).unwrap();
        assert_eq!(result, Err(DecodeError::FrameTooLarge { size: 8, max: 4 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_complete_frame_over_limit_is_rejected() {
        let packet = encode_packet(b"longer than four");
        let mut decoder = PacketDecoder::with_config(FrameConfig { max_frame_size: 4 });
        let mut buf = BytesMut::from(packet.as_ref());

        let result = decoder.decode(&mut buf).unwrap();
        assert_eq!(
            result,
            Err(DecodeError::FrameTooLarge {
                size: packet.len(),
                max: 4
            })
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_frame_at_limit_decodes() {
        let mut decoder = PacketDecoder::with_config(FrameConfig { max_frame_size: 4 });
        let mut buf = BytesMut::from(&[START, b'o', b'k', END][..]);
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn test_reset_abandons_skipped_frame() {
        let mut decoder = PacketDecoder::with_config(FrameConfig { max_frame_size: 2 });
        let mut buf = BytesMut::from(&[START, 9, 8, 7][..]);
        assert!(decoder.decode(&mut buf).is_none());

        decoder.reset();
        buf.extend_from_slice(&[END, START, END]);
        assert_eq!(decoder.decode(&mut buf), Some(Ok(Bytes::new())));
    }

    #[test]
    fn test_frame_config_default() {
        assert_eq!(FrameConfig::default().max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }
}
