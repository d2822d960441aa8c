use bytes::BytesMut;
use tracing::debug;

use crate::codec::{FrameConfig, PacketDecoder};
use crate::error::DecodeResult;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reassembles packets from a byte stream delivered in arbitrary chunks.
///
/// Owns the receive buffer. Chunk boundaries don't need to line up with frame
/// boundaries: partial frames are kept until their END arrives, and a chunk
/// carrying several frames yields all of them.
///
/// A malformed or oversized frame is reported in place and decoding carries
/// on with the bytes after it.
#[derive(Debug)]
pub struct Reassembler {
    buf: BytesMut,
    decoder: PacketDecoder,
}

impl Reassembler {
    /// Create a new reassembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new reassembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: PacketDecoder::with_config(config),
        }
    }

    /// Append a chunk and return every frame it completes, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodeResult> {
        self.extend(chunk);

        let results: Vec<_> = std::iter::from_fn(|| self.next_packet()).collect();
        if !results.is_empty() {
            debug!(
                frames = results.len(),
                buffered = self.buf.len(),
                "drained frames"
            );
        }
        results
    }

    /// Append a chunk without extracting any frames.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Extract the next complete frame, if one is buffered.
    pub fn next_packet(&mut self) -> Option<DecodeResult> {
        self.decoder.decode(&mut self.buf)
    }

    /// Number of bytes held for frames not yet complete.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Whether no partial frame is pending.
    ///
    /// An oversized frame being skipped counts as pending even though its
    /// bytes are not held.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && !self.decoder.is_discarding()
    }

    /// Drop all buffered bytes, abandoning any partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.decoder.reset();
    }

    /// Update the frame length limit.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.decoder.set_max_frame_size(max_frame_size);
    }

    /// Current reassembler configuration.
    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
