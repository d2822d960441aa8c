use std::io::{ErrorKind, Read};

use bytes::Bytes;
use tracing::debug;

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::reassembler::Reassembler;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete packets from any `Read` byte source.
///
/// Handles partial reads and glued packets internally; callers always get
/// whole payloads.
pub struct PacketReader<T> {
    inner: T,
    reassembler: Reassembler,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            reassembler: Reassembler::with_config(config),
        }
    }

    /// Read the next complete packet payload (blocking).
    ///
    /// A frame that fails to decode is returned as `Err(FrameError::Decode)`;
    /// the reader stays usable and the next call continues after that frame.
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Bytes> {
        loop {
            if let Some(result) = self.reassembler.next_packet() {
                return result.map_err(FrameError::from);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if !self.reassembler.is_empty() {
                    debug!(
                        buffered = self.reassembler.buffered(),
                        "source closed mid-frame"
                    );
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.reassembler.extend(&chunk[..read]);
        }
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    ///
    /// Any partially received frame is discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the frame length limit for subsequent reads.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.reassembler.set_max_frame_size(max_frame_size);
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.reassembler.config()
    }
}

impl<T> std::fmt::Debug for PacketReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketReader")
            .field("buffered", &self.reassembler.buffered())
            .finish_non_exhaustive()
    }
}
