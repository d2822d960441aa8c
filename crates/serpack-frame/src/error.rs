use bytes::Bytes;

/// A per-frame decode failure.
///
/// These are local to one frame: the offending bytes have already been
/// consumed and decoding of later frames is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame interior ended on an unresolved `ESCAPE` byte.
    #[error("malformed frame ({len} bytes): trailing escape before END")]
    MalformedFrame { len: usize },

    /// A frame longer than the configured maximum was dropped.
    ///
    /// `size` is the full encoded length, START and END included.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Outcome of extracting one frame: the unescaped payload or a per-frame error.
pub type DecodeResult = std::result::Result<Bytes, DecodeError>;

/// Errors that can occur while reading or writing packets on a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A single frame failed to decode. The stream is still usable.
    #[error("frame decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An I/O error occurred while reading or writing packets.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed, possibly in the middle of a frame.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether reading may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
