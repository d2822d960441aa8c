/// Errors that can occur in packet port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] serpack_frame::FrameError),

    /// Failed to duplicate the stream into read and write halves.
    #[error("failed to clone stream: {0}")]
    CloneStream(#[source] std::io::Error),

    /// Failed to shut the stream down.
    #[error("failed to shut down stream: {0}")]
    Shutdown(#[source] std::io::Error),

    /// Failed to start the listener thread.
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The packet handler panicked on the listener thread.
    #[error("listener thread panicked")]
    ListenerPanicked,
}

impl PortError {
    /// Whether the port may keep receiving after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PortError::Frame(err) if err.is_recoverable())
    }
}

pub type Result<T> = std::result::Result<T, PortError>;
