use serpack_frame::FrameConfig;

/// Default name for listener threads.
pub const DEFAULT_LISTENER_NAME: &str = "serpack-listener";

/// Configuration for a packet port and its listener.
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Framing settings for the receive side.
    pub frame: FrameConfig,
    /// Name given to the listener thread.
    pub listener_name: String,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            listener_name: DEFAULT_LISTENER_NAME.to_string(),
        }
    }
}
