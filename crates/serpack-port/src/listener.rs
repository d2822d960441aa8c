use std::io::Read;
use std::thread::JoinHandle;

use bytes::Bytes;
use serpack_frame::{DecodeError, FrameError, PacketReader};
use tracing::{debug, info, warn};

use crate::config::PortConfig;
use crate::error::{PortError, Result};
use crate::port::{shutdown, TryCloneStream};

/// A notification delivered to a [`PacketListener`] handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketEvent {
    /// A frame decoded successfully.
    Packet(Bytes),
    /// A frame was dropped; decoding continues with the next one.
    Malformed(DecodeError),
}

/// Counters reported when a listener finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Payloads delivered as [`PacketEvent::Packet`].
    pub packets: u64,
    /// Frames delivered as [`PacketEvent::Malformed`].
    pub malformed: u64,
}

/// Runs the receive loop on a dedicated thread and pushes events to a handler.
///
/// The thread owns the reader, so frames are delivered one at a time and in
/// arrival order. It runs until the source reaches EOF or fails. To stop it
/// from this side while the peer keeps the line open, use
/// [`PacketListener::stop`] or [`PacketPort::close`](crate::PacketPort::close).
pub struct PacketListener {
    handle: JoinHandle<Result<ListenerStats>>,
}

impl PacketListener {
    /// Spawn a listener with default configuration.
    pub fn spawn<R, F>(reader: PacketReader<R>, handler: F) -> Result<Self>
    where
        R: Read + Send + 'static,
        F: FnMut(PacketEvent) + Send + 'static,
    {
        Self::spawn_with_config(reader, &PortConfig::default(), handler)
    }

    /// Spawn a listener with explicit configuration.
    pub fn spawn_with_config<R, F>(
        reader: PacketReader<R>,
        config: &PortConfig,
        handler: F,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        F: FnMut(PacketEvent) + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name(config.listener_name.clone())
            .spawn(move || receive_loop(reader, handler))
            .map_err(PortError::Spawn)?;

        debug!(name = %config.listener_name, "listener started");
        Ok(Self { handle })
    }

    /// Whether the receive loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Shut `stream` down and wait for the receive loop to exit.
    ///
    /// `stream` must share the listener's underlying stream, such as the
    /// writer half returned by [`PacketPort::listen`](crate::PacketPort::listen).
    pub fn stop<S: TryCloneStream>(self, stream: &S) -> Result<ListenerStats> {
        shutdown(stream)?;
        self.join()
    }

    /// Wait for the receive loop to exit.
    ///
    /// Returns the counters on a clean EOF and the terminating error otherwise.
    pub fn join(self) -> Result<ListenerStats> {
        self.handle.join().map_err(|_| PortError::ListenerPanicked)?
    }
}

impl std::fmt::Debug for PacketListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketListener")
            .field("thread", &self.handle.thread().name())
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

fn receive_loop<R, F>(mut reader: PacketReader<R>, mut handler: F) -> Result<ListenerStats>
where
    R: Read,
    F: FnMut(PacketEvent),
{
    let mut stats = ListenerStats::default();

    loop {
        match reader.read_packet() {
            Ok(payload) => {
                stats.packets += 1;
                handler(PacketEvent::Packet(payload));
            }
            Err(FrameError::Decode(err)) => {
                warn!(%err, "frame dropped");
                stats.malformed += 1;
                handler(PacketEvent::Malformed(err));
            }
            Err(FrameError::ConnectionClosed) => {
                info!(
                    packets = stats.packets,
                    malformed = stats.malformed,
                    "source closed, listener stopping"
                );
                return Ok(stats);
            }
            Err(err) => {
                warn!(%err, "listener stopping on error");
                return Err(err.into());
            }
        }
    }
}
