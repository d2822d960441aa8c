use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;

use bytes::Bytes;
use serpack_frame::{PacketReader, PacketWriter};
use tracing::debug;

use crate::config::PortConfig;
use crate::error::{PortError, Result};
use crate::listener::{PacketEvent, PacketListener};

/// A duplex stream that can be split into independent read and write handles.
pub trait TryCloneStream: Read + Write + Sized {
    /// Create a second handle to the same underlying stream.
    fn try_clone_stream(&self) -> std::io::Result<Self>;

    /// Shut down both directions of the stream for every handle.
    ///
    /// A read blocked on another handle returns EOF.
    fn shutdown_stream(&self) -> std::io::Result<()>;
}

impl TryCloneStream for std::net::TcpStream {
    fn try_clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self) -> std::io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

#[cfg(unix)]
impl TryCloneStream for std::os::unix::net::UnixStream {
    fn try_clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self) -> std::io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// File handles cannot be shut down; a listener on a device file stops when
/// the device reports EOF or an error.
impl TryCloneStream for std::fs::File {
    fn try_clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self) -> std::io::Result<()> {
        Err(std::io::Error::new(
            ErrorKind::Unsupported,
            "file handles cannot be shut down",
        ))
    }
}

/// Shut `stream` down, treating an already disconnected peer as success.
pub(crate) fn shutdown<S: TryCloneStream>(stream: &S) -> Result<()> {
    match stream.shutdown_stream() {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotConnected => {}
        Err(err) => return Err(PortError::Shutdown(err)),
    }
    debug!("stream shut down");
    Ok(())
}

/// Sends and receives whole payloads over a byte stream.
pub struct PacketPort<R, W> {
    reader: PacketReader<R>,
    writer: PacketWriter<W>,
    config: PortConfig,
}

impl<S: TryCloneStream> PacketPort<S, S> {
    /// Open a port on a duplex stream, such as an already configured serial device.
    pub fn open(stream: S) -> Result<Self> {
        Self::open_with_config(stream, PortConfig::default())
    }

    /// Open a port on a duplex stream with explicit configuration.
    pub fn open_with_config(stream: S, config: PortConfig) -> Result<Self> {
        let reader_stream = stream.try_clone_stream().map_err(PortError::CloneStream)?;
        debug!("packet port opened");
        Ok(Self::with_config(reader_stream, stream, config))
    }
}

impl<R: Read, W: Write> PacketPort<R, W> {
    /// Create a port from separate read and write halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, PortConfig::default())
    }

    /// Create a port from separate halves with explicit configuration.
    pub fn with_config(reader: R, writer: W, config: PortConfig) -> Self {
        Self {
            reader: PacketReader::with_config(reader, config.frame.clone()),
            writer: PacketWriter::new(writer),
            config,
        }
    }

    /// Frame and send one payload.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(payload)?;
        Ok(())
    }

    /// Receive the next payload (blocking).
    ///
    /// A malformed frame is returned as a recoverable error; see
    /// [`PortError::is_recoverable`].
    pub fn recv(&mut self) -> Result<Bytes> {
        Ok(self.reader.read_packet()?)
    }

    /// Current port configuration.
    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Split the port into its packet reader and writer.
    pub fn into_parts(self) -> (PacketReader<R>, PacketWriter<W>) {
        (self.reader, self.writer)
    }
}

impl<R, W> PacketPort<R, W>
where
    R: Read + Send + 'static,
    W: Write,
{
    /// Hand the receive side to a [`PacketListener`] and keep the writer.
    ///
    /// `handler` runs on the listener thread once per received frame.
    pub fn listen<F>(self, handler: F) -> Result<(PacketListener, PacketWriter<W>)>
    where
        F: FnMut(PacketEvent) + Send + 'static,
    {
        let listener = PacketListener::spawn_with_config(self.reader, &self.config, handler)?;
        Ok((listener, self.writer))
    }
}

impl<R, W: TryCloneStream> PacketPort<R, W> {
    /// Shut the stream down locally.
    ///
    /// When both halves share one stream, as after [`PacketPort::open`], a
    /// pending or later [`recv`](Self::recv) returns
    /// `FrameError::ConnectionClosed`.
    pub fn close(&self) -> Result<()> {
        shutdown(self.writer.get_ref())
    }
}

impl<R, W> std::fmt::Debug for PacketPort<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketPort")
            .field("reader", &self.reader)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
