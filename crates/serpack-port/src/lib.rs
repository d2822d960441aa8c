//! Packet endpoint over a serial-style byte stream.
//!
//! [`PacketPort`] sends and receives whole payloads over any reader/writer
//! pair. [`PacketListener`] moves the receive side onto its own thread and
//! pushes each decoded packet, or each malformed-frame notice, to a handler
//! in arrival order.
//!
//! Opening and configuring the physical device is left to the caller: hand
//! in anything that implements `Read` and `Write`.

pub mod config;
pub mod error;
pub mod listener;
pub mod port;

pub use config::{PortConfig, DEFAULT_LISTENER_NAME};
pub use error::{PortError, Result};
pub use listener::{ListenerStats, PacketEvent, PacketListener};
pub use port::{PacketPort, TryCloneStream};
