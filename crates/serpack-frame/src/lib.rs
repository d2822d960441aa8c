//! Byte-stuffed packet framing and stream reassembly for serial links.
//!
//! Every payload is framed as:
//! - A `START` marker (0x01)
//! - The payload, with every marker-valued byte replaced by `ESCAPE` + its complement
//! - An `END` marker (0x1A)
//!
//! Incoming chunks of any size are fed to a [`Reassembler`], which drains
//! every complete packet and keeps the partial tail for the next chunk.

pub mod codec;
pub mod error;
pub mod marker;
pub mod reassembler;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    encode_packet, encode_packet_into, encoded_len, unescape, FrameConfig, PacketDecoder,
    DEFAULT_MAX_FRAME_SIZE,
};
pub use error::{DecodeError, DecodeResult, FrameError, Result};
pub use marker::{END, ESCAPE, START};
pub use reader::PacketReader;
pub use reassembler::Reassembler;
pub use writer::PacketWriter;

#[cfg(feature = "async")]
pub use async_codec::PacketCodec;
