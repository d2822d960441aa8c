//! `tokio_util::codec` adapter for use with `FramedRead`, `FramedWrite` and `Framed`.
//!
//! Decoded items are [`DecodeResult`]s rather than bare payloads so that a
//! malformed frame shows up as one item and the stream keeps going; only I/O
//! failures and EOF inside a frame end the stream with a [`FrameError`].

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{encode_packet_into, FrameConfig, PacketDecoder};
use crate::error::{DecodeResult, FrameError};

/// Byte-stuffed packet codec.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    decoder: PacketDecoder,
}

impl PacketCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            decoder: PacketDecoder::with_config(config),
        }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }
}

impl Decoder for PacketCodec {
    type Item = DecodeResult;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.decoder.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(result) = self.decode(src)? {
            return Ok(Some(result));
        }
        if src.is_empty() && !self.decoder.is_discarding() {
            return Ok(None);
        }

        debug!(buffered = src.len(), "stream ended mid-frame");
        src.clear();
        self.decoder.reset();
        Err(FrameError::ConnectionClosed)
    }
}

impl Encoder<&[u8]> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_packet_into(item, dst);
        Ok(())
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_packet_into(&item, dst);
        Ok(())
    }
}
