//! `tokio_util` codec for zero-delimited frames (feature `async`).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::accumulator::FrameAccumulator;
use crate::codec::{DecodedMessage, Frame, FrameConfig};
use crate::error::StreamError;

/// Decodes validated frames and encodes [`Frame`] envelopes.
///
/// Validation failures surface as `StreamError::Decode`; with `FramedRead`
/// the stream then ends, so callers that want to skip corrupt frames should
/// use [`FrameAccumulator`] directly.
#[derive(Debug)]
pub struct MdpCodec {
    acc: FrameAccumulator,
}

impl MdpCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            acc: FrameAccumulator::with_max_frame_size(config.max_frame_size),
        }
    }
}

impl Default for MdpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MdpCodec {
    type Item = DecodedMessage;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            self.acc.extend(src);
            src.clear();
        }
        match self.acc.next_message() {
            Some(result) => result.map(Some).map_err(StreamError::Decode),
            None => Ok(None),
        }
    }

    /// A partial frame left at end of stream is dropped and reported as
    /// `ConnectionClosed`.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        let pending = self.acc.pending();
        if pending > 0 {
            self.acc.clear();
            tracing::warn!(pending, "stream closed mid-frame");
            return Err(StreamError::ConnectionClosed);
        }
        Ok(None)
    }
}

impl Encoder<Frame> for MdpCodec {
    type Error = StreamError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst);
        Ok(())
    }
}
