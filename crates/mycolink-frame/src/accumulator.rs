use bytes::{Buf, BytesMut};

use crate::cobs::DELIMITER;
use crate::codec::{decode_frame, DecodedMessage, DEFAULT_MAX_FRAME};
use crate::error::{DecodeError, Result};

/// Append-and-scan buffer that re-assembles frames split across chunks.
#[derive(Debug)]
pub struct FrameAccumulator {
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no delimiter.
    scanned: usize,
    max_frame_size: usize,
}

impl FrameAccumulator {
    /// Create an accumulator with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME)
    }

    /// Create an accumulator with an explicit frame size limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_frame_size,
        }
    }

    /// Append a transport chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Split off the next complete frame, delimiter included.
    ///
    /// Empty segments between consecutive delimiters are skipped. Returns
    /// `Ok(None)` when more data is needed, and discards the buffer with
    /// `FrameTooLarge` when the pending segment exceeds the size limit.
    pub fn next_raw(&mut self) -> Result<Option<BytesMut>> {
        loop {
            let found = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == DELIMITER)
                .map(|offset| self.scanned + offset);

            match found {
                Some(0) => {
                    self.buf.advance(1);
                    self.scanned = 0;
                }
                Some(end) => {
                    self.scanned = 0;
                    if end + 1 > self.max_frame_size {
                        self.buf.advance(end + 1);
                        return Err(DecodeError::FrameTooLarge {
                            size: end + 1,
                            max: self.max_frame_size,
                        });
                    }
                    return Ok(Some(self.buf.split_to(end + 1)));
                }
                None => {
                    self.scanned = self.buf.len();
                    if self.buf.len() > self.max_frame_size {
                        let size = self.buf.len();
                        self.clear();
                        tracing::warn!(size, "discarding undelimited bytes");
                        return Err(DecodeError::FrameTooLarge {
                            size,
                            max: self.max_frame_size,
                        });
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Decode the next complete frame.
    ///
    /// A frame that fails validation is consumed and its error returned, so
    /// the caller can keep draining the buffer.
    pub fn next_message(&mut self) -> Option<Result<DecodedMessage>> {
        match self.next_raw() {
            Ok(Some(raw)) => Some(decode_frame(&raw)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }

    /// Bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
