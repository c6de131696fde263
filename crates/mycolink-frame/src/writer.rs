use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{Frame, FrameConfig};
use crate::error::{DecodeError, StreamError};
use crate::message_type::MessageType;

/// Writes complete frames to any `Write` byte stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    /// Write a complete frame (blocking).
    ///
    /// A frame whose encoding exceeds `max_frame_size` is refused before any
    /// byte is written, since a reader with the same limit would discard it.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), StreamError> {
        self.buf.clear();
        frame.encode_into(&mut self.buf);
        if self.buf.len() > self.config.max_frame_size {
            return Err(StreamError::Decode(DecodeError::FrameTooLarge {
                size: self.buf.len(),
                max: self.config.max_frame_size,
            }));
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(StreamError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }

        self.flush()
    }

    /// Encode and send a payload.
    pub fn send(
        &mut self,
        message_type: MessageType,
        sequence_number: u64,
        timestamp_ms: u64,
        payload: &[u8],
    ) -> Result<(), StreamError> {
        let frame = Frame::new(
            message_type,
            sequence_number,
            timestamp_ms,
            bytes::Bytes::copy_from_slice(payload),
        );
        self.write_frame(&frame)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
