use std::io::{ErrorKind, Read};

use crate::accumulator::FrameAccumulator;
use crate::codec::{DecodedMessage, FrameConfig};
use crate::error::StreamError;

const READ_CHUNK_SIZE: usize = 1024;

/// Reads validated frames from any `Read` byte stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    acc: FrameAccumulator,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            acc: FrameAccumulator::with_max_frame_size(config.max_frame_size),
            config,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// A frame that fails validation is returned as `StreamError::Decode`;
    /// the reader stays usable and the next call continues after it.
    /// Returns `Err(StreamError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<DecodedMessage, StreamError> {
        loop {
            if let Some(result) = self.acc.next_message() {
                return result.map_err(StreamError::Decode);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            };

            if read == 0 {
                if self.acc.pending() > 0 {
                    tracing::debug!(pending = self.acc.pending(), "stream closed mid-frame");
                }
                return Err(StreamError::ConnectionClosed);
            }

            self.acc.extend(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<DecodedMessage, StreamError>;

    /// Yields frames until the stream closes.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_message() {
            Err(StreamError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_frame;
    use crate::error::DecodeError;
    use crate::message_type::MessageType;

    #[test]
    fn read_single_frame() {
        let wire = encode_frame(MessageType::Telemetry, 1, 10, br#"{"t":1}"#);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let message = reader.read_message().unwrap();

        assert_eq!(message.message_type, MessageType::Telemetry);
        assert_eq!(message.payload.as_ref(), br#"{"t":1}"#);
    }

    #[test]
    fn iterates_until_eof() {
        let mut wire = Vec::new();
        for seq in 0..3u64 {
            wire.extend_from_slice(&encode_frame(MessageType::Event, seq, 0, b"{}"));
        }

        let reader = FrameReader::new(Cursor::new(wire));
        let seqs: Vec<u64> = reader.map(|m| m.unwrap().sequence_number).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn partial_read_handling() {
        let wire = encode_frame(MessageType::Telemetry, 4, 4, b"slow");

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let message = reader.read_message().unwrap();
        assert_eq!(message.sequence_number, 4);
        assert_eq!(message.payload.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, StreamError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let wire = encode_frame(MessageType::Telemetry, 1, 1, b"partial");
        let mut reader = FrameReader::new(Cursor::new(wire[..wire.len() - 3].to_vec()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, StreamError::ConnectionClosed));
    }

    #[test]
    fn decode_error_then_recovery() {
        let mut wire = vec![0x05, 0x11, 0x00];
        wire.extend_from_slice(&encode_frame(MessageType::Ack, 2, 2, b""));

        let mut reader = FrameReader::new(Cursor::new(wire));
        assert!(matches!(
            reader.read_message(),
            Err(StreamError::Decode(DecodeError::Framing(_)))
        ));
        assert_eq!(reader.read_message().unwrap().sequence_number, 2);
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = encode_frame(MessageType::Telemetry, 8, 8, b"ok");

        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_message().unwrap().sequence_number, 8);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_frame_size, crate::DEFAULT_MAX_FRAME);
        let _inner = reader.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
