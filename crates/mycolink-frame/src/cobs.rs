//! Consistent Overhead Byte Stuffing.
//!
//! Encoded output never contains `0x00` except for the single trailing
//! delimiter, so a zero byte unambiguously ends a frame on a stream.

use bytes::{BufMut, BytesMut};

use crate::error::FramingError;

/// Frame delimiter.
pub const DELIMITER: u8 = 0x00;

/// Longest run of non-zero bytes a single code byte can describe.
const MAX_RUN: usize = 254;

/// Code byte meaning "254 bytes follow, no implicit zero".
const LONG_RUN: u8 = 0xFF;

/// Worst-case encoded size for `len` input bytes, including the delimiter.
pub fn max_encoded_len(len: usize) -> usize {
    len + len / MAX_RUN + 2
}

/// Encode `data`, returning the stuffed bytes followed by the delimiter.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut dst = BytesMut::with_capacity(max_encoded_len(data.len()));
    encode_into(data, &mut dst);
    dst.to_vec()
}

/// Encode `data` and append it, delimiter included, to `dst`.
pub fn encode_into(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(max_encoded_len(data.len()));

    let mut code_at = dst.len();
    dst.put_u8(0);
    let mut code: u8 = 1;

    for &byte in data {
        if byte == 0 {
            dst[code_at] = code;
            code_at = dst.len();
            dst.put_u8(0);
            code = 1;
            continue;
        }

        dst.put_u8(byte);
        code += 1;
        if code == LONG_RUN {
            dst[code_at] = code;
            code_at = dst.len();
            dst.put_u8(0);
            code = 1;
        }
    }

    dst[code_at] = code;
    dst.put_u8(DELIMITER);
}

/// Decode a zero-terminated COBS frame.
///
/// A zero code byte before the terminator ends the usable data early.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>, FramingError> {
    let Some((&last, body)) = frame.split_last() else {
        return Err(FramingError::Empty);
    };
    if last != DELIMITER {
        return Err(FramingError::MissingTerminator);
    }

    let mut out = Vec::with_capacity(body.len());
    let mut pos = 0usize;

    while pos < body.len() {
        let code = body[pos];
        if code == 0 {
            break;
        }

        let start = pos + 1;
        let end = start + usize::from(code - 1);
        if end > body.len() {
            return Err(FramingError::Overrun {
                position: pos,
                code,
                len: frame.len(),
            });
        }

        out.extend_from_slice(&body[start..end]);
        pos = end;

        if code != LONG_RUN && pos < body.len() {
            out.push(0);
        }
    }

    Ok(out)
}
