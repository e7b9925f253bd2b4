//! Frames the proxy synthesizes for clients.
//!
//! Both frames carry a single message field:
//!
//! ```text
//! tag | int32 length | 'M' | message | \0 | \0
//! ```
//!
//! where the length covers everything after the tag.

use bytes::{BufMut, Bytes, BytesMut};

/// Tag byte of a NoticeResponse.
pub const NOTICE_TAG: u8 = b'N';

/// Tag byte of an ErrorResponse.
pub const ERROR_TAG: u8 = b'E';

/// Field type byte of the human-readable message.
pub const MESSAGE_FIELD: u8 = b'M';

/// Encode a NoticeResponse carrying `message`.
pub fn encode_notice(message: &str) -> Bytes {
    encode_frame(NOTICE_TAG, message)
}

/// Encode an ErrorResponse carrying `message`.
pub fn encode_error(message: &str) -> Bytes {
    encode_frame(ERROR_TAG, message)
}

fn encode_frame(tag: u8, message: &str) -> Bytes {
    let text = message.as_bytes();
    let length = 4 + 1 + text.len() + 1 + 1;

    let mut buf = BytesMut::with_capacity(1 + length);
    buf.put_u8(tag);
    buf.put_i32(length as i32);
    buf.put_u8(MESSAGE_FIELD);
    buf.put_slice(text);
    buf.put_u8(0);
    buf.put_u8(0);
    buf.freeze()
}
