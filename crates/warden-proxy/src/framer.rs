//! Incremental Postgres frontend message framing.
//!
//! A client stream starts with one untagged startup-shaped message
//! (`int32 length` including itself, then the body) and continues with typed
//! messages (`byte tag`, `int32 length` including itself but not the tag,
//! then the payload). [`MessageFramer::feed`] turns whatever has accumulated
//! in a receive buffer into complete messages and leaves any partial tail in
//! the buffer for the next read.
//!
//! SSLRequest and GSSENCRequest are startup-shaped but are followed by the
//! real startup message, so they keep the framer expecting an untagged
//! message.

use crate::error::FramingError;
use bytes::{Bytes, BytesMut};

/// Tag byte of a simple query message.
pub const QUERY_TAG: u8 = b'Q';

/// Request code sent in place of a protocol version to ask for TLS.
pub const SSL_REQUEST_CODE: i32 = 80877103;

/// Request code sent in place of a protocol version to ask for GSSAPI encryption.
pub const GSSENC_REQUEST_CODE: i32 = 80877104;

/// Request code of a query cancellation.
pub const CANCEL_REQUEST_CODE: i32 = 80877102;

const LENGTH_FIELD: usize = 4;
const MIN_STARTUP_LENGTH: i32 = 8;
const MIN_TYPED_LENGTH: i32 = 4;

/// What kind of frontend message was framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// An untagged startup-shaped message.
    Startup,
    /// A regular message carrying its tag byte.
    Typed(u8),
}

/// One complete frontend message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    /// Message kind.
    pub kind: MessageKind,
    /// Exact bytes as received, tag and length included.
    pub raw: Bytes,
    /// Value of the length field.
    pub declared_length: u32,
    /// Statement text, for simple query messages.
    pub query: Option<String>,
}

impl ProtocolMessage {
    /// Statement text of a simple query message.
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Check if this is a simple query message.
    pub fn is_query(&self) -> bool {
        self.kind == MessageKind::Typed(QUERY_TAG)
    }

    /// The request code of a startup-shaped message.
    pub fn startup_code(&self) -> Option<i32> {
        if self.kind != MessageKind::Startup || self.raw.len() < 8 {
            return None;
        }
        Some(i32::from_be_bytes([
            self.raw[4],
            self.raw[5],
            self.raw[6],
            self.raw[7],
        ]))
    }
}

/// Per-connection framing state.
#[derive(Debug, Clone)]
pub struct MessageFramer {
    awaiting_startup: bool,
    max_message_size: usize,
}

/// Position of a framed message inside the buffer being scanned.
struct Frame {
    kind: MessageKind,
    start: usize,
    end: usize,
    declared_length: u32,
    query: Option<String>,
}

impl MessageFramer {
    /// Create a framer for a fresh connection.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            awaiting_startup: true,
            max_message_size,
        }
    }

    /// Whether the next message is expected to be untagged.
    pub fn awaiting_startup(&self) -> bool {
        self.awaiting_startup
    }

    /// Frame every complete message at the front of `buf`.
    ///
    /// Consumed bytes are removed from `buf`; an incomplete trailing message
    /// stays there. On error nothing is consumed and no framing state changes,
    /// so the caller decides what to discard.
    pub fn feed(&mut self, buf: &mut BytesMut) -> Result<Vec<ProtocolMessage>, FramingError> {
        let mut frames = Vec::new();
        let mut offset = 0;
        let mut awaiting_startup = self.awaiting_startup;

        loop {
            let rest = &buf[offset..];
            let frame = if awaiting_startup {
                match self.frame_startup(rest)? {
                    Some((frame, code)) => {
                        awaiting_startup =
                            code == SSL_REQUEST_CODE || code == GSSENC_REQUEST_CODE;
                        frame
                    }
                    None => break,
                }
            } else {
                match self.frame_typed(rest)? {
                    Some(frame) => frame,
                    None => break,
                }
            };

            offset += frame.end;
            frames.push(Frame {
                start: offset - frame.end + frame.start,
                end: offset,
                ..frame
            });
        }

        self.awaiting_startup = awaiting_startup;
        let consumed = buf.split_to(offset).freeze();

        Ok(frames
            .into_iter()
            .map(|frame| ProtocolMessage {
                kind: frame.kind,
                raw: consumed.slice(frame.start..frame.end),
                declared_length: frame.declared_length,
                query: frame.query,
            })
            .collect())
    }

    fn frame_startup(&self, rest: &[u8]) -> Result<Option<(Frame, i32)>, FramingError> {
        let Some(length) = read_i32(rest, 0) else {
            return Ok(None);
        };
        if length < MIN_STARTUP_LENGTH {
            return Err(FramingError::InvalidLength {
                length,
                minimum: MIN_STARTUP_LENGTH,
            });
        }
        let total = length as usize;
        self.check_size(total)?;
        if rest.len() < total {
            return Ok(None);
        }

        let Some(code) = read_i32(rest, LENGTH_FIELD) else {
            return Ok(None);
        };
        Ok(Some((
            Frame {
                kind: MessageKind::Startup,
                start: 0,
                end: total,
                declared_length: length as u32,
                query: None,
            },
            code,
        )))
    }

    fn frame_typed(&self, rest: &[u8]) -> Result<Option<Frame>, FramingError> {
        let (Some(&tag), Some(length)) = (rest.first(), read_i32(rest, 1)) else {
            return Ok(None);
        };
        if length < MIN_TYPED_LENGTH {
            return Err(FramingError::InvalidLength {
                length,
                minimum: MIN_TYPED_LENGTH,
            });
        }
        let total = 1 + length as usize;
        self.check_size(total)?;
        if rest.len() < total {
            return Ok(None);
        }

        let query = if tag == QUERY_TAG {
            Some(decode_query(&rest[1 + LENGTH_FIELD..total])?)
        } else {
            None
        };

        Ok(Some(Frame {
            kind: MessageKind::Typed(tag),
            start: 0,
            end: total,
            declared_length: length as u32,
            query,
        }))
    }

    fn check_size(&self, total: usize) -> Result<(), FramingError> {
        if total > self.max_message_size {
            return Err(FramingError::MessageTooLarge {
                length: total,
                limit: self.max_message_size,
            });
        }
        Ok(())
    }
}

/// Big-endian `i32` at `at`, or `None` if the field isn't fully buffered.
fn read_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let field = bytes.get(at..at.checked_add(LENGTH_FIELD)?)?;
    field.try_into().ok().map(i32::from_be_bytes)
}

/// Strip the trailing null byte from a query payload and decode it.
fn decode_query(payload: &[u8]) -> Result<String, FramingError> {
    match payload.split_last() {
        Some((0, text)) => std::str::from_utf8(text)
            .map(str::to_owned)
            .map_err(|_| FramingError::InvalidUtf8),
        _ => Err(FramingError::MissingTerminator),
    }
}
