//! Error kinds shared by the whole workspace (spec §7).

use thiserror::Error;

/// A position inside the byte stream being parsed, for diagnostics.
pub type Position = usize;

/// Errors that the message model, the codec and the protocol connections can
/// all produce. Protocol-specific transport errors (timeouts, command
/// rejections, ...) live in `vmime-net` and wrap this enum via `#[from]`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmimeError {
    #[error("parse error at byte {position}: {message}")]
    ParseError { position: Position, message: String },

    #[error("value of type {expected} cannot be assigned to field {field}")]
    BadFieldValueType { field: String, expected: String },

    #[error("no such field: {0}")]
    NoSuchField(String),

    #[error("no such parameter: {0}")]
    NoSuchParameter(String),

    #[error("no such message-id in sequence")]
    NoSuchMessageId,

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("content-transfer-encoding {0} is not supported")]
    EncodingNotSupported(String),

    #[error("failed to decode content: {0}")]
    DecodingFailed(String),
}
