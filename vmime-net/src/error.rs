//! Transport-level errors shared by the SMTP/IMAP/POP3 connections
//! (spec §4.L).

use vmime_types::error::VmimeError;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for the server")]
    Timeout,

    #[error("connection closed by the peer")]
    ConnectionClosed,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("the server does not advertise {0}")]
    UnsupportedExtension(&'static str),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("the server rejected the command: {0}")]
    Rejected(String),

    #[error("message parsing failed: {0}")]
    Parse(#[from] VmimeError),
}

pub type NetResult<T> = Result<T, NetError>;
