#![deny(missing_debug_implementations)]

//! Parsing and generation of Internet mail messages: RFC-5322 headers,
//! RFC-2047 encoded words, RFC-2231 parameters, MIME multipart bodies and
//! a message-level convenience facade.

pub mod lexical;
pub mod stream;
pub mod charset;
pub mod word;

pub mod datetime_field;
pub mod mailbox_field;
pub mod message_id_field;
pub mod relay_field;
pub mod content_field;
pub mod param_field;

pub mod header_field;
pub mod header;
pub mod body;
pub mod message;

#[cfg(test)]
pub(crate) mod testing;

pub use vmime_types as types;
