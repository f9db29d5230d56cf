//! IMAP client: tagged command/response handling, `LIST` hierarchy,
//! `STARTTLS`, SASL, `SELECT`/`FETCH`/`STORE`/`EXPUNGE`, `MODSEQ`, and
//! untagged-response routing (spec §4.N).

mod connection;

pub use connection::{Capabilities, ImapConnection, ListEntry, SelectedMailbox, TaggedStatus};
