//! POP3 client: `USER`/`PASS`/`APOP`, `STLS`, SASL, and the
//! `STAT`/`LIST`/`UIDL`/`RETR`/`TOP`/`DELE` command set (spec §4.O).

mod connection;

pub use connection::{ListingEntry, Pop3Connection};
