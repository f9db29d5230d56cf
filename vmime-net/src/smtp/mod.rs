//! SMTP submission client: `EHLO`, `STARTTLS`, SASL `PLAIN`/`LOGIN`,
//! pipelining, dot-stuffed `DATA` and `BDAT` chunking (spec §4.M).

mod connection;

pub use connection::{Extensions, SmtpConnection};
