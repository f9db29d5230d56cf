#![deny(missing_debug_implementations)]

//! Async network transports for sending and retrieving Internet mail:
//! SMTP submission, and IMAP/POP3 retrieval, each speaking its wire
//! protocol directly over a plain-or-TLS socket (spec §4.L-O).

pub mod config;
pub mod error;
pub mod line_reader;
pub mod socket;

pub mod smtp;
pub mod imap;
pub mod pop3;
