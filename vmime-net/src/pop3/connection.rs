use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::{Digest, Md5};

use crate::error::{NetError, NetResult};
use crate::line_reader::LineReader;
use crate::socket::Socket;

/// One entry of a `LIST`/`UIDL` listing: the message number and, depending
/// on the command, its octet size or its opaque unique ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub number: u32,
    pub value: String,
}

fn md5_hex(data: &[u8]) -> String {
    Md5::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

fn parse_listing(lines: &[Vec<u8>]) -> Vec<ListingEntry> {
    lines
        .iter()
        .filter_map(|line| {
            let line = String::from_utf8_lossy(line);
            let mut parts = line.splitn(2, ' ');
            let number = parts.next()?.parse().ok()?;
            let value = parts.next()?.to_string();
            Some(ListingEntry { number, value })
        })
        .collect()
}

/// An established POP3 session (spec §4.L/§4.O).
#[derive(Debug)]
pub struct Pop3Connection {
    reader: LineReader<Socket>,
    read_timeout: Duration,
    greeting: String,
}

impl Pop3Connection {
    pub async fn connect(host: &str, port: u16, read_timeout: Duration) -> NetResult<Self> {
        let socket = Socket::connect_plain(host, port).await?;
        let mut reader = LineReader::new(socket, read_timeout);
        let line = reader.read_line().await?;
        let greeting = String::from_utf8_lossy(&line).into_owned();
        if !greeting.starts_with("+OK") {
            return Err(NetError::Protocol(format!("unexpected greeting: {greeting}")));
        }
        Ok(Self { reader, read_timeout, greeting })
    }

    async fn command(&mut self, line: impl AsRef<str>) -> NetResult<String> {
        self.reader.write_line(line.as_ref().as_bytes()).await?;
        let reply = self.reader.read_line().await?;
        let reply = String::from_utf8_lossy(&reply).into_owned();
        if reply.starts_with("+OK") {
            Ok(reply)
        } else {
            Err(NetError::Rejected(reply))
        }
    }

    /// Reads the dot-terminated body following a multiline reply's status
    /// line, un-stuffing any line that starts with an escaping `.`.
    async fn read_multiline(&mut self) -> NetResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let line = self.reader.read_line().await?;
            if line == b"." {
                return Ok(out);
            }
            let unstuffed: &[u8] = if line.first() == Some(&b'.') { &line[1..] } else { &line };
            out.extend_from_slice(unstuffed);
            out.extend_from_slice(b"\r\n");
        }
    }

    pub async fn user(&mut self, username: &str) -> NetResult<()> {
        self.command(format!("USER {username}")).await?;
        Ok(())
    }

    pub async fn pass(&mut self, password: &str) -> NetResult<()> {
        self.command(format!("PASS {password}")).await?;
        Ok(())
    }

    /// RFC-1939 `APOP`: proves knowledge of the password without sending
    /// it in the clear, by hashing it with the greeting's timestamp
    /// banner (the `<...>` portion of the greeting).
    pub async fn apop(&mut self, username: &str, password: &str) -> NetResult<()> {
        let start = self.greeting.find('<').ok_or(NetError::UnsupportedExtension("APOP"))?;
        let end = self.greeting[start..]
            .find('>')
            .map(|i| start + i + 1)
            .ok_or(NetError::UnsupportedExtension("APOP"))?;
        let timestamp = &self.greeting[start..end];
        let digest = md5_hex(format!("{timestamp}{password}").as_bytes());
        self.command(format!("APOP {username} {digest}")).await?;
        Ok(())
    }

    /// `AUTH PLAIN` (RFC-5034), waiting for the server's `+` continuation
    /// before sending the base64-encoded initial response.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> NetResult<()> {
        self.reader.write_line(b"AUTH PLAIN").await?;
        let reply = self.reader.read_line().await?;
        if reply.first() != Some(&b'+') {
            return Err(NetError::Rejected(String::from_utf8_lossy(&reply).into_owned()));
        }
        let mut raw = Vec::with_capacity(username.len() + password.len() + 2);
        raw.push(0);
        raw.extend_from_slice(username.as_bytes());
        raw.push(0);
        raw.extend_from_slice(password.as_bytes());
        self.command(BASE64.encode(raw)).await?;
        Ok(())
    }

    #[cfg(feature = "tls")]
    pub async fn stls(mut self, host: &str) -> NetResult<Self> {
        self.command("STLS").await?;
        let socket = self.reader.into_inner().starttls(host).await?;
        Ok(Self {
            reader: LineReader::new(socket, self.read_timeout),
            read_timeout: self.read_timeout,
            greeting: self.greeting,
        })
    }

    /// `STAT`: returns `(message count, total octets)`.
    pub async fn stat(&mut self) -> NetResult<(u32, u64)> {
        let reply = self.command("STAT").await?;
        let mut parts = reply.trim_start_matches("+OK").split_whitespace();
        let count = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let size = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        Ok((count, size))
    }

    /// `LIST` (no argument): every message's number and octet size.
    pub async fn list_all(&mut self) -> NetResult<Vec<ListingEntry>> {
        self.command("LIST").await?;
        let body = self.read_multiline().await?;
        Ok(parse_listing(&body.split(|&b| b == b'\n').map(|l| l.to_vec()).collect::<Vec<_>>()))
    }

    /// `LIST n`: just that message's size.
    pub async fn list_one(&mut self, number: u32) -> NetResult<ListingEntry> {
        let reply = self.command(format!("LIST {number}")).await?;
        let rest = reply.trim_start_matches("+OK").trim();
        parse_listing(&[rest.as_bytes().to_vec()])
            .into_iter()
            .next()
            .ok_or_else(|| NetError::Protocol(format!("malformed LIST reply: {reply}")))
    }

    /// `UIDL` (no argument): every message's number and unique ID.
    pub async fn uidl_all(&mut self) -> NetResult<Vec<ListingEntry>> {
        self.command("UIDL").await?;
        let body = self.read_multiline().await?;
        Ok(parse_listing(&body.split(|&b| b == b'\n').map(|l| l.to_vec()).collect::<Vec<_>>()))
    }

    pub async fn uidl_one(&mut self, number: u32) -> NetResult<ListingEntry> {
        let reply = self.command(format!("UIDL {number}")).await?;
        let rest = reply.trim_start_matches("+OK").trim();
        parse_listing(&[rest.as_bytes().to_vec()])
            .into_iter()
            .next()
            .ok_or_else(|| NetError::Protocol(format!("malformed UIDL reply: {reply}")))
    }

    /// `RETR n`: the full message, CRLF-terminated lines, dot-unstuffed.
    pub async fn retr(&mut self, number: u32) -> NetResult<Vec<u8>> {
        self.command(format!("RETR {number}")).await?;
        self.read_multiline().await
    }

    /// `TOP n lines`: the header plus the first `lines` body lines.
    pub async fn top(&mut self, number: u32, lines: u32) -> NetResult<Vec<u8>> {
        self.command(format!("TOP {number} {lines}")).await?;
        self.read_multiline().await
    }

    pub async fn dele(&mut self, number: u32) -> NetResult<()> {
        self.command(format!("DELE {number}")).await?;
        Ok(())
    }

    pub async fn rset(&mut self) -> NetResult<()> {
        self.command("RSET").await?;
        Ok(())
    }

    pub async fn noop(&mut self) -> NetResult<()> {
        self.command("NOOP").await?;
        Ok(())
    }

    pub async fn quit(mut self) -> NetResult<()> {
        self.command("QUIT").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_listing_line() {
        let entries = parse_listing(&[b"1 120".to_vec(), b"2 200".to_vec()]);
        assert_eq!(
            entries,
            vec![
                ListingEntry { number: 1, value: "120".to_string() },
                ListingEntry { number: 2, value: "200".to_string() },
            ]
        );
    }

    #[test]
    fn md5_hex_matches_a_known_answer() {
        assert_eq!(md5_hex(b"<1896.697170952@dbc.mtview.ca.us>tanstaaf"), "c4c9334bac560ecc979e58001b3e22fb");
    }
}
