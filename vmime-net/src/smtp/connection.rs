use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{NetError, NetResult};
use crate::line_reader::LineReader;
use crate::socket::Socket;

/// The extensions an `EHLO` reply advertised (spec §4.M).
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    pub size: Option<u64>,
    pub starttls: bool,
    pub pipelining: bool,
    pub chunking: bool,
    pub eightbitmime: bool,
    pub auth_mechanisms: Vec<String>,
}

impl Extensions {
    fn from_ehlo_lines(lines: &[String]) -> Self {
        let mut ext = Extensions::default();
        for line in lines.iter().skip(1) {
            let mut parts = line.split_whitespace();
            match parts.next().map(|w| w.to_ascii_uppercase()).as_deref() {
                Some("STARTTLS") => ext.starttls = true,
                Some("PIPELINING") => ext.pipelining = true,
                Some("CHUNKING") => ext.chunking = true,
                Some("8BITMIME") => ext.eightbitmime = true,
                Some("SIZE") => ext.size = parts.next().and_then(|n| n.parse().ok()),
                Some("AUTH") => ext.auth_mechanisms = parts.map(|m| m.to_ascii_uppercase()).collect(),
                _ => {}
            }
        }
        ext
    }

    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.auth_mechanisms.iter().any(|m| m.eq_ignore_ascii_case(mechanism))
    }
}

/// One line of a (possibly multiline) SMTP reply: `code`, whether it's the
/// last line of the reply (a space rather than a `-` follows the code),
/// and the trailing text.
fn parse_reply_line(line: &[u8]) -> Option<(u16, bool, String)> {
    if line.len() < 4 {
        return None;
    }
    let code: u16 = std::str::from_utf8(&line[0..3]).ok()?.parse().ok()?;
    let is_last = match line[3] {
        b' ' => true,
        b'-' => false,
        _ => return None,
    };
    let text = String::from_utf8_lossy(&line[4..]).into_owned();
    Some((code, is_last, text))
}

/// Reassembles a multiline reply (`250-...` lines followed by one
/// `250 ...` line) into its code and text lines.
fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len());
    for line in message.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b".") {
            out.push(b'.');
        }
        out.extend_from_slice(line);
    }
    out
}

/// Splits `message` into RFC-3030 `BDAT` chunks of at most `chunk_size`
/// bytes, pairing each chunk with the command line that announces it (the
/// final chunk's command carries the `LAST` marker).
fn bdat_chunks(message: &[u8], chunk_size: usize) -> Vec<(String, &[u8])> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    loop {
        let end = (offset + chunk_size).min(message.len());
        let is_last = end == message.len();
        let chunk = &message[offset..end];
        let command =
            if is_last { format!("BDAT {} LAST", chunk.len()) } else { format!("BDAT {}", chunk.len()) };
        chunks.push((command, chunk));
        offset = end;
        if is_last {
            return chunks;
        }
    }
}

/// An established SMTP session (spec §4.L/§4.M).
#[derive(Debug)]
pub struct SmtpConnection {
    reader: LineReader<Socket>,
    read_timeout: Duration,
    pub extensions: Extensions,
}

impl SmtpConnection {
    pub async fn connect(host: &str, port: u16, read_timeout: Duration) -> NetResult<Self> {
        let socket = Socket::connect_plain(host, port).await?;
        let mut reader = LineReader::new(socket, read_timeout);
        let (code, _) = Self::read_reply(&mut reader).await?;
        if code != 220 {
            return Err(NetError::Rejected(format!("unexpected greeting code {code}")));
        }
        Ok(Self {
            reader,
            read_timeout,
            extensions: Extensions::default(),
        })
    }

    async fn read_reply(reader: &mut LineReader<Socket>) -> NetResult<(u16, Vec<String>)> {
        let mut lines = Vec::new();
        loop {
            let raw = reader.read_line().await?;
            let (code, is_last, text) =
                parse_reply_line(&raw).ok_or_else(|| NetError::Protocol(format!("malformed reply line: {raw:?}")))?;
            lines.push(text);
            if is_last {
                return Ok((code, lines));
            }
        }
    }

    async fn command(&mut self, line: impl AsRef<str>) -> NetResult<(u16, Vec<String>)> {
        self.reader.write_line(line.as_ref().as_bytes()).await?;
        Self::read_reply(&mut self.reader).await
    }

    async fn expect(&mut self, line: impl AsRef<str>, expected: u16) -> NetResult<Vec<String>> {
        let (code, lines) = self.command(line).await?;
        if code != expected {
            return Err(NetError::Rejected(format!("{code} (expected {expected}): {}", lines.join(" "))));
        }
        Ok(lines)
    }

    pub async fn ehlo(&mut self, domain: &str) -> NetResult<()> {
        let lines = self.expect(format!("EHLO {domain}"), 250).await?;
        self.extensions = Extensions::from_ehlo_lines(&lines);
        Ok(())
    }

    /// Upgrades the connection to TLS. The caller must `ehlo` again
    /// afterwards, since RFC-3207 discards whatever extensions were
    /// advertised before the handshake.
    #[cfg(feature = "tls")]
    pub async fn starttls(mut self, host: &str) -> NetResult<Self> {
        if !self.extensions.starttls {
            return Err(NetError::UnsupportedExtension("STARTTLS"));
        }
        self.expect("STARTTLS", 220).await?;
        let socket = self.reader.into_inner().starttls(host).await?;
        Ok(Self {
            reader: LineReader::new(socket, self.read_timeout),
            read_timeout: self.read_timeout,
            extensions: Extensions::default(),
        })
    }

    pub async fn auth_plain(&mut self, username: &str, password: &str) -> NetResult<()> {
        if !self.extensions.supports_auth("PLAIN") {
            return Err(NetError::UnsupportedExtension("AUTH PLAIN"));
        }
        let mut raw = Vec::with_capacity(username.len() + password.len() + 2);
        raw.push(0);
        raw.extend_from_slice(username.as_bytes());
        raw.push(0);
        raw.extend_from_slice(password.as_bytes());
        self.expect(format!("AUTH PLAIN {}", BASE64.encode(raw)), 235).await?;
        Ok(())
    }

    pub async fn auth_login(&mut self, username: &str, password: &str) -> NetResult<()> {
        if !self.extensions.supports_auth("LOGIN") {
            return Err(NetError::UnsupportedExtension("AUTH LOGIN"));
        }
        self.expect("AUTH LOGIN", 334).await?;
        self.expect(BASE64.encode(username), 334).await?;
        self.expect(BASE64.encode(password), 235).await?;
        Ok(())
    }

    pub async fn mail_from(&mut self, addr: &str) -> NetResult<()> {
        self.expect(format!("MAIL FROM:<{addr}>"), 250).await?;
        Ok(())
    }

    pub async fn rcpt_to(&mut self, addr: &str) -> NetResult<()> {
        self.expect(format!("RCPT TO:<{addr}>"), 250).await?;
        Ok(())
    }

    /// Writes `MAIL FROM`/`RCPT TO*`/`DATA` without waiting for each
    /// reply in turn, then drains all of them (RFC-2920 PIPELINING).
    pub async fn pipeline(&mut self, commands: &[String]) -> NetResult<Vec<(u16, Vec<String>)>> {
        if !self.extensions.pipelining {
            return Err(NetError::UnsupportedExtension("PIPELINING"));
        }
        for cmd in commands {
            self.reader.write_line(cmd.as_bytes()).await?;
        }
        let mut replies = Vec::with_capacity(commands.len());
        for _ in commands {
            replies.push(Self::read_reply(&mut self.reader).await?);
        }
        Ok(replies)
    }

    /// Sends `message` via `DATA`, dot-stuffing any line that begins with
    /// a `.` and terminating with the bare `.` line (spec §4.M).
    pub async fn data(&mut self, message: &[u8]) -> NetResult<()> {
        self.expect("DATA", 354).await?;
        self.reader.write_raw(&dot_stuff(message)).await?;
        self.reader.write_raw(b".\r\n").await?;
        let (code, lines) = Self::read_reply(&mut self.reader).await?;
        if code != 250 {
            return Err(NetError::Rejected(format!("{code}: {}", lines.join(" "))));
        }
        Ok(())
    }

    /// Sends `message` via RFC-3030 `BDAT` chunking, in chunks of at most
    /// `chunk_size` bytes. Requires the `CHUNKING` extension.
    pub async fn bdat(&mut self, message: &[u8], chunk_size: usize) -> NetResult<()> {
        if !self.extensions.chunking {
            return Err(NetError::UnsupportedExtension("CHUNKING"));
        }
        for (command, chunk) in bdat_chunks(message, chunk_size) {
            self.reader.write_line(command.as_bytes()).await?;
            self.reader.write_raw(chunk).await?;
            let (code, lines) = Self::read_reply(&mut self.reader).await?;
            if code != 250 {
                return Err(NetError::Rejected(format!("{code}: {}", lines.join(" "))));
            }
        }
        Ok(())
    }

    pub async fn quit(mut self) -> NetResult<()> {
        self.expect("QUIT", 221).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_line_reply() {
        assert_eq!(parse_reply_line(b"250 OK"), Some((250, true, " OK".to_string())));
    }

    #[test]
    fn parses_a_continuation_reply_line() {
        assert_eq!(parse_reply_line(b"250-PIPELINING"), Some((250, false, "PIPELINING".to_string())));
    }

    #[test]
    fn dot_stuffing_escapes_leading_dots_per_line() {
        let input = b"hello\r\n.world\r\n..two dots\r\n";
        let stuffed = dot_stuff(input);
        assert_eq!(stuffed, b"hello\r\n..world\r\n...two dots\r\n".to_vec());
    }

    #[test]
    fn dot_stuffing_leaves_non_dot_lines_untouched() {
        let input = b"hello\r\nworld\r\n";
        assert_eq!(dot_stuff(input), input.to_vec());
    }

    #[test]
    fn extensions_parses_a_representative_ehlo_reply() {
        let lines: Vec<String> = [
            "mail.example.com",
            "PIPELINING",
            "SIZE 35882577",
            "STARTTLS",
            "CHUNKING",
            "AUTH PLAIN LOGIN",
            "8BITMIME",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let ext = Extensions::from_ehlo_lines(&lines);
        assert!(ext.pipelining);
        assert!(ext.starttls);
        assert!(ext.chunking);
        assert!(ext.eightbitmime);
        assert_eq!(ext.size, Some(35_882_577));
        assert!(ext.supports_auth("plain"));
        assert!(ext.supports_auth("LOGIN"));
        assert!(!ext.supports_auth("CRAM-MD5"));
    }

    #[test]
    fn bdat_chunking_splits_a_message_and_marks_the_last_chunk() {
        let message = b"0123456789abcdef";
        let chunks = bdat_chunks(message, 7);
        assert_eq!(
            chunks,
            vec![
                ("BDAT 7".to_string(), &message[0..7]),
                ("BDAT 7".to_string(), &message[7..14]),
                ("BDAT 2 LAST".to_string(), &message[14..16]),
            ]
        );
    }

    #[test]
    fn bdat_chunking_handles_a_message_that_fits_in_one_chunk() {
        let message = b"short";
        let chunks = bdat_chunks(message, 4096);
        assert_eq!(chunks, vec![("BDAT 5 LAST".to_string(), &message[..])]);
    }
}
