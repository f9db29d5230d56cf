use std::collections::HashSet;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{NetError, NetResult};
use crate::line_reader::LineReader;
use crate::socket::Socket;

/// The capability tokens a `CAPABILITY` response (or an untagged
/// `CAPABILITY` response code on the greeting) advertised.
#[derive(Debug, Clone, Default)]
pub struct Capabilities(HashSet<String>);

impl Capabilities {
    fn parse(text: &str) -> Self {
        Self(text.split_whitespace().map(|s| s.to_ascii_uppercase()).collect())
    }

    pub fn has(&self, token: &str) -> bool {
        self.0.contains(&token.to_ascii_uppercase())
    }
}

/// The tagged `OK`/`NO`/`BAD` that concludes every command (spec §4.N).
#[derive(Debug, Clone)]
pub struct TaggedStatus {
    pub ok: bool,
    pub code: Option<String>,
    pub text: String,
}

/// One entry of a `LIST` response: attributes, hierarchy delimiter, and
/// mailbox name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub attributes: Vec<String>,
    pub delimiter: Option<char>,
    pub name: String,
}

/// The mailbox-level state a `SELECT`/`EXAMINE` reports (spec §4.N).
#[derive(Debug, Clone, Default)]
pub struct SelectedMailbox {
    pub exists: u32,
    pub recent: u32,
    pub flags: Vec<String>,
    pub uid_validity: Option<u32>,
    pub uid_next: Option<u32>,
    pub highest_mod_seq: Option<u64>,
    pub read_write: bool,
}

/// Splits a response code in brackets off the front of a status line's
/// text, e.g. `"[READ-WRITE] Completed"` -> `(Some("READ-WRITE"), "Completed")`.
fn split_response_code(text: &str) -> (Option<String>, String) {
    let text = text.trim_start();
    if let Some(rest) = text.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let code = rest[..end].to_string();
            let remainder = rest[end + 1..].trim_start().to_string();
            return (Some(code), remainder);
        }
    }
    (None, text.to_string())
}

fn parse_list_line(text: &str) -> Option<ListEntry> {
    // `LIST (\Noselect \HasChildren) "/" "INBOX/Drafts"`
    let rest = text.trim_start();
    let open = rest.find('(')?;
    let close = rest[open..].find(')')? + open;
    let attributes = rest[open + 1..close]
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();

    let remainder = rest[close + 1..].trim_start();
    let mut tokens = split_quoted_or_atom(remainder);
    let delimiter = tokens.next().and_then(|t| if t == "NIL" { None } else { t.chars().next() });
    let name = tokens.next().unwrap_or_default();
    Some(ListEntry { attributes, delimiter, name })
}

/// Splits a string into (at most two) quoted-string-or-atom tokens, the
/// shape `LIST`'s trailing `delimiter name` pair takes.
fn split_quoted_or_atom(input: &str) -> impl Iterator<Item = String> + '_ {
    let mut rest = input.trim_start();
    std::iter::from_fn(move || {
        rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        if let Some(after_quote) = rest.strip_prefix('"') {
            let end = after_quote.find('"').unwrap_or(after_quote.len());
            let token = after_quote[..end].to_string();
            rest = &after_quote[end + 1..];
            Some(token)
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let token = rest[..end].to_string();
            rest = &rest[end..];
            Some(token)
        }
    })
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Validates a greeting line and extracts any `CAPABILITY` response code
/// it carries, sparing a round trip through an explicit `CAPABILITY`
/// command (spec §4.N: "a greeting may pre-advertise capabilities").
fn parse_greeting(greeting: &str) -> NetResult<Capabilities> {
    if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
        return Err(NetError::Protocol(format!("unexpected greeting: {greeting}")));
    }
    let (code, _) = split_response_code(greeting.trim_start_matches("* OK").trim_start_matches("* PREAUTH"));
    Ok(match code {
        Some(code) if code.to_ascii_uppercase().starts_with("CAPABILITY") => {
            Capabilities::parse(code["CAPABILITY".len()..].trim())
        }
        _ => Capabilities::default(),
    })
}

/// An established IMAP session (spec §4.L/§4.N).
#[derive(Debug)]
pub struct ImapConnection {
    reader: LineReader<Socket>,
    read_timeout: Duration,
    tag_counter: u32,
    pub capabilities: Capabilities,
}

impl ImapConnection {
    pub async fn connect(host: &str, port: u16, read_timeout: Duration) -> NetResult<Self> {
        let socket = Socket::connect_plain(host, port).await?;
        let mut reader = LineReader::new(socket, read_timeout);
        let greeting = reader.read_line().await?;
        let greeting = String::from_utf8_lossy(&greeting);
        let capabilities = parse_greeting(&greeting)?;
        Ok(Self {
            reader,
            read_timeout,
            tag_counter: 0,
            capabilities,
        })
    }

    fn next_tag(&mut self) -> String {
        self.tag_counter += 1;
        format!("A{:04}", self.tag_counter)
    }

    /// Sends one tagged command and collects every untagged response line
    /// up to (and not including) the tagged status, which is returned
    /// separately (spec §4.N "untagged-response routing").
    async fn command(&mut self, line: impl AsRef<str>) -> NetResult<(Vec<String>, TaggedStatus)> {
        let tag = self.next_tag();
        self.reader.write_line(format!("{tag} {}", line.as_ref()).as_bytes()).await?;
        self.read_response(&tag).await
    }

    async fn read_response(&mut self, tag: &str) -> NetResult<(Vec<String>, TaggedStatus)> {
        let mut untagged = Vec::new();
        loop {
            let raw = self.reader.read_line().await?;
            let line = String::from_utf8_lossy(&raw).into_owned();
            if let Some(rest) = line.strip_prefix(&format!("{tag} ")) {
                let mut parts = rest.splitn(2, ' ');
                let status = parts.next().unwrap_or("");
                let text = parts.next().unwrap_or("");
                let (code, text) = split_response_code(text);
                return Ok((
                    untagged,
                    TaggedStatus {
                        ok: status.eq_ignore_ascii_case("OK"),
                        code,
                        text,
                    },
                ));
            }
            untagged.push(line);
        }
    }

    async fn expect_ok(&mut self, line: impl AsRef<str>) -> NetResult<Vec<String>> {
        let (untagged, status) = self.command(line).await?;
        if !status.ok {
            return Err(NetError::Rejected(status.text));
        }
        Ok(untagged)
    }

    pub async fn capability(&mut self) -> NetResult<()> {
        let untagged = self.expect_ok("CAPABILITY").await?;
        for line in untagged {
            if let Some(rest) = line.strip_prefix("* CAPABILITY ") {
                self.capabilities = Capabilities::parse(rest);
            }
        }
        Ok(())
    }

    #[cfg(feature = "tls")]
    pub async fn starttls(mut self, host: &str) -> NetResult<Self> {
        if !self.capabilities.has("STARTTLS") {
            return Err(NetError::UnsupportedExtension("STARTTLS"));
        }
        self.expect_ok("STARTTLS").await?;
        let socket = self.reader.into_inner().starttls(host).await?;
        Ok(Self {
            reader: LineReader::new(socket, self.read_timeout),
            read_timeout: self.read_timeout,
            tag_counter: self.tag_counter,
            capabilities: Capabilities::default(),
        })
    }

    pub async fn login(&mut self, username: &str, password: &str) -> NetResult<()> {
        self.expect_ok(format!("LOGIN {} {}", quote(username), quote(password))).await?;
        Ok(())
    }

    /// `AUTHENTICATE PLAIN`, without the `SASL-IR` initial-response
    /// shortcut: waits for the server's `+` continuation before sending
    /// the base64 response line.
    pub async fn authenticate_plain(&mut self, username: &str, password: &str) -> NetResult<()> {
        let tag = self.next_tag();
        self.reader.write_line(format!("{tag} AUTHENTICATE PLAIN").as_bytes()).await?;
        let continuation = self.reader.read_line().await?;
        if !continuation.starts_with(b"+") {
            return Err(NetError::Protocol("expected a continuation request".to_string()));
        }
        let mut raw = Vec::with_capacity(username.len() + password.len() + 2);
        raw.push(0);
        raw.extend_from_slice(username.as_bytes());
        raw.push(0);
        raw.extend_from_slice(password.as_bytes());
        self.reader.write_line(BASE64.encode(raw).as_bytes()).await?;
        let (_, status) = self.read_response(&tag).await?;
        if !status.ok {
            return Err(NetError::Rejected(status.text));
        }
        Ok(())
    }

    pub async fn list(&mut self, reference: &str, pattern: &str) -> NetResult<Vec<ListEntry>> {
        let untagged = self
            .expect_ok(format!("LIST {} {}", quote(reference), quote(pattern)))
            .await?;
        Ok(untagged
            .iter()
            .filter_map(|line| line.strip_prefix("* LIST "))
            .filter_map(parse_list_line)
            .collect())
    }

    /// `SELECT`/`EXAMINE` share everything but the command verb and the
    /// write access it grants (spec §4.N); `EXAMINE` never sets
    /// `read_write`, `SELECT` sets it unless the tagged status carries a
    /// `READ-ONLY` response code (RFC-3501 §6.3.1/§6.3.2).
    async fn select_or_examine(&mut self, command: &str, mailbox: &str) -> NetResult<SelectedMailbox> {
        let (untagged, status) = self.command(format!("{command} {}", quote(mailbox))).await?;
        if !status.ok {
            return Err(NetError::Rejected(status.text));
        }
        let mut selected = SelectedMailbox::default();
        for line in &untagged {
            if let Some(rest) = line.strip_prefix("* ") {
                if let Some(n) = rest.strip_suffix(" EXISTS") {
                    selected.exists = n.parse().unwrap_or(0);
                } else if let Some(n) = rest.strip_suffix(" RECENT") {
                    selected.recent = n.parse().unwrap_or(0);
                } else if let Some(flags) = rest.strip_prefix("FLAGS (").and_then(|s| s.strip_suffix(')')) {
                    selected.flags = flags.split_whitespace().map(|s| s.to_string()).collect();
                } else if let Some(code) = rest.strip_prefix("OK [") {
                    let code = code.find(']').map(|end| &code[..end]).unwrap_or(code);
                    if let Some(v) = code.strip_prefix("UIDVALIDITY ") {
                        selected.uid_validity = v.trim().parse().ok();
                    } else if let Some(v) = code.strip_prefix("UIDNEXT ") {
                        selected.uid_next = v.trim().parse().ok();
                    } else if let Some(v) = code.strip_prefix("HIGHESTMODSEQ ") {
                        selected.highest_mod_seq = v.trim().parse().ok();
                    }
                }
            }
        }
        let server_says_read_only = status
            .code
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("READ-ONLY"));
        selected.read_write = command.eq_ignore_ascii_case("SELECT") && !server_says_read_only;
        Ok(selected)
    }

    pub async fn select(&mut self, mailbox: &str) -> NetResult<SelectedMailbox> {
        self.select_or_examine("SELECT", mailbox).await
    }

    /// `EXAMINE`: identical to [`Self::select`] but always opens the
    /// mailbox read-only, even if the server doesn't send a `READ-ONLY`
    /// response code (spec §4.N).
    pub async fn examine(&mut self, mailbox: &str) -> NetResult<SelectedMailbox> {
        self.select_or_examine("EXAMINE", mailbox).await
    }

    /// Runs `FETCH`, returning the raw untagged `* n FETCH (...)` lines for
    /// the caller to destructure (the full `FETCH` data-item grammar is
    /// out of scope for a transport-level client).
    pub async fn fetch(&mut self, sequence_set: &str, items: &str) -> NetResult<Vec<String>> {
        self.expect_ok(format!("FETCH {sequence_set} ({items})")).await
    }

    /// `UID FETCH`, same shape as [`Self::fetch`] but addressed by UID.
    pub async fn uid_fetch(&mut self, uid_set: &str, items: &str) -> NetResult<Vec<String>> {
        self.expect_ok(format!("UID FETCH {uid_set} ({items})")).await
    }

    pub async fn store(&mut self, sequence_set: &str, item: &str, flags: &str) -> NetResult<Vec<String>> {
        self.expect_ok(format!("STORE {sequence_set} {item} ({flags})")).await
    }

    /// `STORE ... (UNCHANGEDSINCE modseq)` (RFC-7162 CONDSTORE).
    pub async fn store_unchanged_since(
        &mut self,
        sequence_set: &str,
        mod_seq: u64,
        item: &str,
        flags: &str,
    ) -> NetResult<Vec<String>> {
        if !self.capabilities.has("CONDSTORE") {
            return Err(NetError::UnsupportedExtension("CONDSTORE"));
        }
        self.expect_ok(format!(
            "STORE {sequence_set} (UNCHANGEDSINCE {mod_seq}) {item} ({flags})"
        ))
        .await
    }

    pub async fn expunge(&mut self) -> NetResult<Vec<u32>> {
        let untagged = self.expect_ok("EXPUNGE").await?;
        Ok(untagged
            .iter()
            .filter_map(|line| line.strip_prefix("* ")?.strip_suffix(" EXPUNGE"))
            .filter_map(|n| n.parse().ok())
            .collect())
    }

    pub async fn logout(mut self) -> NetResult<()> {
        self.expect_ok("LOGOUT").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_are_matched_case_insensitively() {
        let caps = Capabilities::parse("IMAP4rev1 STARTTLS AUTH=PLAIN IDLE");
        assert!(caps.has("starttls"));
        assert!(caps.has("IDLE"));
        assert!(!caps.has("COMPRESS=DEFLATE"));
    }

    #[test]
    fn splits_a_response_code_from_status_text() {
        let (code, text) = split_response_code("[READ-WRITE] Completed");
        assert_eq!(code.as_deref(), Some("READ-WRITE"));
        assert_eq!(text, "Completed");
    }

    #[test]
    fn status_text_without_a_code_passes_through() {
        let (code, text) = split_response_code("Completed");
        assert_eq!(code, None);
        assert_eq!(text, "Completed");
    }

    #[test]
    fn parses_a_list_response_line() {
        let entry = parse_list_line("(\\HasNoChildren) \"/\" \"INBOX/Drafts\"").unwrap();
        assert_eq!(entry.attributes, vec!["\\HasNoChildren".to_string()]);
        assert_eq!(entry.delimiter, Some('/'));
        assert_eq!(entry.name, "INBOX/Drafts");
    }

    #[test]
    fn parses_a_list_response_with_a_nil_delimiter() {
        let entry = parse_list_line("(\\Noselect) NIL \"\"").unwrap();
        assert_eq!(entry.delimiter, None);
    }

    #[test]
    fn greeting_carries_capabilities_and_spares_a_round_trip() {
        let caps = parse_greeting("* OK [CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN] ready").unwrap();
        assert!(caps.has("IMAP4rev1"));
        assert!(caps.has("starttls"));
        assert!(caps.has("AUTH=PLAIN"));
    }

    #[test]
    fn greeting_without_a_capability_code_yields_empty_capabilities() {
        let caps = parse_greeting("* OK IMAP4rev1 Service Ready").unwrap();
        assert!(!caps.has("STARTTLS"));
    }

    #[test]
    fn preauth_greeting_is_accepted() {
        let caps = parse_greeting("* PREAUTH [CAPABILITY IMAP4rev1 IDLE] already authenticated").unwrap();
        assert!(caps.has("IDLE"));
    }

    #[test]
    fn a_non_greeting_line_is_rejected() {
        assert!(parse_greeting("* BAD not a greeting").is_err());
    }
}
