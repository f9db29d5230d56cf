//! `Received:` trace stops (spec §3 Relay, §4.F relay.parse).

use crate::datetime::DateTime;

/// One `Received:` trace stop: `{ from, by, via, id, for, with:[string], date }`.
///
/// Any field may be absent except `with`, which is a possibly-empty list
/// (a single `Received:` line may name more than one `with` token, e.g.
/// `with ESMTPSA (TLS)`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relay {
    pub from: Option<String>,
    pub by: Option<String>,
    pub via: Option<String>,
    pub id: Option<String>,
    pub for_: Option<String>,
    pub with: Vec<String>,
    pub date: Option<DateTime>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_relay_has_no_trace_tokens() {
        let r = Relay::new();
        assert!(r.from.is_none());
        assert!(r.with.is_empty());
    }
}
