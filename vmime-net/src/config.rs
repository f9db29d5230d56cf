//! Connection configuration, built with a fluent builder rather than
//! parsed from a config file (spec §6's service properties table).

use std::time::Duration;

/// How a connection should establish transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// No TLS at all.
    #[default]
    None,
    /// Connect in the clear, then upgrade via `STARTTLS`/`STLS` once the
    /// server advertises support for it.
    StartTls,
    /// Negotiate TLS immediately, before any protocol greeting.
    Implicit,
}

/// Properties governing how a client connects and authenticates
/// (spec §6), mirroring each service's `server_address`, `server_port`,
/// `auth_username`, `auth_password`, `tls`, `tls_required`, `sasl`,
/// `sasl_fallback`, `pipelining`, `chunking` and `need_authentication`
/// settings. Constructed with the builder below.
#[derive(Debug, Clone)]
pub struct ConnectionProperties {
    pub server_address: String,
    pub server_port: u16,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub tls: TlsMode,
    pub tls_required: bool,
    pub sasl: bool,
    pub sasl_fallback: bool,
    pub pipelining: bool,
    pub chunking: bool,
    pub need_authentication: bool,
    pub read_timeout: Duration,
}

impl ConnectionProperties {
    pub fn new(server_address: impl Into<String>, server_port: u16) -> Self {
        Self {
            server_address: server_address.into(),
            server_port,
            auth_username: None,
            auth_password: None,
            tls: TlsMode::None,
            tls_required: false,
            sasl: false,
            sasl_fallback: true,
            pipelining: false,
            chunking: false,
            need_authentication: true,
            read_timeout: Duration::from_secs(30),
        }
    }

    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_username = Some(username.into());
        self.auth_password = Some(password.into());
        self
    }

    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.tls = mode;
        self
    }

    pub fn tls_required(mut self, required: bool) -> Self {
        self.tls_required = required;
        self
    }

    pub fn sasl(mut self, enabled: bool) -> Self {
        self.sasl = enabled;
        self
    }

    pub fn sasl_fallback(mut self, enabled: bool) -> Self {
        self.sasl_fallback = enabled;
        self
    }

    pub fn pipelining(mut self, enabled: bool) -> Self {
        self.pipelining = enabled;
        self
    }

    pub fn chunking(mut self, enabled: bool) -> Self {
        self.chunking = enabled;
        self
    }

    pub fn need_authentication(mut self, needed: bool) -> Self {
        self.need_authentication = needed;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_defaults_a_caller_did_not_override() {
        let props = ConnectionProperties::new("smtp.example.com", 587)
            .auth("alice", "hunter2")
            .tls(TlsMode::StartTls);

        assert_eq!(props.server_address, "smtp.example.com");
        assert_eq!(props.server_port, 587);
        assert_eq!(props.auth_username.as_deref(), Some("alice"));
        assert_eq!(props.auth_password.as_deref(), Some("hunter2"));
        assert_eq!(props.tls, TlsMode::StartTls);
        assert!(!props.tls_required);
        assert!(props.sasl_fallback);
        assert!(props.need_authentication);
    }

    #[test]
    fn builder_overrides_apply() {
        let props = ConnectionProperties::new("imap.example.com", 993)
            .tls(TlsMode::Implicit)
            .tls_required(true)
            .sasl(true)
            .sasl_fallback(false)
            .pipelining(true)
            .chunking(true)
            .need_authentication(false)
            .read_timeout(Duration::from_secs(5));

        assert_eq!(props.tls, TlsMode::Implicit);
        assert!(props.tls_required);
        assert!(props.sasl);
        assert!(!props.sasl_fallback);
        assert!(props.pipelining);
        assert!(props.chunking);
        assert!(!props.need_authentication);
        assert_eq!(props.read_timeout, Duration::from_secs(5));
    }
}
