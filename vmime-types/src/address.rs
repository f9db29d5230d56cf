//! Mailbox, group and address types (spec §3 "Mailbox / mailbox-list /
//! address / address-list / group").
//!
//! These are plain data: grounded in the `AddrSpec`/`MailboxRef`/`Domain`
//! model of RFC-5322 mailbox grammars, but owned (no borrow from the parsed
//! buffer) since decoded display names may already have been RFC-2047
//! decoded into fresh bytes.

use crate::core::Text;

/// `local-part@domain`, or just `local-part` for a route-less, domain-less
/// address (never produced by the parser, but constructible programmatically).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddrSpec {
    pub local_part: String,
    pub domain: String,
}

impl AddrSpec {
    pub fn new(local_part: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }
}

impl std::fmt::Display for AddrSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// A single `name-addr` or bare `addr-spec`, with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mailbox {
    pub name: Option<Text>,
    pub addr_spec: AddrSpec,
}

impl Mailbox {
    pub fn new(addr_spec: AddrSpec) -> Self {
        Self {
            name: None,
            addr_spec,
        }
    }

    pub fn with_name(mut self, name: Text) -> Self {
        self.name = Some(name);
        self
    }
}

/// A comma-separated list of mailboxes.
pub type MailboxList = Vec<Mailbox>;

/// `phrase : mailbox-list ;` — a named container of mailboxes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    pub name: Text,
    pub members: MailboxList,
}

/// An RFC-5322 `address`: a single mailbox, or a named group of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Mailbox(Mailbox),
    Group(Group),
}

impl Address {
    /// Flattens the address into its constituent mailboxes: a single
    /// mailbox yields one element, a group yields its members.
    pub fn mailboxes(&self) -> Vec<&Mailbox> {
        match self {
            Address::Mailbox(m) => vec![m],
            Address::Group(g) => g.members.iter().collect(),
        }
    }
}

impl From<Mailbox> for Address {
    fn from(value: Mailbox) -> Self {
        Address::Mailbox(value)
    }
}

/// A comma-separated list of addresses (mailboxes and/or groups).
pub type AddressList = Vec<Address>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_mailboxes_flattens_members() {
        let g = Group {
            name: Text::from_ascii("undisclosed-recipients"),
            members: vec![Mailbox::new(AddrSpec::new("a", "example.com"))],
        };
        let addr = Address::Group(g);
        assert_eq!(addr.mailboxes().len(), 1);
    }

    #[test]
    fn addr_spec_displays_as_local_at_domain() {
        let a = AddrSpec::new("joe", "example.com");
        assert_eq!(a.to_string(), "joe@example.com");
    }
}
