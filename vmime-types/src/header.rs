//! Header fields and the header itself (spec §3 Header field/Header, §4.G,
//! §4.H, §4.I).

use crate::address::{Address, AddressList, Mailbox, MailboxList};
use crate::core::Text;
use crate::datetime::DateTime;
use crate::disposition::Disposition;
use crate::encoding::Encoding;
use crate::message_id::{MessageId, MessageIdSequence};
use crate::param::ParameterSet;
use crate::relay::Relay;

/// `type/subtype`, the main value of a `Content-Type:` field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.type_.eq_ignore_ascii_case("multipart")
    }

    pub fn is_text(&self) -> bool {
        self.type_.eq_ignore_ascii_case("text")
    }

    pub fn is_message(&self) -> bool {
        self.type_.eq_ignore_ascii_case("message")
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}

/// The delegate grammar a header field's main value was parsed into (spec
/// §4.F). Every variant other than [`FieldBody::Unstructured`] has a typed,
/// validated shape; `Unstructured` is the factory's fallback for unknown
/// field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBody {
    Unstructured(Text),
    Mailbox(Mailbox),
    MailboxList(MailboxList),
    Address(Address),
    AddressList(AddressList),
    DateTime(DateTime),
    MessageId(MessageId),
    MessageIdSequence(MessageIdSequence),
    Relay(Relay),
    Disposition(Disposition),
    ContentType(MediaType),
    ContentDisposition(String),
    ContentTransferEncoding(Encoding),
}

/// `(name: string, value: HeaderFieldValue)` (spec §3 Header field).
///
/// `value` carries both the typed main value and any RFC-2045 parameters,
/// since the grammar for parameters is shared across all parameterized
/// field kinds (spec §4.H) rather than being its own field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFieldValue {
    pub body: FieldBody,
    pub params: ParameterSet,
}

impl HeaderFieldValue {
    pub fn new(body: FieldBody) -> Self {
        Self {
            body,
            params: ParameterSet::new(),
        }
    }

    pub fn with_params(mut self, params: ParameterSet) -> Self {
        self.params = params;
        self
    }
}

impl From<Text> for HeaderFieldValue {
    fn from(value: Text) -> Self {
        Self::new(FieldBody::Unstructured(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: HeaderFieldValue,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<HeaderFieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Ordered list of fields (spec §3 Header, §4.I). Permits multiple fields
/// of the same name; lookup by name returns the first match, iteration
/// yields insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    fields: Vec<HeaderField>,
}

impl Header {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn append(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// Returns the first field named `name`, case-insensitively.
    pub fn find(&self, name: &str) -> Option<&HeaderField> {
        self.fields.iter().find(|f| f.name_matches(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut HeaderField> {
        self.fields.iter_mut().find(|f| f.name_matches(name))
    }

    /// Returns every field named `name`, in insertion order.
    pub fn find_all(&self, name: &str) -> Vec<&HeaderField> {
        self.fields.iter().filter(|f| f.name_matches(name)).collect()
    }

    /// Removes the field at `index`. Returns it if present.
    pub fn remove_at(&mut self, index: usize) -> Option<HeaderField> {
        if index < self.fields.len() {
            Some(self.fields.remove(index))
        } else {
            None
        }
    }

    /// Removes the first field matching `name` by identity (pointer
    /// equality is not meaningful for owned data, so this compares by
    /// value instead).
    pub fn remove_field(&mut self, field: &HeaderField) -> bool {
        if let Some(idx) = self.fields.iter().position(|f| f == field) {
            self.fields.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_returns_first_match_in_insertion_order() {
        let mut h = Header::new();
        h.append(HeaderField::new("Received", Text::from_ascii("first")));
        h.append(HeaderField::new("received", Text::from_ascii("second")));
        assert_eq!(h.find_all("Received").len(), 2);
        match &h.find("RECEIVED").unwrap().value.body {
            FieldBody::Unstructured(t) => assert_eq!(t.to_string_lossy(), "first"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn media_type_displays_as_type_slash_subtype() {
        let mt = MediaType::new("multipart", "mixed");
        assert_eq!(mt.to_string(), "multipart/mixed");
        assert!(mt.is_multipart());
    }
}
