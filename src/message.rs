//! Message parser/builder facade (spec §4.K): conveniences over a parsed
//! [`Message`], plus the supplemental [`Attachment`] and [`MessageBuilder`]
//! (grounded in `original_source/src/defaultAttachment.cpp`,
//! `fileAttachment.cpp` and the `messageParser.cpp`/`messageBuilder` split).

use std::collections::HashSet;

use vmime_types::address::{Address, Mailbox};
use vmime_types::body::{Body, BodyPart, ContentHandler, Message, PartId};
use vmime_types::core::{Charset, Text, Word};
use vmime_types::datetime::DateTime;
use vmime_types::encoding::{Encoding, EncodingName};
use vmime_types::header::{FieldBody, Header, HeaderField, HeaderFieldValue, MediaType};
use vmime_types::param::{Parameter, ParameterSet};

use crate::charset::decide_encoding;

/// The `From:` mailbox, if present and well-typed.
pub fn sender(message: &Message) -> Option<&Mailbox> {
    match message.root().header.find("From").map(|f| &f.value.body) {
        Some(FieldBody::Mailbox(m)) => Some(m),
        _ => None,
    }
}

/// Every address named in `To:` or `Cc:`, in that order.
pub fn recipients(message: &Message) -> Vec<&Address> {
    let mut out = Vec::new();
    for name in ["To", "Cc"] {
        if let Some(FieldBody::AddressList(list)) = message.root().header.find(name).map(|f| &f.value.body) {
            out.extend(list.iter());
        }
    }
    out
}

/// The decoded `Subject:` text, if present.
pub fn subject(message: &Message) -> Option<&Text> {
    match message.root().header.find("Subject").map(|f| &f.value.body) {
        Some(FieldBody::Unstructured(t)) => Some(t),
        _ => None,
    }
}

/// The message's effective date: the first `Received:` trace date if
/// present, else `Date:`, else the current time (spec §4.K).
pub fn effective_date(message: &Message) -> DateTime {
    if let Some(FieldBody::Relay(relay)) = message.root().header.find("Received").map(|f| &f.value.body) {
        if let Some(date) = &relay.date {
            return *date;
        }
    }
    if let Some(FieldBody::DateTime(dt)) = message.root().header.find("Date").map(|f| &f.value.body) {
        return *dt;
    }
    DateTime::now()
}

fn all_part_ids(message: &Message, id: PartId, out: &mut Vec<PartId>) {
    out.push(id);
    for &child in message.children_of(id) {
        all_part_ids(message, child, out);
    }
}

/// Every leaf part whose content-type is `text/*` (spec §4.K "list of
/// textual parts").
pub fn text_parts(message: &Message) -> Vec<PartId> {
    let mut ids = Vec::new();
    all_part_ids(message, message.root_id(), &mut ids);
    ids.into_iter()
        .filter(|&id| {
            message
                .part(id)
                .map(|p| !p.body.is_multipart() && p.body.content_type.is_text())
                .unwrap_or(false)
        })
        .collect()
}

/// Heuristic attachment listing: any leaf part with a `filename` on its
/// `Content-Disposition:`, or a non-text content-type, excluding whichever
/// text part was picked as the message body (spec §4.K).
pub fn attachments(message: &Message) -> Vec<PartId> {
    let mut ids = Vec::new();
    all_part_ids(message, message.root_id(), &mut ids);

    let body_text_id = ids.iter().copied().find(|&id| {
        message
            .part(id)
            .map(|p| !p.body.is_multipart() && p.body.content_type.is_text())
            .unwrap_or(false)
    });

    ids.into_iter()
        .filter(|&id| {
            if Some(id) == body_text_id {
                return false;
            }
            let Some(part) = message.part(id) else { return false };
            if part.body.is_multipart() {
                return false;
            }
            let has_filename = part
                .header
                .find("Content-Disposition")
                .map(|f| f.value.params.find("filename").is_some())
                .unwrap_or(false);
            has_filename || !part.body.content_type.is_text()
        })
        .collect()
}

/// An attachment bundle: `(media_type, encoding, filename, description,
/// data)` (spec §4.K supplement). Discovering attachments from the
/// filesystem remains out of scope; this builds one from bytes already in
/// memory, the way `fileAttachment` wraps a `contentHandler` the caller
/// already produced.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub media_type: MediaType,
    pub encoding: Option<EncodingName>,
    pub filename: Option<String>,
    pub description: Option<Text>,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(media_type: MediaType, data: Vec<u8>) -> Self {
        Self {
            media_type,
            encoding: None,
            filename: None,
            description: None,
            data,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_description(mut self, description: Text) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingName) -> Self {
        self.encoding = Some(encoding);
        self
    }

    fn into_body_part(self) -> BodyPart {
        let encoding_name = self
            .encoding
            .unwrap_or_else(|| decide_encoding(&self.data, None));

        let mut header = Header::new();
        header.append(HeaderField::new(
            "Content-Type",
            HeaderFieldValue::new(FieldBody::ContentType(self.media_type.clone())),
        ));
        header.append(HeaderField::new(
            "Content-Transfer-Encoding",
            HeaderFieldValue::new(FieldBody::ContentTransferEncoding(Encoding::new(encoding_name))),
        ));
        if let Some(description) = self.description {
            header.append(HeaderField::new("Content-Description", description));
        }

        let mut disposition_params = ParameterSet::new();
        if let Some(filename) = &self.filename {
            disposition_params.set(Parameter::new("filename", Word::ascii(filename.as_bytes().to_vec())));
        }
        header.append(HeaderField::new(
            "Content-Disposition",
            HeaderFieldValue::new(FieldBody::ContentDisposition("attachment".to_string()))
                .with_params(disposition_params),
        ));

        let body = Body {
            contents: ContentHandler::Decoded(self.data),
            content_type: self.media_type,
            ..Default::default()
        };
        BodyPart { header, body, parent: None }
    }
}

fn leaf_part(media_type: MediaType, charset: Option<Charset>, bytes: Vec<u8>) -> BodyPart {
    let encoding_name = decide_encoding(&bytes, charset.as_ref());

    let mut header = Header::new();
    let mut content_type_params = ParameterSet::new();
    if let Some(cs) = &charset {
        content_type_params.set(Parameter::new("charset", Word::ascii(cs.name().as_bytes().to_vec())));
    }
    header.append(HeaderField::new(
        "Content-Type",
        HeaderFieldValue::new(FieldBody::ContentType(media_type.clone())).with_params(content_type_params),
    ));
    header.append(HeaderField::new(
        "Content-Transfer-Encoding",
        HeaderFieldValue::new(FieldBody::ContentTransferEncoding(Encoding::new(encoding_name))),
    ));

    let body = Body {
        contents: ContentHandler::Decoded(bytes),
        content_type: media_type,
        charset,
        ..Default::default()
    };
    BodyPart { header, body, parent: None }
}

fn multipart_content_type_field(subtype: &str, boundary: &str) -> HeaderField {
    let mut params = ParameterSet::new();
    params.set(Parameter::new("boundary", Word::ascii(boundary.as_bytes().to_vec())));
    HeaderField::new(
        "Content-Type",
        HeaderFieldValue::new(FieldBody::ContentType(MediaType::new("multipart", subtype))).with_params(params),
    )
}

/// Assembles a [`Message`] from a subject, sender, recipients, text body
/// and attachments, producing a correct `multipart/mixed` or
/// `multipart/alternative` tree (spec §4.K supplement, grounded in
/// `original_source`'s `messageBuilder`).
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    subject: Option<Text>,
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    text_body: Option<(Charset, Vec<u8>)>,
    html_body: Option<(Charset, Vec<u8>)>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: Text) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn from(mut self, from: Mailbox) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Mailbox) -> Self {
        self.to.push(to);
        self
    }

    pub fn cc(mut self, cc: Mailbox) -> Self {
        self.cc.push(cc);
        self
    }

    pub fn text_body(mut self, charset: Charset, bytes: Vec<u8>) -> Self {
        self.text_body = Some((charset, bytes));
        self
    }

    pub fn html_body(mut self, charset: Charset, bytes: Vec<u8>) -> Self {
        self.html_body = Some((charset, bytes));
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    fn set_envelope(&self, header: &mut Header) {
        if let Some(subject) = &self.subject {
            header.append(HeaderField::new(
                "Subject",
                HeaderFieldValue::new(FieldBody::Unstructured(subject.clone())),
            ));
        }
        if let Some(from) = &self.from {
            header.append(HeaderField::new(
                "From",
                HeaderFieldValue::new(FieldBody::Mailbox(from.clone())),
            ));
        }
        if !self.to.is_empty() {
            header.append(HeaderField::new(
                "To",
                HeaderFieldValue::new(FieldBody::AddressList(
                    self.to.iter().cloned().map(Address::Mailbox).collect(),
                )),
            ));
        }
        if !self.cc.is_empty() {
            header.append(HeaderField::new(
                "Cc",
                HeaderFieldValue::new(FieldBody::AddressList(
                    self.cc.iter().cloned().map(Address::Mailbox).collect(),
                )),
            ));
        }
        header.append(HeaderField::new(
            "Date",
            HeaderFieldValue::new(FieldBody::DateTime(DateTime::now())),
        ));
    }

    pub fn build(self) -> Message {
        let text_leaf = self
            .text_body
            .clone()
            .map(|(cs, bytes)| leaf_part(MediaType::new("text", "plain"), Some(cs), bytes));
        let html_leaf = self
            .html_body
            .clone()
            .map(|(cs, bytes)| leaf_part(MediaType::new("text", "html"), Some(cs), bytes));

        let (mut body_root, alt_children) = match (text_leaf, html_leaf) {
            (Some(t), Some(h)) => {
                let boundary = "----=_alternative";
                let mut header = Header::new();
                header.append(multipart_content_type_field("alternative", boundary));
                let part = BodyPart {
                    header,
                    body: Body {
                        content_type: MediaType::new("multipart", "alternative"),
                        boundary: Some(boundary.to_string()),
                        ..Default::default()
                    },
                    parent: None,
                };
                (part, vec![t, h])
            }
            (Some(t), None) => (t, Vec::new()),
            (None, Some(h)) => (h, Vec::new()),
            (None, None) => (
                leaf_part(MediaType::new("text", "plain"), Some(Charset::default()), Vec::new()),
                Vec::new(),
            ),
        };

        if self.attachments.is_empty() {
            self.set_envelope(&mut body_root.header);
            let mut message = Message::new(body_root);
            let root_id = message.root_id();
            for child in alt_children {
                message.append_part(root_id, child);
            }
            message
        } else {
            let boundary = "----=_mixed";
            let mut header = Header::new();
            header.append(multipart_content_type_field("mixed", boundary));
            self.set_envelope(&mut header);
            let mixed_root = BodyPart {
                header,
                body: Body {
                    content_type: MediaType::new("multipart", "mixed"),
                    boundary: Some(boundary.to_string()),
                    ..Default::default()
                },
                parent: None,
            };

            let mut message = Message::new(mixed_root);
            let root_id = message.root_id();

            if alt_children.is_empty() {
                message.append_part(root_id, body_root);
            } else {
                let alt_id = message.append_part(root_id, body_root);
                for child in alt_children {
                    message.append_part(alt_id, child);
                }
            }
            for attachment in self.attachments {
                message.append_part(root_id, attachment.into_body_part());
            }
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmime_types::address::AddrSpec;
    use vmime_types::context::{GenerationContext, ParsingContext};

    #[test]
    fn builds_a_simple_text_message_with_envelope_fields() {
        let message = MessageBuilder::new()
            .subject(Text::from_ascii("hello"))
            .from(Mailbox::new(AddrSpec::new("alice", "example.com")))
            .to(Mailbox::new(AddrSpec::new("bob", "example.com")))
            .text_body(Charset::default(), b"hi there".to_vec())
            .build();

        assert!(message.children_of(message.root_id()).is_empty());
        assert_eq!(subject(&message).unwrap().to_string_lossy(), "hello");
        assert_eq!(sender(&message).unwrap().addr_spec.to_string(), "alice@example.com");
        assert_eq!(recipients(&message).len(), 1);
    }

    #[test]
    fn builds_a_multipart_alternative_for_text_and_html_bodies() {
        let message = MessageBuilder::new()
            .text_body(Charset::default(), b"hi".to_vec())
            .html_body(Charset::default(), b"<p>hi</p>".to_vec())
            .build();

        assert_eq!(message.children_of(message.root_id()).len(), 2);
    }

    #[test]
    fn attaches_files_under_a_multipart_mixed_root() {
        let message = MessageBuilder::new()
            .text_body(Charset::default(), b"hi".to_vec())
            .attachment(
                Attachment::new(MediaType::new("application", "octet-stream"), vec![1, 2, 3])
                    .with_filename("data.bin"),
            )
            .build();

        let children = message.children_of(message.root_id());
        assert_eq!(children.len(), 2);
        assert_eq!(attachments(&message).len(), 1);
        assert_eq!(text_parts(&message).len(), 1);
    }

    #[test]
    fn builder_output_round_trips_through_generation_and_parsing() {
        let message = MessageBuilder::new()
            .subject(Text::from_ascii("hi"))
            .text_body(Charset::default(), b"body text".to_vec())
            .attachment(Attachment::new(MediaType::new("application", "octet-stream"), vec![9, 9]))
            .build();

        let bytes = crate::body::generate_message(&GenerationContext::default(), &message);
        let reparsed = crate::body::parse_message(&ParsingContext::default(), &bytes);
        assert_eq!(subject(&reparsed).unwrap().to_string_lossy(), "hi");
        assert_eq!(reparsed.children_of(reparsed.root_id()).len(), 2);
    }

    #[test]
    fn effective_date_falls_back_to_received_then_date_then_now() {
        let message = MessageBuilder::new().text_body(Charset::default(), b"x".to_vec()).build();
        // No Received field was set, but Date was stamped by the builder.
        assert!(effective_date(&message).year >= 2020);
    }
}
