//! The MIME body tree: `Body`, `BodyPart`, `ContentHandler` and the `Message`
//! arena that owns them (spec §3 Body/BodyPart/Message/Content handler,
//! §4.J, §9 "ownership of parent back-pointers" redesign note).
//!
//! The source holds a weak `parent` reference cycling back from a child
//! `bodyPart` to its owner. Rust has no safe, zero-cost equivalent of that
//! without `Rc`/`Weak` and interior mutability, so per the redesign note the
//! tree is flattened into an arena owned by [`Message`]: every [`BodyPart`]
//! is addressed by a [`PartId`], and `parent` is a plain, non-owning index
//! rather than a pointer.

use crate::encoding::Encoding;
use crate::header::{Header, MediaType};

/// Index of a [`BodyPart`] inside a [`Message`]'s arena.
pub type PartId = usize;

/// Either extracted bytes already in their final (decoded) form, or bytes
/// still in a declared transfer encoding (spec §3 Content handler).
///
/// The source's re-openable byte-source variant (for content bigger than
/// should be buffered) is an external-collaborator concern (platform
/// filesystem/socket handling, out of scope); callers who need streaming
/// extraction work from `Encoded` bytes directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentHandler {
    Decoded(Vec<u8>),
    Encoded { encoding: Encoding, data: Vec<u8> },
}

impl ContentHandler {
    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded { .. })
    }

    /// The length of whichever form is currently held, in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Decoded(b) => b.len(),
            Self::Encoded { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContentHandler {
    fn default() -> Self {
        Self::Decoded(Vec::new())
    }
}

/// `{ contents, prolog, epilog, boundary?, contentType, charset, parts }`
/// (spec §3 Body). Invariant: non-empty `parts` implies `content_type` is
/// `multipart/*` and `boundary` is set (synthesized at generation time if
/// absent); otherwise `contents` is the payload and `parts` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    pub contents: ContentHandler,
    pub prolog: String,
    pub epilog: String,
    pub boundary: Option<String>,
    pub content_type: MediaType,
    pub charset: Option<crate::core::Charset>,
    pub parts: Vec<PartId>,
}

impl Body {
    pub fn leaf(content_type: MediaType, contents: ContentHandler) -> Self {
        Self {
            contents,
            content_type,
            ..Default::default()
        }
    }

    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// `{ header, body, parent }` (spec §3 BodyPart). `parent` is `None` for
/// the root of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BodyPart {
    pub header: Header,
    pub body: Body,
    pub parent: Option<PartId>,
}

/// The arena owning an entire message's body-part tree, rooted at
/// [`Message::root`]. A `Message` *is* the root `BodyPart` plus the arena
/// that makes non-owning parent back-pointers possible (spec §3 Message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    arena: Vec<BodyPart>,
    root: PartId,
}

impl Message {
    /// Builds a new message whose root is a single, parentless body part.
    pub fn new(root: BodyPart) -> Self {
        Self {
            arena: vec![root],
            root: 0,
        }
    }

    pub fn root_id(&self) -> PartId {
        self.root
    }

    pub fn root(&self) -> &BodyPart {
        &self.arena[self.root]
    }

    pub fn root_mut(&mut self) -> &mut BodyPart {
        &mut self.arena[self.root]
    }

    pub fn part(&self, id: PartId) -> Option<&BodyPart> {
        self.arena.get(id)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut BodyPart> {
        self.arena.get_mut(id)
    }

    /// The non-owning parent of `id`, or `None` if `id` is the root.
    pub fn parent_of(&self, id: PartId) -> Option<&BodyPart> {
        self.part(id)?.parent.and_then(|p| self.part(p))
    }

    /// Appends `child` as a new last child of `parent_id`, returning its
    /// fresh `PartId`.
    pub fn append_part(&mut self, parent_id: PartId, mut child: BodyPart) -> PartId {
        child.parent = Some(parent_id);
        let new_id = self.arena.len();
        self.arena.push(child);
        self.arena[parent_id].body.parts.push(new_id);
        new_id
    }

    /// Detaches `id` from its parent's children list. The node stays in the
    /// arena (so existing `PartId`s elsewhere remain valid) but its
    /// `parent` is cleared and it is no longer reachable from the tree.
    pub fn detach(&mut self, id: PartId) {
        if let Some(parent_id) = self.arena[id].parent.take() {
            self.arena[parent_id].body.parts.retain(|&p| p != id);
        }
    }

    pub fn children_of(&self, id: PartId) -> &[PartId] {
        self.part(id).map(|p| p.body.parts.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MediaType;

    #[test]
    fn append_sets_parent_and_child_list() {
        let root = BodyPart {
            header: Header::new(),
            body: Body::leaf(MediaType::new("multipart", "mixed"), ContentHandler::default()),
            parent: None,
        };
        let mut msg = Message::new(root);
        let child = BodyPart {
            header: Header::new(),
            body: Body::leaf(
                MediaType::new("text", "plain"),
                ContentHandler::Decoded(b"hi".to_vec()),
            ),
            parent: None,
        };
        let child_id = msg.append_part(msg.root_id(), child);
        assert_eq!(msg.parent_of(child_id).unwrap(), msg.root());
        assert_eq!(msg.children_of(msg.root_id()), &[child_id]);
    }

    #[test]
    fn detach_clears_parent_and_removes_from_children() {
        let root = BodyPart::default();
        let mut msg = Message::new(root);
        let child_id = msg.append_part(msg.root_id(), BodyPart::default());
        msg.detach(child_id);
        assert!(msg.part(child_id).unwrap().parent.is_none());
        assert!(msg.children_of(msg.root_id()).is_empty());
    }

    #[test]
    fn leaf_body_has_no_parts_and_multipart_body_does() {
        let leaf = Body::leaf(MediaType::new("text", "plain"), ContentHandler::default());
        assert!(!leaf.is_multipart());
    }
}
