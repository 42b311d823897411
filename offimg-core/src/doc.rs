//! Document model: inline text and image nodes
//!
//! Positions count one per character of text and one per image node, so
//! position `0` is before the first character and `size()` is the end.
//! All mutations go through [`Document::apply`].

use std::collections::HashSet;
use std::fmt;

use crate::error::DocumentError;
use crate::hash::HashAlgorithm;
use crate::node::{self, ImageAttrs};

/// Stable identity of an image node for the lifetime of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An image node owned by the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    pub id: NodeId,
    pub attrs: ImageAttrs,
}

/// A piece of inline content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Image(ImageNode),
}

impl Inline {
    fn size(&self) -> usize {
        match self {
            Inline::Text(text) => text.chars().count(),
            Inline::Image(_) => 1,
        }
    }
}

/// A single document change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    InsertImage { pos: usize, attrs: ImageAttrs },
    InsertText { pos: usize, text: String },
    /// Replace the `src` of a live node. A missing node is skipped.
    SetSrc { id: NodeId, src: String },
    RemoveImage { id: NodeId },
}

/// An ordered batch of steps applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub steps: Vec<Step>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(mut self, pos: usize, attrs: ImageAttrs) -> Self {
        self.steps.push(Step::InsertImage { pos, attrs });
        self
    }

    pub fn insert_text(mut self, pos: usize, text: impl Into<String>) -> Self {
        self.steps.push(Step::InsertText {
            pos,
            text: text.into(),
        });
        self
    }

    pub fn set_src(mut self, id: NodeId, src: impl Into<String>) -> Self {
        self.steps.push(Step::SetSrc {
            id,
            src: src.into(),
        });
        self
    }

    pub fn remove_image(mut self, id: NodeId) -> Self {
        self.steps.push(Step::RemoveImage { id });
        self
    }
}

/// What applying a transaction changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Ids of inserted image nodes, in step order
    pub inserted: Vec<NodeId>,
    /// Steps that targeted nodes no longer in the document
    pub skipped: usize,
}

/// The main document structure
#[derive(Debug, Clone)]
pub struct Document {
    pub algorithm: HashAlgorithm,
    content: Vec<Inline>,
    next_id: u64,
    pub rev: u64,
}

impl Document {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            content: Vec::new(),
            next_id: 1,
            rev: 1,
        }
    }

    /// Build a document from parsed content, assigning node ids
    pub fn from_parts(algorithm: HashAlgorithm, parts: Vec<Part>) -> Self {
        let mut doc = Self::new(algorithm);
        for part in parts {
            match part {
                Part::Text(text) => doc.push_text(text),
                Part::Image(attrs) => {
                    let id = doc.alloc_id();
                    doc.content.push(Inline::Image(ImageNode { id, attrs }));
                }
            }
        }
        doc
    }

    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(Inline::Text(last)) = self.content.last_mut() {
            last.push_str(&text);
        } else {
            self.content.push(Inline::Text(text));
        }
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn content(&self) -> &[Inline] {
        &self.content
    }

    /// Total size in positions
    pub fn size(&self) -> usize {
        self.content.iter().map(Inline::size).sum()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageNode> {
        self.content.iter().filter_map(|inline| match inline {
            Inline::Image(node) => Some(node),
            Inline::Text(_) => None,
        })
    }

    pub fn image(&self, id: NodeId) -> Option<&ImageNode> {
        self.images().find(|node| node.id == id)
    }

    /// Position of a node, if it is still in the document
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        let mut pos = 0;
        for inline in &self.content {
            if let Inline::Image(node) = inline {
                if node.id == id {
                    return Some(pos);
                }
            }
            pos += inline.size();
        }
        None
    }

    /// Whether any live node references `hash`
    pub fn references(&self, hash: &str) -> bool {
        self.images()
            .any(|node| node.attrs.content_hash.as_deref() == Some(hash))
    }

    /// Plain text with each image shown as `\u{FFFC}`
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|inline| match inline {
                Inline::Text(text) => text.as_str(),
                Inline::Image(_) => "\u{FFFC}",
            })
            .collect()
    }

    /// Apply a transaction. On error nothing is changed.
    ///
    /// Every step is checked against the current content first, then the
    /// steps run in place.
    pub fn apply(&mut self, tr: Transaction) -> Result<Applied, DocumentError> {
        self.check(&tr.steps)?;

        let mut applied = Applied::default();
        for step in tr.steps {
            match step {
                Step::InsertImage { pos, attrs } => {
                    let id = self.alloc_id();
                    self.insert_at(pos, Inline::Image(ImageNode { id, attrs }))?;
                    applied.inserted.push(id);
                }
                Step::InsertText { pos, text } => {
                    if !text.is_empty() {
                        self.insert_at(pos, Inline::Text(text))?;
                    }
                }
                Step::SetSrc { id, src } => match self.image_mut(id) {
                    Some(node) => node.attrs.src = src,
                    None => applied.skipped += 1,
                },
                Step::RemoveImage { id } => {
                    let before = self.content.len();
                    self.content
                        .retain(|inline| !matches!(inline, Inline::Image(n) if n.id == id));
                    if self.content.len() == before {
                        applied.skipped += 1;
                    } else {
                        self.normalize();
                    }
                }
            }
        }

        self.rev += 1;
        Ok(applied)
    }

    /// Dry run of `steps`: positions, attributes and node liveness
    fn check(&self, steps: &[Step]) -> Result<(), DocumentError> {
        let mut size = self.size();
        let mut next_id = self.next_id;
        let mut added = HashSet::new();
        let mut removed = HashSet::new();
        let live = |id: NodeId, added: &HashSet<NodeId>, removed: &HashSet<NodeId>| {
            added.contains(&id) || (!removed.contains(&id) && self.image(id).is_some())
        };

        for step in steps {
            match step {
                Step::InsertImage { pos, attrs } => {
                    attrs.validate(self.algorithm)?;
                    check_pos(*pos, size)?;
                    added.insert(NodeId(next_id));
                    next_id += 1;
                    size += 1;
                }
                Step::InsertText { pos, text } => {
                    check_pos(*pos, size)?;
                    size += text.chars().count();
                }
                Step::SetSrc { id, src } => {
                    if live(*id, &added, &removed) {
                        node::validate_src(src)?;
                    }
                }
                Step::RemoveImage { id } => {
                    if live(*id, &added, &removed) {
                        added.remove(id);
                        removed.insert(*id);
                        size -= 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn image_mut(&mut self, id: NodeId) -> Option<&mut ImageNode> {
        self.content.iter_mut().find_map(|inline| match inline {
            Inline::Image(node) if node.id == id => Some(node),
            _ => None,
        })
    }

    fn insert_at(&mut self, pos: usize, item: Inline) -> Result<(), DocumentError> {
        check_pos(pos, self.size())?;

        let mut offset = 0;
        let mut index = self.content.len();
        let mut split = None;
        for (i, inline) in self.content.iter().enumerate() {
            let len = inline.size();
            if pos == offset {
                index = i;
                break;
            }
            if pos < offset + len {
                index = i;
                split = Some(pos - offset);
                break;
            }
            offset += len;
        }

        // Position falls inside a text run: split it
        if let Some(at) = split {
            if let Inline::Text(text) = &mut self.content[index] {
                let byte = char_to_byte(text, at);
                let tail = text.split_off(byte);
                self.content.insert(index + 1, Inline::Text(tail));
                index += 1;
            }
        }

        self.content.insert(index, item);
        self.normalize();
        Ok(())
    }

    /// Merge adjacent text runs and drop empty ones
    fn normalize(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.content.len());
        for inline in self.content.drain(..) {
            if let Inline::Text(text) = &inline {
                if text.is_empty() {
                    continue;
                }
                if let Some(Inline::Text(last)) = merged.last_mut() {
                    last.push_str(text);
                    continue;
                }
            }
            merged.push(inline);
        }
        self.content = merged;
    }

    /// Markup for one node
    pub fn render_node(&self, node: &ImageNode) -> String {
        node::render(&node.attrs, self.algorithm).to_html()
    }
}

fn check_pos(pos: usize, size: usize) -> Result<(), DocumentError> {
    if pos > size {
        return Err(DocumentError::PositionOutOfRange { pos, size });
    }
    Ok(())
}

/// Parsed content before ids are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image(ImageAttrs),
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "data:image/png;base64,AQID";

    fn doc_with_text(text: &str) -> Document {
        Document::from_parts(HashAlgorithm::Sha512, vec![Part::Text(text.to_string())])
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::new(HashAlgorithm::Sha512);
        assert_eq!(doc.size(), 0);
        assert_eq!(doc.rev, 1);
        assert_eq!(doc.images().count(), 0);
    }

    #[test]
    fn test_insert_splits_text() {
        let mut doc = doc_with_text("hello world");
        let applied = doc
            .apply(Transaction::new().insert_image(5, ImageAttrs::new(SRC)))
            .unwrap();

        assert_eq!(applied.inserted.len(), 1);
        assert_eq!(doc.text(), "hello\u{FFFC} world");
        assert_eq!(doc.size(), 12);
        assert_eq!(doc.position_of(applied.inserted[0]), Some(5));
        assert_eq!(doc.rev, 2);
    }

    #[test]
    fn test_insert_counts_characters_not_bytes() {
        let mut doc = doc_with_text("héllo");
        doc.apply(Transaction::new().insert_image(2, ImageAttrs::new(SRC)))
            .unwrap();
        assert_eq!(doc.text(), "hé\u{FFFC}llo");
    }

    #[test]
    fn test_insert_at_start_and_end() {
        let mut doc = doc_with_text("ab");
        doc.apply(
            Transaction::new()
                .insert_image(0, ImageAttrs::new(SRC))
                .insert_image(3, ImageAttrs::new(SRC)),
        )
        .unwrap();
        assert_eq!(doc.text(), "\u{FFFC}ab\u{FFFC}");
    }

    #[test]
    fn test_two_inserts_at_same_position() {
        let mut doc = doc_with_text("abcd");
        let first = doc
            .apply(Transaction::new().insert_image(2, ImageAttrs::new(SRC)))
            .unwrap()
            .inserted[0];
        let second = doc
            .apply(Transaction::new().insert_image(2, ImageAttrs::new(SRC)))
            .unwrap()
            .inserted[0];

        assert_eq!(doc.position_of(second), Some(2));
        assert_eq!(doc.position_of(first), Some(3));
    }

    #[test]
    fn test_failed_transaction_leaves_document_unchanged() {
        let mut doc = doc_with_text("abc");
        let result = doc.apply(
            Transaction::new()
                .insert_image(1, ImageAttrs::new(SRC))
                .insert_image(1, ImageAttrs::new("")),
        );

        assert!(matches!(result, Err(DocumentError::InvalidAttributes(_))));
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.rev, 1);
    }

    #[test]
    fn test_rejected_later_step_leaves_earlier_steps_unapplied() {
        let mut doc = Document::from_parts(
            HashAlgorithm::Sha512,
            vec![Part::Text("ab".into()), Part::Image(ImageAttrs::new(SRC))],
        );
        let id = doc.images().next().unwrap().id;
        let before = doc.content().to_vec();

        let result = doc.apply(
            Transaction::new()
                .insert_text(0, "xyz")
                .remove_image(id)
                .set_src(id, "not a uri")
                .insert_image(9, ImageAttrs::new(SRC)),
        );

        assert_eq!(
            result,
            Err(DocumentError::PositionOutOfRange { pos: 9, size: 5 })
        );
        assert_eq!(doc.content(), before.as_slice());
        assert_eq!(doc.rev, 1);
    }

    #[test]
    fn test_bad_src_for_live_node_rejects_whole_batch() {
        let mut doc = doc_with_text("abc");
        let id = doc
            .apply(Transaction::new().insert_image(1, ImageAttrs::new(SRC)))
            .unwrap()
            .inserted[0];

        let result = doc.apply(
            Transaction::new()
                .insert_text(0, "zz")
                .set_src(id, "data:text/plain;base64,AQID"),
        );
        assert!(matches!(result, Err(DocumentError::InvalidAttributes(_))));
        assert_eq!(doc.text(), "a\u{FFFC}bc");
        assert_eq!(doc.image(id).unwrap().attrs.src, SRC);
    }

    #[test]
    fn test_set_src_on_node_inserted_in_same_transaction() {
        let mut doc = doc_with_text("abc");
        let next = NodeId(doc.next_id);
        let other = "data:image/gif;base64,R0lG";
        let applied = doc
            .apply(
                Transaction::new()
                    .insert_image(3, ImageAttrs::new(SRC))
                    .set_src(next, other),
            )
            .unwrap();

        assert_eq!(applied.inserted, vec![next]);
        assert_eq!(applied.skipped, 0);
        assert_eq!(doc.image(next).unwrap().attrs.src, other);
    }

    #[test]
    fn test_set_src_after_removal_in_same_transaction_is_skipped() {
        let mut doc = doc_with_text("abc");
        let id = doc
            .apply(Transaction::new().insert_image(1, ImageAttrs::new(SRC)))
            .unwrap()
            .inserted[0];

        // The src is never checked once the node is gone
        let applied = doc
            .apply(Transaction::new().remove_image(id).set_src(id, "bogus"))
            .unwrap();
        assert_eq!(applied.skipped, 1);
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_out_of_range_insert_rejected() {
        let mut doc = doc_with_text("abc");
        let result = doc.apply(Transaction::new().insert_image(4, ImageAttrs::new(SRC)));
        assert_eq!(
            result,
            Err(DocumentError::PositionOutOfRange { pos: 4, size: 3 })
        );
    }

    #[test]
    fn test_set_src_on_missing_node_is_skipped() {
        let mut doc = doc_with_text("abc");
        let applied = doc
            .apply(Transaction::new().set_src(NodeId(99), SRC))
            .unwrap();
        assert_eq!(applied.skipped, 1);
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_set_src_updates_in_place() {
        let mut doc = Document::from_parts(
            HashAlgorithm::Sha512,
            vec![Part::Image(ImageAttrs::new("https://example.com/a.png"))],
        );
        let id = doc.images().next().unwrap().id;
        doc.apply(Transaction::new().set_src(id, SRC)).unwrap();
        assert_eq!(doc.image(id).unwrap().attrs.src, SRC);
        assert_eq!(doc.position_of(id), Some(0));
    }

    #[test]
    fn test_remove_image_merges_text() {
        let mut doc = doc_with_text("ab");
        let id = doc
            .apply(Transaction::new().insert_image(1, ImageAttrs::new(SRC)))
            .unwrap()
            .inserted[0];
        doc.apply(Transaction::new().remove_image(id)).unwrap();

        assert_eq!(doc.content(), &[Inline::Text("ab".to_string())]);
        assert!(doc.image(id).is_none());
    }

    #[test]
    fn test_references() {
        let hash = HashAlgorithm::Sha512.digest(b"x");
        let doc = Document::from_parts(
            HashAlgorithm::Sha512,
            vec![Part::Image(ImageAttrs::new(SRC).with_hash(hash.clone()))],
        );
        assert!(doc.references(&hash));
        assert!(!doc.references("other"));
    }
}
