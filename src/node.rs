//! Rich-text document tree shared by every pagination stage.
//!
//! Nodes are plain owned values: every split stage clones the parts it
//! keeps, so the document handed to a pass is never mutated by it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Marker class for a manual page break.
pub const PAGE_BREAK_CLASS: &str = "page-break";
/// Marker class for fixed multi-column blocks that must never be divided.
pub const COLUMN_CONTAINER_CLASS: &str = "column-container";
/// Marker class for multi-field section blocks.
pub const SECTION_CLASS: &str = "section";
/// Marker class added to the tail half of a split block.
pub const CONTINUATION_CLASS: &str = "paragraph-continuation";

/// Class marker list; almost every element carries zero to two markers.
pub type ClassList = smallvec::SmallVec<[String; 2]>;

/// Opaque attribute bag (`style`, `data-*`, ...), shared between clones.
pub type Attributes = Arc<BTreeMap<String, String>>;

/// Stable identity of a text run assigned when a document is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRun {
    /// Run identifier, unique within one document.
    pub id: u32,
    /// Character offset of this fragment inside the original run.
    pub start: usize,
}

/// Leaf text content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<TextRun>,
}

impl TextNode {
    /// Create a text node without run identity.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            run: None,
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Split at a character offset, advancing the run start of the tail.
    pub fn split_at_char(&self, offset: usize) -> (TextNode, TextNode) {
        let byte = char_to_byte(&self.text, offset);
        let (head, tail) = self.text.split_at(byte);
        let tail_run = self.run.map(|run| TextRun {
            id: run.id,
            start: run.start + offset,
        });
        (
            TextNode {
                text: head.to_string(),
                run: self.run,
            },
            TextNode {
                text: tail.to_string(),
                run: tail_run,
            },
        )
    }
}

/// Element with a tag, class markers, opaque attributes, and children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "classes_is_empty")]
    pub classes: ClassList,
    #[serde(default, skip_serializing_if = "attrs_is_empty")]
    pub attrs: Attributes,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

fn classes_is_empty(classes: &ClassList) -> bool {
    classes.is_empty()
}

fn attrs_is_empty(attrs: &Attributes) -> bool {
    attrs.is_empty()
}

impl ElementNode {
    /// Create an element with no markers or attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: ClassList::new(),
            attrs: Attributes::default(),
            children: Vec::new(),
        }
    }

    /// Builder: add a class marker.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    /// Builder: set an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.attrs).insert(key.into(), value.into());
        self
    }

    /// Builder: append a child.
    pub fn with_child(mut self, child: impl Into<DocumentNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Builder: append a text child.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(TextNode::new(text))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Clone tag, markers and attributes without children.
    pub fn shell(&self) -> ElementNode {
        ElementNode {
            tag: self.tag.clone(),
            classes: self.classes.clone(),
            attrs: Arc::clone(&self.attrs),
            children: Vec::new(),
        }
    }

    /// Clone of this element holding `children` instead of its own.
    pub fn with_children(&self, children: Vec<DocumentNode>) -> ElementNode {
        let mut out = self.shell();
        out.children = children;
        out
    }

    /// Clone holding `children`, marked as the continued half of this element.
    pub fn continuation_with(&self, children: Vec<DocumentNode>) -> ElementNode {
        let mut out = self.with_children(children);
        out.add_class(CONTINUATION_CLASS);
        out
    }

    pub fn is_continuation(&self) -> bool {
        self.has_class(CONTINUATION_CLASS)
    }

    /// Heading level for `h1`..`h6`.
    pub fn heading_level(&self) -> Option<u8> {
        let bytes = self.tag.as_bytes();
        if bytes.len() == 2 && (bytes[0] == b'h' || bytes[0] == b'H') {
            let level = bytes[1].wrapping_sub(b'0');
            if (1..=6).contains(&level) {
                return Some(level);
            }
        }
        None
    }
}

/// A node in the rich-text tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentNode {
    Text(TextNode),
    Element(ElementNode),
}

impl From<TextNode> for DocumentNode {
    fn from(value: TextNode) -> Self {
        Self::Text(value)
    }
}

impl From<ElementNode> for DocumentNode {
    fn from(value: ElementNode) -> Self {
        Self::Element(value)
    }
}

impl DocumentNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextNode::new(text))
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) => None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.as_element().is_some_and(|el| el.has_class(class))
    }

    /// Whether this node or any descendant carries `class`.
    pub fn contains_class(&self, class: &str) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Element(el) => {
                el.has_class(class) || el.children.iter().any(|c| c.contains_class(class))
            }
        }
    }

    /// Concatenated text of the subtree, verbatim.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(&text.text),
            Self::Element(el) => {
                for child in &el.children {
                    child.push_text(out);
                }
            }
        }
    }

    /// Whether the subtree holds no visible text and no elements.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.text.trim().is_empty(),
            Self::Element(_) => false,
        }
    }

    /// Number of whitespace-delimited words, counting across inline boundaries.
    pub fn word_count(&self) -> usize {
        let mut counter = WordCounter::default();
        self.visit_text(&mut |text| counter.feed(&text.text));
        counter.words
    }

    /// Depth-first visit of every text node.
    pub fn visit_text<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a TextNode),
    {
        match self {
            Self::Text(text) => f(text),
            Self::Element(el) => {
                for child in &el.children {
                    child.visit_text(f);
                }
            }
        }
    }

    /// Mutable depth-first visit of every text node.
    pub fn visit_text_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut TextNode),
    {
        match self {
            Self::Text(text) => f(text),
            Self::Element(el) => {
                for child in &mut el.children {
                    child.visit_text_mut(f);
                }
            }
        }
    }
}

#[derive(Default)]
struct WordCounter {
    words: usize,
    in_word: bool,
}

impl WordCounter {
    fn feed(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.in_word = false;
            } else if !self.in_word {
                self.in_word = true;
                self.words += 1;
            }
        }
    }
}

/// Verbatim text of a forest.
pub fn forest_text(nodes: &[DocumentNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.push_text(&mut out);
    }
    out
}

/// Whether a forest has nothing but whitespace text.
pub fn is_blank_forest(nodes: &[DocumentNode]) -> bool {
    nodes.iter().all(DocumentNode::is_blank)
}

/// Tags laid out as blocks rather than inline runs.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "p" | "div"
            | "section"
            | "article"
            | "blockquote"
            | "pre"
            | "ul"
            | "ol"
            | "li"
            | "table"
            | "thead"
            | "tbody"
            | "tr"
            | "td"
            | "th"
            | "figure"
            | "hr"
            | "header"
            | "footer"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

/// Assign a fresh [`TextRun`] to every text node, in document order.
///
/// Returns the number of runs assigned.
pub fn assign_text_runs(nodes: &mut [DocumentNode]) -> u32 {
    let mut next = 0u32;
    for node in nodes.iter_mut() {
        node.visit_text_mut(&mut |text| {
            text.run = Some(TextRun { id: next, start: 0 });
            next = next.saturating_add(1);
        });
    }
    next
}

/// Rebuild a flowing document from concatenated page contents.
///
/// Continuation fragments are folded back into the preceding element of the
/// same tag, inline elements cut by a word split are folded back when their
/// text runs meet, and adjacent text fragments of one run are joined.
pub fn rejoin_continuations(nodes: Vec<DocumentNode>) -> Vec<DocumentNode> {
    let mut out: Vec<DocumentNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        push_merged(&mut out, node);
    }
    out
}

fn push_merged(out: &mut Vec<DocumentNode>, node: DocumentNode) {
    match (out.last_mut(), node) {
        (Some(DocumentNode::Element(prev)), DocumentNode::Element(mut cont))
            if cont.is_continuation() && prev.tag == cont.tag =>
        {
            for child in cont.children.drain(..) {
                push_merged(&mut prev.children, child);
            }
        }
        (Some(DocumentNode::Element(prev)), DocumentNode::Element(mut next))
            if continues_inline(prev, &next) =>
        {
            for child in next.children.drain(..) {
                push_merged(&mut prev.children, child);
            }
        }
        (Some(DocumentNode::Text(prev)), DocumentNode::Text(next))
            if runs_adjacent(prev, &next) =>
        {
            prev.text.push_str(&next.text);
        }
        (_, node) => out.push(node),
    }
}

// Both halves of one inline element: same shell, and the text run of the
// first half carries on into the second.
fn continues_inline(prev: &ElementNode, next: &ElementNode) -> bool {
    !is_block_tag(&next.tag)
        && prev.tag == next.tag
        && prev.classes == next.classes
        && prev.attrs == next.attrs
        && match (last_text(&prev.children), first_text(&next.children)) {
            (Some(a), Some(b)) => runs_adjacent(a, b),
            _ => false,
        }
}

fn last_text(nodes: &[DocumentNode]) -> Option<&TextNode> {
    nodes.iter().rev().find_map(|node| match node {
        DocumentNode::Text(text) => Some(text),
        DocumentNode::Element(el) => last_text(&el.children),
    })
}

fn first_text(nodes: &[DocumentNode]) -> Option<&TextNode> {
    nodes.iter().find_map(|node| match node {
        DocumentNode::Text(text) => Some(text),
        DocumentNode::Element(el) => first_text(&el.children),
    })
}

fn runs_adjacent(prev: &TextNode, next: &TextNode) -> bool {
    match (prev.run, next.run) {
        (Some(a), Some(b)) => a.id == b.id && a.start + prev.char_len() == b.start,
        _ => false,
    }
}

pub(crate) fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}
