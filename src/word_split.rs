//! Formatting-preserving split of one block at a word boundary.

use crate::node::{is_block_tag, DocumentNode, ElementNode, CONTINUATION_CLASS};

/// Split `node` after word `word_index` (1-based; 0 keeps no words).
///
/// Words are maximal non-whitespace runs in document order and may cross
/// inline element boundaries. Whitespace between the last head word and the
/// first tail word stays in the head. Every element straddling the split is
/// cloned into both halves; the tail root and its straddling block-level
/// descendants are marked as continuations, inline formatting is not.
/// Returns `None` for the tail when the split point is at or past the last
/// word.
pub fn split_at_word(
    node: &DocumentNode,
    word_index: usize,
) -> (DocumentNode, Option<DocumentNode>) {
    let Some(offset) = word_start_offset(node, word_index.saturating_add(1)) else {
        return (node.clone(), None);
    };
    let mut remaining = offset;
    let (head, tail) = split_node(node, &mut remaining);
    let head = head.unwrap_or_else(|| empty_like(node));
    (head, tail.map(mark_root))
}

/// Character offset at which word `ordinal` (1-based) begins.
pub fn word_start_offset(node: &DocumentNode, ordinal: usize) -> Option<usize> {
    let mut words = 0usize;
    let mut in_word = false;
    let mut pos = 0usize;
    let mut found = None;
    node.visit_text(&mut |text| {
        for ch in text.text.chars() {
            if ch.is_whitespace() {
                in_word = false;
            } else if !in_word {
                in_word = true;
                words += 1;
                if words == ordinal && found.is_none() {
                    found = Some(pos);
                }
            }
            pos += 1;
        }
    });
    found
}

fn split_node(
    node: &DocumentNode,
    remaining: &mut usize,
) -> (Option<DocumentNode>, Option<DocumentNode>) {
    if *remaining == 0 {
        return (None, Some(node.clone()));
    }
    match node {
        DocumentNode::Text(text) => {
            let len = text.char_len();
            if *remaining >= len {
                *remaining -= len;
                return (Some(node.clone()), None);
            }
            let (head, tail) = text.split_at_char(*remaining);
            *remaining = 0;
            (Some(head.into()), Some(tail.into()))
        }
        DocumentNode::Element(el) => {
            let len = char_len_of(node);
            if *remaining >= len {
                *remaining -= len;
                return (Some(node.clone()), None);
            }
            let mut head = el.shell();
            let mut tail = el.shell();
            for child in &el.children {
                let (h, t) = split_node(child, remaining);
                head.children.extend(h);
                tail.children.extend(t);
            }
            (
                non_empty(head).map(DocumentNode::Element),
                non_empty(tail).map(|t| tail_like(t, el)),
            )
        }
    }
}

fn non_empty(el: ElementNode) -> Option<ElementNode> {
    (!el.children.is_empty()).then_some(el)
}

fn tail_like(tail: ElementNode, original: &ElementNode) -> DocumentNode {
    if is_block_tag(&original.tag) {
        original.continuation_with(tail.children).into()
    } else {
        original.with_children(tail.children).into()
    }
}

fn mark_root(tail: DocumentNode) -> DocumentNode {
    match tail {
        DocumentNode::Element(mut el) => {
            el.add_class(CONTINUATION_CLASS);
            el.into()
        }
        text => text,
    }
}

fn empty_like(node: &DocumentNode) -> DocumentNode {
    match node {
        DocumentNode::Text(text) => text.split_at_char(0).0.into(),
        DocumentNode::Element(el) => el.shell().into(),
    }
}

fn char_len_of(node: &DocumentNode) -> usize {
    let mut len = 0usize;
    node.visit_text(&mut |text| len += text.char_len());
    len
}
