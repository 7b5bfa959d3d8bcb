//! Block classification for split policy selection.

use crate::node::{DocumentNode, ElementNode, COLUMN_CONTAINER_CLASS, SECTION_CLASS};

/// How a block may be divided across pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockClass {
    /// Placed whole or deferred whole, never divided.
    Unsplittable,
    /// Section whose first child is a heading; splits between child fields.
    SectionWithHeading,
    /// Anything else.
    Plain,
}

/// Classify one block node.
pub fn classify(node: &DocumentNode) -> BlockClass {
    let Some(el) = node.as_element() else {
        return BlockClass::Plain;
    };
    if el.has_class(COLUMN_CONTAINER_CLASS) {
        BlockClass::Unsplittable
    } else if el.has_class(SECTION_CLASS) && first_child_is_heading(el) {
        BlockClass::SectionWithHeading
    } else {
        BlockClass::Plain
    }
}

/// Whether a node matches the heading pattern.
pub fn is_heading(node: &DocumentNode) -> bool {
    node.as_element().is_some_and(is_heading_element)
}

pub fn is_heading_element(el: &ElementNode) -> bool {
    el.heading_level().is_some()
        || el.has_class("heading")
        || el.has_class("section-heading")
        || el.has_class("section-title")
        || el.attr("role") == Some("heading")
}

fn first_child_is_heading(el: &ElementNode) -> bool {
    el.children
        .iter()
        .find(|child| !child.is_blank())
        .is_some_and(is_heading)
}

/// Minimum number of children kept on the fitting side when a block is
/// divided between its children: heading plus one field, or one child.
pub fn split_floor(el: &ElementNode) -> usize {
    if first_child_is_heading(el) {
        2
    } else {
        1
    }
}

/// Whether any direct or nested child is a section block, including the
/// headless continuation of one.
pub fn has_nested_sections(node: &DocumentNode) -> bool {
    node.as_element().is_some_and(|el| {
        el.children.iter().any(|child| {
            classify(child) == BlockClass::SectionWithHeading
                || child
                    .as_element()
                    .is_some_and(|c| c.has_class(SECTION_CLASS) && c.is_continuation())
                || has_nested_sections(child)
        })
    })
}

/// Whether any descendant below `node` is unsplittable.
pub fn has_unsplittable_descendant(node: &DocumentNode) -> bool {
    node.as_element().is_some_and(|el| {
        el.children.iter().any(|child| {
            classify(child) == BlockClass::Unsplittable || has_unsplittable_descendant(child)
        })
    })
}
