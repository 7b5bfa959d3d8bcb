//! Manual page-break partitioning.

use crate::node::{is_blank_forest, DocumentNode, ElementNode, PAGE_BREAK_CLASS};

/// Split a document into sections at manual page-break markers.
///
/// Each returned forest must start on a new page. Blank sections are dropped,
/// and a document without markers comes back as one forest equal to the input.
pub fn partition(document: &[DocumentNode]) -> Vec<Vec<DocumentNode>> {
    let mut sections: Vec<Vec<DocumentNode>> = vec![Vec::new()];
    for node in document {
        let pieces = split_at_breaks(node);
        append_pieces(&mut sections, pieces);
    }
    sections.retain(|forest| !is_blank_forest(forest));
    sections
}

/// Whether a node is a page-break marker itself.
pub fn is_page_break(node: &DocumentNode) -> bool {
    node.has_class(PAGE_BREAK_CLASS)
}

/// Count of markers anywhere in a forest.
pub fn count_page_breaks(document: &[DocumentNode]) -> usize {
    fn count(node: &DocumentNode) -> usize {
        match node {
            DocumentNode::Text(_) => 0,
            DocumentNode::Element(_) if is_page_break(node) => 1,
            DocumentNode::Element(el) => el.children.iter().map(count).sum(),
        }
    }
    document.iter().map(count).sum()
}

// Pieces of one node separated by the breaks inside it: `n` breaks yield
// `n + 1` pieces, any of which may be empty.
fn split_at_breaks(node: &DocumentNode) -> Vec<Option<DocumentNode>> {
    if is_page_break(node) {
        return vec![None, None];
    }
    let DocumentNode::Element(el) = node else {
        return vec![Some(node.clone())];
    };
    if !node.contains_class(PAGE_BREAK_CLASS) {
        return vec![Some(node.clone())];
    }

    let mut pieces: Vec<Vec<DocumentNode>> = vec![Vec::new()];
    for child in &el.children {
        append_pieces(&mut pieces, split_at_breaks(child));
    }
    pieces
        .into_iter()
        .map(|children| wrap_piece(el, children))
        .collect()
}

fn wrap_piece(el: &ElementNode, children: Vec<DocumentNode>) -> Option<DocumentNode> {
    if is_blank_forest(&children) {
        return None;
    }
    Some(DocumentNode::Element(el.with_children(children)))
}

fn append_pieces<P>(sections: &mut Vec<Vec<DocumentNode>>, pieces: Vec<P>)
where
    P: IntoIterator<Item = DocumentNode>,
{
    for (idx, piece) in pieces.into_iter().enumerate() {
        if idx > 0 {
            sections.push(Vec::new());
        }
        if let Some(current) = sections.last_mut() {
            current.extend(piece);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::forest_text;

    fn para(text: &str) -> DocumentNode {
        ElementNode::new("p").with_text(text).into()
    }

    fn marker() -> DocumentNode {
        ElementNode::new("div").with_class(PAGE_BREAK_CLASS).into()
    }

    #[test]
    fn no_markers_is_identity() {
        let doc = vec![para("a"), para("b")];
        assert_eq!(partition(&doc), vec![doc]);
    }

    #[test]
    fn top_level_marker_splits_sections() {
        let doc = vec![para("a"), marker(), para("b")];
        let sections = partition(&doc);
        assert_eq!(sections, vec![vec![para("a")], vec![para("b")]]);
    }

    #[test]
    fn leading_and_repeated_markers_drop_empty_sections() {
        let doc = vec![marker(), para("a"), marker(), marker(), para("b"), marker()];
        let sections = partition(&doc);
        assert_eq!(sections.len(), 2);
        assert_eq!(count_page_breaks(&doc), 4);
    }

    #[test]
    fn nested_marker_clones_container_on_both_sides() {
        let container = ElementNode::new("div")
            .with_class("body")
            .with_attr("style", "margin: 0")
            .with_child(para("before"))
            .with_child(marker())
            .with_child(para("after"));
        let doc = vec![container.into()];
        let sections = partition(&doc);
        assert_eq!(sections.len(), 2);
        for section in &sections {
            let el = section[0].as_element().unwrap();
            assert_eq!(el.tag, "div");
            assert!(el.has_class("body"));
            assert_eq!(el.attr("style"), Some("margin: 0"));
            assert_eq!(count_page_breaks(section), 0);
        }
        assert_eq!(forest_text(&sections[0]), "before");
        assert_eq!(forest_text(&sections[1]), "after");
    }

    #[test]
    fn deeply_nested_markers_each_start_a_section() {
        let inner = ElementNode::new("div")
            .with_child(para("one"))
            .with_child(marker())
            .with_child(para("two"))
            .with_child(marker())
            .with_child(para("three"));
        let doc = vec![ElementNode::new("article").with_child(inner).into()];
        let texts: Vec<String> = partition(&doc).iter().map(|s| forest_text(s)).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }
}
