//! Caret capture and restore across a repagination pass.

use pageflow::{DocumentNode, TextNode};
use serde::{Deserialize, Serialize};

use crate::render_ir::Page;

/// Caret location inside a page list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaretPlacement {
    /// Page holding the caret.
    pub page_index: usize,
    /// Child indices from the page forest down to a text node.
    pub path: Vec<usize>,
    /// Character offset inside that text node.
    pub offset: usize,
}

/// Absolute offset inside a stable text run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAnchor {
    pub id: u32,
    pub offset: usize,
}

/// Caret snapshot taken right before a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub page_index: usize,
    /// Depth-first index of the caret's text node within its page.
    pub text_node_ordinal: usize,
    pub character_offset: usize,
    /// Caret sat at the very end of its page.
    pub at_end: bool,
    pub run_anchor: Option<RunAnchor>,
}

/// Holds at most one caret snapshot between capture and restore.
#[derive(Clone, Debug, Default)]
pub struct CursorTracker {
    snapshot: Option<CursorPosition>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&CursorPosition> {
        self.snapshot.as_ref()
    }

    /// Record the caret against the current page list.
    ///
    /// Returns `None` (and clears any earlier snapshot) when there is no
    /// caret or it points outside `pages`.
    pub fn capture(
        &mut self,
        pages: &[Page],
        caret: Option<&CaretPlacement>,
    ) -> Option<CursorPosition> {
        self.snapshot = caret.and_then(|caret| locate(pages, caret));
        self.snapshot.clone()
    }

    /// Map the snapshot onto a new page list and consume it.
    pub fn restore(&mut self, pages: &[Page]) -> Option<CaretPlacement> {
        let position = self.snapshot.take()?;
        if pages.is_empty() {
            return None;
        }
        if let Some(anchor) = position.run_anchor {
            if let Some(placement) = find_run_anchor(pages, anchor) {
                return Some(placement);
            }
        }
        let page_index = position.page_index.min(pages.len() - 1);
        let texts = text_nodes(&pages[page_index].content);
        if !position.at_end {
            if let Some((path, text)) = texts.get(position.text_node_ordinal) {
                return Some(CaretPlacement {
                    page_index,
                    path: path.clone(),
                    offset: position.character_offset.min(text.char_len()),
                });
            }
        }
        log::debug!(
            "caret ordinal {} not found on page {}; placing at page end",
            position.text_node_ordinal,
            page_index + 1
        );
        Some(end_of_page(page_index, &texts))
    }
}

fn locate(pages: &[Page], caret: &CaretPlacement) -> Option<CursorPosition> {
    let page = pages.get(caret.page_index)?;
    let texts = text_nodes(&page.content);
    let Some(ordinal) = texts.iter().position(|(path, _)| *path == caret.path) else {
        return Some(CursorPosition {
            page_index: caret.page_index,
            text_node_ordinal: texts.len(),
            character_offset: 0,
            at_end: true,
            run_anchor: None,
        });
    };
    let text = texts[ordinal].1;
    let offset = caret.offset.min(text.char_len());
    Some(CursorPosition {
        page_index: caret.page_index,
        text_node_ordinal: ordinal,
        character_offset: offset,
        at_end: ordinal + 1 == texts.len() && offset == text.char_len(),
        run_anchor: text.run.map(|run| RunAnchor {
            id: run.id,
            offset: run.start + offset,
        }),
    })
}

fn find_run_anchor(pages: &[Page], anchor: RunAnchor) -> Option<CaretPlacement> {
    let mut fragment_end = None;
    for (page_index, page) in pages.iter().enumerate() {
        for (path, text) in text_nodes(&page.content) {
            let Some(run) = text.run.filter(|run| run.id == anchor.id) else {
                continue;
            };
            let end = run.start + text.char_len();
            if (run.start..end).contains(&anchor.offset) {
                return Some(CaretPlacement {
                    page_index,
                    path,
                    offset: anchor.offset - run.start,
                });
            }
            if anchor.offset == end && fragment_end.is_none() {
                fragment_end = Some(CaretPlacement {
                    page_index,
                    path,
                    offset: anchor.offset - run.start,
                });
            }
        }
    }
    fragment_end
}

fn end_of_page(page_index: usize, texts: &[(Vec<usize>, &TextNode)]) -> CaretPlacement {
    match texts.last() {
        Some((path, text)) => CaretPlacement {
            page_index,
            path: path.clone(),
            offset: text.char_len(),
        },
        None => CaretPlacement {
            page_index,
            path: Vec::new(),
            offset: 0,
        },
    }
}

fn text_nodes(forest: &[DocumentNode]) -> Vec<(Vec<usize>, &TextNode)> {
    fn walk<'a>(
        nodes: &'a [DocumentNode],
        path: &mut Vec<usize>,
        out: &mut Vec<(Vec<usize>, &'a TextNode)>,
    ) {
        for (idx, node) in nodes.iter().enumerate() {
            path.push(idx);
            match node {
                DocumentNode::Text(text) => out.push((path.clone(), text)),
                DocumentNode::Element(el) => walk(&el.children, path, out),
            }
            path.pop();
        }
    }
    let mut out = Vec::new();
    walk(forest, &mut Vec::new(), &mut out);
    out
}
