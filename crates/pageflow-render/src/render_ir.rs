use pageflow::{forest_text, is_block_tag, rejoin_continuations, to_markup, DocumentNode};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// One laid-out page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based id, regenerated on every pass.
    pub id: u32,
    /// Page content forest.
    pub content: Vec<DocumentNode>,
}

impl Page {
    /// Create a page.
    pub fn new(id: u32, content: Vec<DocumentNode>) -> Self {
        Self { id, content }
    }

    /// Empty placeholder page.
    pub fn empty(id: u32) -> Self {
        Self::new(id, Vec::with_capacity(0))
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Verbatim page text.
    pub fn text_content(&self) -> String {
        forest_text(&self.content)
    }

    /// Page content serialized as markup.
    pub fn to_markup(&self) -> String {
        to_markup(&self.content)
    }

    /// Whitespace-collapsed preview of the page text, ellipsized past `max_chars`.
    pub fn snippet(&self, max_chars: usize) -> String {
        let mut plain = String::new();
        for node in &self.content {
            push_plain_text(node, &mut plain);
        }
        let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= max_chars {
            return collapsed;
        }
        let mut out: String = collapsed.chars().take(max_chars).collect();
        out.truncate(out.trim_end().len());
        out.push('\u{2026}');
        out
    }
}

fn push_plain_text(node: &DocumentNode, out: &mut String) {
    match node {
        DocumentNode::Text(text) => out.push_str(&text.text),
        DocumentNode::Element(el) => {
            let block = is_block_tag(&el.tag);
            if block {
                out.push(' ');
            }
            for child in &el.children {
                push_plain_text(child, out);
            }
            if block {
                out.push(' ');
            }
        }
    }
}

/// Plain-text previews for a page list.
pub fn page_snippets(pages: &[Page], max_chars: usize) -> Vec<String> {
    pages.iter().map(|page| page.snippet(max_chars)).collect()
}

/// Flowing document rebuilt from page contents, with continuation fragments
/// folded back into the blocks they were split from.
pub fn flow_document(pages: &[Page]) -> Vec<DocumentNode> {
    rejoin_continuations(
        pages
            .iter()
            .flat_map(|page| page.content.iter().cloned())
            .collect(),
    )
}

/// Per-node outcome of a height split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitDecision {
    /// Every sibling fit.
    FitsWhole,
    /// Overflowing block divided between children; `head_count` children kept.
    SplitAsBlock(usize),
    /// Overflowing block divided after word `word_index`.
    SplitAsWords(usize),
    /// Overflowing node moved to the next page untouched.
    DeferWhole,
    /// Overflow escape: placed although it does not fit.
    ForceWhole,
}

/// Deterministic fingerprint of a fragment's full structure, used as a cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey(pub [u8; 32]);

// FNV-1a over four independently seeded lanes.
struct FnvLanes([u64; 4]);

impl Hasher for FnvLanes {
    fn write(&mut self, bytes: &[u8]) {
        for lane in &mut self.0 {
            for b in bytes {
                *lane ^= *b as u64;
                *lane = lane.wrapping_mul(0x100000001b3);
            }
        }
    }

    fn finish(&self) -> u64 {
        self.0[0]
    }
}

impl FragmentKey {
    /// Fingerprint of every tag, marker, attribute, text and run in `fragment`.
    pub fn for_fragment(fragment: &[DocumentNode]) -> Self {
        let mut lanes = FnvLanes([
            0xcbf29ce484222325,
            0x9e3779b97f4a7c15,
            0xd6e8feb86659fd93,
            0xa0761d6478bd642f,
        ]);
        fragment.hash(&mut lanes);
        let mut out = [0u8; 32];
        for (chunk, lane) in out.chunks_exact_mut(8).zip(lanes.0) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
        Self(out)
    }
}
