use pageflow::{
    classify, has_nested_sections, has_unsplittable_descendant, is_blank_forest, is_block_tag,
    is_heading, split_at_word, split_floor, to_markup, BlockClass, DocumentNode, ElementNode,
    COLUMN_CONTAINER_CLASS, SECTION_CLASS,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::render_ir::{FragmentKey, SplitDecision};

/// Rendering parameters handed to a [`LayoutMeasurer`].
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureMetrics {
    /// Content box width.
    pub width_px: f32,
    /// Font family stack, as the display surface would receive it.
    pub font_family: String,
    /// Base font size.
    pub font_size_px: f32,
    /// Line-height multiplier.
    pub line_height: f32,
}

/// Layout measurement hook: renders a candidate fragment and reports its height.
///
/// Implementations must follow the same wrapping, margin and list rules as
/// the final display surface, or the configured safety margin has to absorb
/// the difference.
pub trait LayoutMeasurer: Send + Sync {
    /// Rendered height in pixels of `fragment` laid out as a page body.
    fn measure_fragment_px(&self, fragment: &[DocumentNode], metrics: &MeasureMetrics) -> f32;
}

/// Page geometry and typography used for pagination.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Physical page width.
    pub page_width_px: f32,
    /// Physical page height.
    pub page_height_px: f32,
    /// Left margin.
    pub margin_left_px: f32,
    /// Right margin.
    pub margin_right_px: f32,
    /// Top margin.
    pub margin_top_px: f32,
    /// Bottom margin.
    pub margin_bottom_px: f32,
    /// Body font family.
    pub font_family: String,
    /// Body font size.
    pub font_size_px: f32,
    /// Line-height multiplier.
    pub line_height: f32,
    /// Subtracted from the content height to absorb measurement rounding.
    pub safety_margin_px: f32,
}

impl LayoutConfig {
    /// Convenience for a page size with default margins and typography.
    pub fn for_page(width: f32, height: f32) -> Self {
        Self {
            page_width_px: width,
            page_height_px: height,
            ..Self::default()
        }
    }

    pub fn content_width_px(&self) -> f32 {
        (self.page_width_px - self.margin_left_px - self.margin_right_px).max(1.0)
    }

    pub fn content_height_px(&self) -> f32 {
        (self.page_height_px - self.margin_top_px - self.margin_bottom_px).max(1.0)
    }

    /// Height budget handed to the splitter.
    pub fn page_budget_px(&self) -> f32 {
        (self.content_height_px() - self.safety_margin_px).max(1.0)
    }

    pub fn measure_metrics(&self) -> MeasureMetrics {
        MeasureMetrics {
            width_px: self.content_width_px(),
            font_family: self.font_family.clone(),
            font_size_px: self.font_size_px,
            line_height: self.line_height,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        // A4 at 96 dpi with one-inch margins.
        Self {
            page_width_px: 794.0,
            page_height_px: 1123.0,
            margin_left_px: 96.0,
            margin_right_px: 96.0,
            margin_top_px: 96.0,
            margin_bottom_px: 96.0,
            font_family: "serif".to_string(),
            font_size_px: 16.0,
            line_height: 1.5,
            safety_margin_px: 4.0,
        }
    }
}

/// Built-in measurer approximating browser block layout with greedy word wrap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeuristicMeasurer {
    /// Gap after paragraph and list item blocks.
    pub paragraph_gap_px: f32,
    /// Gap after heading blocks.
    pub heading_gap_px: f32,
    /// First-line indent for paragraphs that are not continuations.
    pub first_line_indent_px: f32,
    /// Left indent for list bodies.
    pub list_indent_px: f32,
}

impl Default for HeuristicMeasurer {
    fn default() -> Self {
        Self {
            paragraph_gap_px: 8.0,
            heading_gap_px: 10.0,
            first_line_indent_px: 18.0,
            list_indent_px: 12.0,
        }
    }
}

impl LayoutMeasurer for HeuristicMeasurer {
    fn measure_fragment_px(&self, fragment: &[DocumentNode], metrics: &MeasureMetrics) -> f32 {
        self.measure_flow(fragment, metrics.width_px, metrics)
    }
}

impl HeuristicMeasurer {
    fn measure_flow(&self, nodes: &[DocumentNode], width: f32, metrics: &MeasureMetrics) -> f32 {
        let mut height = 0.0f32;
        let mut inline_text = String::new();
        for node in nodes {
            match node {
                DocumentNode::Element(el) if is_block_tag(&el.tag) => {
                    height += self.inline_run_height(&inline_text, width, metrics);
                    inline_text.clear();
                    height += self.measure_block(el, width, metrics);
                }
                other => inline_text.push_str(&other.text_content()),
            }
        }
        height + self.inline_run_height(&inline_text, width, metrics)
    }

    fn inline_run_height(&self, text: &str, width: f32, metrics: &MeasureMetrics) -> f32 {
        let lines = wrap_line_count(text, width, metrics.font_size_px, 0.0);
        lines as f32 * metrics.font_size_px * metrics.line_height
    }

    fn measure_block(&self, el: &ElementNode, width: f32, metrics: &MeasureMetrics) -> f32 {
        if el.has_class(COLUMN_CONTAINER_CLASS) {
            let columns = el.children.iter().filter(|c| !c.is_blank()).count().max(1);
            let column_width = width / columns as f32;
            return el
                .children
                .iter()
                .map(|col| self.measure_flow(std::slice::from_ref(col), column_width, metrics))
                .fold(0.0f32, f32::max);
        }
        let heading_level = el.heading_level();
        let size_px = metrics.font_size_px * heading_scale(heading_level);
        let gap = match (heading_level, el.tag.as_str()) {
            (Some(_), _) => self.heading_gap_px,
            (None, "p" | "li" | "blockquote" | "pre") => self.paragraph_gap_px,
            _ => 0.0,
        };
        let has_block_children = el
            .children
            .iter()
            .any(|c| c.as_element().is_some_and(|e| is_block_tag(&e.tag)));
        if has_block_children {
            let inner_width = if matches!(el.tag.as_str(), "ul" | "ol") {
                (width - self.list_indent_px).max(1.0)
            } else {
                width
            };
            return self.measure_flow(&el.children, inner_width, metrics) + gap;
        }
        let indent = if el.tag == "p" && !el.is_continuation() {
            self.first_line_indent_px
        } else {
            0.0
        };
        let text = DocumentNode::Element(el.clone()).text_content();
        let lines = wrap_line_count(&text, width, size_px, indent);
        lines as f32 * size_px * metrics.line_height + gap
    }
}

fn heading_scale(level: Option<u8>) -> f32 {
    match level {
        Some(1) => 2.0,
        Some(2) => 1.5,
        Some(3) => 1.25,
        Some(4) => 1.1,
        Some(6) => 0.9,
        _ => 1.0,
    }
}

fn wrap_line_count(text: &str, width: f32, size_px: f32, first_indent: f32) -> usize {
    let space = proportional_glyph_em_width(' ') * size_px;
    let mut lines = 0usize;
    let mut line_w = 0.0f32;
    for word in text.split_whitespace() {
        let word_w: f32 = word.chars().map(proportional_glyph_em_width).sum::<f32>() * size_px;
        if lines == 0 {
            lines = 1;
            line_w = first_indent + word_w;
        } else if line_w + space + word_w > width {
            lines += 1;
            line_w = word_w;
        } else {
            line_w += space + word_w;
        }
    }
    lines
}

fn proportional_glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' => 0.32,
        '\t' => 1.28,
        '\u{00A0}' => 0.32,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' => 0.23,
        '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' => 0.34,
        '(' | ')' | '[' | ']' | '{' | '}' => 0.30,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' => 0.74,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_ascii_uppercase() => 0.64,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_whitespace() => 0.32,
        c if c.is_ascii_punctuation() => 0.42,
        _ => 0.56,
    }
}

/// Result of one height split.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitOutcome {
    /// Content placed on the current page.
    pub fitting: Vec<DocumentNode>,
    /// Content carried to the next page.
    pub remaining: Vec<DocumentNode>,
    /// What happened at the overflow point.
    pub decision: SplitDecision,
}

impl SplitOutcome {
    pub fn fitting_markup(&self) -> String {
        to_markup(&self.fitting)
    }

    pub fn remaining_markup(&self) -> String {
        to_markup(&self.remaining)
    }
}

/// Why [`HeightSplitter::force_first`] had to place content that overflows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForcedPlacement {
    /// An unsplittable block taller than an empty page.
    Unsplittable,
    /// A section that does not fit even at its minimum child floor.
    SectionFloor,
    /// A minimal fragment (first word or floor children) of other content.
    Fragment,
}

/// Measurement counters for one splitter lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitStats {
    pub measure_calls: usize,
    pub cache_hits: usize,
}

// Enclosing containers of the sequence being split, outermost first, each
// with the siblings already committed before it at its level.
#[derive(Clone, Debug, Default)]
struct Scope {
    levels: Vec<ScopeLevel>,
}

#[derive(Clone, Debug)]
struct ScopeLevel {
    before: Vec<DocumentNode>,
    shell: ElementNode,
}

impl Scope {
    fn enter(&self, before: &[DocumentNode], container: &ElementNode) -> Scope {
        let mut levels = self.levels.clone();
        levels.push(ScopeLevel {
            before: before.to_vec(),
            shell: container.shell(),
        });
        Scope { levels }
    }

    // Full page fragment with `nodes` placed at the innermost level.
    fn wrap(&self, nodes: Vec<DocumentNode>) -> Vec<DocumentNode> {
        let mut forest = nodes;
        for level in self.levels.iter().rev() {
            let mut outer = Vec::with_capacity(level.before.len() + 1);
            outer.extend(level.before.iter().cloned());
            outer.push(level.shell.with_children(forest).into());
            forest = outer;
        }
        forest
    }
}

/// Height-driven splitter for one pagination pass.
///
/// Measurements are memoized by fragment fingerprint for the lifetime of the
/// splitter, so one splitter must not outlive a pass.
pub struct HeightSplitter<'a> {
    measurer: &'a dyn LayoutMeasurer,
    metrics: &'a MeasureMetrics,
    cache: RefCell<HashMap<FragmentKey, f32>>,
    stats: Cell<SplitStats>,
}

impl core::fmt::Debug for HeightSplitter<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeightSplitter")
            .field("metrics", self.metrics)
            .field("stats", &self.stats.get())
            .finish_non_exhaustive()
    }
}

impl<'a> HeightSplitter<'a> {
    pub fn new(measurer: &'a dyn LayoutMeasurer, metrics: &'a MeasureMetrics) -> Self {
        Self {
            measurer,
            metrics,
            cache: RefCell::new(HashMap::new()),
            stats: Cell::new(SplitStats::default()),
        }
    }

    pub fn stats(&self) -> SplitStats {
        self.stats.get()
    }

    /// Measured height of a fragment, served from the pass cache when possible.
    pub fn measure(&self, fragment: &[DocumentNode]) -> f32 {
        let key = FragmentKey::for_fragment(fragment);
        let mut stats = self.stats.get();
        if let Some(height) = self.cache.borrow().get(&key).copied() {
            stats.cache_hits += 1;
            self.stats.set(stats);
            return height;
        }
        stats.measure_calls += 1;
        self.stats.set(stats);
        let height = self.measurer.measure_fragment_px(fragment, self.metrics);
        self.cache.borrow_mut().insert(key, height);
        height
    }

    /// Split `siblings` into what fits within `max_height` and what remains.
    ///
    /// Walks the siblings in order and stops at the first node that
    /// overflows. Nothing after the overflow point is examined.
    pub fn split_at_height(&self, siblings: &[DocumentNode], max_height: f32) -> SplitOutcome {
        self.split_sequence(&Scope::default(), siblings, max_height)
    }

    /// Overflow escape for a page that would otherwise stay empty: place the
    /// smallest viable fragment of the first node.
    pub fn force_first(&self, siblings: &[DocumentNode]) -> (SplitOutcome, ForcedPlacement) {
        let Some((first, rest)) = siblings.split_first() else {
            let outcome = SplitOutcome {
                fitting: Vec::new(),
                remaining: Vec::new(),
                decision: SplitDecision::FitsWhole,
            };
            return (outcome, ForcedPlacement::Fragment);
        };
        let (head, tail, kind) = force_node(first);
        let mut remaining = Vec::with_capacity(rest.len() + 1);
        remaining.extend(tail);
        remaining.extend(rest.iter().cloned());
        let outcome = SplitOutcome {
            fitting: vec![head],
            remaining,
            decision: SplitDecision::ForceWhole,
        };
        (outcome, kind)
    }

    fn fits(&self, scope: &Scope, nodes: &[DocumentNode], max_height: f32) -> bool {
        let fragment = scope.wrap(nodes.to_vec());
        self.measure(&fragment) <= max_height
    }

    fn fits_with(
        &self,
        scope: &Scope,
        before: &[DocumentNode],
        candidate: DocumentNode,
        max_height: f32,
    ) -> bool {
        let mut nodes = Vec::with_capacity(before.len() + 1);
        nodes.extend(before.iter().cloned());
        nodes.push(candidate);
        self.fits(scope, &nodes, max_height)
    }

    fn split_sequence(
        &self,
        scope: &Scope,
        siblings: &[DocumentNode],
        max_height: f32,
    ) -> SplitOutcome {
        let mut fitting: Vec<DocumentNode> = Vec::with_capacity(siblings.len());
        for (idx, node) in siblings.iter().enumerate() {
            fitting.push(node.clone());
            if self.fits(scope, &fitting, max_height) {
                continue;
            }
            fitting.pop();
            let rest = &siblings[idx + 1..];
            let mut remaining = Vec::with_capacity(rest.len() + 2);

            // A heading may not end a page: trailing headings move down
            // together with the node they introduce, which is deferred whole
            // to keep order.
            let trailing = fitting.iter().rev().take_while(|n| is_heading(n)).count();
            if trailing > 0 && trailing < fitting.len() {
                let keep = fitting.len() - trailing;
                remaining.extend(fitting.drain(keep..));
                remaining.push(node.clone());
                remaining.extend(rest.iter().cloned());
                return SplitOutcome {
                    fitting,
                    remaining,
                    decision: SplitDecision::DeferWhole,
                };
            }

            let (head, tail, decision) = self.split_overflow(scope, &fitting, node, max_height);
            fitting.extend(head);
            remaining.extend(tail);
            remaining.extend(rest.iter().cloned());
            return SplitOutcome {
                fitting,
                remaining,
                decision,
            };
        }
        SplitOutcome {
            fitting,
            remaining: Vec::new(),
            decision: SplitDecision::FitsWhole,
        }
    }

    fn split_overflow(
        &self,
        scope: &Scope,
        before: &[DocumentNode],
        node: &DocumentNode,
        max_height: f32,
    ) -> (Option<DocumentNode>, Option<DocumentNode>, SplitDecision) {
        match (classify(node), node) {
            (BlockClass::Unsplittable, _) => defer(node),
            (BlockClass::SectionWithHeading, DocumentNode::Element(el)) => {
                self.split_section(scope, before, el, max_height)
            }
            (BlockClass::Plain, DocumentNode::Element(el)) if is_section_continuation(el) => {
                self.split_section(scope, before, el, max_height)
            }
            (BlockClass::Plain, DocumentNode::Element(el)) if has_block_structure(node) => {
                self.split_container(scope, before, el, max_height)
            }
            _ => self.split_words(scope, before, node, max_height),
        }
    }

    fn split_words(
        &self,
        scope: &Scope,
        before: &[DocumentNode],
        node: &DocumentNode,
        max_height: f32,
    ) -> (Option<DocumentNode>, Option<DocumentNode>, SplitDecision) {
        let words = node.word_count();
        if words <= 1 {
            return defer(node);
        }
        let mut lo = 1usize;
        let mut hi = words - 1;
        let mut best = 0usize;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let (head, _) = split_at_word(node, mid);
            if self.fits_with(scope, before, head, max_height) {
                best = mid;
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }
        if best == 0 {
            return defer(node);
        }
        let (head, tail) = split_at_word(node, best);
        (Some(head), tail, SplitDecision::SplitAsWords(best))
    }

    fn split_container(
        &self,
        scope: &Scope,
        before: &[DocumentNode],
        el: &ElementNode,
        max_height: f32,
    ) -> (Option<DocumentNode>, Option<DocumentNode>, SplitDecision) {
        let inner = scope.enter(before, el);
        let split = self.split_sequence(&inner, &el.children, max_height);
        if is_blank_forest(&split.fitting) {
            return defer_element(el);
        }
        if split.remaining.is_empty() {
            return (Some(el.clone().into()), None, SplitDecision::FitsWhole);
        }
        let head_count = split.fitting.len();
        (
            Some(el.with_children(split.fitting).into()),
            Some(el.continuation_with(split.remaining).into()),
            SplitDecision::SplitAsBlock(head_count),
        )
    }

    fn split_section(
        &self,
        scope: &Scope,
        before: &[DocumentNode],
        el: &ElementNode,
        max_height: f32,
    ) -> (Option<DocumentNode>, Option<DocumentNode>, SplitDecision) {
        let children = &el.children;
        let floor = split_floor(el);

        let mut kept = 0usize;
        for count in 1..=children.len() {
            let candidate = el.with_children(children[..count].to_vec());
            if self.fits_with(scope, before, candidate.into(), max_height) {
                kept = count;
            } else {
                break;
            }
        }
        if kept >= children.len() {
            return (Some(el.clone().into()), None, SplitDecision::FitsWhole);
        }

        let partial = children
            .get(kept)
            .filter(|field| classify(field) != BlockClass::Unsplittable)
            .and_then(DocumentNode::as_element);
        if let Some(field) = partial {
            let field_floor = split_floor(field).max(1);
            let mut take = field.children.len().saturating_sub(1);
            while take >= field_floor {
                let mut head_children = Vec::with_capacity(kept + 1);
                head_children.extend(children[..kept].iter().cloned());
                head_children.push(field.with_children(field.children[..take].to_vec()).into());
                let candidate = el.with_children(head_children);
                if self.fits_with(scope, before, candidate.clone().into(), max_height) {
                    if kept + 1 < floor {
                        break;
                    }
                    let field_tail = field.continuation_with(field.children[take..].to_vec());
                    let mut tail_children: Vec<DocumentNode> =
                        Vec::with_capacity(children.len() - kept);
                    tail_children.push(field_tail.into());
                    tail_children.extend(children[kept + 1..].iter().cloned());
                    return (
                        Some(candidate.into()),
                        Some(el.continuation_with(tail_children).into()),
                        SplitDecision::SplitAsBlock(kept + 1),
                    );
                }
                take -= 1;
            }
        }

        if kept > 0 && kept >= floor {
            return (
                Some(el.with_children(children[..kept].to_vec()).into()),
                Some(el.continuation_with(children[kept..].to_vec()).into()),
                SplitDecision::SplitAsBlock(kept),
            );
        }
        log::debug!(
            "section <{}> keeps {} of {} children, below floor {}; deferring",
            el.tag,
            kept,
            children.len(),
            floor
        );
        defer_element(el)
    }
}

fn defer(node: &DocumentNode) -> (Option<DocumentNode>, Option<DocumentNode>, SplitDecision) {
    (None, Some(node.clone()), SplitDecision::DeferWhole)
}

fn defer_element(el: &ElementNode) -> (Option<DocumentNode>, Option<DocumentNode>, SplitDecision) {
    (None, Some(el.clone().into()), SplitDecision::DeferWhole)
}

fn is_section_continuation(el: &ElementNode) -> bool {
    el.has_class(SECTION_CLASS) && el.is_continuation()
}

// Blocks that must be divided between children rather than word by word.
fn has_block_structure(node: &DocumentNode) -> bool {
    has_nested_sections(node) || has_unsplittable_descendant(node)
}

fn force_node(node: &DocumentNode) -> (DocumentNode, Option<DocumentNode>, ForcedPlacement) {
    let el = match (classify(node), node) {
        (BlockClass::Unsplittable, _) => {
            return (node.clone(), None, ForcedPlacement::Unsplittable);
        }
        (_, DocumentNode::Element(el)) => el,
        (_, DocumentNode::Text(_)) => return force_words(node),
    };

    let section = classify(node) == BlockClass::SectionWithHeading || is_section_continuation(el);
    if section {
        let floor = split_floor(el);
        if el.children.len() > floor {
            return (
                el.with_children(el.children[..floor].to_vec()).into(),
                Some(el.continuation_with(el.children[floor..].to_vec()).into()),
                ForcedPlacement::SectionFloor,
            );
        }
        return (node.clone(), None, ForcedPlacement::SectionFloor);
    }

    if has_block_structure(node) {
        if let Some((first, rest)) = el.children.split_first() {
            let (head, tail, kind) = force_node(first);
            let mut tail_children = Vec::with_capacity(rest.len() + 1);
            tail_children.extend(tail);
            tail_children.extend(rest.iter().cloned());
            let tail: Option<DocumentNode> =
                (!tail_children.is_empty()).then(|| el.continuation_with(tail_children).into());
            return (el.with_children(vec![head]).into(), tail, kind);
        }
    }
    force_words(node)
}

fn force_words(node: &DocumentNode) -> (DocumentNode, Option<DocumentNode>, ForcedPlacement) {
    if node.word_count() > 1 {
        let (head, tail) = split_at_word(node, 1);
        return (head, tail, ForcedPlacement::Fragment);
    }
    (node.clone(), None, ForcedPlacement::Fragment)
}
