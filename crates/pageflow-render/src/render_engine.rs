use pageflow::{is_blank_forest, partition, DocumentNode};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::render_ir::{Page, SplitDecision};
use crate::render_layout::{
    ForcedPlacement, HeightSplitter, HeuristicMeasurer, LayoutConfig, LayoutMeasurer,
    SplitOutcome,
};

/// Runtime diagnostics from a pagination pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PaginationDiagnostic {
    /// An unsplittable block is taller than an empty page and was placed anyway.
    UnsplittableOverflow {
        page_index: usize,
        height_px: f32,
        budget_px: f32,
    },
    /// A section could not keep its minimum children and was forced at its floor.
    SectionFloorOverflow {
        page_index: usize,
        height_px: f32,
        budget_px: f32,
    },
    /// A minimal fragment was placed on an otherwise empty page.
    ForcedPlacement {
        page_index: usize,
        height_px: f32,
        budget_px: f32,
    },
    /// Output was truncated at the page cap.
    PageCapReached { limit: usize },
    ReflowTimeMs(u32),
}

type DiagnosticCallback = Arc<Mutex<Box<dyn FnMut(PaginationDiagnostic) + Send + 'static>>>;
type DiagnosticSink = Option<DiagnosticCallback>;

/// Repaginator options.
#[derive(Clone, Debug, PartialEq)]
pub struct RepaginatorOptions {
    /// Page geometry and typography.
    pub layout: LayoutConfig,
    /// Hard cap on emitted pages.
    pub max_pages: usize,
    /// Preview length used by [`Repaginator::snippets`].
    pub snippet_chars: usize,
}

impl Default for RepaginatorOptions {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            max_pages: 200,
            snippet_chars: 150,
        }
    }
}

impl RepaginatorOptions {
    /// Build options for a page size.
    pub fn for_page(width: f32, height: f32) -> Self {
        Self {
            layout: LayoutConfig::for_page(width, height),
            ..Self::default()
        }
    }
}

/// Turns a flowing document into measured pages.
#[derive(Clone)]
pub struct Repaginator {
    opts: RepaginatorOptions,
    measurer: Arc<dyn LayoutMeasurer>,
    diagnostic_sink: DiagnosticSink,
}

impl fmt::Debug for Repaginator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repaginator")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl Default for Repaginator {
    fn default() -> Self {
        Self::new(RepaginatorOptions::default())
    }
}

impl Repaginator {
    /// Create a repaginator backed by [`HeuristicMeasurer`].
    pub fn new(opts: RepaginatorOptions) -> Self {
        Self {
            opts,
            measurer: Arc::new(HeuristicMeasurer::default()),
            diagnostic_sink: None,
        }
    }

    /// Replace the layout measurer.
    pub fn with_measurer(mut self, measurer: Arc<dyn LayoutMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn options(&self) -> &RepaginatorOptions {
        &self.opts
    }

    /// Register or replace the diagnostics sink.
    pub fn set_diagnostic_sink<F>(&mut self, sink: F)
    where
        F: FnMut(PaginationDiagnostic) + Send + 'static,
    {
        self.diagnostic_sink = Some(Arc::new(Mutex::new(Box::new(sink))));
    }

    fn emit_diagnostic(&self, diagnostic: PaginationDiagnostic) {
        let Some(sink) = &self.diagnostic_sink else {
            return;
        };
        if let Ok(mut sink) = sink.lock() {
            sink(diagnostic);
        }
    }

    /// Height budget used by [`Repaginator::repaginate`].
    pub fn budget_px(&self) -> f32 {
        self.opts.layout.page_budget_px()
    }

    /// Measure a fragment with the configured measurer and page metrics.
    pub fn measure(&self, fragment: &[DocumentNode]) -> f32 {
        self.measurer
            .measure_fragment_px(fragment, &self.opts.layout.measure_metrics())
    }

    /// Paginate with the configured page budget less the safety margin.
    pub fn repaginate(&self, document: &[DocumentNode]) -> Vec<Page> {
        self.repaginate_with_budget(document, self.budget_px())
    }

    /// Paginate against an explicit content height.
    ///
    /// Manual page breaks always start a new page; content between breaks is
    /// never merged onto a shared page. Always returns at least one page.
    pub fn repaginate_with_budget(&self, document: &[DocumentNode], budget_px: f32) -> Vec<Page> {
        let started = Instant::now();
        let max_pages = self.opts.max_pages.max(1);
        let metrics = self.opts.layout.measure_metrics();
        let splitter = HeightSplitter::new(self.measurer.as_ref(), &metrics);
        let mut contents: Vec<Vec<DocumentNode>> = Vec::new();
        let mut capped = false;

        'sections: for section in partition(document) {
            let mut remaining = section;
            while !remaining.is_empty() {
                if contents.len() >= max_pages {
                    capped = true;
                    break 'sections;
                }
                let mut outcome = splitter.split_at_height(&remaining, budget_px);
                if is_blank_forest(&outcome.fitting) && !outcome.remaining.is_empty() {
                    outcome = self.force_onto_page(&splitter, outcome, contents.len(), budget_px);
                }
                if outcome.fitting.is_empty() {
                    break;
                }
                let mut content = outcome.fitting;
                remaining = if is_blank_forest(&outcome.remaining) {
                    content.extend(outcome.remaining);
                    Vec::new()
                } else {
                    outcome.remaining
                };
                contents.push(content);
            }
        }

        if capped {
            log::warn!(
                "pagination stopped at the {} page cap; remaining content dropped",
                max_pages
            );
            self.emit_diagnostic(PaginationDiagnostic::PageCapReached { limit: max_pages });
        }

        let mut pages: Vec<Page> = contents
            .into_iter()
            .enumerate()
            .map(|(idx, content)| Page::new(idx as u32 + 1, content))
            .collect();
        if pages.is_empty() {
            pages.push(Page::empty(1));
        }

        let stats = splitter.stats();
        let elapsed = started.elapsed().as_millis().min(u32::MAX as u128) as u32;
        log::debug!(
            "repaginated into {} pages in {} ms ({} measurements, {} cache hits)",
            pages.len(),
            elapsed,
            stats.measure_calls,
            stats.cache_hits
        );
        self.emit_diagnostic(PaginationDiagnostic::ReflowTimeMs(elapsed));
        pages
    }

    /// Page previews at the configured snippet length.
    pub fn snippets(&self, pages: &[Page]) -> Vec<String> {
        crate::render_ir::page_snippets(pages, self.opts.snippet_chars)
    }

    // Force content onto a page whose fitting side holds nothing visible,
    // keeping any leading whitespace nodes in front of the forced fragment.
    fn force_onto_page(
        &self,
        splitter: &HeightSplitter<'_>,
        outcome: SplitOutcome,
        page_index: usize,
        budget_px: f32,
    ) -> SplitOutcome {
        let mut fitting = outcome.fitting;
        let mut rest = outcome.remaining;
        while !rest.is_empty() {
            let (forced, kind) = splitter.force_first(&rest);
            fitting.extend(forced.fitting);
            rest = forced.remaining;
            if !is_blank_forest(&fitting) {
                let height_px = splitter.measure(&fitting);
                self.report_forced(kind, page_index, height_px, budget_px);
                break;
            }
        }
        SplitOutcome {
            fitting,
            remaining: rest,
            decision: SplitDecision::ForceWhole,
        }
    }

    fn report_forced(
        &self,
        kind: ForcedPlacement,
        page_index: usize,
        height_px: f32,
        budget_px: f32,
    ) {
        let diagnostic = match kind {
            ForcedPlacement::Unsplittable => {
                log::warn!(
                    "unsplittable block ({:.1}px) exceeds page budget {:.1}px on page {}",
                    height_px,
                    budget_px,
                    page_index + 1
                );
                PaginationDiagnostic::UnsplittableOverflow {
                    page_index,
                    height_px,
                    budget_px,
                }
            }
            ForcedPlacement::SectionFloor => {
                log::warn!(
                    "section floor ({:.1}px) exceeds page budget {:.1}px on page {}",
                    height_px,
                    budget_px,
                    page_index + 1
                );
                PaginationDiagnostic::SectionFloorOverflow {
                    page_index,
                    height_px,
                    budget_px,
                }
            }
            ForcedPlacement::Fragment => {
                log::warn!(
                    "forced {:.1}px fragment onto page {} with budget {:.1}px",
                    height_px,
                    page_index + 1,
                    budget_px
                );
                PaginationDiagnostic::ForcedPlacement {
                    page_index,
                    height_px,
                    budget_px,
                }
            }
        };
        self.emit_diagnostic(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_layout::MeasureMetrics;
    use pageflow::{forest_text, ElementNode, COLUMN_CONTAINER_CLASS, PAGE_BREAK_CLASS};

    struct WordMeasurer;

    impl LayoutMeasurer for WordMeasurer {
        fn measure_fragment_px(&self, fragment: &[DocumentNode], _: &MeasureMetrics) -> f32 {
            fragment.iter().map(DocumentNode::word_count).sum::<usize>() as f32
        }
    }

    fn para(text: &str) -> DocumentNode {
        ElementNode::new("p").with_text(text).into()
    }

    fn page_break() -> DocumentNode {
        ElementNode::new("div").with_class(PAGE_BREAK_CLASS).into()
    }

    fn engine() -> Repaginator {
        Repaginator::default().with_measurer(Arc::new(WordMeasurer))
    }

    fn collecting(engine: &mut Repaginator) -> Arc<Mutex<Vec<PaginationDiagnostic>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.set_diagnostic_sink(move |d| sink.lock().unwrap().push(d));
        seen
    }

    #[test]
    fn empty_document_yields_one_empty_page() {
        let pages = engine().repaginate_with_budget(&[], 10.0);
        assert_eq!(pages, vec![Page::empty(1)]);
    }

    #[test]
    fn manual_breaks_never_share_a_page() {
        let doc = vec![para("a b"), page_break(), para("c d")];
        let pages = engine().repaginate_with_budget(&doc, 100.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].text_content(), "a b");
        assert_eq!(pages[1].text_content(), "c d");
        assert_eq!(pages.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn long_paragraph_flows_across_pages() {
        let text = (1..=25).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let pages = engine().repaginate_with_budget(&[para(&text)], 10.0);
        assert_eq!(pages.len(), 3);
        let joined: String = pages.iter().map(Page::text_content).collect();
        assert_eq!(joined, text);
        assert!(pages[1].content[0].has_class(pageflow::CONTINUATION_CLASS));
    }

    #[test]
    fn oversized_unsplittable_block_is_placed_and_reported() {
        let cols: DocumentNode = ElementNode::new("div")
            .with_class(COLUMN_CONTAINER_CLASS)
            .with_child(para("one two three four"))
            .into();
        let mut engine = engine();
        let seen = collecting(&mut engine);
        let pages = engine.repaginate_with_budget(&[para("x"), cols.clone()], 3.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].content, vec![cols]);
        let seen = seen.lock().unwrap();
        assert!(seen.contains(&PaginationDiagnostic::UnsplittableOverflow {
            page_index: 1,
            height_px: 4.0,
            budget_px: 3.0
        }));
    }

    #[test]
    fn single_oversized_word_is_forced() {
        let mut engine = engine();
        let seen = collecting(&mut engine);
        let pages = engine.repaginate_with_budget(&[para("word")], 0.5);
        assert_eq!(pages.len(), 1);
        assert_eq!(forest_text(&pages[0].content), "word");
        assert!(seen
            .lock()
            .unwrap()
            .iter()
            .any(|d| matches!(d, PaginationDiagnostic::ForcedPlacement { .. })));
    }

    #[test]
    fn leading_whitespace_is_forced_with_the_next_block() {
        let cols: DocumentNode = ElementNode::new("div")
            .with_class(COLUMN_CONTAINER_CLASS)
            .with_child(para("one two three four"))
            .into();
        let mut engine = engine();
        let seen = collecting(&mut engine);
        let doc = vec![DocumentNode::text("\n  "), cols.clone(), para("tail")];
        let pages = engine.repaginate_with_budget(&doc, 3.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].content, vec![DocumentNode::text("\n  "), cols]);
        assert_eq!(pages[1].content, vec![para("tail")]);
        assert!(seen.lock().unwrap().iter().any(|d| matches!(
            d,
            PaginationDiagnostic::UnsplittableOverflow { page_index: 0, .. }
        )));
    }

    #[test]
    fn whitespace_after_a_forced_block_stays_on_its_page() {
        let cols: DocumentNode = ElementNode::new("div")
            .with_class(COLUMN_CONTAINER_CLASS)
            .with_child(para("one two three four"))
            .into();
        let doc = vec![DocumentNode::text(" "), cols.clone(), DocumentNode::text("\n\n")];
        let pages = engine().repaginate_with_budget(&doc, 3.0);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content, doc);
        let joined: String = pages.iter().map(Page::text_content).collect();
        assert_eq!(joined, forest_text(&doc));
    }

    #[test]
    fn page_cap_truncates_and_reports() {
        let mut engine = Repaginator::new(RepaginatorOptions {
            max_pages: 2,
            ..RepaginatorOptions::default()
        })
        .with_measurer(Arc::new(WordMeasurer));
        let seen = collecting(&mut engine);
        let doc: Vec<DocumentNode> = (0..5).map(|_| para("a b c")).collect();
        let pages = engine.repaginate_with_budget(&doc, 3.0);
        assert_eq!(pages.len(), 2);
        let seen = seen.lock().unwrap();
        assert!(seen.contains(&PaginationDiagnostic::PageCapReached { limit: 2 }));
        assert!(matches!(seen.last(), Some(PaginationDiagnostic::ReflowTimeMs(_))));
    }

    #[test]
    fn repaginating_is_idempotent() {
        let doc = vec![
            para("alpha beta gamma"),
            para("delta epsilon"),
            page_break(),
            para("zeta eta theta iota"),
        ];
        let engine = engine();
        assert_eq!(
            engine.repaginate_with_budget(&doc, 4.0),
            engine.repaginate_with_budget(&doc, 4.0)
        );
    }

    #[test]
    fn snippets_use_configured_length() {
        let engine = Repaginator::new(RepaginatorOptions {
            snippet_chars: 4,
            ..RepaginatorOptions::default()
        });
        let pages = vec![Page::new(1, vec![para("hello world")])];
        assert_eq!(engine.snippets(&pages), vec!["hell\u{2026}".to_string()]);
    }
}
