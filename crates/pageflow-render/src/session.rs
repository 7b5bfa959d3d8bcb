use pageflow::DocumentNode;
use std::time::Instant;

use crate::cursor::{CaretPlacement, CursorTracker};
use crate::render_engine::Repaginator;
use crate::scheduler::{
    MutationKind, OverflowProbe, RepaginationScheduler, ScheduleDecision, SchedulerConfig,
};
use crate::surface::PageSurface;

/// Result of one committed pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOutcome {
    pub page_count: usize,
    /// Caret mapped onto the new pages, when one was supplied.
    pub caret: Option<CaretPlacement>,
}

/// Editor-facing pagination loop: scheduling, pass execution, commit and
/// caret preservation.
#[derive(Debug)]
pub struct PaginationSession {
    repaginator: Repaginator,
    surface: PageSurface,
    cursor: CursorTracker,
    scheduler: RepaginationScheduler,
}

impl PaginationSession {
    pub fn new(repaginator: Repaginator, scheduler: SchedulerConfig) -> Self {
        let surface = PageSurface::new(repaginator.options().snippet_chars);
        Self {
            repaginator,
            surface,
            cursor: CursorTracker::new(),
            scheduler: RepaginationScheduler::new(scheduler),
        }
    }

    pub fn repaginator(&self) -> &Repaginator {
        &self.repaginator
    }

    pub fn surface(&self) -> &PageSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut PageSurface {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &RepaginationScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut RepaginationScheduler {
        &mut self.scheduler
    }

    /// Probe for keystroke scheduling against the edited content of one page.
    pub fn probe_page(&self, page_index: usize, edited: &[DocumentNode]) -> OverflowProbe {
        OverflowProbe {
            rendered_height_px: self.repaginator.measure(edited),
            budget_px: self.repaginator.budget_px(),
            has_following_page: page_index + 1 < self.surface.page_count(),
        }
    }

    /// Report a mutation. A `RunNow` decision is the caller's cue to call
    /// [`PaginationSession::repaginate_now`].
    pub fn notify_mutation(
        &mut self,
        kind: MutationKind,
        now: Instant,
        probe: Option<OverflowProbe>,
    ) -> ScheduleDecision {
        self.scheduler.on_mutation(kind, now, probe)
    }

    /// Run a pass if a debounce deadline has elapsed.
    pub fn tick(
        &mut self,
        now: Instant,
        document: &[DocumentNode],
        caret: Option<&CaretPlacement>,
    ) -> Option<PassOutcome> {
        if !self.scheduler.poll(now) {
            return None;
        }
        self.repaginate_now(document, caret)
    }

    /// Repaginate `document`, commit the pages and map the caret onto them.
    ///
    /// Returns `None` when a pass is already running.
    pub fn repaginate_now(
        &mut self,
        document: &[DocumentNode],
        caret: Option<&CaretPlacement>,
    ) -> Option<PassOutcome> {
        let _guard = self.scheduler.try_begin_pass()?;
        self.scheduler.cancel_pending();
        self.cursor.capture(self.surface.pages(), caret);
        let pages = self.repaginator.repaginate(document);
        self.surface.commit(pages);
        let caret = self.cursor.restore(self.surface.pages());
        if let Some(placement) = &caret {
            self.surface.go_to_page(placement.page_index);
        }
        Some(PassOutcome {
            page_count: self.surface.page_count(),
            caret,
        })
    }
}
