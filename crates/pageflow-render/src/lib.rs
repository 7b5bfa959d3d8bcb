//! Measurement-driven pagination for `pageflow` documents.
//!
//! A [`Repaginator`] partitions a document at manual breaks and fills pages
//! with the [`HeightSplitter`], asking an injected [`LayoutMeasurer`] for the
//! height of every candidate fragment. [`PaginationSession`] wraps a pass
//! with edit scheduling, page commit and caret preservation.

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod cursor;
mod render_engine;
mod render_ir;
mod render_layout;
mod scheduler;
mod session;
mod surface;

pub use cursor::{CaretPlacement, CursorPosition, CursorTracker, RunAnchor};
pub use render_engine::{PaginationDiagnostic, Repaginator, RepaginatorOptions};
pub use render_ir::{flow_document, page_snippets, FragmentKey, Page, SplitDecision};
pub use render_layout::{
    ForcedPlacement, HeightSplitter, HeuristicMeasurer, LayoutConfig, LayoutMeasurer,
    MeasureMetrics, SplitOutcome, SplitStats,
};
pub use scheduler::{
    MutationKind, OverflowProbe, PassGuard, RepaginationScheduler, ScheduleDecision,
    SchedulerConfig, SkipReason, Suppression,
};
pub use session::{PaginationSession, PassOutcome};
pub use surface::PageSurface;
