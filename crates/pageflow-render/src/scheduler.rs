//! Decides when a repagination pass should run in response to edits.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Kind of document mutation reported by the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Whole document content replaced programmatically.
    ContentReplaced,
    /// Bold, alignment, list toggles and other formatting commands.
    FormattingCommand,
    Paste,
    /// A manual page-break marker was deleted.
    PageBreakRemoved,
    /// Keystroke-level text input.
    Typing,
}

/// Why a mutation did not schedule a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The edited page neither overflows nor has room to pull content back.
    NoOverflow,
    /// A suppression window is active.
    Suppressed,
}

/// Scheduler response to a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleDecision {
    RunNow,
    /// A pass is due at `due` unless another mutation replaces the deadline.
    Debounced { due: Instant },
    Skipped(SkipReason),
}

/// Rendered state of the page being typed on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverflowProbe {
    pub rendered_height_px: f32,
    pub budget_px: f32,
    /// Whether content exists on a later page that could flow back.
    pub has_following_page: bool,
}

/// Scheduler tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Quiet period after typing before a pass runs.
    pub debounce: Duration,
    /// Height above the budget tolerated before typing schedules a pass.
    pub overflow_slack_px: f32,
    /// Free space below the budget that triggers pulling content back.
    pub underfill_slack_px: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            overflow_slack_px: 2.0,
            underfill_slack_px: 48.0,
        }
    }
}

/// Window during which keystroke and formatting passes are skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Suppression {
    pub until: Instant,
}

impl Suppression {
    pub fn is_active(&self, now: Instant) -> bool {
        now < self.until
    }
}

/// Held for the duration of a pass; dropping it allows the next one.
#[derive(Debug)]
pub struct PassGuard {
    in_flight: Rc<Cell<bool>>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.in_flight.set(false);
    }
}

/// Debounce, suppression and reentrancy control for repagination.
#[derive(Debug, Default)]
pub struct RepaginationScheduler {
    config: SchedulerConfig,
    pending: Option<Instant>,
    suppression: Option<Suppression>,
    in_flight: Rc<Cell<bool>>,
}

impl RepaginationScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Classify a mutation.
    ///
    /// Typing without a probe is debounced, since overflow cannot be ruled out.
    pub fn on_mutation(
        &mut self,
        kind: MutationKind,
        now: Instant,
        probe: Option<OverflowProbe>,
    ) -> ScheduleDecision {
        let decision = self.decide(kind, now, probe);
        log::trace!("mutation {:?} -> {:?}", kind, decision);
        decision
    }

    fn decide(
        &mut self,
        kind: MutationKind,
        now: Instant,
        probe: Option<OverflowProbe>,
    ) -> ScheduleDecision {
        let suppressed = self.is_suppressed(now);
        match kind {
            MutationKind::FormattingCommand if suppressed => {
                ScheduleDecision::Skipped(SkipReason::Suppressed)
            }
            MutationKind::ContentReplaced
            | MutationKind::FormattingCommand
            | MutationKind::Paste
            | MutationKind::PageBreakRemoved => {
                self.pending = None;
                ScheduleDecision::RunNow
            }
            MutationKind::Typing if suppressed => ScheduleDecision::Skipped(SkipReason::Suppressed),
            MutationKind::Typing => {
                if probe.is_some_and(|probe| !self.probe_fires(&probe)) {
                    return ScheduleDecision::Skipped(SkipReason::NoOverflow);
                }
                let due = now + self.config.debounce;
                self.pending = Some(due);
                ScheduleDecision::Debounced { due }
            }
        }
    }

    fn probe_fires(&self, probe: &OverflowProbe) -> bool {
        let overflow = probe.rendered_height_px > probe.budget_px + self.config.overflow_slack_px;
        let underfill = probe.has_following_page
            && probe.rendered_height_px < probe.budget_px - self.config.underfill_slack_px;
        overflow || underfill
    }

    /// Report and clear a debounce deadline that has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(due) if due <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending_due(&self) -> Option<Instant> {
        self.pending
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Skip keystroke and formatting passes until `until`.
    pub fn suppress_until(&mut self, until: Instant) {
        self.suppression = Some(Suppression { until });
    }

    pub fn clear_suppression(&mut self) {
        self.suppression = None;
    }

    /// Whether a suppression window covers `now`; expired windows are dropped.
    pub fn is_suppressed(&mut self, now: Instant) -> bool {
        match self.suppression {
            Some(window) if window.is_active(now) => true,
            Some(_) => {
                self.suppression = None;
                false
            }
            None => false,
        }
    }

    /// Claim the pass slot. Returns `None` while another pass holds it; the
    /// request is dropped rather than queued.
    pub fn try_begin_pass(&self) -> Option<PassGuard> {
        if self.in_flight.get() {
            log::debug!("repagination already in progress; dropping request");
            return None;
        }
        self.in_flight.set(true);
        Some(PassGuard {
            in_flight: Rc::clone(&self.in_flight),
        })
    }

    pub fn is_pass_in_flight(&self) -> bool {
        self.in_flight.get()
    }
}
