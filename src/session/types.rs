//! Task session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceShape;

/// Reserved action that wipes the session back to "no task".
pub const ACTION_QUIT: &str = "quit";

/// Reserved action that asks the service for a fresh plan of the same task.
pub const ACTION_RESTART: &str = "restart";

/// The authoritative local view of the task in progress.
///
/// `steps` plus `current_index` are the source of truth for position;
/// `current_step` is a tracked cache that only diverges when the service
/// names a step the local plan does not contain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskSession {
    /// Opaque id issued by the service; empty means no active task.
    pub task_id: String,
    pub goal: String,
    /// Ordered plan; mutable only by wholesale replacement.
    pub steps: Vec<String>,
    /// Zero-based position; `== steps.len()` means the plan is exhausted.
    pub current_index: usize,
    pub current_step: String,
    /// Append-only; never reordered in storage.
    pub history: Vec<HistoryEntry>,
    /// Remedial suggestions from the last failed verification; cleared on
    /// every new transition.
    pub options: Vec<String>,
    /// Latest human-facing status line from the service.
    pub message: String,
}

impl TaskSession {
    pub fn is_active(&self) -> bool {
        !self.task_id.is_empty()
    }

    /// True once the plan is exhausted or the service signalled completion.
    pub fn is_complete(&self) -> bool {
        self.is_active() && self.current_step.is_empty() && self.current_index >= self.steps.len()
    }

    /// The step the local plan says is current, ignoring the cache.
    pub fn expected_step(&self) -> Option<&str> {
        self.steps.get(self.current_index).map(String::as_str)
    }

    /// Display-order view of history; storage order is untouched.
    pub fn recent_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().rev()
    }
}

/// One immutable record of a verification or mark-done attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: String,
    /// What the evidence contained, never the payload itself.
    pub evidence: EvidenceShape,
    pub passed: bool,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        step: impl Into<String>,
        evidence: EvidenceShape,
        passed: bool,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            evidence,
            passed,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What a transition did to the session, so callers can re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Another transition was in flight; this one was a no-op.
    Busy,
    /// The response arrived after its task was gone and was discarded.
    Stale,
    /// A task was started.
    Started,
    /// The step passed and the plan moved forward.
    Advanced,
    /// The step did not pass; position unchanged, options refreshed.
    Rejected,
    /// The service declared the task complete.
    Completed,
    /// A fresh plan for the same task was adopted.
    Restarted,
    /// The session was wiped back to "no task".
    SessionCleared,
    /// A generic remedial action; only the display message changed.
    Acknowledged,
}
