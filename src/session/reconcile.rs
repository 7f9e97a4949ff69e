//! Reconciliation engine.
//!
//! Merges a remote response into the local session under partial information.
//! A verify response can carry four competing movement signals; they resolve
//! through one priority-ordered match — completion beats a replacement plan,
//! which beats a named next step, which beats the bare local increment — so
//! no combination can silently fall through.

use super::types::{HistoryEntry, Outcome, TaskSession, ACTION_QUIT, ACTION_RESTART};
use crate::evidence::EvidenceShape;
use crate::gateway::{ApplyActionResponse, MarkDoneResponse, RemoteHistoryEntry, VerifyStepResponse};

/// How a passing response moves the plan, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Advance {
    /// Adopt a wholesale replacement plan and reset to its head.
    ReplacePlan(Vec<String>),
    /// Jump to a step the service named; may be non-linear.
    NamedStep(String),
    /// No directive: move one step forward locally.
    Increment,
}

impl Advance {
    pub(crate) fn classify(resp: &VerifyStepResponse) -> Self {
        if let Some(steps) = resp.next_steps.as_ref().filter(|s| !s.is_empty()) {
            return Self::ReplacePlan(steps.clone());
        }
        if let Some(step) = resp
            .next_step
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Self::NamedStep(step.to_string());
        }
        Self::Increment
    }
}

/// Apply a verify response. `attempted` is the step the evidence was for,
/// snapshotted before the request went out.
pub(crate) fn apply_verify(
    session: &mut TaskSession,
    attempted: String,
    shape: EvidenceShape,
    resp: &VerifyStepResponse,
) -> Outcome {
    if let Some(message) = &resp.message {
        session.message = message.clone();
    }

    // Completion is terminal regardless of `passed`.
    if resp.done {
        complete(session, resp.history.clone());
        return Outcome::Completed;
    }

    // History grows on every settled attempt, failed ones included.
    session.history.push(HistoryEntry::new(
        attempted,
        shape,
        resp.passed,
        resp.reason.clone().unwrap_or_default(),
    ));

    if resp.passed {
        match Advance::classify(resp) {
            Advance::ReplacePlan(steps) => adopt_plan(session, steps),
            Advance::NamedStep(step) => move_to_step(session, &step),
            Advance::Increment => advance_locally(session),
        }
        session.options.clear();
        Outcome::Advanced
    } else {
        // Position never moves on failure, but a re-plan can still arrive.
        if let Some(steps) = resp.next_steps.as_ref().filter(|s| !s.is_empty()) {
            tracing::warn!(
                steps = steps.len(),
                "re-plan received on failed verification; adopting"
            );
            adopt_plan(session, steps.clone());
        }
        session.options = resp.options.clone().unwrap_or_default();
        Outcome::Rejected
    }
}

/// Apply a mark-done response: the synthetic pass entry is recorded first,
/// then either the local increment or the service's completion payload.
pub(crate) fn apply_mark_done(session: &mut TaskSession, resp: &MarkDoneResponse) -> Outcome {
    let attempted = session.current_step.clone();
    session.history.push(HistoryEntry::new(
        attempted,
        EvidenceShape::default(),
        true,
        "manually marked done",
    ));

    if let Some(message) = &resp.message {
        session.message = message.clone();
    }

    if resp.done {
        complete(session, resp.history.clone());
        Outcome::Completed
    } else {
        advance_locally(session);
        session.options.clear();
        Outcome::Advanced
    }
}

/// Apply an action response. The service is the authority on action validity;
/// only the two reserved actions get special local handling.
pub(crate) fn apply_action(
    session: &mut TaskSession,
    action: &str,
    resp: &ApplyActionResponse,
) -> Outcome {
    match action {
        ACTION_QUIT => {
            // Wipe regardless of what the response carried.
            *session = TaskSession::default();
            if let Some(message) = &resp.message {
                session.message = message.clone();
            }
            Outcome::SessionCleared
        }
        ACTION_RESTART => {
            session.history.clear();
            session.options.clear();
            // A fresh plan is adopted only when the response carries one;
            // absence means keep the local plan and reset to its head.
            match resp.steps.as_ref().filter(|s| !s.is_empty()) {
                Some(steps) => adopt_plan(session, steps.clone()),
                None => {
                    session.current_index = 0;
                    session.current_step = session.steps.first().cloned().unwrap_or_default();
                }
            }
            if let Some(step) = &resp.current_step {
                session.current_step = step.clone();
            }
            // Task identity survives a restart unless the service says otherwise.
            if let Some(task_id) = &resp.task_id {
                session.task_id = task_id.clone();
            }
            if let Some(message) = &resp.message {
                session.message = message.clone();
            }
            Outcome::Restarted
        }
        _ => {
            if let Some(message) = &resp.message {
                session.message = message.clone();
            }
            Outcome::Acknowledged
        }
    }
}

fn complete(session: &mut TaskSession, remote_history: Option<Vec<RemoteHistoryEntry>>) {
    if let Some(entries) = remote_history {
        session.history = entries.into_iter().map(HistoryEntry::from).collect();
    }
    session.steps.clear();
    session.current_step.clear();
    session.current_index = 0;
    session.options.clear();
}

fn adopt_plan(session: &mut TaskSession, steps: Vec<String>) {
    session.current_step = steps.first().cloned().unwrap_or_default();
    session.current_index = 0;
    session.steps = steps;
}

/// Jump to a step the service named. Unknown steps are appended idempotently
/// and pointed at; for that out-of-band path `current_step` is authoritative
/// and the index is best-effort.
fn move_to_step(session: &mut TaskSession, step: &str) {
    if let Some(position) = session.steps.iter().position(|s| s == step) {
        session.current_index = position;
    } else {
        tracing::warn!(step, "next step not in local plan; appending out of band");
        session.steps.push(step.to_string());
        session.current_index = session.steps.len() - 1;
    }
    session.current_step = step.to_string();
}

fn advance_locally(session: &mut TaskSession) {
    session.current_index += 1;
    // Overrunning the plan leaves the step empty, a heuristic completion
    // signal even without an explicit `done`.
    session.current_step = session
        .steps
        .get(session.current_index)
        .cloned()
        .unwrap_or_default();
}
