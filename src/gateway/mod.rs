//! Remote verification gateway boundary.
//!
//! The reasoning/verification service is external; this module pins down the
//! narrow request/response contract the session layer consumes. Wire structs
//! mirror the service's loosely-typed payloads: every field the service may
//! omit is optional and defaults, because absence means "use local fallback",
//! never a hard error. The one exception is the explicit `error` field, which
//! always aborts the transition.

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::evidence::{Evidence, EvidenceShape};
use crate::session::HistoryEntry;

/// Response to `start-task`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartTaskResponse {
    pub task_id: Option<String>,
    pub goal: Option<String>,
    pub steps: Vec<String>,
    pub current_step: Option<String>,
    pub error: Option<String>,
}

/// Response to `verify-step`.
///
/// Carries up to four competing signals about where the task now stands:
/// a completion flag, a full replacement plan, an explicit next step, or
/// nothing (bare local increment). The reconciliation engine resolves them
/// in that priority order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyStepResponse {
    pub done: bool,
    pub passed: bool,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub next_steps: Option<Vec<String>>,
    pub next_step: Option<String>,
    pub options: Option<Vec<String>>,
    pub history: Option<Vec<RemoteHistoryEntry>>,
    pub error: Option<String>,
}

/// Response to `mark-step-done`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkDoneResponse {
    pub done: bool,
    pub message: Option<String>,
    pub history: Option<Vec<RemoteHistoryEntry>>,
    pub error: Option<String>,
}

/// Response to `apply-action`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyActionResponse {
    pub message: Option<String>,
    pub steps: Option<Vec<String>>,
    pub current_step: Option<String>,
    pub task_id: Option<String>,
    pub error: Option<String>,
}

/// A history record as the service reports it on completion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteHistoryEntry {
    pub step: String,
    pub passed: bool,
    pub reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<RemoteHistoryEntry> for HistoryEntry {
    fn from(remote: RemoteHistoryEntry) -> Self {
        HistoryEntry {
            step: remote.step,
            // The service does not report evidence composition.
            evidence: EvidenceShape::default(),
            passed: remote.passed,
            reason: remote.reason.unwrap_or_default(),
            timestamp: remote.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// The four operations the session layer performs against the service.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Ask the service to plan a task for the stated goal.
    async fn start_task(&self, goal: &str) -> Result<StartTaskResponse, GatewayError>;

    /// Submit evidence for the current step.
    async fn verify_step(
        &self,
        task_id: &str,
        evidence: &Evidence,
    ) -> Result<VerifyStepResponse, GatewayError>;

    /// Record the current step as done without evidence review.
    async fn mark_step_done(&self, task_id: &str) -> Result<MarkDoneResponse, GatewayError>;

    /// Apply a remedial action (one of the suggested options, or a reserved
    /// action). The service, not the client, judges validity.
    async fn apply_action(
        &self,
        task_id: &str,
        action: &str,
    ) -> Result<ApplyActionResponse, GatewayError>;
}
