//! Session transition controller.
//!
//! One owned session object with an explicit transition API; every state
//! change flows through here so it stays auditable and testable apart from
//! rendering. A single busy flag gates all transition entry points: a second
//! invocation while one is pending is a no-op, never queued, so two requests
//! can never race to reconcile the same position. Camera acquisition is
//! deliberately outside the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::reconcile;
use super::types::{Outcome, TaskSession};
use crate::error::{SessionError, SessionResult, ValidationError};
use crate::evidence::{EvidenceDraft, ImageArtifact};
use crate::gateway::VerificationGateway;

pub struct SessionController {
    gateway: Arc<dyn VerificationGateway>,
    session: RwLock<TaskSession>,
    draft: Mutex<EvidenceDraft>,
    busy: AtomicBool,
}

/// Clears the busy flag when the transition resolves, error paths included.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionController {
    pub fn new(gateway: Arc<dyn VerificationGateway>) -> Self {
        Self {
            gateway,
            session: RwLock::new(TaskSession::default()),
            draft: Mutex::new(EvidenceDraft::default()),
            busy: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current session for rendering.
    pub async fn session(&self) -> TaskSession {
        self.session.read().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    // ---- evidence draft -------------------------------------------------

    pub async fn set_note(&self, text: impl Into<String>) {
        self.draft.lock().await.set_text(text);
    }

    pub async fn attach_image(&self, artifact: Arc<ImageArtifact>) {
        self.draft.lock().await.attach_image(artifact);
    }

    pub async fn clear_evidence(&self) {
        self.draft.lock().await.clear();
    }

    // ---- transitions ----------------------------------------------------

    /// Start a new task, clearing any prior session wholesale.
    ///
    /// On gateway failure nothing is applied: the pre-existing state stays
    /// exactly as it was.
    pub async fn start_task(&self, goal: &str) -> SessionResult<Outcome> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(ValidationError::EmptyGoal.into());
        }
        let Some(_guard) = self.try_begin() else {
            return Ok(Outcome::Busy);
        };

        let resp = self
            .gateway
            .start_task(goal)
            .await
            .map_err(SessionError::StartFailed)?;

        let mut session = self.session.write().await;
        *session = TaskSession::default();
        session.task_id = resp.task_id.unwrap_or_default();
        // Service may restate the goal; fall back to the raw user input.
        session.goal = resp
            .goal
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| goal.to_string());
        session.steps = resp.steps;
        session.current_step = resp
            .current_step
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| session.steps.first().cloned().unwrap_or_default());
        tracing::info!(
            task_id = %session.task_id,
            steps = session.steps.len(),
            "task started"
        );

        self.draft.lock().await.clear();
        Ok(Outcome::Started)
    }

    /// Submit the drafted evidence for the current step.
    ///
    /// Preconditions (an active task, assemblable evidence) are checked
    /// before the gateway is contacted. The draft is cleared only when the
    /// step passes; on failure it stays attached for a retry.
    pub async fn verify_step(&self) -> SessionResult<Outcome> {
        let Some(_guard) = self.try_begin() else {
            return Ok(Outcome::Busy);
        };

        let (task_id, attempted) = {
            let session = self.session.read().await;
            if !session.is_active() {
                return Err(ValidationError::NoActiveTask.into());
            }
            (session.task_id.clone(), session.current_step.clone())
        };
        let evidence = self.draft.lock().await.assemble()?;

        let resp = self.gateway.verify_step(&task_id, &evidence).await?;

        let mut session = self.session.write().await;
        if session.task_id != task_id {
            tracing::warn!(%task_id, "discarding verify response for departed task");
            return Ok(Outcome::Stale);
        }
        let outcome = reconcile::apply_verify(&mut session, attempted, evidence.shape(), &resp);
        drop(session);

        if matches!(outcome, Outcome::Advanced | Outcome::Completed) {
            self.draft.lock().await.clear();
        }
        Ok(outcome)
    }

    /// Record the current step as done without evidence review.
    ///
    /// A trust-the-user override: a synthetic passing history entry is
    /// written and the plan advances locally unless the service reports
    /// completion.
    pub async fn mark_done(&self) -> SessionResult<Outcome> {
        let Some(_guard) = self.try_begin() else {
            return Ok(Outcome::Busy);
        };

        let task_id = {
            let session = self.session.read().await;
            if !session.is_active() {
                return Err(ValidationError::NoActiveTask.into());
            }
            session.task_id.clone()
        };

        let resp = self.gateway.mark_step_done(&task_id).await?;

        let mut session = self.session.write().await;
        if session.task_id != task_id {
            tracing::warn!(%task_id, "discarding mark-done response for departed task");
            return Ok(Outcome::Stale);
        }
        let outcome = reconcile::apply_mark_done(&mut session, &resp);
        drop(session);

        self.draft.lock().await.clear();
        Ok(outcome)
    }

    /// Apply a remedial action: one of the service's suggested options, or
    /// the reserved `"restart"` / `"quit"`. Unknown actions go to the
    /// service untouched; it is the authority on validity.
    pub async fn apply_option(&self, action: &str) -> SessionResult<Outcome> {
        let Some(_guard) = self.try_begin() else {
            return Ok(Outcome::Busy);
        };

        let task_id = {
            let session = self.session.read().await;
            if !session.is_active() {
                return Err(ValidationError::NoActiveTask.into());
            }
            session.task_id.clone()
        };

        let resp = self.gateway.apply_action(&task_id, action).await?;

        let mut session = self.session.write().await;
        if session.task_id != task_id {
            tracing::warn!(%task_id, action, "discarding action response for departed task");
            return Ok(Outcome::Stale);
        }
        let outcome = reconcile::apply_action(&mut session, action, &resp);
        drop(session);

        if matches!(outcome, Outcome::SessionCleared | Outcome::Restarted) {
            self.draft.lock().await.clear();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::evidence::Evidence;
    use crate::gateway::{
        ApplyActionResponse, MarkDoneResponse, StartTaskResponse, VerifyStepResponse,
    };
    use crate::session::types::ACTION_QUIT;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Gateway that replays scripted verify responses in order.
    #[derive(Default)]
    struct ScriptedGateway {
        start: StdMutex<Option<Result<StartTaskResponse, GatewayError>>>,
        verify: StdMutex<VecDeque<VerifyStepResponse>>,
        mark_done: StdMutex<Option<MarkDoneResponse>>,
        action: StdMutex<Option<ApplyActionResponse>>,
    }

    impl ScriptedGateway {
        fn with_start(resp: StartTaskResponse) -> Self {
            let gw = Self::default();
            *gw.start.lock().unwrap() = Some(Ok(resp));
            gw
        }

        fn tea() -> Self {
            Self::with_start(StartTaskResponse {
                task_id: Some("t-tea".to_string()),
                goal: Some("make tea".to_string()),
                steps: vec![
                    "boil water".to_string(),
                    "steep tea".to_string(),
                    "serve".to_string(),
                ],
                current_step: Some("boil water".to_string()),
                error: None,
            })
        }

        fn script_verify(&self, resp: VerifyStepResponse) {
            self.verify.lock().unwrap().push_back(resp);
        }
    }

    #[async_trait]
    impl VerificationGateway for ScriptedGateway {
        async fn start_task(&self, _goal: &str) -> Result<StartTaskResponse, GatewayError> {
            self.start
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(StartTaskResponse::default()))
        }

        async fn verify_step(
            &self,
            _task_id: &str,
            _evidence: &Evidence,
        ) -> Result<VerifyStepResponse, GatewayError> {
            Ok(self.verify.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn mark_step_done(&self, _task_id: &str) -> Result<MarkDoneResponse, GatewayError> {
            Ok(self.mark_done.lock().unwrap().take().unwrap_or_default())
        }

        async fn apply_action(
            &self,
            _task_id: &str,
            _action: &str,
        ) -> Result<ApplyActionResponse, GatewayError> {
            Ok(self.action.lock().unwrap().take().unwrap_or_default())
        }
    }

    async fn started_controller(gateway: ScriptedGateway) -> SessionController {
        let controller = SessionController::new(Arc::new(gateway));
        controller.start_task("make tea").await.unwrap();
        controller
    }

    #[tokio::test]
    async fn start_initializes_at_plan_head() {
        let controller = started_controller(ScriptedGateway::tea()).await;
        let session = controller.session().await;
        assert_eq!(session.task_id, "t-tea");
        assert_eq!(session.goal, "make tea");
        assert_eq!(session.current_index, 0);
        assert_eq!(session.current_step, "boil water");
        assert_eq!(session.current_step, session.steps[0]);
        assert!(session.history.is_empty());
        assert!(session.options.is_empty());
    }

    #[tokio::test]
    async fn start_failure_leaves_no_task_state_untouched() {
        let gateway = ScriptedGateway::default();
        *gateway.start.lock().unwrap() = Some(Err(GatewayError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }));
        let controller = SessionController::new(Arc::new(gateway));

        let err = controller.start_task("make tea").await.unwrap_err();
        assert!(matches!(err, SessionError::StartFailed(_)));
        let session = controller.session().await;
        assert!(!session.is_active());
        assert!(session.steps.is_empty());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn start_falls_back_to_raw_goal_text() {
        let gateway = ScriptedGateway::with_start(StartTaskResponse {
            task_id: Some("t-1".to_string()),
            steps: vec!["step one".to_string()],
            ..StartTaskResponse::default()
        });
        let controller = SessionController::new(Arc::new(gateway));
        controller.start_task("  fix the bike  ").await.unwrap();
        let session = controller.session().await;
        assert_eq!(session.goal, "fix the bike");
        assert_eq!(session.current_step, "step one");
    }

    #[tokio::test]
    async fn verify_preconditions_fail_before_any_network_call() {
        let controller = SessionController::new(Arc::new(ScriptedGateway::default()));
        let err = controller.verify_step().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::NoActiveTask)
        ));

        let controller = started_controller(ScriptedGateway::tea()).await;
        let err = controller.verify_step().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::MissingEvidence)
        ));
        // Nothing reached the session.
        assert!(controller.session().await.history.is_empty());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn make_tea_scenario() {
        let gateway = ScriptedGateway::tea();
        gateway.script_verify(VerifyStepResponse {
            passed: true,
            ..VerifyStepResponse::default()
        });
        gateway.script_verify(VerifyStepResponse {
            passed: false,
            reason: Some("no evidence of steeping".to_string()),
            options: Some(vec!["retry".to_string(), "skip".to_string()]),
            ..VerifyStepResponse::default()
        });
        let controller = started_controller(gateway).await;

        controller.set_note("kettle boiled").await;
        let outcome = controller.verify_step().await.unwrap();
        assert_eq!(outcome, Outcome::Advanced);
        let session = controller.session().await;
        assert_eq!(session.current_index, 1);
        assert_eq!(session.current_step, "steep tea");
        assert_eq!(session.history.len(), 1);

        controller.set_note("tea bag in cup").await;
        let outcome = controller.verify_step().await.unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        let session = controller.session().await;
        assert_eq!(session.current_index, 1);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.options, vec!["retry", "skip"]);
        // Failed verify keeps the draft for a retry.
        assert_eq!(controller.draft.lock().await.text(), "tea bag in cup");

        let outcome = controller.mark_done().await.unwrap();
        assert_eq!(outcome, Outcome::Advanced);
        let session = controller.session().await;
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.current_index, 2);
        assert_eq!(session.current_step, "serve");
        assert!(controller.draft.lock().await.is_empty());
    }

    #[tokio::test]
    async fn passing_verify_clears_the_draft() {
        let gateway = ScriptedGateway::tea();
        gateway.script_verify(VerifyStepResponse {
            passed: true,
            ..VerifyStepResponse::default()
        });
        let controller = started_controller(gateway).await;
        controller.set_note("done").await;
        controller.verify_step().await.unwrap();
        assert!(controller.draft.lock().await.is_empty());
    }

    #[tokio::test]
    async fn quit_wipes_session_and_draft() {
        let controller = started_controller(ScriptedGateway::tea()).await;
        controller.set_note("half-written note").await;
        let outcome = controller.apply_option(ACTION_QUIT).await.unwrap();
        assert_eq!(outcome, Outcome::SessionCleared);
        let session = controller.session().await;
        assert!(session.goal.is_empty());
        assert!(session.task_id.is_empty());
        assert!(session.steps.is_empty());
        assert!(session.history.is_empty());
        assert!(controller.draft.lock().await.is_empty());
    }

    /// Gateway whose verify blocks until released, to hold a transition
    /// in flight.
    struct BlockingGateway {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl VerificationGateway for BlockingGateway {
        async fn start_task(&self, _goal: &str) -> Result<StartTaskResponse, GatewayError> {
            Ok(StartTaskResponse {
                task_id: Some("t-block".to_string()),
                steps: vec!["only step".to_string()],
                current_step: Some("only step".to_string()),
                ..StartTaskResponse::default()
            })
        }

        async fn verify_step(
            &self,
            _task_id: &str,
            _evidence: &Evidence,
        ) -> Result<VerifyStepResponse, GatewayError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(VerifyStepResponse {
                passed: true,
                ..VerifyStepResponse::default()
            })
        }

        async fn mark_step_done(&self, _task_id: &str) -> Result<MarkDoneResponse, GatewayError> {
            Ok(MarkDoneResponse::default())
        }

        async fn apply_action(
            &self,
            _task_id: &str,
            _action: &str,
        ) -> Result<ApplyActionResponse, GatewayError> {
            Ok(ApplyActionResponse::default())
        }
    }

    #[tokio::test]
    async fn second_transition_while_pending_is_a_noop() {
        let gateway = Arc::new(BlockingGateway {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let controller = Arc::new(SessionController::new(
            Arc::clone(&gateway) as Arc<dyn VerificationGateway>
        ));
        controller.start_task("block").await.unwrap();
        controller.set_note("proof").await;

        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.verify_step().await })
        };
        gateway.entered.notified().await;

        // All transition entry points are gated, not just verify.
        assert!(controller.is_busy());
        assert_eq!(controller.verify_step().await.unwrap(), Outcome::Busy);
        assert_eq!(controller.mark_done().await.unwrap(), Outcome::Busy);
        assert_eq!(controller.apply_option("retry").await.unwrap(), Outcome::Busy);

        gateway.release.notify_one();
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Advanced);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn stale_response_for_departed_task_is_discarded() {
        let gateway = Arc::new(BlockingGateway {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let controller = Arc::new(SessionController::new(
            Arc::clone(&gateway) as Arc<dyn VerificationGateway>
        ));
        controller.start_task("block").await.unwrap();
        controller.set_note("proof").await;

        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.verify_step().await })
        };
        gateway.entered.notified().await;

        // The task goes away underneath the in-flight request.
        controller.session.write().await.task_id = String::new();

        gateway.release.notify_one();
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Stale);
        let session = controller.session().await;
        assert!(session.history.is_empty());
        assert_eq!(session.current_index, 0);
    }
}
