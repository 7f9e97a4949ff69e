//! HTTP implementation of the verification gateway.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{
    ApplyActionResponse, MarkDoneResponse, StartTaskResponse, VerificationGateway,
    VerifyStepResponse,
};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::evidence::Evidence;

/// Reqwest-backed gateway client.
///
/// Every call is a single request: a non-success status or transport failure
/// is terminal for that transition, never retried here.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        tracing::debug!(path, "gateway request");
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn check_service_error(error: Option<String>) -> Result<(), GatewayError> {
        match error {
            Some(message) => Err(GatewayError::Service(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationGateway for HttpGateway {
    async fn start_task(&self, goal: &str) -> Result<StartTaskResponse, GatewayError> {
        let body = serde_json::json!({ "task": goal });
        let response: StartTaskResponse = self.post_json("start-task", &body).await?;
        Self::check_service_error(response.error.clone())?;
        Ok(response)
    }

    async fn verify_step(
        &self,
        task_id: &str,
        evidence: &Evidence,
    ) -> Result<VerifyStepResponse, GatewayError> {
        // verify-step is the one multipart endpoint: the image travels as a
        // binary part, the rest as form fields.
        let mut form = Form::new().text("taskId", task_id.to_string());
        if let Some(text) = evidence.text() {
            form = form.text("textNote", text.to_string());
        }
        if let Some(image) = evidence.image() {
            let part = Part::bytes(image.bytes.to_vec())
                .file_name(image.file_name())
                .mime_str(image.mime)?;
            form = form.part("image", part);
        }

        tracing::debug!(
            task_id,
            has_image = evidence.image().is_some(),
            "gateway request: verify-step"
        );
        let response = self
            .client
            .post(self.endpoint("verify-step"))
            .multipart(form)
            .send()
            .await?;
        let response: VerifyStepResponse = Self::decode(response).await?;
        Self::check_service_error(response.error.clone())?;
        Ok(response)
    }

    async fn mark_step_done(&self, task_id: &str) -> Result<MarkDoneResponse, GatewayError> {
        let body = serde_json::json!({ "taskId": task_id });
        let response: MarkDoneResponse = self.post_json("mark-step-done", &body).await?;
        Self::check_service_error(response.error.clone())?;
        Ok(response)
    }

    async fn apply_action(
        &self,
        task_id: &str,
        action: &str,
    ) -> Result<ApplyActionResponse, GatewayError> {
        let body = serde_json::json!({ "action": action, "taskId": task_id });
        let response: ApplyActionResponse = self.post_json("apply-action", &body).await?;
        Self::check_service_error(response.error.clone())?;
        Ok(response)
    }
}
