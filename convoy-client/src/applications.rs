//! Application endpoints

use convoy_core::domain::application::Application;
use convoy_core::domain::deployment::Deployment;
use convoy_core::domain::progress::{ProgressEvent, ProgressStatus};
use convoy_core::dto::application::{CreateApplication, UpdateApplication};
use reqwest::StatusCode;

use crate::ConvoyClient;
use crate::error::{ClientError, Result};
use crate::progress::LineDecoder;

impl ConvoyClient {
    // =============================================================================
    // Queries
    // =============================================================================

    /// List the applications the caller may view
    pub async fn list_applications(&self) -> Result<Vec<Application>> {
        let request = self.authenticated(self.client.get(self.url("list")));
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Get an application by id or name
    pub async fn get_application(&self, id: &str) -> Result<Application> {
        let request = self.authenticated(self.client.get(self.url(&format!("list/{}", id))));
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Deployments of an application, newest first
    pub async fn application_history(&self, id: &str) -> Result<Vec<Deployment>> {
        let request = self.authenticated(self.client.get(self.url(&format!("history/{}", id))));
        let response = request.send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Orchestrations
    // =============================================================================
    //
    // Each call forwards progress lines to `on_event` as they arrive and
    // returns the success verdict. A failure verdict becomes an error.

    /// Create an application and deploy its first command
    pub async fn create_application(
        &self,
        req: &CreateApplication,
        on_event: impl FnMut(&ProgressEvent),
    ) -> Result<ProgressEvent> {
        let request = self.authenticated(self.client.post(self.url("create")).json(req));
        let response = request.send().await?;

        self.follow_progress(response, on_event).await
    }

    /// Start every container of an application
    pub async fn start_application(
        &self,
        id: &str,
        on_event: impl FnMut(&ProgressEvent),
    ) -> Result<ProgressEvent> {
        let request = self.authenticated(self.client.post(self.url(&format!("start/{}", id))));
        let response = request.send().await?;

        self.follow_progress(response, on_event).await
    }

    /// Stop every container of an application
    pub async fn stop_application(
        &self,
        id: &str,
        on_event: impl FnMut(&ProgressEvent),
    ) -> Result<ProgressEvent> {
        let request = self.authenticated(self.client.post(self.url(&format!("stop/{}", id))));
        let response = request.send().await?;

        self.follow_progress(response, on_event).await
    }

    /// Redeploy a previous deployment
    ///
    /// `target` is a deployment id when non-negative, otherwise the number of
    /// deployments to step back from the most recent one.
    pub async fn revert_application(
        &self,
        id: &str,
        target: i64,
        on_event: impl FnMut(&ProgressEvent),
    ) -> Result<ProgressEvent> {
        let request = self.authenticated(
            self.client
                .put(self.url(&format!("revert/{}", id)))
                .query(&[("target", target)]),
        );
        let response = request.send().await?;

        self.follow_progress(response, on_event).await
    }

    /// Change instances and/or command; `None` when nothing had to change
    pub async fn update_application(
        &self,
        id: &str,
        req: &UpdateApplication,
        on_event: impl FnMut(&ProgressEvent),
    ) -> Result<Option<ProgressEvent>> {
        let request =
            self.authenticated(self.client.put(self.url(&format!("update/{}", id))).json(req));
        let response = request.send().await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        self.follow_progress(response, on_event).await.map(Some)
    }

    /// Read a progress body to its verdict
    async fn follow_progress(
        &self,
        response: reqwest::Response,
        mut on_event: impl FnMut(&ProgressEvent),
    ) -> Result<ProgressEvent> {
        let mut response = self.check_status(response).await?;
        let mut decoder = LineDecoder::new();
        let mut verdict = None;

        while let Some(chunk) = response.chunk().await? {
            for event in decoder.push(&chunk)? {
                observe(event, &mut verdict, &mut on_event);
            }
        }
        if let Some(event) = decoder.finish()? {
            observe(event, &mut verdict, &mut on_event);
        }

        settle(verdict)
    }
}

fn observe(
    event: ProgressEvent,
    verdict: &mut Option<ProgressEvent>,
    on_event: &mut impl FnMut(&ProgressEvent),
) {
    if event.is_verdict() {
        *verdict = Some(event);
    } else {
        on_event(&event);
    }
}

fn settle(verdict: Option<ProgressEvent>) -> Result<ProgressEvent> {
    match verdict {
        Some(event) if event.status == ProgressStatus::Success => Ok(event),
        Some(event) => Err(ClientError::OperationFailed {
            code: event.code,
            message: event.message,
        }),
        None => {
            tracing::warn!("Progress stream ended without a verdict");
            Err(ClientError::ParseError(
                "progress stream ended without a verdict".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_verdict_is_an_error() {
        let err = settle(Some(ProgressEvent::verdict(
            false,
            500,
            "deployment failed on h2",
        )))
        .unwrap_err();

        assert!(matches!(
            err,
            ClientError::OperationFailed { code: 500, ref message } if message == "deployment failed on h2"
        ));
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        assert!(matches!(settle(None), Err(ClientError::ParseError(_))));
    }

    #[test]
    fn test_verdict_is_not_forwarded() {
        let mut seen = Vec::new();
        let mut verdict = None;

        observe(
            ProgressEvent::starting("pull", 1),
            &mut verdict,
            &mut |e: &ProgressEvent| seen.push(e.status),
        );
        observe(
            ProgressEvent::verdict(true, 200, "done"),
            &mut verdict,
            &mut |e: &ProgressEvent| seen.push(e.status),
        );

        assert_eq!(seen, vec![ProgressStatus::Starting]);
        assert_eq!(settle(verdict).unwrap().message, "done");
    }
}
