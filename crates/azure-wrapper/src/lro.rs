//! Long-running ARM operations.
//!
//! A mutating ARM request answers with either a finished resource or an
//! in-progress marker (`201`/`202` plus `Azure-AsyncOperation` or `Location`
//! headers, or a non-terminal `provisioningState`). [`Operation`] captures
//! that first response and [`wait_for_completion`] polls it to a terminal
//! state under an [`OperationContext`] deadline / cancellation token.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::{AzureClient, RawResponse};
use crate::types::{AsyncOperationStatus, AzureError, AzureErrorKind, AzureResult};

const HEADER_ASYNC_OPERATION: &str = "azure-asyncoperation";
const HEADER_LOCATION: &str = "location";

// ─── Context ────────────────────────────────────────────────────────

/// Deadline and cancellation scope for a blocking call.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl OperationContext {
    /// No deadline; only explicit cancellation stops the wait.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Share an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Same cancellation scope; `timeout` applies only when no deadline is set.
    pub fn or_timeout(&self, timeout: Duration) -> Self {
        Self {
            deadline: self.deadline.or_else(|| Some(Instant::now() + timeout)),
            token: self.token.clone(),
        }
    }

    /// Drive `fut` to completion unless the deadline passes or the token fires first.
    pub async fn run<T, F>(&self, what: &str, fut: F) -> AzureResult<T>
    where
        F: Future<Output = AzureResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(AzureError::cancelled(format!("{} cancelled before start", what)));
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                Err(AzureError::cancelled(format!("{} cancelled before completion", what)))
            }
            _ = sleep_until(self.deadline) => {
                Err(AzureError::timeout(format!("{} did not complete before the deadline", what)))
            }
            res = fut => res,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}

// ─── Operation handle ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMethod {
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed(String),
    Canceled(String),
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    fn from_status_str(status: &str, detail: impl FnOnce() -> String) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed(detail()),
            "canceled" | "cancelled" => Self::Canceled(detail()),
            _ => Self::InProgress,
        }
    }
}

/// Handle to an ARM long-running operation.
#[derive(Debug, Clone)]
pub struct Operation {
    method: OperationMethod,
    resource_url: String,
    async_operation_url: Option<String>,
    location_url: Option<String>,
    retry_after: Option<Duration>,
    state: OperationState,
    final_status: Option<u16>,
    body: Option<serde_json::Value>,
}

impl Operation {
    /// Interpret the response to the initial PUT / DELETE.
    pub fn from_initial(
        method: OperationMethod,
        resource_url: &str,
        raw: &RawResponse,
    ) -> AzureResult<Self> {
        let body = raw.json_opt().ok().flatten();
        let async_operation_url = raw.header(HEADER_ASYNC_OPERATION).map(String::from);
        let location_url = if raw.status == 202 {
            raw.header(HEADER_LOCATION).map(String::from)
        } else {
            None
        };
        let provisioning = body
            .as_ref()
            .and_then(provisioning_state)
            .map(|s| OperationState::from_status_str(s, || format!("provisioningState {}", s)));

        let state = if async_operation_url.is_some() && raw.status != 200 {
            OperationState::InProgress
        } else if raw.status == 202 {
            OperationState::InProgress
        } else if method == OperationMethod::Put {
            provisioning.unwrap_or(OperationState::Succeeded)
        } else {
            OperationState::Succeeded
        };

        let final_status = match state {
            OperationState::Succeeded => Some(raw.status),
            _ => None,
        };

        Ok(Self {
            method,
            resource_url: resource_url.to_string(),
            async_operation_url,
            location_url,
            retry_after: raw.retry_after(),
            state,
            final_status,
            body,
        })
    }

    pub fn method(&self) -> OperationMethod {
        self.method
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    /// HTTP status of the response that completed the operation.
    pub fn final_status(&self) -> Option<u16> {
        self.final_status
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    fn next_delay(&self, default: Duration) -> Duration {
        self.retry_after.unwrap_or(default)
    }

    fn terminal_error(&self) -> Option<AzureError> {
        match &self.state {
            OperationState::Failed(msg) => Some(AzureError::new(
                AzureErrorKind::OperationFailed,
                format!("operation failed: {}", msg),
            )),
            OperationState::Canceled(msg) => Some(AzureError::new(
                AzureErrorKind::OperationFailed,
                format!("operation canceled: {}", msg),
            )),
            _ => None,
        }
    }

    /// Poll the operation once and update its state.
    pub async fn poll(&mut self, client: &AzureClient) -> AzureResult<()> {
        if let Some(url) = self.async_operation_url.clone() {
            let raw = client.send(Method::GET, &url, None).await?;
            if !raw.is_success() {
                return Err(raw.into_error());
            }
            self.retry_after = raw.retry_after();
            let status: AsyncOperationStatus = raw.json()?;
            let error = status.error.clone();
            self.state = OperationState::from_status_str(&status.status, || {
                error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| status.status.clone())
            });
            if self.state == OperationState::Succeeded {
                self.final_status = Some(200);
                // the async status body is not the resource
                if self.method == OperationMethod::Put {
                    self.body = None;
                }
            }
        } else if let Some(url) = self.location_url.clone() {
            let raw = client.send(Method::GET, &url, None).await?;
            self.retry_after = raw.retry_after();
            match raw.status {
                202 => self.state = OperationState::InProgress,
                status if raw.is_success() => {
                    self.body = raw.json_opt().ok().flatten();
                    self.final_status = Some(status);
                    self.state = OperationState::Succeeded;
                }
                _ => return Err(raw.into_error()),
            }
        } else {
            let raw = client.send(Method::GET, &self.resource_url, None).await?;
            self.retry_after = raw.retry_after();
            match self.method {
                OperationMethod::Delete if raw.status == 404 => {
                    self.final_status = Some(200);
                    self.state = OperationState::Succeeded;
                }
                OperationMethod::Delete if raw.is_success() => {
                    self.state = OperationState::InProgress;
                }
                OperationMethod::Put if raw.is_success() => {
                    let body = raw.json_opt()?;
                    self.state = body
                        .as_ref()
                        .and_then(provisioning_state)
                        .map(|s| {
                            OperationState::from_status_str(s, || format!("provisioningState {}", s))
                        })
                        .unwrap_or(OperationState::Succeeded);
                    if self.state == OperationState::Succeeded {
                        self.final_status = Some(raw.status);
                    }
                    self.body = body;
                }
                _ => return Err(raw.into_error()),
            }
        }
        debug!("operation on {} → {:?}", self.resource_url, self.state);
        Ok(())
    }
}

fn provisioning_state(body: &serde_json::Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(|s| s.as_str())
}

// ─── Waiting ────────────────────────────────────────────────────────

/// Block until `op` reaches a terminal state, or the context ends.
pub async fn wait_for_completion(
    client: &AzureClient,
    op: &mut Operation,
    ctx: &OperationContext,
) -> AzureResult<()> {
    let default_delay = client.config().poll_interval;
    ctx.run("long-running operation", async {
        loop {
            if op.is_done() {
                return match op.terminal_error() {
                    Some(e) => {
                        warn!("operation on {} ended: {}", op.resource_url, e);
                        Err(e)
                    }
                    None => Ok(()),
                };
            }
            tokio::time::sleep(op.next_delay(default_delay)).await;
            op.poll(client).await?;
        }
    })
    .await
}

/// Deserialize the resource produced by a finished PUT.
pub async fn result<T: DeserializeOwned>(client: &AzureClient, op: &Operation) -> AzureResult<T> {
    if op.state != OperationState::Succeeded {
        return Err(AzureError::new(
            AzureErrorKind::OperationFailed,
            "operation has not succeeded",
        ));
    }
    if let Some(body) = op.body.as_ref().filter(|b| b.is_object()) {
        return serde_json::from_value(body.clone())
            .map_err(|e| AzureError::new(AzureErrorKind::Parse, format!("JSON parse: {e}")));
    }
    client.get_json(&op.resource_url).await
}

/// PUT `body`, wait for the operation and return the resulting resource.
pub async fn put_and_wait<B: Serialize, T: DeserializeOwned>(
    client: &AzureClient,
    url: &str,
    body: &B,
    ctx: &OperationContext,
) -> AzureResult<T> {
    let mut op = ctx.run("create or update request", client.begin_put(url, body)).await?;
    wait_for_completion(client, &mut op, ctx).await?;
    ctx.run("result fetch", result(client, &op)).await
}

/// DELETE, wait for the operation, and report whether it ended with HTTP 200.
pub async fn delete_and_wait(
    client: &AzureClient,
    url: &str,
    ctx: &OperationContext,
) -> AzureResult<bool> {
    let mut op = ctx.run("delete request", client.begin_delete(url)).await?;
    wait_for_completion(client, &mut op, ctx).await?;
    Ok(op.final_status() == Some(200))
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn raw(status: u16, headers: &[(&'static str, &'static str)], body: &str) -> RawResponse {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.insert(*k, HeaderValue::from_static(v));
        }
        RawResponse {
            status,
            headers: map,
            body: body.to_string(),
        }
    }

    #[test]
    fn put_200_with_succeeded_state_is_done() {
        let r = raw(200, &[], r#"{"name":"x","properties":{"provisioningState":"Succeeded"}}"#);
        let op = Operation::from_initial(OperationMethod::Put, "u", &r).unwrap();
        assert!(op.is_done());
        assert_eq!(op.final_status(), Some(200));
        assert!(op.body().is_some());
    }

    #[test]
    fn put_201_with_async_header_is_in_progress() {
        let r = raw(
            201,
            &[("azure-asyncoperation", "http://x/op"), ("retry-after", "1")],
            r#"{"properties":{"provisioningState":"Updating"}}"#,
        );
        let op = Operation::from_initial(OperationMethod::Put, "u", &r).unwrap();
        assert_eq!(op.state(), &OperationState::InProgress);
        assert_eq!(op.next_delay(Duration::from_secs(9)), Duration::from_secs(1));
    }

    #[test]
    fn put_201_with_creating_state_polls_resource() {
        let r = raw(201, &[], r#"{"properties":{"provisioningState":"Creating"}}"#);
        let op = Operation::from_initial(OperationMethod::Put, "u", &r).unwrap();
        assert!(!op.is_done());
    }

    #[test]
    fn put_with_failed_state_reports_error() {
        let r = raw(200, &[], r#"{"properties":{"provisioningState":"Failed"}}"#);
        let op = Operation::from_initial(OperationMethod::Put, "u", &r).unwrap();
        let e = op.terminal_error().unwrap();
        assert_eq!(e.kind, AzureErrorKind::OperationFailed);
    }

    #[test]
    fn delete_202_with_location_is_in_progress() {
        let r = raw(202, &[("location", "http://x/loc")], "");
        let op = Operation::from_initial(OperationMethod::Delete, "u", &r).unwrap();
        assert!(!op.is_done());
        assert_eq!(op.location_url.as_deref(), Some("http://x/loc"));
    }

    #[test]
    fn delete_204_is_done_without_200() {
        let r = raw(204, &[], "");
        let op = Operation::from_initial(OperationMethod::Delete, "u", &r).unwrap();
        assert!(op.is_done());
        assert_eq!(op.final_status(), Some(204));
    }

    #[test]
    fn status_strings_map_to_states() {
        let d = || "detail".to_string();
        assert_eq!(OperationState::from_status_str("Succeeded", d), OperationState::Succeeded);
        assert_eq!(OperationState::from_status_str("InProgress", d), OperationState::InProgress);
        assert_eq!(
            OperationState::from_status_str("Failed", d),
            OperationState::Failed("detail".into())
        );
        assert_eq!(
            OperationState::from_status_str("Canceled", d),
            OperationState::Canceled("detail".into())
        );
    }

    #[tokio::test]
    async fn run_times_out() {
        let ctx = OperationContext::with_timeout(Duration::from_millis(20));
        let e = ctx
            .run("sleepy", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AzureError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(e.kind, AzureErrorKind::Timeout);
    }

    #[tokio::test]
    async fn run_observes_cancellation() {
        let ctx = OperationContext::background();
        let token = ctx.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let e = ctx
            .run("sleepy", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AzureError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(e.kind, AzureErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn run_refuses_already_cancelled_context() {
        let ctx = OperationContext::with_timeout(Duration::from_secs(5));
        ctx.cancel();
        let e = ctx
            .run("noop", async { Ok::<_, AzureError>(1) })
            .await
            .unwrap_err();
        assert_eq!(e.kind, AzureErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn or_timeout_keeps_existing_deadline_and_token() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let ctx = OperationContext::with_deadline(deadline);
        let derived = ctx.or_timeout(Duration::from_secs(1000));
        assert_eq!(derived.deadline(), Some(deadline));
        ctx.cancel();
        assert!(derived.is_cancelled());

        let open = OperationContext::background().or_timeout(Duration::from_secs(1000));
        let d = open.deadline().unwrap();
        assert!(d > Instant::now() + Duration::from_secs(990));
    }

    #[tokio::test]
    async fn run_passes_through_result() {
        let ctx = OperationContext::with_timeout(Duration::from_secs(5));
        let v = ctx.run("quick", async { Ok::<_, AzureError>(42) }).await.unwrap();
        assert_eq!(v, 42);
    }
}
