//! HTTP client wrapper for the Azure Resource Manager API.
//!
//! Handles bearer-token injection, rate-limit retries with exponential backoff,
//! pagination via `nextLink`, standard ARM error extraction and the initial
//! request of long-running operations.

use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AzureConfig;
use crate::lro::{Operation, OperationMethod};
use crate::types::{
    ArmList, AzureCredentials, AzureError, AzureErrorKind, AzureResult, AzureToken,
};

/// Maximum retries for transient / rate-limit errors.
const MAX_RETRIES: u32 = 3;
/// Base delay between retries (doubled each attempt).
const BASE_DELAY_MS: u64 = 500;

/// A response whose status has not been interpreted yet.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    /// `Retry-After` expressed in whole seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header(RETRY_AFTER.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    pub fn json<T: DeserializeOwned>(&self) -> AzureResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| AzureError::new(AzureErrorKind::Parse, format!("JSON parse: {e}")))
    }

    /// Body as JSON, or `None` when the body is empty.
    pub fn json_opt(&self) -> AzureResult<Option<serde_json::Value>> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        self.json().map(Some)
    }

    pub fn into_error(self) -> AzureError {
        AzureError::from_status(self.status, &self.body)
    }
}

/// HTTP client with Azure-specific auth and retry logic.
#[derive(Clone)]
pub struct AzureClient {
    http: Client,
    token: Option<AzureToken>,
    credentials: Option<AzureCredentials>,
    config: AzureConfig,
}

impl Default for AzureClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureClient {
    pub fn new() -> Self {
        Self::with_config(AzureConfig::new())
    }

    pub fn with_config(config: AzureConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.http_timeout)
                .build()
                .unwrap_or_default(),
            token: None,
            credentials: None,
            config,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    pub fn set_credentials(&mut self, creds: AzureCredentials) {
        self.credentials = Some(creds);
    }

    pub fn credentials(&self) -> Option<&AzureCredentials> {
        self.credentials.as_ref()
    }

    pub fn set_token(&mut self, token: AzureToken) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&AzureToken> {
        self.token.as_ref()
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_ref()
            .map(|t| !t.access_token.is_empty() && !t.is_expired())
            .unwrap_or(false)
    }

    pub fn subscription_id(&self) -> AzureResult<&str> {
        self.credentials
            .as_ref()
            .map(|c| c.subscription_id.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(AzureError::subscription_not_set)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Subscription-scoped URL.
    pub fn subscription_url(&self, suffix: &str) -> AzureResult<String> {
        let sub = self.subscription_id()?;
        Ok(format!(
            "{}/subscriptions/{}{}",
            self.config.arm_endpoint, sub, suffix
        ))
    }

    /// Resource-group-scoped URL.
    pub fn resource_group_url(&self, rg: &str, suffix: &str) -> AzureResult<String> {
        let sub = self.subscription_id()?;
        Ok(format!(
            "{}/subscriptions/{}/resourceGroups/{}{}",
            self.config.arm_endpoint, sub, rg, suffix
        ))
    }

    // ── Auth header builder ──────────────────────────────────────────

    fn auth_headers(&self) -> AzureResult<HeaderMap> {
        let token = self
            .token
            .as_ref()
            .filter(|t| !t.access_token.is_empty())
            .ok_or_else(AzureError::not_authenticated)?;

        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", token.access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&val).map_err(|e| {
                AzureError::new(AzureErrorKind::Auth, format!("Header value error: {e}"))
            })?,
        );
        Ok(headers)
    }

    // ── Core request loop ────────────────────────────────────────────

    /// Send an authenticated request, retrying transient failures.
    ///
    /// Returns the first non-retryable response, successful or not.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> AzureResult<RawResponse> {
        let headers = self.auth_headers()?;

        for attempt in 0..=MAX_RETRIES {
            let mut req = self
                .http
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(b) = body {
                req = req.json(b);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| AzureError::new(AzureErrorKind::Network, format!("{e}")))?;

            let status = resp.status().as_u16();
            let resp_headers = resp.headers().clone();
            let raw = RawResponse {
                status,
                headers: resp_headers,
                body: resp.text().await.unwrap_or_default(),
            };

            if should_retry(raw.status) && attempt < MAX_RETRIES {
                let delay = raw
                    .retry_after()
                    .unwrap_or_else(|| Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt)));
                warn!(
                    "Azure {} {} → {} – retrying in {}ms",
                    method,
                    url,
                    raw.status,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Ok(raw);
        }

        Err(AzureError::new(
            AzureErrorKind::Network,
            "Max retries exceeded",
        ))
    }

    // ── Core HTTP verbs ──────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AzureResult<T> {
        let raw = self.send(Method::GET, url, None).await?;
        if !raw.is_success() {
            return Err(raw.into_error());
        }
        raw.json()
    }

    // ── Long-running operations ──────────────────────────────────────

    /// Issue a PUT and capture the operation handle for polling.
    pub async fn begin_put<B: Serialize>(&self, url: &str, body: &B) -> AzureResult<Operation> {
        let value = to_value(body)?;
        let raw = self.send(Method::PUT, url, Some(&value)).await?;
        if !raw.is_success() {
            return Err(raw.into_error());
        }
        debug!("Azure PUT {} → {}", url, raw.status);
        Operation::from_initial(OperationMethod::Put, url, &raw)
    }

    /// Issue a DELETE and capture the operation handle for polling.
    pub async fn begin_delete(&self, url: &str) -> AzureResult<Operation> {
        let raw = self.send(Method::DELETE, url, None).await?;
        if !raw.is_success() {
            return Err(raw.into_error());
        }
        debug!("Azure DELETE {} → {}", url, raw.status);
        Operation::from_initial(OperationMethod::Delete, url, &raw)
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Follow `nextLink` to collect **all** items from a paginated ARM list endpoint.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        initial_url: &str,
    ) -> AzureResult<Vec<T>> {
        let mut all: Vec<T> = Vec::new();
        let mut url = initial_url.to_string();

        loop {
            debug!("Azure paginate: {}", url);
            let page: ArmList<T> = self.get_json(&url).await?;
            all.extend(page.value);
            match page.next_link {
                Some(next) if !next.is_empty() => url = next,
                _ => break,
            }
        }

        Ok(all)
    }

    /// POST unauthenticated form data (used by auth module for token exchange).
    pub async fn post_form_unauthenticated<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> AzureResult<T> {
        let form_pairs: Vec<(&str, &str)> = form
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect();

        let resp = self
            .http
            .post(url)
            .form(&form_pairs)
            .send()
            .await
            .map_err(|e| AzureError::new(AzureErrorKind::Network, format!("{e}")))?;

        if resp.status().is_success() {
            resp.json::<T>().await.map_err(|e| {
                AzureError::new(AzureErrorKind::Parse, format!("JSON parse: {e}"))
            })
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(AzureError::from_status(status, &body))
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn should_retry(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn to_value<B: Serialize>(body: &B) -> AzureResult<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| AzureError::new(AzureErrorKind::Parse, format!("JSON encode: {e}")))
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_sub(sub: &str) -> AzureClient {
        let mut c = AzureClient::new();
        c.set_credentials(AzureCredentials {
            subscription_id: sub.into(),
            ..Default::default()
        });
        c
    }

    #[test]
    fn new_client_default() {
        let c = AzureClient::new();
        assert!(!c.is_authenticated());
        assert!(c.credentials().is_none());
        assert!(c.token().is_none());
    }

    #[test]
    fn set_token_authenticates() {
        let mut c = AzureClient::new();
        c.set_token(AzureToken {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        });
        assert!(c.is_authenticated());
        c.clear_token();
        assert!(!c.is_authenticated());
    }

    #[test]
    fn expired_token_not_authenticated() {
        let mut c = AzureClient::new();
        c.set_token(AzureToken {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        });
        assert!(!c.is_authenticated());
    }

    #[test]
    fn subscription_id_missing() {
        let c = AzureClient::new();
        let e = c.subscription_id().unwrap_err();
        assert_eq!(e.kind, AzureErrorKind::SubscriptionNotSet);
    }

    #[test]
    fn subscription_url_construction() {
        let c = client_with_sub("sub1");
        let url = c.subscription_url("/resourcegroups/rg1").unwrap();
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub1/resourcegroups/rg1"
        );
    }

    #[test]
    fn resource_group_url_construction() {
        let c = client_with_sub("sub1");
        let url = c
            .resource_group_url("rg1", "/providers/Microsoft.Network/loadBalancers/lb1")
            .unwrap();
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/loadBalancers/lb1"
        );
    }

    #[tokio::test]
    async fn send_without_token_fails() {
        let c = client_with_sub("sub1");
        let e = c
            .send(Method::GET, "http://127.0.0.1:1/", None)
            .await
            .unwrap_err();
        assert_eq!(e.kind, AzureErrorKind::NotAuthenticated);
    }

    #[test]
    fn raw_response_helpers() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let raw = RawResponse {
            status: 202,
            headers,
            body: String::new(),
        };
        assert!(raw.is_success());
        assert_eq!(raw.retry_after(), Some(Duration::from_secs(7)));
        assert!(raw.json_opt().unwrap().is_none());
    }

    #[test]
    fn should_retry_logic() {
        assert!(should_retry(429));
        assert!(should_retry(500));
        assert!(should_retry(503));
        assert!(!should_retry(400));
        assert!(!should_retry(404));
    }
}
