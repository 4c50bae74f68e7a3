//! Endpoint, API-version and timing configuration, plus environment-based
//! credential resolution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{AzureCredentials, AzureError, AzureResult};

/// Azure public cloud Resource Manager endpoint.
pub const ARM_BASE: &str = "https://management.azure.com";

/// Azure AD authority host for the public cloud.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_ARM_ENDPOINT: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";

// ─── Azure API version constants ────────────────────────────────────

pub mod api_versions {
    pub const RESOURCES: &str = "2019-05-01";
    pub const NETWORK: &str = "2019-12-01";
    pub const CONTAINER_INSTANCE: &str = "2018-10-01";
    pub const BLOCKCHAIN: &str = "2018-06-01-preview";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Resource Manager base URL, without trailing slash.
    pub arm_endpoint: String,
    /// Azure AD authority host, without trailing slash.
    pub authority_host: String,
    pub api_version_resources: String,
    pub api_version_network: String,
    pub api_version_container: String,
    pub api_version_blockchain: String,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Delay between long-running-operation polls when the service sends no `Retry-After`.
    pub poll_interval: Duration,
    /// Deadline applied by `start_container`.
    pub container_start_timeout: Duration,
    /// Number of trailing log lines fetched by `container_logs`.
    pub log_tail: u32,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureConfig {
    pub fn new() -> Self {
        Self {
            arm_endpoint: ARM_BASE.into(),
            authority_host: AUTHORITY_HOST.into(),
            api_version_resources: api_versions::RESOURCES.into(),
            api_version_network: api_versions::NETWORK.into(),
            api_version_container: api_versions::CONTAINER_INSTANCE.into(),
            api_version_blockchain: api_versions::BLOCKCHAIN.into(),
            http_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            container_start_timeout: Duration::from_secs(1000),
            log_tail: 100,
        }
    }

    /// Defaults overridden by `AZURE_RESOURCE_MANAGER_ENDPOINT` and `AZURE_AUTHORITY_HOST`.
    pub fn from_env() -> AzureResult<Self> {
        let mut config = Self::new();
        if let Some(endpoint) = non_empty_env(ENV_ARM_ENDPOINT) {
            config.set_arm_endpoint(&endpoint)?;
        }
        if let Some(host) = non_empty_env(ENV_AUTHORITY_HOST) {
            config.set_authority_host(&host)?;
        }
        Ok(config)
    }

    pub fn set_arm_endpoint(&mut self, endpoint: &str) -> AzureResult<()> {
        self.arm_endpoint = normalize_endpoint(endpoint)?;
        Ok(())
    }

    pub fn set_authority_host(&mut self, host: &str) -> AzureResult<()> {
        self.authority_host = normalize_endpoint(host)?;
        Ok(())
    }

    /// OAuth scope for Resource Manager tokens, e.g. `https://management.azure.com/.default`.
    pub fn arm_scope(&self) -> String {
        format!("{}/.default", self.arm_endpoint)
    }
}

fn normalize_endpoint(raw: &str) -> AzureResult<String> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| AzureError::validation(format!("invalid endpoint '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AzureError::validation(format!(
            "invalid endpoint '{}': unsupported scheme",
            raw
        )));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AzureCredentials {
    pub fn new(
        subscription_id: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Resolve credentials from the standard `AZURE_*` environment variables.
    pub fn from_env() -> AzureResult<Self> {
        let get = |key: &str| {
            non_empty_env(key).ok_or_else(|| {
                AzureError::new(
                    crate::types::AzureErrorKind::Auth,
                    format!("missing environment variable {}", key),
                )
            })
        };
        Ok(Self {
            subscription_id: get(ENV_SUBSCRIPTION_ID)?,
            tenant_id: get(ENV_TENANT_ID)?,
            client_id: get(ENV_CLIENT_ID)?,
            client_secret: get(ENV_CLIENT_SECRET)?,
        })
    }

    pub fn is_complete(&self) -> bool {
        !self.subscription_id.is_empty()
            && !self.tenant_id.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let c = AzureConfig::new();
        assert_eq!(c.arm_endpoint, "https://management.azure.com");
        assert_eq!(c.api_version_network, "2019-12-01");
        assert_eq!(c.api_version_container, "2018-10-01");
        assert_eq!(c.api_version_resources, "2019-05-01");
        assert_eq!(c.container_start_timeout, Duration::from_secs(1000));
        assert_eq!(c.log_tail, 100);
    }

    #[test]
    fn arm_scope_uses_endpoint() {
        let c = AzureConfig::new();
        assert_eq!(c.arm_scope(), "https://management.azure.com/.default");
    }

    #[test]
    fn endpoint_trailing_slash_trimmed() {
        let mut c = AzureConfig::new();
        c.set_arm_endpoint("http://127.0.0.1:8080/").unwrap();
        assert_eq!(c.arm_endpoint, "http://127.0.0.1:8080");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        let mut c = AzureConfig::new();
        assert!(c.set_arm_endpoint("not a url").is_err());
        assert!(c.set_authority_host("ftp://example.com").is_err());
    }

    #[test]
    fn credentials_completeness() {
        let c = AzureCredentials::new("s", "t", "c", "x");
        assert!(c.is_complete());
        let partial = AzureCredentials {
            subscription_id: "s".into(),
            ..Default::default()
        };
        assert!(!partial.is_complete());
    }
}
