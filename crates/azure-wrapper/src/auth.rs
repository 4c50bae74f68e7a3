//! Azure AD OAuth2 authentication.
//!
//! Client-credentials (service-principal) flow against the Microsoft Identity
//! Platform v2.0 token endpoint, scoped to Resource Manager.

use chrono::{Duration, Utc};
use log::debug;

use crate::client::AzureClient;
use crate::types::{
    AzureCredentials, AzureError, AzureErrorKind, AzureResult, AzureToken, TokenResponse,
};

/// Token endpoint URL for a given tenant.
fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!("{}/{}/oauth2/v2.0/token", authority_host, tenant_id)
}

/// Acquire a Resource Manager token using the client-credentials grant.
pub async fn acquire_token(
    client: &AzureClient,
    creds: &AzureCredentials,
) -> AzureResult<AzureToken> {
    if creds.client_id.is_empty() || creds.client_secret.is_empty() || creds.tenant_id.is_empty() {
        return Err(AzureError::new(
            AzureErrorKind::Auth,
            "failed to resolve Azure authorizer; client_id, client_secret, and tenant_id are all required",
        ));
    }

    let config = client.config();
    let url = token_url(&config.authority_host, &creds.tenant_id);
    let scope = config.arm_scope();
    debug!("Azure token request → {}", url);

    let form: Vec<(&str, &str)> = vec![
        ("grant_type", "client_credentials"),
        ("client_id", &creds.client_id),
        ("client_secret", &creds.client_secret),
        ("scope", &scope),
    ];

    let resp: TokenResponse = client
        .post_form_unauthenticated(&url, &form)
        .await
        .map_err(|e| {
            AzureError::new(AzureErrorKind::Auth, e.message)
                .context("failed to resolve Azure authorizer")
        })?;
    Ok(token_from_response(resp))
}

/// Convert the raw token endpoint response into our cached `AzureToken`.
fn token_from_response(resp: TokenResponse) -> AzureToken {
    let expires_at = resp
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs as i64));

    AzureToken {
        access_token: resp.access_token,
        token_type: resp.token_type,
        expires_at,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
