#![allow(dead_code)]

use std::time::Duration;

use azure_wrapper::types::AzureToken;
use azure_wrapper::{AzureClient, AzureConfig, AzureCredentials};
use wiremock::MockServer;

pub const SUB: &str = "sub-123";
pub const TENANT: &str = "tenant-abc";
pub const TOKEN: &str = "test-token";

/// Config pointing both ARM and the authority host at the mock server.
pub fn config_for(server: &MockServer) -> AzureConfig {
    let mut config = AzureConfig::new();
    config.set_arm_endpoint(&server.uri()).unwrap();
    config.set_authority_host(&server.uri()).unwrap();
    config.poll_interval = Duration::from_millis(10);
    config
}

pub fn credentials() -> AzureCredentials {
    AzureCredentials::new(SUB, TENANT, "client-id", "client-secret")
}

/// Client with credentials and a valid bearer token already set.
pub fn client_for(server: &MockServer) -> AzureClient {
    let mut client = AzureClient::with_config(config_for(server));
    client.set_credentials(credentials());
    client.set_token(AzureToken {
        access_token: TOKEN.into(),
        token_type: "Bearer".into(),
        expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
    });
    client
}

pub fn rg_path(rg: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUB, rg)
}

pub fn network_path(rg: &str, kind: &str, name: &str) -> String {
    format!(
        "{}/providers/Microsoft.Network/{}/{}",
        rg_path(rg),
        kind,
        name
    )
}

pub fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}
