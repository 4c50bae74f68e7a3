//! Central service façade for the management operations.
//!
//! Owns the HTTP client and credentials, keeps the bearer token fresh and
//! exposes one async method per operation. Share it between tasks through
//! [`AzureServiceState`].

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::auth;
use crate::blockchain;
use crate::client::AzureClient;
use crate::config::AzureConfig;
use crate::container_instances::{self, ContainerParams};
use crate::logging;
use crate::lro::OperationContext;
use crate::networking;
use crate::resource_groups;
use crate::security::SecurityConfig;
use crate::types::*;

/// Thread-safe service handle.
pub type AzureServiceState = Arc<Mutex<AzureService>>;

/// Tokens expiring within this window are refreshed before the next call.
const TOKEN_REFRESH_SKEW_MINUTES: i64 = 5;

/// Snapshot of the service's connection state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub authenticated: bool,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub arm_endpoint: String,
    pub token_expires_at: Option<String>,
}

/// The core service combining client + credentials.
pub struct AzureService {
    client: AzureClient,
    credentials: AzureCredentials,
}

impl AzureService {
    pub fn new(credentials: AzureCredentials) -> Self {
        Self::with_config(credentials, AzureConfig::default())
    }

    pub fn with_config(credentials: AzureCredentials, config: AzureConfig) -> Self {
        let mut client = AzureClient::with_config(config);
        client.set_credentials(credentials.clone());
        Self {
            client,
            credentials,
        }
    }

    /// Credentials, endpoints and log level from the `AZURE_*` environment variables.
    pub fn from_env() -> AzureResult<Self> {
        let level = logging::apply_env_level();
        debug!("AzureService::from_env (log level {})", level);
        let credentials = AzureCredentials::from_env()?;
        let config = AzureConfig::from_env()?;
        Ok(Self::with_config(credentials, config))
    }

    /// Wrap into `Arc<Mutex<_>>` for sharing across tasks.
    pub fn into_shared(self) -> AzureServiceState {
        Arc::new(Mutex::new(self))
    }

    pub fn client(&self) -> &AzureClient {
        &self.client
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.is_authenticated()
    }

    pub fn connection_summary(&self) -> ConnectionSummary {
        let sub = &self.credentials.subscription_id;
        let tenant = &self.credentials.tenant_id;
        ConnectionSummary {
            authenticated: self.is_authenticated(),
            subscription_id: (!sub.is_empty()).then(|| sub.clone()),
            tenant_id: (!tenant.is_empty()).then(|| tenant.clone()),
            arm_endpoint: self.client.config().arm_endpoint.clone(),
            token_expires_at: self
                .client
                .token()
                .and_then(|t| t.expires_at.map(|e| e.to_rfc3339())),
        }
    }

    // ── Auth ─────────────────────────────────────────────────────────

    pub async fn authenticate(&mut self) -> AzureResult<()> {
        if !self.credentials.is_complete() {
            return Err(AzureError::new(
                AzureErrorKind::Auth,
                "failed to resolve Azure authorizer; subscription_id, tenant_id, client_id, and client_secret are all required",
            ));
        }
        let token = auth::acquire_token(&self.client, &self.credentials).await?;
        self.client.set_token(token);
        Ok(())
    }

    pub fn set_token(&mut self, token: AzureToken) {
        self.client.set_token(token);
    }

    pub fn disconnect(&mut self) {
        self.client.clear_token();
    }

    async fn ensure_auth(&mut self) -> AzureResult<()> {
        let skew = chrono::Duration::minutes(TOKEN_REFRESH_SKEW_MINUTES);
        let stale = self.client.token().map_or(true, |t| t.expires_within(skew));
        if stale || !self.client.is_authenticated() {
            self.authenticate().await?;
        }
        Ok(())
    }

    /// [`ensure_auth`](Self::ensure_auth) bounded by `ctx`; a cancelled
    /// context never reaches the token endpoint.
    async fn ensure_auth_within(&mut self, ctx: &OperationContext) -> AzureResult<()> {
        ctx.run("token request", self.ensure_auth()).await
    }

    // ── Resource Groups ──────────────────────────────────────────────

    pub async fn upsert_resource_group(
        &mut self,
        ctx: &OperationContext,
        region: &str,
        name: &str,
    ) -> AzureResult<String> {
        self.ensure_auth_within(ctx).await?;
        resource_groups::upsert_resource_group(&self.client, ctx, region, name).await
    }

    pub async fn delete_resource_group(
        &mut self,
        ctx: &OperationContext,
        name: &str,
    ) -> AzureResult<bool> {
        self.ensure_auth_within(ctx).await?;
        resource_groups::delete_resource_group(&self.client, ctx, name).await
    }

    pub async fn get_resource_group(&mut self, name: &str) -> AzureResult<ResourceGroup> {
        self.ensure_auth().await?;
        resource_groups::get_resource_group(&self.client, name).await
    }

    pub async fn list_resource_groups(&mut self) -> AzureResult<Vec<ResourceGroup>> {
        self.ensure_auth().await?;
        resource_groups::list_resource_groups(&self.client).await
    }

    pub async fn resource_group_exists(&mut self, name: &str) -> AzureResult<bool> {
        self.ensure_auth().await?;
        resource_groups::exists(&self.client, name).await
    }

    // ── Networking ───────────────────────────────────────────────────

    pub async fn upsert_virtual_network(
        &mut self,
        ctx: &OperationContext,
        group_name: &str,
        name: &str,
        region: &str,
    ) -> AzureResult<VirtualNetwork> {
        self.ensure_auth_within(ctx).await?;
        networking::upsert_virtual_network(&self.client, ctx, group_name, name, region).await
    }

    pub async fn delete_virtual_network(
        &mut self,
        ctx: &OperationContext,
        group_name: &str,
        name: &str,
    ) -> AzureResult<bool> {
        self.ensure_auth_within(ctx).await?;
        networking::delete_virtual_network(&self.client, ctx, group_name, name).await
    }

    pub async fn get_virtual_network(
        &mut self,
        group_name: &str,
        name: &str,
    ) -> AzureResult<VirtualNetwork> {
        self.ensure_auth().await?;
        networking::get_virtual_network(&self.client, group_name, name).await
    }

    pub async fn create_public_ip(
        &mut self,
        ctx: &OperationContext,
        ip_name: &str,
        location: &str,
        group_name: &str,
    ) -> AzureResult<PublicIpAddress> {
        self.ensure_auth_within(ctx).await?;
        networking::create_public_ip(&self.client, ctx, ip_name, location, group_name).await
    }

    pub async fn get_public_ip(
        &mut self,
        ctx: &OperationContext,
        ip_name: &str,
        group_name: &str,
    ) -> AzureResult<PublicIpAddress> {
        self.ensure_auth_within(ctx).await?;
        networking::get_public_ip(&self.client, ctx, ip_name, group_name).await
    }

    pub async fn create_load_balancer(
        &mut self,
        ctx: &OperationContext,
        lb_name: &str,
        location: &str,
        pip_name: &str,
        group_name: &str,
        security: Option<&SecurityConfig>,
    ) -> AzureResult<LoadBalancer> {
        self.ensure_auth_within(ctx).await?;
        networking::create_load_balancer(
            &self.client,
            ctx,
            lb_name,
            location,
            pip_name,
            group_name,
            security,
        )
        .await
    }

    pub async fn delete_load_balancer(
        &mut self,
        ctx: &OperationContext,
        lb_name: &str,
        group_name: &str,
    ) -> AzureResult<bool> {
        self.ensure_auth_within(ctx).await?;
        networking::delete_load_balancer(&self.client, ctx, lb_name, group_name).await
    }

    pub async fn get_load_balancer(
        &mut self,
        lb_name: &str,
        group_name: &str,
    ) -> AzureResult<LoadBalancer> {
        self.ensure_auth().await?;
        networking::get_load_balancer(&self.client, lb_name, group_name).await
    }

    // ── Container Instances ──────────────────────────────────────────

    pub async fn start_container(
        &mut self,
        ctx: &OperationContext,
        params: &ContainerParams,
    ) -> AzureResult<ContainerCreateResult> {
        self.ensure_auth_within(ctx).await?;
        container_instances::start_container(&self.client, ctx, params).await
    }

    pub async fn delete_container(
        &mut self,
        ctx: &OperationContext,
        group_name: &str,
        container_id: &str,
    ) -> AzureResult<bool> {
        self.ensure_auth_within(ctx).await?;
        container_instances::delete_container(&self.client, ctx, group_name, container_id).await
    }

    pub async fn get_container_group(
        &mut self,
        group_name: &str,
        name: &str,
    ) -> AzureResult<ContainerGroup> {
        self.ensure_auth().await?;
        container_instances::get_container_group(&self.client, group_name, name).await
    }

    pub async fn container_logs(
        &mut self,
        ctx: &OperationContext,
        group_name: &str,
        container_group: &str,
        container: &str,
    ) -> AzureResult<String> {
        self.ensure_auth_within(ctx).await?;
        container_instances::container_logs(&self.client, ctx, group_name, container_group, container)
            .await
    }

    // ── Blockchain Members ───────────────────────────────────────────

    pub async fn list_blockchain_members(
        &mut self,
        ctx: &OperationContext,
    ) -> AzureResult<Vec<BlockchainMember>> {
        self.ensure_auth_within(ctx).await?;
        blockchain::list_blockchain_members(&self.client, ctx).await
    }

    pub async fn list_blockchain_members_in_group(
        &mut self,
        ctx: &OperationContext,
        rg: &str,
    ) -> AzureResult<Vec<BlockchainMember>> {
        self.ensure_auth_within(ctx).await?;
        blockchain::list_blockchain_members_in_group(&self.client, ctx, rg).await
    }

    pub async fn get_blockchain_member(
        &mut self,
        ctx: &OperationContext,
        rg: &str,
        name: &str,
    ) -> AzureResult<BlockchainMember> {
        self.ensure_auth_within(ctx).await?;
        blockchain::get_blockchain_member(&self.client, ctx, rg, name).await
    }

    pub async fn list_consortium_members(
        &mut self,
        ctx: &OperationContext,
        rg: &str,
        name: &str,
    ) -> AzureResult<Vec<ConsortiumMember>> {
        self.ensure_auth_within(ctx).await?;
        blockchain::list_consortium_members(&self.client, ctx, rg, name).await
    }

    /// Blockchain members grouped by consortium name; members without one are skipped.
    pub async fn blockchain_members_by_consortium(
        &mut self,
        ctx: &OperationContext,
    ) -> AzureResult<BTreeMap<String, Vec<BlockchainMember>>> {
        let members = self.list_blockchain_members(ctx).await?;
        let mut grouped: BTreeMap<String, Vec<BlockchainMember>> = BTreeMap::new();
        for member in members {
            let consortium = member
                .properties
                .as_ref()
                .and_then(|p| p.consortium.clone());
            if let Some(c) = consortium {
                grouped.entry(c).or_default().push(member);
            }
        }
        Ok(grouped)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
