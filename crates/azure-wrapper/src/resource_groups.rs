//! Azure Resource Groups – upsert, delete, get, list.

use std::collections::HashMap;

use log::debug;

use crate::client::AzureClient;
use crate::lro::{self, OperationContext};
use crate::types::{AzureErrorKind, AzureResult, CreateResourceGroupRequest, ResourceGroup};

fn resource_group_url(client: &AzureClient, name: &str) -> AzureResult<String> {
    let api = &client.config().api_version_resources;
    client.subscription_url(&format!("/resourcegroups/{}?api-version={}", name, api))
}

/// Create or update a resource group and return its ARM ID.
pub async fn upsert_resource_group(
    client: &AzureClient,
    ctx: &OperationContext,
    region: &str,
    name: &str,
) -> AzureResult<String> {
    let url = resource_group_url(client, name)?;
    debug!("upsert_resource_group({}) → {}", name, url);
    let request = CreateResourceGroupRequest {
        location: region.to_string(),
        tags: HashMap::new(),
    };
    let group: ResourceGroup = lro::put_and_wait(client, &url, &request, ctx)
        .await
        .map_err(|e| e.context("failed to upsert resource group"))?;
    Ok(group.id)
}

/// Delete a resource group (and everything in it); true when the service answered 200.
pub async fn delete_resource_group(
    client: &AzureClient,
    ctx: &OperationContext,
    name: &str,
) -> AzureResult<bool> {
    let url = resource_group_url(client, name)?;
    debug!("delete_resource_group({}) → {}", name, url);
    lro::delete_and_wait(client, &url, ctx)
        .await
        .map_err(|e| e.context("failed to delete resource group"))
}

/// Get a single resource group by name.
pub async fn get_resource_group(client: &AzureClient, name: &str) -> AzureResult<ResourceGroup> {
    let url = resource_group_url(client, name)?;
    debug!("get_resource_group({}) → {}", name, url);
    client.get_json(&url).await
}

/// List all resource groups in the subscription.
pub async fn list_resource_groups(client: &AzureClient) -> AzureResult<Vec<ResourceGroup>> {
    let api = &client.config().api_version_resources;
    let url = client.subscription_url(&format!("/resourcegroups?api-version={}", api))?;
    debug!("list_resource_groups → {}", url);
    client.get_all_pages(&url).await
}

/// Check whether a resource group exists.
pub async fn exists(client: &AzureClient, name: &str) -> AzureResult<bool> {
    match get_resource_group(client, name).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind == AzureErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
