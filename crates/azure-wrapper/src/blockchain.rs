//! Azure Blockchain Service – read-only member and consortium queries.

use log::debug;

use crate::client::AzureClient;
use crate::lro::OperationContext;
use crate::types::{AzureResult, BlockchainMember, ConsortiumMember};

const PROVIDER: &str = "/providers/Microsoft.Blockchain/blockchainMembers";

fn api(client: &AzureClient) -> &str {
    &client.config().api_version_blockchain
}

/// List every blockchain member in the subscription.
pub async fn list_blockchain_members(
    client: &AzureClient,
    ctx: &OperationContext,
) -> AzureResult<Vec<BlockchainMember>> {
    let url = client.subscription_url(&format!("{}?api-version={}", PROVIDER, api(client)))?;
    debug!("list_blockchain_members → {}", url);
    ctx.run("blockchain member list", client.get_all_pages(&url))
        .await
        .map_err(|e| e.context("failed to list blockchain members"))
}

pub async fn list_blockchain_members_in_group(
    client: &AzureClient,
    ctx: &OperationContext,
    rg: &str,
) -> AzureResult<Vec<BlockchainMember>> {
    let url = client.resource_group_url(rg, &format!("{}?api-version={}", PROVIDER, api(client)))?;
    debug!("list_blockchain_members_in_group({}) → {}", rg, url);
    ctx.run("blockchain member list", client.get_all_pages(&url))
        .await
        .map_err(|e| e.context(format!("failed to list blockchain members in {}", rg)))
}

pub async fn get_blockchain_member(
    client: &AzureClient,
    ctx: &OperationContext,
    rg: &str,
    name: &str,
) -> AzureResult<BlockchainMember> {
    let url = client.resource_group_url(
        rg,
        &format!("{}/{}?api-version={}", PROVIDER, name, api(client)),
    )?;
    debug!("get_blockchain_member({}/{}) → {}", rg, name, url);
    ctx.run("blockchain member lookup", client.get_json(&url))
        .await
        .map_err(|e| e.context(format!("failed to get blockchain member {}", name)))
}

/// Members of the consortium that `name` belongs to.
pub async fn list_consortium_members(
    client: &AzureClient,
    ctx: &OperationContext,
    rg: &str,
    name: &str,
) -> AzureResult<Vec<ConsortiumMember>> {
    let url = client.resource_group_url(
        rg,
        &format!(
            "{}/{}/consortiumMembers?api-version={}",
            PROVIDER,
            name,
            api(client)
        ),
    )?;
    debug!("list_consortium_members({}/{}) → {}", rg, name, url);
    ctx.run("consortium member list", client.get_all_pages(&url))
        .await
        .map_err(|e| e.context(format!("failed to list consortium members of {}", name)))
}

// ─── Tests ──────────────────────────────────────────────────────────
