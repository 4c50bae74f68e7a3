//! Azure Container Instances – start, delete, inspect and read logs of
//! container groups.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::client::AzureClient;
use crate::lro::{self, OperationContext};
use crate::security::{validate_security, SecurityConfig};
use crate::types::{
    AzureError, AzureErrorKind, AzureResult, Container, ContainerCreateResult, ContainerGroup,
    ContainerGroupProperties, ContainerInterface, ContainerIpAddress, ContainerLogs,
    ContainerProperties, ContainerResources, EnvironmentVariable, ResourceAllocation,
};

/// Inputs for [`start_container`].
#[derive(Debug, Clone, Default)]
pub struct ContainerParams {
    pub region: String,
    pub resource_group: String,
    pub image: Option<String>,
    pub cpu: f64,
    /// Memory in GB.
    pub memory: f64,
    pub entrypoint: Vec<String>,
    /// Only string values are passed to the container.
    pub environment: BTreeMap<String, serde_json::Value>,
    pub security: Option<SecurityConfig>,
}

fn container_group_url(client: &AzureClient, rg: &str, name: &str) -> AzureResult<String> {
    let api = &client.config().api_version_container;
    client.resource_group_url(
        rg,
        &format!(
            "/providers/Microsoft.ContainerInstance/containerGroups/{}?api-version={}",
            name, api
        ),
    )
}

fn environment_variables(env: &BTreeMap<String, serde_json::Value>) -> Vec<EnvironmentVariable> {
    env.iter()
        .filter_map(|(name, value)| match value.as_str() {
            Some(v) => Some(EnvironmentVariable {
                name: name.clone(),
                value: Some(v.to_string()),
            }),
            None => {
                debug!("skipping non-string environment value for {}", name);
                None
            }
        })
        .collect()
}

/// Build the container-group body; group and its single container share `name`.
pub fn container_group_definition(name: &str, params: &ContainerParams, image: &str) -> ContainerGroup {
    let (group_ports, container_ports) = params
        .security
        .as_ref()
        .map(|s| s.container_ports())
        .unwrap_or_default();
    let allocation = ResourceAllocation {
        cpu: Some(params.cpu),
        memory_in_gb: Some(params.memory),
    };

    ContainerGroup {
        name: name.to_string(),
        location: params.region.clone(),
        properties: Some(ContainerGroupProperties {
            containers: vec![Container {
                name: name.to_string(),
                properties: Some(ContainerProperties {
                    image: Some(image.to_string()),
                    command: params.entrypoint.clone(),
                    environment_variables: environment_variables(&params.environment),
                    resources: Some(ContainerResources {
                        requests: Some(allocation.clone()),
                        limits: Some(allocation),
                    }),
                    ports: container_ports,
                    instance_view: None,
                }),
            }],
            os_type: Some("Linux".into()),
            provisioning_state: None,
            ip_address: Some(ContainerIpAddress {
                ports: group_ports,
                ip_type: Some("Public".into()),
                ..Default::default()
            }),
            restart_policy: None,
        }),
        ..Default::default()
    }
}

fn create_result(group: &ContainerGroup) -> ContainerCreateResult {
    let ip = group.properties.as_ref().and_then(|p| p.ip_address.as_ref());
    ContainerCreateResult {
        container_ids: vec![group.name.clone()],
        interfaces: vec![ContainerInterface {
            host: ip.and_then(|i| i.fqdn.clone()),
            ipv4: ip.and_then(|i| i.ip.clone()),
            ..Default::default()
        }],
    }
}

/// Create a container group running `params.image` and wait until it is
/// provisioned. `config.container_start_timeout` bounds the wait when `ctx`
/// carries no deadline of its own; cancelling `ctx` aborts it.
pub async fn start_container(
    client: &AzureClient,
    ctx: &OperationContext,
    params: &ContainerParams,
) -> AzureResult<ContainerCreateResult> {
    let image = params.image.as_deref().ok_or_else(|| {
        AzureError::validation(format!(
            "Unable to start container in region: {}; container can only be started with a valid image",
            params.region
        ))
    })?;
    validate_security(params.security.as_ref())?;

    let ctx = ctx.or_timeout(client.config().container_start_timeout);
    let name = uuid::Uuid::new_v4().to_string();
    let url = container_group_url(client, &params.resource_group, &name)?;
    debug!("start_container({}/{}) → {}", params.resource_group, name, url);

    let body = container_group_definition(&name, params, image);
    let group: ContainerGroup = lro::put_and_wait(client, &url, &body, &ctx)
        .await
        .map_err(|e| {
            warn!("failed to create container group; {}", e);
            e.context("failed to create container group")
        })?;
    info!("started container group {} in {}", group.name, params.region);
    Ok(create_result(&group))
}

/// Delete a container group by name and wait for the deletion to finish.
/// Returns true when the group existed and was removed.
pub async fn delete_container(
    client: &AzureClient,
    ctx: &OperationContext,
    group_name: &str,
    container_id: &str,
) -> AzureResult<bool> {
    let url = container_group_url(client, group_name, container_id)?;
    debug!("delete_container({}/{}) → {}", group_name, container_id, url);
    lro::delete_and_wait(client, &url, ctx)
        .await
        .map_err(|e| e.context("Unable to delete container"))
}

pub async fn get_container_group(
    client: &AzureClient,
    group_name: &str,
    name: &str,
) -> AzureResult<ContainerGroup> {
    let url = container_group_url(client, group_name, name)?;
    debug!("get_container_group({}/{}) → {}", group_name, name, url);
    client.get_json(&url).await
}

/// Fetch the last `config.log_tail` log lines of one container.
pub async fn container_logs(
    client: &AzureClient,
    ctx: &OperationContext,
    group_name: &str,
    container_group: &str,
    container: &str,
) -> AzureResult<String> {
    let api = &client.config().api_version_container;
    let url = client.resource_group_url(
        group_name,
        &format!(
            "/providers/Microsoft.ContainerInstance/containerGroups/{}/containers/{}/logs?api-version={}&tail={}",
            container_group,
            container,
            api,
            client.config().log_tail
        ),
    )?;
    debug!("container_logs({}/{}/{}) → {}", group_name, container_group, container, url);
    let logs: ContainerLogs = ctx
        .run("container logs", client.get_json(&url))
        .await
        .map_err(|e| e.context("Unable to get container logs"))?;
    logs.content.ok_or_else(|| {
        AzureError::new(AzureErrorKind::Parse, "Unable to get container logs; empty response")
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
