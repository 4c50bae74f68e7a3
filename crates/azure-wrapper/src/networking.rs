//! Azure Networking – virtual networks, public IPs, load balancers.

use log::debug;

use crate::client::AzureClient;
use crate::lro::{self, OperationContext};
use crate::security::{validate_security, RuleLinks, SecurityConfig};
use crate::types::{
    AddressSpace, AzureResult, BackendAddressPool, FrontendIpConfiguration,
    FrontendIpConfigurationProperties, LoadBalancer, LoadBalancerProperties, Probe,
    ProbeProperties, PublicIpAddress, PublicIpProperties, SubResource, Subnet, SubnetProperties,
    VirtualNetwork, VnetProperties,
};

pub const VNET_ADDRESS_SPACE: &str = "10.0.0.0/8";
/// Subnets carved out of [`VNET_ADDRESS_SPACE`] for every new virtual network.
pub const VNET_SUBNETS: [(&str, &str); 2] = [
    ("subnet1Name", "10.0.0.0/16"),
    ("subnet2Name", "10.1.0.0/16"),
];

pub const FRONTEND_IP_CONFIG_NAME: &str = "fip";
pub const BACKEND_POOL_NAME: &str = "backEndPool";
pub const PROBE_NAME: &str = "probe";
const PROBE_INTERVAL_SECS: u32 = 30;
const PROBE_COUNT: u32 = 2;

fn network_url(client: &AzureClient, rg: &str, kind: &str, name: &str) -> AzureResult<String> {
    let api = &client.config().api_version_network;
    client.resource_group_url(
        rg,
        &format!("/providers/Microsoft.Network/{}/{}?api-version={}", kind, name, api),
    )
}

// ─── Virtual Networks ───────────────────────────────────────────────

pub fn virtual_network_definition(region: &str) -> VirtualNetwork {
    VirtualNetwork {
        location: region.to_string(),
        properties: Some(VnetProperties {
            address_space: Some(AddressSpace {
                address_prefixes: vec![VNET_ADDRESS_SPACE.to_string()],
            }),
            subnets: VNET_SUBNETS
                .iter()
                .map(|(name, prefix)| Subnet {
                    name: name.to_string(),
                    properties: Some(SubnetProperties {
                        address_prefix: Some(prefix.to_string()),
                        provisioning_state: None,
                    }),
                    ..Default::default()
                })
                .collect(),
            provisioning_state: None,
        }),
        ..Default::default()
    }
}

/// Create or update a virtual network with the standard address plan.
pub async fn upsert_virtual_network(
    client: &AzureClient,
    ctx: &OperationContext,
    group_name: &str,
    name: &str,
    region: &str,
) -> AzureResult<VirtualNetwork> {
    let url = network_url(client, group_name, "virtualNetworks", name)?;
    debug!("upsert_virtual_network({}/{}) → {}", group_name, name, url);
    lro::put_and_wait(client, &url, &virtual_network_definition(region), ctx)
        .await
        .map_err(|e| e.context("cannot create virtual network"))
}

pub async fn delete_virtual_network(
    client: &AzureClient,
    ctx: &OperationContext,
    group_name: &str,
    name: &str,
) -> AzureResult<bool> {
    let url = network_url(client, group_name, "virtualNetworks", name)?;
    debug!("delete_virtual_network({}/{}) → {}", group_name, name, url);
    lro::delete_and_wait(client, &url, ctx)
        .await
        .map_err(|e| e.context("failed to delete virtual network"))
}

pub async fn get_virtual_network(
    client: &AzureClient,
    group_name: &str,
    name: &str,
) -> AzureResult<VirtualNetwork> {
    let url = network_url(client, group_name, "virtualNetworks", name)?;
    debug!("get_virtual_network({}/{}) → {}", group_name, name, url);
    client.get_json(&url).await
}

// ─── Public IP Addresses ────────────────────────────────────────────

/// Static IPv4 public address.
pub async fn create_public_ip(
    client: &AzureClient,
    ctx: &OperationContext,
    ip_name: &str,
    location: &str,
    group_name: &str,
) -> AzureResult<PublicIpAddress> {
    let url = network_url(client, group_name, "publicIPAddresses", ip_name)?;
    debug!("create_public_ip({}/{}) → {}", group_name, ip_name, url);
    let body = PublicIpAddress {
        name: ip_name.to_string(),
        location: location.to_string(),
        properties: Some(PublicIpProperties {
            public_ip_address_version: Some("IPv4".into()),
            public_ip_allocation_method: Some("Static".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    lro::put_and_wait(client, &url, &body, ctx)
        .await
        .map_err(|e| e.context("cannot create public ip address"))
}

pub async fn get_public_ip(
    client: &AzureClient,
    ctx: &OperationContext,
    ip_name: &str,
    group_name: &str,
) -> AzureResult<PublicIpAddress> {
    let url = network_url(client, group_name, "publicIPAddresses", ip_name)?;
    debug!("get_public_ip({}/{}) → {}", group_name, ip_name, url);
    ctx.run("public ip lookup", client.get_json(&url))
        .await
        .map_err(|e| e.context("failed to get public IP address"))
}

// ─── Load Balancers ─────────────────────────────────────────────────

/// ARM IDs of a load balancer's child resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerIds {
    pub frontend_ip_configuration: String,
    pub backend_address_pool: String,
    pub probe: String,
}

/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/loadBalancers`
pub fn load_balancer_id_prefix(subscription_id: &str, group_name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/loadBalancers",
        subscription_id, group_name
    )
}

impl LoadBalancerIds {
    // The leading slash before the prefix is part of the established ID format.
    pub fn new(subscription_id: &str, group_name: &str, lb_name: &str) -> Self {
        let prefix = load_balancer_id_prefix(subscription_id, group_name);
        Self {
            frontend_ip_configuration: format!(
                "/{}/{}/frontendIPConfigurations/{}",
                prefix, lb_name, FRONTEND_IP_CONFIG_NAME
            ),
            backend_address_pool: format!(
                "/{}/{}/backendAddressPools/{}",
                prefix, lb_name, BACKEND_POOL_NAME
            ),
            probe: format!("/{}/{}/probes/{}", prefix, lb_name, PROBE_NAME),
        }
    }
}

/// Build the load balancer body. Without any TCP port there is nothing to
/// probe, so the probe and the rules' probe links are left out.
pub fn load_balancer_definition(
    location: &str,
    public_ip: &PublicIpAddress,
    ids: &LoadBalancerIds,
    security: Option<&SecurityConfig>,
) -> LoadBalancer {
    let health_port = security.and_then(|s| s.health_check_port());
    let links = RuleLinks {
        frontend_ip_configuration: ids.frontend_ip_configuration.clone(),
        backend_address_pool: ids.backend_address_pool.clone(),
        probe: health_port.map(|_| ids.probe.clone()),
    };
    let rules = security
        .map(|s| s.load_balancing_rules(&links))
        .unwrap_or_default();
    let probes = health_port
        .map(|port| {
            vec![Probe {
                name: PROBE_NAME.to_string(),
                properties: Some(ProbeProperties {
                    protocol: "Tcp".to_string(),
                    port,
                    interval_in_seconds: PROBE_INTERVAL_SECS,
                    number_of_probes: PROBE_COUNT,
                }),
                ..Default::default()
            }]
        })
        .unwrap_or_default();

    LoadBalancer {
        location: location.to_string(),
        properties: Some(LoadBalancerProperties {
            frontend_ip_configurations: vec![FrontendIpConfiguration {
                name: FRONTEND_IP_CONFIG_NAME.to_string(),
                properties: Some(FrontendIpConfigurationProperties {
                    private_ip_allocation_method: Some("Dynamic".into()),
                    public_ip_address: Some(SubResource::new(public_ip.id.clone())),
                }),
                ..Default::default()
            }],
            backend_address_pools: vec![BackendAddressPool {
                name: BACKEND_POOL_NAME.to_string(),
                ..Default::default()
            }],
            probes,
            load_balancing_rules: rules,
            inbound_nat_rules: Vec::new(),
            provisioning_state: None,
        }),
        ..Default::default()
    }
}

/// Create a load balancer fronted by an existing public IP, with one rule per
/// ingress port in `security`.
pub async fn create_load_balancer(
    client: &AzureClient,
    ctx: &OperationContext,
    lb_name: &str,
    location: &str,
    pip_name: &str,
    group_name: &str,
    security: Option<&SecurityConfig>,
) -> AzureResult<LoadBalancer> {
    validate_security(security)?;

    let ids = LoadBalancerIds::new(client.subscription_id()?, group_name, lb_name);
    let pip = get_public_ip(client, ctx, pip_name, group_name).await?;
    debug!("create_load_balancer: public ip {}", pip.id);

    let url = network_url(client, group_name, "loadBalancers", lb_name)?;
    debug!("create_load_balancer({}/{}) → {}", group_name, lb_name, url);
    let body = load_balancer_definition(location, &pip, &ids, security);
    lro::put_and_wait(client, &url, &body, ctx)
        .await
        .map_err(|e| e.context("cannot create load balancer"))
}

pub async fn delete_load_balancer(
    client: &AzureClient,
    ctx: &OperationContext,
    lb_name: &str,
    group_name: &str,
) -> AzureResult<bool> {
    let url = network_url(client, group_name, "loadBalancers", lb_name)?;
    debug!("delete_load_balancer({}/{}) → {}", group_name, lb_name, url);
    lro::delete_and_wait(client, &url, ctx)
        .await
        .map_err(|e| e.context("cannot delete load balancer"))
}

pub async fn get_load_balancer(
    client: &AzureClient,
    lb_name: &str,
    group_name: &str,
) -> AzureResult<LoadBalancer> {
    let url = network_url(client, group_name, "loadBalancers", lb_name)?;
    debug!("get_load_balancer({}/{}) → {}", group_name, lb_name, url);
    client.get_json(&url).await
}

// ─── Tests ──────────────────────────────────────────────────────────
