//! Ingress security configuration and its expansion into container ports and
//! load-balancer rules.
//!
//! The config is keyed by CIDR block; each block lists TCP and UDP ports:
//!
//! ```json
//! { "egress": "*", "ingress": { "0.0.0.0/0": { "tcp": [4221, 4222], "udp": [] } } }
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::{
    AzureError, AzureResult, ContainerPort, LoadBalancingRule, LoadBalancingRuleProperties,
    SubResource,
};

pub const MISSING_SECURITY_CONFIG: &str = "container cannot start without security config";

/// Transport protocol of an ingress port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Container Instance spelling (`TCP` / `UDP`).
    pub fn container_name(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
        }
    }

    /// Network (load balancer) spelling (`Tcp` / `Udp`).
    pub fn network_name(&self) -> &'static str {
        match self {
            Self::Tcp => "Tcp",
            Self::Udp => "Udp",
        }
    }

    fn rule_prefix(&self) -> &'static str {
        match self {
            Self::Tcp => "lbRuleTcp",
            Self::Udp => "lbRuleUdp",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressPorts {
    #[serde(default, deserialize_with = "deserialize_ports")]
    pub tcp: Vec<u16>,
    #[serde(default, deserialize_with = "deserialize_ports")]
    pub udp: Vec<u16>,
}

/// Keys other than a typed `ingress` map (including `"ingress": null`) are
/// kept verbatim in `extra`, so a config is empty only when it had no keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct SecurityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<BTreeMap<String, IngressPorts>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TryFrom<Map<String, Value>> for SecurityConfig {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let ingress = match map.remove("ingress") {
            None => None,
            Some(Value::Null) => {
                map.insert("ingress".into(), Value::Null);
                None
            }
            Some(v) => Some(serde_json::from_value(v).map_err(|e| e.to_string())?),
        };
        let egress = map.remove("egress");
        Ok(Self {
            ingress,
            egress,
            extra: map.into_iter().collect(),
        })
    }
}

/// Port numbers may arrive as JSON floats (`4221.0`); accept any integral value in range.
fn deserialize_ports<'de, D>(deserializer: D) -> Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<f64>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| {
            if p.fract() == 0.0 && (1.0..=65535.0).contains(&p) {
                Ok(p as u16)
            } else {
                Err(serde::de::Error::custom(format!("invalid port {}", p)))
            }
        })
        .collect()
}

/// One expanded ingress port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub protocol: Protocol,
    pub port: u16,
}

impl SecurityConfig {
    pub fn from_value(value: &Value) -> AzureResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| AzureError::validation(format!("invalid security config: {}", e)))
    }

    /// Ingress rule for a single CIDR block.
    pub fn allow(mut self, cidr: impl Into<String>, ports: IngressPorts) -> Self {
        self.ingress
            .get_or_insert_with(BTreeMap::new)
            .insert(cidr.into(), ports);
        self
    }

    /// True when the config carried no keys at all.
    pub fn is_empty(&self) -> bool {
        self.ingress.is_none() && self.egress.is_none() && self.extra.is_empty()
    }

    /// Every ingress port in CIDR order, TCP before UDP within a block,
    /// without repeating a (protocol, port) pair.
    pub fn port_mappings(&self) -> Vec<PortMapping> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for ports in self.ingress.iter().flat_map(|m| m.values()) {
            let tcp = ports.tcp.iter().map(|&p| PortMapping { protocol: Protocol::Tcp, port: p });
            let udp = ports.udp.iter().map(|&p| PortMapping { protocol: Protocol::Udp, port: p });
            for mapping in tcp.chain(udp) {
                if seen.insert(mapping) {
                    out.push(mapping);
                }
            }
        }
        out
    }

    /// Container-group IP ports (with protocol) and container ports (without).
    pub fn container_ports(&self) -> (Vec<ContainerPort>, Vec<ContainerPort>) {
        let mappings = self.port_mappings();
        let group = mappings
            .iter()
            .map(|m| ContainerPort {
                port: m.port,
                protocol: Some(m.protocol.container_name().to_string()),
            })
            .collect();
        let mut seen = HashSet::new();
        let container = mappings
            .iter()
            .filter(|m| seen.insert(m.port))
            .map(|m| ContainerPort {
                port: m.port,
                protocol: None,
            })
            .collect();
        (group, container)
    }

    /// First TCP port, used as the health-probe port.
    pub fn health_check_port(&self) -> Option<u16> {
        self.port_mappings()
            .into_iter()
            .find(|m| m.protocol == Protocol::Tcp)
            .map(|m| m.port)
    }

    /// One load-balancing rule per ingress port.
    pub fn load_balancing_rules(&self, links: &RuleLinks) -> Vec<LoadBalancingRule> {
        let mut counters: BTreeMap<Protocol, usize> = BTreeMap::new();
        self.port_mappings()
            .into_iter()
            .map(|m| {
                let n = counters.entry(m.protocol).or_insert(0);
                let name = format!("{}{}", m.protocol.rule_prefix(), n);
                *n += 1;
                LoadBalancingRule {
                    name,
                    properties: Some(LoadBalancingRuleProperties {
                        protocol: m.protocol.network_name().to_string(),
                        frontend_port: m.port,
                        backend_port: m.port,
                        idle_timeout_in_minutes: 4,
                        enable_floating_ip: false,
                        load_distribution: "Default".to_string(),
                        frontend_ip_configuration: Some(SubResource::new(&links.frontend_ip_configuration)),
                        backend_address_pool: Some(SubResource::new(&links.backend_address_pool)),
                        probe: links.probe.as_ref().map(SubResource::new),
                    }),
                    ..Default::default()
                }
            })
            .collect()
    }
}

/// Sub-resource IDs a load-balancing rule points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLinks {
    pub frontend_ip_configuration: String,
    pub backend_address_pool: String,
    pub probe: Option<String>,
}

/// `None` means "no restriction"; a present but empty config is rejected.
pub fn validate_security(security: Option<&SecurityConfig>) -> AzureResult<()> {
    match security {
        Some(cfg) if cfg.is_empty() => Err(AzureError::validation(MISSING_SECURITY_CONFIG)),
        _ => Ok(()),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
