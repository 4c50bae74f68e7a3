//! # Azure Wrapper
//!
//! Thin async wrapper over the Azure Resource Manager REST API for standing
//! up and tearing down node infrastructure.
//!
//! ## Features
//!
//! - **Authentication** – service-principal client-credentials flow, token refresh
//! - **Long-running operations** – `Azure-AsyncOperation` / `Location` polling
//!   under a deadline and cancellation token
//! - **Resource Groups** – upsert, delete, get, list
//! - **Networking** – virtual networks, public IPs, load balancers built from an
//!   ingress security config
//! - **Container Instances** – start, delete, inspect, logs
//! - **Blockchain Service** – list and read blockchain and consortium members

pub mod types;
pub mod config;
pub mod logging;
pub mod client;
pub mod auth;
pub mod lro;
pub mod security;
pub mod resource_groups;
pub mod networking;
pub mod container_instances;
pub mod blockchain;
pub mod service;

pub use client::AzureClient;
pub use config::AzureConfig;
pub use container_instances::ContainerParams;
pub use lro::OperationContext;
pub use security::{IngressPorts, SecurityConfig};
pub use service::{AzureService, AzureServiceState};
pub use types::{AzureCredentials, AzureError, AzureErrorKind, AzureResult};
