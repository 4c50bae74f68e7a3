mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use azure_wrapper::container_instances::{self, ContainerParams};
use azure_wrapper::{AzureErrorKind, IngressPorts, OperationContext, SecurityConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

const GROUPS_RE: &str = r"^/subscriptions/sub-123/resourceGroups/rg1/providers/Microsoft\.ContainerInstance/containerGroups/[0-9a-f-]{36}$";

fn params() -> ContainerParams {
    let mut environment = BTreeMap::new();
    environment.insert("NETWORK_ID".to_string(), json!("net-1"));
    environment.insert("IGNORED".to_string(), json!(true));
    ContainerParams {
        region: "eastus".into(),
        resource_group: "rg1".into(),
        image: Some("provide/geth:latest".into()),
        cpu: 2.0,
        memory: 4.0,
        entrypoint: vec![],
        environment,
        security: Some(SecurityConfig::default().allow(
            "0.0.0.0/0",
            IngressPorts {
                tcp: vec![8545],
                udp: vec![],
            },
        )),
    }
}

#[tokio::test]
async fn start_waits_for_provisioning_and_reports_interface() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("PUT"))
        .and(path_regex(GROUPS_RE))
        .and(query_param("api-version", "2018-10-01"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "properties": {"provisioningState": "Creating"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(GROUPS_RE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Pending"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(GROUPS_RE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "from-service",
            "properties": {
                "provisioningState": "Succeeded",
                "ipAddress": {"ip": "20.1.2.3", "fqdn": "node.eastus.azurecontainer.io", "ports": [{"port": 8545, "protocol": "TCP"}]}
            }
        })))
        .mount(&server)
        .await;

    let result =
        container_instances::start_container(&client, &OperationContext::background(), &params())
            .await
            .unwrap();
    assert_eq!(result.container_ids, vec!["from-service".to_string()]);
    assert_eq!(result.interfaces[0].host.as_deref(), Some("node.eastus.azurecontainer.io"));
    assert_eq!(result.interfaces[0].ipv4.as_deref(), Some("20.1.2.3"));

    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    let group_name = put.url.path().rsplit('/').next().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&group_name).is_ok());

    let body: Value = put.body_json().unwrap();
    assert_eq!(body["name"], group_name.as_str());
    assert_eq!(body["location"], "eastus");
    assert_eq!(body["properties"]["osType"], "Linux");
    assert_eq!(body["properties"]["ipAddress"]["type"], "Public");
    let container = &body["properties"]["containers"][0];
    assert_eq!(container["name"], group_name.as_str());
    assert_eq!(container["properties"]["image"], "provide/geth:latest");
    assert_eq!(
        container["properties"]["environmentVariables"],
        json!([{"name": "NETWORK_ID", "value": "net-1"}])
    );
    assert_eq!(
        container["properties"]["resources"]["limits"],
        json!({"cpu": 2.0, "memoryInGB": 4.0})
    );
}

#[tokio::test]
async fn start_without_image_sends_nothing() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut p = params();
    p.image = None;
    let err = container_instances::start_container(&client, &OperationContext::background(), &p)
        .await
        .unwrap_err();
    assert_eq!(err.kind, AzureErrorKind::Validation);
}

#[tokio::test]
async fn cancelling_context_aborts_pending_start() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("PUT"))
        .and(path_regex(GROUPS_RE))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "properties": {"provisioningState": "Creating"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(GROUPS_RE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Pending"}
        })))
        .mount(&server)
        .await;

    let ctx = OperationContext::background();
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let err = container_instances::start_container(&client, &ctx, &params())
        .await
        .unwrap_err();
    assert_eq!(err.kind, AzureErrorKind::Cancelled);
    assert!(err.message.starts_with("failed to create container group"));
}

#[tokio::test]
async fn caller_deadline_bounds_start() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("PUT"))
        .and(path_regex(GROUPS_RE))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "properties": {"provisioningState": "Creating"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(GROUPS_RE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Pending"}
        })))
        .mount(&server)
        .await;

    let ctx = OperationContext::with_timeout(Duration::from_millis(150));
    let err = container_instances::start_container(&client, &ctx, &params())
        .await
        .unwrap_err();
    assert_eq!(err.kind, AzureErrorKind::Timeout);
}

#[tokio::test]
async fn logs_request_tail() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("GET"))
        .and(path(format!(
            "{}/providers/Microsoft.ContainerInstance/containerGroups/cg1/containers/cg1/logs",
            rg_path("rg1")
        )))
        .and(query_param("tail", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "booted\nready\n"})))
        .mount(&server)
        .await;

    let logs = container_instances::container_logs(
        &client,
        &OperationContext::background(),
        "rg1",
        "cg1",
        "cg1",
    )
    .await
    .unwrap();
    assert_eq!(logs.lines().collect::<Vec<_>>(), vec!["booted", "ready"]);
}

#[tokio::test]
async fn delete_container_errors_carry_context() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("DELETE"))
        .and(path(format!(
            "{}/providers/Microsoft.ContainerInstance/containerGroups/cg1",
            rg_path("rg1")
        )))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "AuthorizationFailed", "message": "no access"}
        })))
        .mount(&server)
        .await;

    let err = container_instances::delete_container(
        &client,
        &OperationContext::background(),
        "rg1",
        "cg1",
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, AzureErrorKind::Forbidden);
    assert!(err.message.starts_with("Unable to delete container"));
}

fn cg1_path() -> String {
    format!(
        "{}/providers/Microsoft.ContainerInstance/containerGroups/cg1",
        rg_path("rg1")
    )
}

#[tokio::test]
async fn delete_container_polls_async_operation() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let status_url = format!("{}/operations/del1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(cg1_path()))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", status_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/del1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/del1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;

    let deleted = container_instances::delete_container(
        &client,
        &OperationContext::background(),
        "rg1",
        "cg1",
    )
    .await
    .unwrap();
    assert!(deleted);
}

#[tokio::test]
async fn delete_container_times_out_while_in_progress() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let status_url = format!("{}/operations/del2", server.uri());

    Mock::given(method("DELETE"))
        .and(path(cg1_path()))
        .respond_with(
            ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", status_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/del2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .mount(&server)
        .await;

    let err = container_instances::delete_container(
        &client,
        &OperationContext::with_timeout(Duration::from_millis(150)),
        "rg1",
        "cg1",
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, AzureErrorKind::Timeout);
    assert!(err.message.starts_with("Unable to delete container"));
}
