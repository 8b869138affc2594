//! Tool invocations through the router against a stubbed BloodHound.

use bloodhound_mcp::adapters::bloodhound_tools::build_catalog;
use bloodhound_mcp::adapters::tool_handler::{ToolRouter, ToolTimeouts};
use bloodhound_mcp::bloodhound::{BloodhoundClient, ClientOptions, Credential};
use bloodhound_mcp::domain::{ToolErrorKind, ToolInvocation, ToolPort, ToolStatus};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router_for(server: &MockServer) -> ToolRouter {
    let mut options = ClientOptions::new(server.uri());
    options.max_retries = 0;
    options.timeout = Duration::from_secs(5);
    let client = BloodhoundClient::new(
        Credential::new("test-token-id", SecretString::new("dGVzdC10b2tlbi1rZXk=".into())),
        options,
    )
    .unwrap();
    let catalog = build_catalog(Arc::new(client)).unwrap();
    ToolRouter::new(Arc::new(catalog), ToolTimeouts::default())
}

#[tokio::test]
async fn test_get_domains_returns_record_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/available-domains"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"name": "NORTH.SEVENKINGDOMS.LOCAL", "collected": true}],
            "count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let result = router
        .invoke(ToolInvocation::new("get_domains", json!({})))
        .await;

    assert_eq!(result.status, ToolStatus::Success);
    assert_eq!(
        result.payload["domains"],
        json!([{"name": "NORTH.SEVENKINGDOMS.LOCAL", "collected": true}])
    );
    assert_eq!(result.payload["count"], 1);
}

#[tokio::test]
async fn test_repeated_reads_are_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/domains/S-1-5-21-100/users"))
        .and(query_param("skip", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"name": "JON.SNOW@NORTH.SEVENKINGDOMS.LOCAL", "objectid": "S-1-5-21-100-1118"},
                {"name": "SANSA.STARK@NORTH.SEVENKINGDOMS.LOCAL", "objectid": "S-1-5-21-100-1112"}
            ],
            "count": 17,
            "skip": 0,
            "limit": 2
        })))
        .expect(2)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let invocation = ToolInvocation::new(
        "get_users",
        json!({"domain_id": "S-1-5-21-100", "limit": 2}),
    );

    let first = router.invoke(invocation.clone()).await;
    let second = router.invoke(invocation).await;

    assert!(first.is_success());
    assert_eq!(first.payload, second.payload);
    assert_eq!(first.payload["count"], 17);
    assert_eq!(first.payload["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_bloodhound() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let result = router
        .invoke(ToolInvocation::new("get_users", json!({"limit": 5})))
        .await;

    assert_eq!(result.error_kind(), Some(ToolErrorKind::InvalidArguments));
    assert!(result.to_text().contains("domain_id"));
}

#[tokio::test]
async fn test_negative_paging_rejected_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let result = router
        .invoke(ToolInvocation::new(
            "get_users",
            json!({"domain_id": "S-1-5-21-100", "skip": -20}),
        ))
        .await;

    assert_eq!(result.error_kind(), Some(ToolErrorKind::InvalidArguments));
    assert!(result.to_text().contains("skip"));
}

#[tokio::test]
async fn test_raw_query_gets_its_own_deadline() {
    use bloodhound_mcp::config::{BloodhoundSettings, ServerSettings, Settings, ToolSettings};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({"data": {"nodes": {"7": {"label": "DOMAIN ADMINS@NORTH.SEVENKINGDOMS.LOCAL"}}, "edges": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = Settings {
        bloodhound: BloodhoundSettings {
            domain: "127.0.0.1".to_string(),
            port: server.address().port(),
            scheme: "http".to_string(),
            token_id: "test-token-id".to_string(),
            token_key: SecretString::new("dGVzdC10b2tlbi1rZXk=".into()),
            request_timeout_secs: 1,
            ..BloodhoundSettings::default()
        },
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        tools: ToolSettings {
            raw_query_timeout_secs: 10,
            ..ToolSettings::default()
        },
        agent: Default::default(),
    };
    let (_client, router) = bloodhound_mcp::build_tool_router(&settings).unwrap();

    let result = router
        .invoke(ToolInvocation::new(
            "run_cypher_query",
            json!({"query": "MATCH (g:Group) RETURN g LIMIT 1"}),
        ))
        .await;

    assert_eq!(result.status, ToolStatus::Success);
    assert_eq!(result.payload["has_results"], true);
}
