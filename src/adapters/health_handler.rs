use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bloodhound::BloodhoundClient;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub tools: usize,
}

pub struct HealthHandler {
    client: Arc<BloodhoundClient>,
    tool_count: usize,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(client: Arc<BloodhoundClient>, tool_count: usize) -> Self {
        Self {
            client,
            tool_count,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - returns 200 if the server is running
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            tools: self.tool_count,
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - returns 200 once BloodHound answers a signed request
    pub async fn ready(&self) -> impl IntoResponse {
        match self.client.version().await {
            Ok(version) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "bloodhound": version.get("data").cloned().unwrap_or(version),
                })),
            ),
            Err(e) => {
                tracing::warn!(kind = %e.kind, "Readiness check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "not_ready",
                        "kind": e.kind,
                        "message": e.message,
                    })),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloodhound::{ClientOptions, Credential};
    use secrecy::SecretString;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler(uri: &str) -> HealthHandler {
        let mut options = ClientOptions::new(uri);
        options.max_retries = 0;
        options.timeout = Duration::from_secs(2);
        let client = BloodhoundClient::new(
            Credential::new("id", SecretString::new("key".into())),
            options,
        )
        .unwrap();
        HealthHandler::new(Arc::new(client), 3)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = handler("http://127.0.0.1:9").health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_when_bloodhound_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"API": {"current_version": "v2"}, "server_version": "v5.8.0"}
            })))
            .mount(&server)
            .await;

        let response = handler(&server.uri()).ready().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready_on_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let response = handler(&server.uri()).ready().await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
