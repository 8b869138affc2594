//! Raw Cypher queries and saved-query management.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::client::{BloodhoundClient, Listing, QueryParams};
use super::error::{ApiError, ApiErrorKind};

const CYPHER_PATH: &str = "/api/v2/graphs/cypher";
const SAVED_QUERIES_PATH: &str = "/api/v2/saved-queries";

/// Outcome of a raw graph query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherResult {
    /// `{nodes, edges}` as returned by the server
    pub data: Value,
    pub has_results: bool,
    /// Heuristic remarks about the query text
    pub warnings: Vec<String>,
}

/// Cheap lexical checks run before a query is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCheck {
    pub has_match: bool,
    pub has_return: bool,
    pub high_complexity: bool,
}

impl QueryCheck {
    pub fn inspect(query: &str) -> Self {
        let upper = query.to_uppercase();
        Self {
            has_match: upper.contains("MATCH"),
            has_return: upper.contains("RETURN"),
            high_complexity: ["*", "ALL", "COLLECT"].iter().any(|kw| upper.contains(kw)),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.has_return {
            warnings.push("query has no RETURN clause".to_string());
        }
        if self.high_complexity {
            warnings.push("query may be expensive (variable-length pattern or aggregation)".to_string());
        }
        warnings
    }
}

fn empty_graph() -> Value {
    json!({ "nodes": {}, "edges": [] })
}

impl BloodhoundClient {
    /// Run a Cypher query against the graph.
    ///
    /// A 404 from the server means the query ran and matched nothing; it is
    /// reported as an empty result, not an error. Results larger than the
    /// configured limit are refused rather than truncated.
    pub async fn run_cypher(
        &self,
        query: &str,
        include_properties: bool,
    ) -> Result<CypherResult, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::bad_request("Cypher query is empty"));
        }
        let check = QueryCheck::inspect(query);

        let body = json!({ "query": query, "includeproperties": include_properties });
        let data = match self.post_query(CYPHER_PATH, &body).await {
            Ok(response) => response.get("data").cloned().unwrap_or_else(empty_graph),
            Err(err) if err.kind == ApiErrorKind::NotFound => {
                debug!("Cypher query matched no data");
                return Ok(CypherResult {
                    data: empty_graph(),
                    has_results: false,
                    warnings: check.warnings(),
                });
            }
            Err(err) if err.kind == ApiErrorKind::BadRequest => {
                return Err(ApiError {
                    message: format!("Cypher query syntax error: {}", err.message),
                    ..err
                });
            }
            Err(err) => return Err(err),
        };

        let size = serde_json::to_vec(&data).map(|b| b.len()).unwrap_or(0);
        let limit = self.options().max_result_bytes;
        if size > limit {
            return Err(ApiError::new(
                ApiErrorKind::ResultTooLarge,
                format!(
                    "query returned {size} bytes, above the {limit} byte limit; add a LIMIT clause or narrow the pattern"
                ),
            ));
        }

        Ok(CypherResult {
            has_results: graph_has_results(&data),
            data,
            warnings: check.warnings(),
        })
    }

    /// `GET /api/v2/saved-queries`
    pub async fn list_saved_queries(
        &self,
        skip: u64,
        limit: usize,
        name: Option<&str>,
        sort_by: Option<&str>,
    ) -> Result<Listing, ApiError> {
        let query = QueryParams::new()
            .with_opt("name", name)
            .with_opt("sortby", sort_by);
        self.list(SAVED_QUERIES_PATH, &query, skip, limit).await
    }

    /// `POST /api/v2/saved-queries`
    pub async fn create_saved_query(
        &self,
        name: &str,
        query: &str,
        description: Option<&str>,
    ) -> Result<Value, ApiError> {
        if name.trim().is_empty() || query.trim().is_empty() {
            return Err(ApiError::bad_request("saved query needs a name and a query"));
        }
        let mut body = json!({ "name": name, "query": query });
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        let response = self.post(SAVED_QUERIES_PATH, &body).await?;
        Ok(response.get("data").cloned().unwrap_or(response))
    }
}

fn graph_has_results(data: &Value) -> bool {
    let non_empty = |key: &str| match data.get(key) {
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        _ => false,
    };
    non_empty("nodes") || non_empty("edges") || data.get("literals").is_some_and(|l| !l.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloodhound::client::ClientOptions;
    use crate::bloodhound::signer::Credential;
    use secrecy::SecretString;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, max_bytes: usize) -> BloodhoundClient {
        let mut options = ClientOptions::new(server.uri());
        options.initial_backoff = Duration::from_millis(1);
        options.max_result_bytes = max_bytes;
        BloodhoundClient::new(
            Credential::new("id", SecretString::new("key".into())),
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_query_check() {
        let check = QueryCheck::inspect("MATCH p=(u:User)-[*1..]->(g:Group) RETURN p");
        assert!(check.has_match);
        assert!(check.has_return);
        assert!(check.high_complexity);

        let warnings = QueryCheck::inspect("match (n:User)").warnings();
        assert_eq!(warnings, vec!["query has no RETURN clause".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, 1000).run_cypher("   ", true).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_results_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CYPHER_PATH))
            .and(body_json(json!({"query": "MATCH (n:User) RETURN n LIMIT 1", "includeproperties": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"nodes": {"1": {"label": "ALICE@CORP.LOCAL"}}, "edges": []}
            })))
            .mount(&server)
            .await;

        let result = client_for(&server, 10_000)
            .run_cypher("MATCH (n:User) RETURN n LIMIT 1", true)
            .await
            .unwrap();
        assert!(result.has_results);
        assert_eq!(result.data["nodes"]["1"]["label"], "ALICE@CORP.LOCAL");
    }

    #[tokio::test]
    async fn test_not_found_means_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CYPHER_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 10_000)
            .run_cypher("MATCH (n:Nope) RETURN n", false)
            .await
            .unwrap();
        assert!(!result.has_results);
        assert_eq!(result.data, empty_graph());
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CYPHER_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errors": [{"context": "", "message": "Invalid input 'RETRN'"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 10_000)
            .run_cypher("MATCH (n) RETRN n", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::BadRequest);
        assert!(err.message.starts_with("Cypher query syntax error"));
    }

    #[tokio::test]
    async fn test_oversized_result_refused() {
        let server = MockServer::start().await;
        let nodes: serde_json::Map<String, Value> = (0..50)
            .map(|i| (i.to_string(), json!({"label": format!("USER{i}@CORP.LOCAL")})))
            .collect();
        Mock::given(method("POST"))
            .and(path(CYPHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"nodes": nodes, "edges": []}})))
            .mount(&server)
            .await;

        let err = client_for(&server, 256)
            .run_cypher("MATCH (n:User) RETURN n", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::ResultTooLarge);
    }

    fn client_with_deadlines(server: &MockServer, timeout: Duration, query_timeout: Duration) -> BloodhoundClient {
        let mut options = ClientOptions::new(server.uri());
        options.initial_backoff = Duration::from_millis(1);
        options.timeout = timeout;
        options.query_timeout = query_timeout;
        BloodhoundClient::new(
            Credential::new("id", SecretString::new("key".into())),
            options,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_slow_query_runs_past_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CYPHER_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"data": {"nodes": {"1": {"label": "DA"}}, "edges": []}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_deadlines(&server, Duration::from_secs(1), Duration::from_secs(10));
        let result = client
            .run_cypher("MATCH (n:Group) RETURN n", false)
            .await
            .unwrap();
        assert!(result.has_results);
    }

    #[tokio::test]
    async fn test_timed_out_query_is_not_resent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CYPHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_deadlines(&server, Duration::from_secs(10), Duration::from_millis(500));
        let err = client
            .run_cypher("MATCH (n) RETURN n", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unreachable);
        assert!(err.timed_out);
    }

    #[tokio::test]
    async fn test_create_saved_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SAVED_QUERIES_PATH))
            .and(body_json(json!({"name": "kerberoastable", "query": "MATCH (u:User {hasspn:true}) RETURN u"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 7, "name": "kerberoastable"}})))
            .expect(1)
            .mount(&server)
            .await;

        let saved = client_for(&server, 1000)
            .create_saved_query("kerberoastable", "MATCH (u:User {hasspn:true}) RETURN u", None)
            .await
            .unwrap();
        assert_eq!(saved["id"], 7);
    }
}
