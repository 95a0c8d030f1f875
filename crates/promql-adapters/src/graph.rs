//! Neo4j-backed graph of related metrics.
//!
//! Talks to the HTTP transactional endpoint, so no Bolt driver is needed.
//! The graph is optional: [`connect_graph`] returns `None` when the feature is
//! disabled or the database stays unreachable after the startup retries.

use async_trait::async_trait;
use promql_core::{with_cancellation, CancellationToken, GraphConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::retry::RetryPolicy;
use crate::{AdapterError, AdapterResult};

const RELATED_METRICS_QUERY: &str = "MATCH (m:Metric {name: $name})-[r:RELATED]-(similar:Metric) \
     RETURN similar, r.weight AS weight \
     ORDER BY weight DESC \
     LIMIT 5";

const PING_QUERY: &str = "RETURN 1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedMetric {
    pub name: String,
    #[serde(default)]
    pub metric_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weight: f64,
}

/// Source of metric-similarity hints.
#[async_trait]
pub trait MetricGraph: Send + Sync {
    /// Up to five metrics related to `name`, strongest relationship first.
    async fn related_metrics(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<Vec<RelatedMetric>>;
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// HTTP client for the Neo4j transactional API
pub struct Neo4jClient {
    endpoint: String,
    user: String,
    password: String,
    client: Client,
}

impl Neo4jClient {
    pub fn new(config: &GraphConfig) -> AdapterResult<Self> {
        if config.uri.trim().is_empty() {
            return Err(AdapterError::Configuration(
                "knowledge graph uri is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AdapterError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
        })
    }

    async fn run(&self, statement: &str, parameters: Value) -> AdapterResult<Vec<TxRow>> {
        let body = json!({
            "statements": [{"statement": statement, "parameters": parameters}]
        });

        debug!("Sending graph statement to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::RequestFailed(format!(
                "Request failed with status: {}",
                response.status()
            )));
        }

        let response: TxResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::SerializationError(e.to_string()))?;

        if let Some(err) = response.errors.first() {
            return Err(AdapterError::InvalidResponse(format!(
                "{}: {}",
                err.code, err.message
            )));
        }

        Ok(response
            .results
            .into_iter()
            .flat_map(|result| result.data)
            .collect())
    }

    /// Checks connectivity with bounded fixed-backoff retries. Each attempt is
    /// cut off by the policy's attempt timeout.
    pub async fn connect(&self, policy: &RetryPolicy) -> AdapterResult<()> {
        policy
            .execute(|| async { self.run(PING_QUERY, json!({})).await.map(|_| ()) })
            .await
    }
}

fn related_from_row(row: &TxRow) -> Option<RelatedMetric> {
    let node = row.row.first()?;
    let name = node.get("name")?.as_str()?.to_string();
    let text = |key: &str| {
        node.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(RelatedMetric {
        name,
        metric_type: text("type"),
        description: text("description"),
        weight: row.row.get(1).and_then(Value::as_f64).unwrap_or_default(),
    })
}

#[async_trait]
impl MetricGraph for Neo4jClient {
    #[instrument(skip(self, cancel))]
    async fn related_metrics(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<Vec<RelatedMetric>> {
        let rows = with_cancellation(
            cancel,
            self.run(RELATED_METRICS_QUERY, json!({ "name": name })),
        )
        .await?;

        Ok(rows.iter().filter_map(related_from_row).collect())
    }
}

/// Builds and verifies the graph client, or disables the feature.
///
/// Never fails: an unreachable database is logged and yields `None`.
pub async fn connect_graph(config: &GraphConfig) -> Option<Neo4jClient> {
    if !config.enabled {
        debug!("Knowledge graph disabled");
        return None;
    }

    let client = match Neo4jClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            warn!("Knowledge graph disabled: {}", e);
            return None;
        }
    };

    let policy = RetryPolicy::fixed(config.connect_attempts, config.connect_backoff())
        .with_attempt_timeout(config.timeout());
    match client.connect(&policy).await {
        Ok(()) => {
            info!(uri = %config.uri, "Connected to knowledge graph");
            Some(client)
        }
        Err(e) => {
            warn!("Knowledge graph unreachable, continuing without it: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GraphConfig {
        GraphConfig {
            enabled: true,
            uri: server.uri(),
            user: "neo4j".to_string(),
            password: "secret".to_string(),
            connect_attempts: 3,
            connect_backoff_seconds: 0,
            timeout_seconds: 5,
            ..GraphConfig::default()
        }
    }

    #[tokio::test]
    async fn test_related_metrics_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(header("authorization", "Basic bmVvNGo6c2VjcmV0"))
            .and(body_partial_json(json!({
                "statements": [{"parameters": {"name": "http_requests_total"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "columns": ["similar", "weight"],
                    "data": [
                        {"row": [{"name": "http_errors_total", "type": "counter", "description": "errors"}, 0.9]},
                        {"row": [{"name": "http_latency_seconds"}, 0.4]}
                    ]
                }],
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Neo4jClient::new(&config_for(&server)).unwrap();
        let related = client
            .related_metrics("http_requests_total", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(related.len(), 2);
        assert_eq!(related[0].name, "http_errors_total");
        assert_eq!(related[0].metric_type, "counter");
        assert_eq!(related[0].weight, 0.9);
        assert_eq!(related[1].description, "");
    }

    #[tokio::test]
    async fn test_statement_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]
            })))
            .mount(&server)
            .await;

        let client = Neo4jClient::new(&config_for(&server)).unwrap();
        let err = client
            .related_metrics("x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[tokio::test]
    async fn test_connect_graph_disabled() {
        assert!(connect_graph(&GraphConfig::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_connect_graph_gives_up_after_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        assert!(connect_graph(&config_for(&server)).await.is_none());
    }

    #[tokio::test]
    async fn test_connect_graph_gives_up_on_silent_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [], "errors": []}))
                    .set_delay(std::time::Duration::from_secs(60)),
            )
            .mount(&server)
            .await;

        let config = GraphConfig {
            connect_attempts: 2,
            timeout_seconds: 1,
            ..config_for(&server)
        };
        let started = std::time::Instant::now();
        assert!(connect_graph(&config).await.is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_connect_graph_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"statements": [{"statement": "RETURN 1"}]})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"results": [], "errors": []})),
            )
            .mount(&server)
            .await;

        assert!(connect_graph(&config_for(&server)).await.is_some());
    }

    #[test]
    fn test_missing_uri_is_configuration_error() {
        let config = GraphConfig {
            enabled: true,
            ..GraphConfig::default()
        };
        assert!(matches!(
            Neo4jClient::new(&config),
            Err(AdapterError::Configuration(_))
        ));
    }
}
