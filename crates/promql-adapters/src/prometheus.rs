//! Prometheus HTTP API client.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use promql_core::{with_cancellation, CancellationToken, PrometheusConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{AdapterError, AdapterResult};

/// `(timestamp, value)` pair as encoded by the Prometheus API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample(pub f64, pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Sample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Vector,
    Matrix,
    Scalar,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Series(Vec<Series>),
    Sample(Sample),
}

/// The `data` member of a successful query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub result_type: ResultType,
    pub result: QueryResult,
}

impl QueryData {
    pub fn series(&self) -> &[Series] {
        match &self.result {
            QueryResult::Series(series) => series,
            QueryResult::Sample(_) => &[],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parameters for a range query.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

/// Query backend consumed by the schema cache, validator and API.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Instant query, evaluated at `time` or at the server's "now".
    async fn query(
        &self,
        promql: &str,
        time: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> AdapterResult<QueryData>;

    async fn query_range(
        &self,
        promql: &str,
        range: &RangeQuery,
        cancel: &CancellationToken,
    ) -> AdapterResult<QueryData>;
}

/// HTTP client for the Prometheus query API
pub struct PrometheusClient {
    base_url: String,
    client: Client,
}

impl PrometheusClient {
    pub fn new(config: &PrometheusConfig) -> AdapterResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AdapterError::Configuration(e.to_string()))?;

        Ok(Self {
            base_url: config.address.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn send_request(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AdapterResult<QueryData> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Sending GET request to {}", url);

        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<ApiResponse>(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .as_ref()
                .and_then(|r| r.error.clone())
                .unwrap_or(body);
            return Err(AdapterError::RequestFailed(format!(
                "Request failed with status {}: {}",
                status, detail
            )));
        }

        let parsed = parsed.ok_or_else(|| {
            AdapterError::SerializationError(format!("unexpected response body: {}", body))
        })?;

        if parsed.status != "success" {
            return Err(AdapterError::InvalidResponse(format!(
                "{}: {}",
                parsed.error_type.unwrap_or_else(|| "error".to_string()),
                parsed.error.unwrap_or_default()
            )));
        }

        parsed
            .data
            .ok_or_else(|| AdapterError::InvalidResponse("response has no data".to_string()))
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    #[instrument(skip(self, cancel), fields(query_len = promql.len()))]
    async fn query(
        &self,
        promql: &str,
        time: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> AdapterResult<QueryData> {
        let mut params = vec![("query", promql.to_string())];
        if let Some(time) = time {
            params.push(("time", format_time(&time)));
        }

        with_cancellation(cancel, self.send_request("/api/v1/query", &params)).await
    }

    #[instrument(skip(self, range, cancel), fields(query_len = promql.len()))]
    async fn query_range(
        &self,
        promql: &str,
        range: &RangeQuery,
        cancel: &CancellationToken,
    ) -> AdapterResult<QueryData> {
        let params = vec![
            ("query", promql.to_string()),
            ("start", format_time(&range.start)),
            ("end", format_time(&range.end)),
            ("step", format!("{}", range.step.as_secs_f64())),
        ];

        with_cancellation(cancel, self.send_request("/api/v1/query_range", &params)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PrometheusClient {
        PrometheusClient::new(&PrometheusConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_instant_query_vector() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", "up"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "vector",
                    "result": [
                        {"metric": {"__name__": "up", "job": "api"}, "value": [1700000000.0, "1"]}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let data = client_for(&server)
            .query("up", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(data.result_type, ResultType::Vector);
        let series = data.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].metric.get("job").map(String::as_str), Some("api"));
        assert_eq!(series[0].value, Some(Sample(1700000000.0, "1".to_string())));
    }

    #[tokio::test]
    async fn test_scalar_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "scalar", "result": [1700000000.0, "42"]}
            })))
            .mount(&server)
            .await;

        let data = client_for(&server)
            .query("42", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(data.result_type, ResultType::Scalar);
        assert_eq!(
            data.result,
            QueryResult::Sample(Sample(1700000000.0, "42".to_string()))
        );
        assert!(data.series().is_empty());
    }

    #[tokio::test]
    async fn test_range_query_sends_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query_range"))
            .and(query_param("start", "2024-01-01T00:00:00.000Z"))
            .and(query_param("end", "2024-01-01T01:00:00.000Z"))
            .and(query_param("step", "60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "matrix",
                    "result": [
                        {"metric": {}, "values": [[1704067200.0, "1"], [1704067260.0, "2"]]}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let range = RangeQuery {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            step: Duration::from_secs(60),
        };
        let data = client_for(&server)
            .query_range("up", &range, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(data.result_type, ResultType::Matrix);
        assert_eq!(data.series()[0].values.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_request_surfaces_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "parse error at char 5: unexpected end of input"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query("rate(", None, &CancellationToken::new())
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("parse error"));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "success", "data": {"resultType": "vector", "result": []}}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = client_for(&server).query("up", None, &token).await;
        assert!(matches!(result, Err(AdapterError::Cancelled)));
    }
}
