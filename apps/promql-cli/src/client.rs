//! HTTP client for the translation API

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub promql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResult {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<(f64, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<(f64, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub result_type: String,
    pub result: Value,
    pub chart_type: String,
}

impl ExecuteResponse {
    /// Result as series, or empty for scalar and string results.
    pub fn series(&self) -> Vec<SeriesResult> {
        serde_json::from_value(self.result.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecuteRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::builder().build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn convert(&self, query: &str) -> Result<ConvertResponse> {
        let response = self
            .http
            .post(self.url("/api/v1/convert"))
            .json(&json!({ "query": query }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn validate(&self, promql: &str) -> Result<ValidateResponse> {
        let response = self
            .http
            .post(self.url("/api/v1/validate"))
            .json(&json!({ "promql": promql }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse> {
        let response = self
            .http
            .post(self.url("/api/v1/execute"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn metrics(&self) -> Result<Vec<String>> {
        let response = self.http.get(self.url("/api/v1/metrics")).send().await?;
        Self::decode(response).await
    }

    /// Health body; a degraded server answers 503 with the same shape.
    pub async fn health(&self) -> Result<Value> {
        let response = self.http.get(self.url("/health")).send().await?;
        if response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Ok(response.json().await?);
        }
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_convert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/convert"))
            .and(body_json(json!({"query": "error rate"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promql": "rate(http_errors_total[5m])",
                "explanation": "Error rate."
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/", server.uri())).unwrap();
        let response = client.convert("error rate").await.unwrap();
        assert_eq!(response.promql, "rate(http_errors_total[5m])");
        assert_eq!(response.explanation.as_deref(), Some("Error rate."));
        assert!(response.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_message_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/convert"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "failed to build query: no metric specified"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        match client.convert("???").await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("no metric specified"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_degraded_health_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(json!({"status": "degraded", "prometheus": false})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health["status"], "degraded");
    }

    #[test]
    fn test_execute_series() {
        let response: ExecuteResponse = serde_json::from_value(json!({
            "resultType": "vector",
            "result": [{"metric": {"job": "api"}, "value": [1700000000.0, "1"]}],
            "chartType": "table"
        }))
        .unwrap();
        let series = response.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value.as_ref().unwrap().1, "1");
    }
}
