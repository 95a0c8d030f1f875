//! Application wiring

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use promql_adapters::{
    connect_graph, ChatCompletionClient, MetricSchemaCache, MetricsBackend, PrometheusClient,
    Validator,
};
use promql_agent::{ContextExtractor, Explainer, KnowledgePatterns, Translator};
use promql_api::AppState;
use promql_core::AppConfig;
use promql_nlp::NlpEngineImpl;

use crate::cli::Args;
use crate::server::Server;

/// Main application
pub struct App {
    config: AppConfig,
    state: AppState,
}

impl App {
    /// Load configuration and build every component.
    pub async fn build(args: Args) -> Result<Self> {
        args.validate().context("Invalid command line arguments")?;

        let mut config =
            AppConfig::load_from(args.config.as_ref()).context("Failed to load configuration")?;
        if let Some(port) = args.port {
            config.server.port = port;
        }

        let state = build_state(&config).await?;
        Ok(Self { config, state })
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        info!("Starting server");
        info!("HTTP address: {}", self.config.server.address());

        let server = Server::new(self.config.server, self.state);
        server.run().await
    }
}

async fn build_state(config: &AppConfig) -> Result<AppState> {
    info!("Initializing application components");

    let backend: Arc<dyn MetricsBackend> = Arc::new(
        PrometheusClient::new(&config.prometheus).context("Failed to create Prometheus client")?,
    );
    info!(address = %config.prometheus.address, "Prometheus client ready");

    if config.llm.api_key.is_empty() {
        warn!("No language-model API key configured; fallback and explanations will fail");
    }
    let llm = Arc::new(
        ChatCompletionClient::new(&config.llm).context("Failed to create completion client")?,
    );

    let schema = Arc::new(MetricSchemaCache::new(
        backend.clone(),
        config.prometheus.schema_ttl(),
    ));
    let validator = Arc::new(Validator::new(backend.clone()));
    let nlp = Arc::new(NlpEngineImpl::new().with_max_query_length(config.server.max_query_length));

    let mut extractor = ContextExtractor::new(
        nlp,
        schema.clone(),
        llm.clone(),
        Arc::new(KnowledgePatterns::new()),
    );
    if let Some(graph) = connect_graph(&config.knowledge_graph).await {
        extractor = extractor.with_graph(Arc::new(graph));
    }

    let translator = Arc::new(Translator::new(
        extractor,
        validator.clone(),
        Explainer::new(llm),
    ));

    Ok(AppState::new(translator, validator, backend, schema)
        .with_request_timeout(config.server.request_timeout()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_builds_from_defaults() {
        let config = AppConfig::default();
        let state = build_state(&config).await.unwrap();
        assert_eq!(state.request_timeout, config.server.request_timeout());
    }
}
