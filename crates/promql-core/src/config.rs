use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix for structured environment overrides, e.g. `PROMQL_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "PROMQL";

/// Main application configuration.
///
/// Built once at process start and handed to every component that needs it.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub knowledge_graph: GraphConfig,
}

impl AppConfig {
    /// Load configuration from defaults and environment variables only.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None::<&Path>)
    }

    /// Load configuration from an optional file with environment overrides.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load_from<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_seconds", 30)?
            .set_default("server.max_query_length", 1000)?
            .set_default("prometheus.address", "http://localhost:9090")?
            .set_default("prometheus.timeout_seconds", 30)?
            .set_default("prometheus.schema_ttl_seconds", 300)?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.api_key", "")?
            .set_default("llm.base_url", "https://api.openai.com/v1")?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.top_p", 1.0)?
            .set_default("llm.max_tokens", 512)?
            .set_default("knowledge_graph.enabled", false)?
            .set_default("knowledge_graph.database", "neo4j")?
            .set_default("knowledge_graph.connect_attempts", 5)?
            .set_default("knowledge_graph.connect_backoff_seconds", 2)?
            .set_default("knowledge_graph.timeout_seconds", 10)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path.as_ref()).required(false));
        }

        let builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            // Short variable names kept for existing deployments.
            .set_override_option("server.port", env_var("SERVER_PORT"))?
            .set_override_option("prometheus.address", env_var("PROMETHEUS_URL"))?
            .set_override_option("llm.api_key", env_var("OPENAI_API_KEY"))?
            .set_override_option("llm.model", env_var("OPENAI_MODEL"))?
            .set_override_option("knowledge_graph.uri", env_var("NEO4J_URI"))?
            .set_override_option(
                "knowledge_graph.enabled",
                env_var("NEO4J_URI").map(|_| true),
            )?
            .set_override_option("knowledge_graph.user", env_var("NEO4J_USER"))?
            .set_override_option("knowledge_graph.password", env_var("NEO4J_PASSWORD"))?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("invalid server port: 0".to_string()));
        }
        if self.prometheus.address.trim().is_empty() {
            return Err(ConfigError::Message(
                "prometheus address is required".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Message(
                "llm temperature must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(ConfigError::Message(
                "llm top_p must be between 0 and 1".to_string(),
            ));
        }
        if self.knowledge_graph.enabled && self.knowledge_graph.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "knowledge graph timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            prometheus: PrometheusConfig::default(),
            llm: LlmConfig::default(),
            knowledge_graph: GraphConfig::default(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_query_length: default_max_query_length(),
        }
    }

    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_max_query_length() -> usize {
    1000
}

/// Query backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_address")]
    pub address: String,
    #[serde(default = "default_prometheus_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_schema_ttl_seconds")]
    pub schema_ttl_seconds: u64,
}

impl PrometheusConfig {
    pub fn new(address: String) -> Self {
        Self {
            address,
            timeout_seconds: default_prometheus_timeout_seconds(),
            schema_ttl_seconds: default_schema_ttl_seconds(),
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn schema_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_ttl_seconds)
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self::new(default_prometheus_address())
    }
}

fn default_prometheus_address() -> String {
    "http://localhost:9090".to_string()
}

fn default_prometheus_timeout_seconds() -> u64 {
    30
}

fn default_schema_ttl_seconds() -> u64 {
    300 // 5 minutes
}

/// Extra HTTP header sent with every completion request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderConfig {
    pub key: String,
    pub value: String,
}

/// Language-model provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub custom_headers: Vec<HeaderConfig>,
}

impl LlmConfig {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: default_base_url(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            proxy: None,
            organization: None,
            custom_headers: Vec::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push(HeaderConfig {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new(default_model(), String::new())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    512
}

/// Optional graph database used for metric-similarity enrichment
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_graph_database")]
    pub database: String,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: usize,
    #[serde(default = "default_connect_backoff_seconds")]
    pub connect_backoff_seconds: u64,
    /// Per-request limit, also applied to each startup attempt
    #[serde(default = "default_graph_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl GraphConfig {
    pub fn connect_backoff(&self) -> Duration {
        Duration::from_secs(self.connect_backoff_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            uri: String::new(),
            user: String::new(),
            password: String::new(),
            database: default_graph_database(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_seconds: default_connect_backoff_seconds(),
            timeout_seconds: default_graph_timeout_seconds(),
        }
    }
}

fn default_graph_database() -> String {
    "neo4j".to_string()
}

fn default_connect_attempts() -> usize {
    5
}

fn default_connect_backoff_seconds() -> u64 {
    2
}

fn default_graph_timeout_seconds() -> u64 {
    10
}
