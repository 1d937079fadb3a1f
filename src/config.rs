use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "DOCS_KB_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Search limits
    #[serde(default)]
    pub search: SearchConfig,

    /// Ingestion HTTP client configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment.
    ///
    /// An explicit `path` wins over `DOCS_KB_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let config_path = path
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        if let Some(config_path) = config_path {
            builder = builder.add_source(config::File::with_name(&config_path).required(false));
        }

        builder
            // Override with environment variables (prefix: DOCS_KB_)
            .add_source(
                config::Environment::with_prefix("DOCS_KB")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("storage.text_index_fields"),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Protocol transport
    #[serde(default)]
    pub transport: Transport,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path for the embedded database (sled)
    pub path: Option<PathBuf>,

    /// Root directory of on-disk text indexes; defaults to `<path>/text_index`
    pub index_path: Option<PathBuf>,

    /// Collection holding documentation records
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Create the text index at startup
    #[serde(default = "default_true")]
    pub create_text_index: bool,

    /// Document paths covered by the text index
    #[serde(default = "default_text_index_fields")]
    pub text_index_fields: Vec<String>,

    /// Text index writer memory budget (bytes)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,
}

impl StorageConfig {
    /// Text index root, derived from the database path when not set
    pub fn resolved_index_path(&self) -> Option<PathBuf> {
        self.index_path
            .clone()
            .or_else(|| self.path.as_ref().map(|p| p.join("text_index")))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            index_path: None,
            collection: default_collection(),
            create_text_index: default_true(),
            text_index_fields: default_text_index_fields(),
            writer_heap_size: default_writer_heap_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result count when the caller gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on any caller-supplied limit
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Records returned by a scoped resource read
    #[serde(default = "default_resource_list_limit")]
    pub resource_list_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_results: default_max_results(),
            resource_list_limit: default_resource_list_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Fetch timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent when fetching documents
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_collection() -> String {
    "documentation".to_string()
}

fn default_text_index_fields() -> Vec<String> {
    vec![
        "technology".to_string(),
        "content.title".to_string(),
        "content.description".to_string(),
    ]
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_limit() -> usize {
    10
}

fn default_max_results() -> usize {
    1000
}

fn default_resource_list_limit() -> usize {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "docs-knowledge-server".to_string()
}

fn default_true() -> bool {
    true
}
