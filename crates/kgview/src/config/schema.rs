use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub graphs: GraphConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// How requests to the graph CRUD endpoint authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Basic,
    #[default]
    Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the triple store, e.g. `http://virtuoso:8890`.
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_crud_path")]
    pub crud_path: String,
    #[serde(default = "default_sparql_path")]
    pub sparql_path: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default = "default_password_env")]
    pub password_env: Option<String>,
    #[serde(default)]
    pub auth: AuthScheme,
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_store_url() -> String {
    "http://localhost:8890".to_string()
}

fn default_crud_path() -> String {
    "/sparql-graph-crud-auth".to_string()
}

fn default_sparql_path() -> String {
    "/sparql".to_string()
}

fn default_username() -> String {
    "dba".to_string()
}

fn default_password_env() -> Option<String> {
    Some("DBA_PASSWORD".to_string())
}

fn default_pool_size() -> usize {
    20
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            crud_path: default_crud_path(),
            sparql_path: default_sparql_path(),
            username: default_username(),
            password: None,
            password_file: None,
            password_env: default_password_env(),
            auth: AuthScheme::default(),
            pool_max_idle_per_host: default_pool_size(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn crud_endpoint(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.crud_path)
    }

    pub fn sparql_endpoint(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.sparql_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause after a request timed out.
    #[serde(default = "default_timeout_backoff_ms")]
    pub timeout_backoff_ms: u64,
    /// Pause after any other transport error or retryable status.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_timeout_backoff_ms() -> u64 {
    5_000
}

fn default_error_backoff_ms() -> u64 {
    2_000
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_backoff_ms: default_timeout_backoff_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Single-shot upload carrying the whole dataset.
    #[serde(default = "default_single_upload_secs")]
    pub single_upload_secs: u64,
    #[serde(default = "default_batch_upload_secs")]
    pub batch_upload_secs: u64,
    #[serde(default = "default_query_secs")]
    pub query_secs: u64,
}

fn default_single_upload_secs() -> u64 {
    300
}

fn default_batch_upload_secs() -> u64 {
    10
}

fn default_query_secs() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            single_upload_secs: default_single_upload_secs(),
            batch_upload_secs: default_batch_upload_secs(),
            query_secs: default_query_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_base_uri")]
    pub base_uri: String,
    #[serde(default = "default_graph_name")]
    pub default_name: String,
    /// SPARQL endpoint advertised in reports. Falls back to the store's own.
    #[serde(default)]
    pub public_sparql_endpoint: Option<String>,
}

fn default_graph_base_uri() -> String {
    "http://localhost:8080/graph".to_string()
}

fn default_graph_name() -> String {
    "default".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_uri: default_graph_base_uri(),
            default_name: default_graph_name(),
            public_sparql_endpoint: None,
        }
    }
}

impl GraphConfig {
    /// Name actually used for a requested graph. Empty, blank and the literal
    /// `default` all resolve to the configured default graph.
    pub fn display_name<'a>(&'a self, graph_name: &'a str) -> &'a str {
        let trimmed = graph_name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("default") {
            &self.default_name
        } else {
            trimmed
        }
    }

    pub fn graph_uri(&self, graph_name: &str) -> String {
        format!(
            "{}/{}",
            self.base_uri.trim_end_matches('/'),
            self.display_name(graph_name)
        )
    }

    /// Inverse of [`graph_uri`](Self::graph_uri) for graphs under the base URI.
    pub fn graph_name<'a>(&self, graph_uri: &'a str) -> Option<&'a str> {
        let base = self.base_uri.trim_end_matches('/');
        graph_uri
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

fn default_batch_size() -> usize {
    2000
}

fn default_inter_batch_delay_ms() -> u64 {
    1_000
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_top_classes")]
    pub top_classes: usize,
    #[serde(default = "default_top_predicates")]
    pub top_predicates: usize,
    #[serde(default = "default_detail_classes")]
    pub detail_classes: usize,
    #[serde(default = "default_detail_instances")]
    pub detail_instances: usize,
}

fn default_top_classes() -> usize {
    100
}

fn default_top_predicates() -> usize {
    50
}

fn default_detail_classes() -> usize {
    10
}

fn default_detail_instances() -> usize {
    20
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_classes: default_top_classes(),
            top_predicates: default_top_predicates(),
            detail_classes: default_detail_classes(),
            detail_instances: default_detail_instances(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Upper bound on concurrently running ingestion jobs. Unbounded if unset.
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_uri_defaults() {
        let graphs = GraphConfig::default();
        assert_eq!(graphs.graph_uri(""), "http://localhost:8080/graph/default");
        assert_eq!(graphs.graph_uri("   "), "http://localhost:8080/graph/default");
        assert_eq!(graphs.graph_uri("people"), "http://localhost:8080/graph/people");
    }

    #[test]
    fn test_default_keyword_uses_configured_default() {
        let graphs = GraphConfig {
            default_name: "main".to_string(),
            ..Default::default()
        };
        assert_eq!(graphs.graph_uri(""), "http://localhost:8080/graph/main");
        assert_eq!(graphs.graph_uri("default"), "http://localhost:8080/graph/main");
        assert_eq!(graphs.graph_uri("Default"), "http://localhost:8080/graph/main");
        assert_eq!(graphs.display_name("default"), "main");
        assert_eq!(graphs.graph_uri("defaults"), "http://localhost:8080/graph/defaults");
    }

    #[test]
    fn test_graph_name_roundtrip() {
        let graphs = GraphConfig {
            base_uri: "http://example.org/graph/".to_string(),
            ..Default::default()
        };
        let uri = graphs.graph_uri("books");
        assert_eq!(uri, "http://example.org/graph/books");
        assert_eq!(graphs.graph_name(&uri), Some("books"));
        assert_eq!(graphs.graph_name("http://other.org/graph/books"), None);
        assert_eq!(graphs.graph_name("http://example.org/graph/"), None);
    }

    #[test]
    fn test_endpoints() {
        let store = StoreConfig {
            url: "http://virtuoso:8890/".to_string(),
            ..Default::default()
        };
        assert_eq!(store.sparql_endpoint(), "http://virtuoso:8890/sparql");
        assert_eq!(
            store.crud_endpoint(),
            "http://virtuoso:8890/sparql-graph-crud-auth"
        );
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.upload.batch_size, 2000);
        assert_eq!(config.store.retry.max_attempts, 5);
        assert_eq!(config.store.auth, AuthScheme::Digest);
        assert_eq!(config.analysis.top_predicates, 50);
        assert!(config.worker.max_concurrent_jobs.is_none());
    }
}
