use std::time::Duration;

use crate::config::{AnalysisConfig, Config, GraphConfig};

pub struct PipelineConfig {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    pub single_upload_timeout: Duration,
    pub batch_upload_timeout: Duration,
    pub query_timeout: Duration,
    pub graphs: GraphConfig,
    pub analysis: AnalysisConfig,
    /// Endpoint advertised in report provenance.
    pub sparql_endpoint: String,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let timeouts = &config.store.timeouts;
        Self {
            batch_size: config.upload.batch_size.max(1),
            inter_batch_delay: Duration::from_millis(config.upload.inter_batch_delay_ms),
            single_upload_timeout: Duration::from_secs(timeouts.single_upload_secs),
            batch_upload_timeout: Duration::from_secs(timeouts.batch_upload_secs),
            query_timeout: Duration::from_secs(timeouts.query_secs),
            graphs: config.graphs.clone(),
            analysis: config.analysis.clone(),
            sparql_endpoint: config
                .graphs
                .public_sparql_endpoint
                .clone()
                .unwrap_or_else(|| config.store.sparql_endpoint()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_defaults() {
        let config = PipelineConfig::from_config(&Config::default());
        assert_eq!(config.batch_size, 2000);
        assert_eq!(config.inter_batch_delay, Duration::from_secs(1));
        assert_eq!(config.single_upload_timeout, Duration::from_secs(300));
        assert_eq!(config.batch_upload_timeout, Duration::from_secs(10));
        assert_eq!(config.sparql_endpoint, "http://localhost:8890/sparql");
    }

    #[test]
    fn test_public_endpoint_preferred() {
        let mut config = Config::default();
        config.graphs.public_sparql_endpoint = Some("https://kg.example.org/sparql".to_string());
        let config = PipelineConfig::from_config(&config);
        assert_eq!(config.sparql_endpoint, "https://kg.example.org/sparql");
    }
}
