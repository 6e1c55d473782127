use std::path::Path;

use reqwest::Url;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

impl Config {
    /// Overlays settings from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlays settings from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VIRTUOSO_URL") {
            self.store.url = url;
        }
        if let Some(user) = lookup("VIRTUOSO_USER") {
            self.store.username = user;
        }
        if let Some(external) = lookup("EXTERNAL_VIRTUOSO_URL") {
            self.graphs.public_sparql_endpoint =
                Some(format!("{}/sparql", external.trim_end_matches('/')));
        }
        if let Some(base) = lookup("GRAPH_BASE_URI") {
            self.graphs.base_uri = format!("{}/graph", base.trim_end_matches('/'));
        }
        if let Some(name) = lookup("DEFAULT_GRAPH_NAME") {
            self.graphs.default_name = name;
        }
        if let Some(value) = lookup("KGVIEW_BATCH_SIZE") {
            self.upload.batch_size = parse_env("KGVIEW_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("KGVIEW_MAX_CONCURRENT_JOBS") {
            self.worker.max_concurrent_jobs = Some(parse_env("KGVIEW_MAX_CONCURRENT_JOBS", &value)?);
        }

        validate_config(self)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.upload.batch_size == 0 {
        return Err(ConfigError::Validation {
            message: "upload.batch_size must be greater than 0".to_string(),
        });
    }

    if config.store.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "store.retry.max_attempts must be greater than 0".to_string(),
        });
    }

    if config.worker.max_concurrent_jobs == Some(0) {
        return Err(ConfigError::Validation {
            message: "worker.max_concurrent_jobs must be greater than 0 when set".to_string(),
        });
    }

    for (field, value) in [
        ("store.url", config.store.url.as_str()),
        ("graphs.base_uri", config.graphs.base_uri.as_str()),
    ] {
        if let Err(e) = Url::parse(value) {
            return Err(ConfigError::Validation {
                message: format!("{} '{}' is not a valid URL: {}", field, value, e),
            });
        }
    }

    if let Some(endpoint) = &config.graphs.public_sparql_endpoint {
        if let Err(e) = Url::parse(endpoint) {
            return Err(ConfigError::Validation {
                message: format!(
                    "graphs.public_sparql_endpoint '{}' is not a valid URL: {}",
                    endpoint, e
                ),
            });
        }
    }

    if config.graphs.default_name.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "graphs.default_name must not be empty".to_string(),
        });
    }
    if let Err(reason) = crate::service::check_graph_name(&config.graphs.default_name) {
        return Err(ConfigError::Validation {
            message: format!("graphs.default_name: {}", reason),
        });
    }

    Ok(())
}
