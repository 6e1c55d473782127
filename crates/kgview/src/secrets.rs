//! Credential resolution for the triple store.
//!
//! The store password is looked up in priority order:
//!
//! 1. **Direct value** - `store.password` in the config file
//! 2. **File reference** - `store.password_file`, for the Docker secrets pattern
//! 3. **Env var reference** - `store.password_env` (default `DBA_PASSWORD`)
//!
//! When none of them yields a value the store's factory password `dba` is used,
//! matching a freshly provisioned Virtuoso instance.

use secrecy::SecretString;
use std::fs;

use crate::config::StoreConfig;

/// Password used when no secret source is configured or populated.
const FALLBACK_PASSWORD: &str = "dba";

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Username and password presented to the store's CRUD endpoint.
#[derive(Clone)]
pub struct StoreCredentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl StoreCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Resolves credentials from the store section of the config.
    ///
    /// An unset password env var falls through to the factory password; a
    /// configured password file that cannot be read is an error.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let password = match resolve_secret(
            config.password.as_deref(),
            config.password_file.as_deref(),
            config.password_env.as_deref(),
        ) {
            Ok(secret) => secret,
            Err(SecretError::NoSourceProvided) | Err(SecretError::EnvVarNotSet { .. }) => {
                SecretString::from(FALLBACK_PASSWORD)
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            username: config.username.clone(),
            password,
        })
    }
}

/// Resolves a secret from multiple sources in priority order:
/// 1. Direct value (if provided and non-empty)
/// 2. File contents (if path provided)
/// 3. Environment variable (if name provided)
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    // Priority 1: Direct value
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    // Priority 2: File
    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(e) => Err(SecretError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    // Priority 3: Environment variable
    if let Some(var_name) = env_var {
        if !var_name.is_empty() {
            return match std::env::var(var_name) {
                // Env vars may carry trailing newlines
                Ok(value) => Ok(SecretString::from(value.trim())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: var_name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: var_name.to_string(),
                }),
            };
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Expands `~` to the user's home directory.
///
/// Only `~` and `~/path` are supported, not `~user/path`.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("KGVIEW_TEST_SECRET_1", "env_value");
        let secret =
            resolve_secret(Some("direct"), None, Some("KGVIEW_TEST_SECRET_1")).unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("KGVIEW_TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "file_value").unwrap();
        std::env::set_var("KGVIEW_TEST_SECRET_2", "env_value");

        let path = temp_file.path().to_str().unwrap();
        let secret = resolve_secret(None, Some(path), Some("KGVIEW_TEST_SECRET_2")).unwrap();
        assert_eq!(secret.expose_secret(), "file_value");
        std::env::remove_var("KGVIEW_TEST_SECRET_2");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("KGVIEW_TEST_SECRET_3", "env_value\n");
        let secret = resolve_secret(None, None, Some("KGVIEW_TEST_SECRET_3")).unwrap();
        assert_eq!(secret.expose_secret(), "env_value");
        std::env::remove_var("KGVIEW_TEST_SECRET_3");
    }

    #[test]
    fn test_no_source_error() {
        let result = resolve_secret(None, None, None);
        assert!(matches!(result, Err(SecretError::NoSourceProvided)));
    }

    #[test]
    fn test_file_not_found_error() {
        let result = resolve_secret(None, Some("/nonexistent/path/to/secret"), None);
        assert!(matches!(result, Err(SecretError::FileReadError { .. })));
    }

    #[test]
    #[serial]
    fn test_credentials_fall_back_to_factory_password() {
        let config = StoreConfig {
            password_env: Some("KGVIEW_DEFINITELY_UNSET_PASSWORD".to_string()),
            ..Default::default()
        };
        let creds = StoreCredentials::from_config(&config).unwrap();
        assert_eq!(creds.username, "dba");
        assert_eq!(creds.password.expose_secret(), "dba");
    }

    #[test]
    fn test_credentials_from_direct_password() {
        let config = StoreConfig {
            username: "loader".to_string(),
            password: Some("s3cret".to_string()),
            ..Default::default()
        };
        let creds = StoreCredentials::from_config(&config).unwrap();
        assert_eq!(creds.username, "loader");
        assert_eq!(creds.password.expose_secret(), "s3cret");
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }

    #[test]
    fn test_credentials_unreadable_file_is_error() {
        let config = StoreConfig {
            password_file: Some("/nonexistent/kgview/password".to_string()),
            ..Default::default()
        };
        assert!(StoreCredentials::from_config(&config).is_err());
    }
}
