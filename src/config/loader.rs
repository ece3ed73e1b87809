//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Environment, ProxyConfig};
use crate::config::validation::ValidationError;

/// Environment variable holding the shared secret.
pub const ENV_API_KEY: &str = "RELAY_API_KEY";
/// Environment variable selecting the deployment mode.
pub const ENV_MODE: &str = "RELAY_ENV";
/// Environment variable overriding the upstream base URL.
pub const ENV_UPSTREAM: &str = "RELAY_UPSTREAM";
/// Environment variable overriding the `/link` target.
pub const ENV_LINK_URL: &str = "RELAY_LINK_URL";
/// Environment variable overriding the bind address.
pub const ENV_BIND: &str = "RELAY_BIND";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid {var}: '{value}'")]
    Env { var: &'static str, value: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file.
///
/// Only syntax is checked here. Semantic validation runs once every layer
/// (file, environment, CLI) has been applied.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Overlay values from the environment onto a configuration.
///
/// `lookup` abstracts the variable source so callers can pass
/// `|k| std::env::var(k).ok()` or a fixed map.
pub fn apply_env_overrides<F>(mut config: ProxyConfig, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_API_KEY) {
        config.access.api_key = Some(key);
    }
    if let Some(mode) = lookup(ENV_MODE) {
        config.environment =
            Environment::parse(&mode).ok_or(ConfigError::Env { var: ENV_MODE, value: mode })?;
    }
    if let Some(upstream) = lookup(ENV_UPSTREAM) {
        config.upstream.base_url = upstream;
    }
    if let Some(link) = lookup(ENV_LINK_URL) {
        config.upstream.link_url = Some(link);
    }
    if let Some(bind) = lookup(ENV_BIND) {
        config.listener.bind_address = bind;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_config;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"

            [access]
            api_key = "from-file"
            gate_fallback = true
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
        assert_eq!(config.access.api_key.as_deref(), Some("from-file"));
        assert!(config.access.gate_fallback);
    }

    #[test]
    fn test_env_override_repairs_file_before_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream]\nbase_url = \"not a url\"").unwrap();

        let config = load_config(file.path()).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "upstream.base_url");

        let config = apply_env_overrides(
            config,
            lookup_from(&[(ENV_UPSTREAM, "https://upstream.test")]),
        )
        .unwrap();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_load_config_rejects_bad_syntax() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream\nbase_url = 1").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_env_overrides(
            ProxyConfig::default(),
            lookup_from(&[
                (ENV_API_KEY, "env-secret"),
                (ENV_MODE, "prod"),
                (ENV_UPSTREAM, "https://upstream.test"),
                (ENV_BIND, "127.0.0.1:9999"),
            ]),
        )
        .unwrap();

        assert_eq!(config.access.api_key.as_deref(), Some("env-secret"));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.upstream.base_url, "https://upstream.test");
        assert_eq!(config.upstream.link_url, None);
        assert_eq!(
            config.upstream.link_target().unwrap().as_str(),
            "https://upstream.test/link"
        );
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");
    }

    #[test]
    fn test_env_override_bad_mode() {
        let err = apply_env_overrides(ProxyConfig::default(), lookup_from(&[(ENV_MODE, "qa")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_MODE, .. }));
    }
}
