use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "GIFHOARD_CONFIG";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const RUST_LOG_ENV: &str = "RUST_LOG";

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

/// Builds the effective configuration for the process.
///
/// The file comes from `cli_path`, else from `GIFHOARD_CONFIG`; with
/// neither, compiled-in defaults are used. `DATABASE_URL` and `RUST_LOG`
/// override the file.
pub fn resolve_config(cli_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let path = cli_path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;

    Ok(config)
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.is_empty()) {
        let path = url.strip_prefix("sqlite://").unwrap_or(&url);
        config.database.path = PathBuf::from(path);
    }
    if let Some(level) = lookup(RUST_LOG_ENV).filter(|v| !v.is_empty()) {
        config.logging.level = level;
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.source.base_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "source.base_url must not be empty".to_string(),
        });
    }

    if config.channels.sfw.is_empty() && config.channels.nsfw.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one channel must be configured".to_string(),
        });
    }

    // Channel names are case-insensitive at the source
    let mut seen = HashSet::new();
    for name in config.channels.sfw.iter().chain(config.channels.nsfw.iter()) {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::InvalidChannel {
                name: name.clone(),
                reason: "Channel names may only contain letters, digits and '_'".to_string(),
            });
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::InvalidChannel {
                name: name.clone(),
                reason: "Duplicate channel name".to_string(),
            });
        }
    }

    if config.transcoder.instances.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one transcoder instance must be configured".to_string(),
        });
    }

    for host in &config.transcoder.instances {
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::InvalidInstance {
                host: host.clone(),
                reason: "Instance must be an http:// or https:// URL".to_string(),
            });
        }
    }

    if config.source.request_timeout_secs == 0 || config.transcoder.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Request timeouts must be greater than zero".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TranscoderKind;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.transcoder.instances.len(), 5);
        assert_eq!(config.transcoder.kind, TranscoderKind::Gifs);
        assert!(config.ledger.retry_failed_after_days.is_none());
        assert!(config.channels.sfw.contains(&"gifs".to_string()));
    }

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "database": { "path": "/var/lib/gifhoard/store.db" },
            "channels": { "sfw": ["gifs", "CatGifs"], "nsfw": [] },
            "transcoder": {
                "kind": "gfycat",
                "instances": ["http://upload.gfycat.com"],
                "request_timeout_secs": 60
            },
            "scheduler": { "pause_between_sweeps_secs": 30, "one_shot": true },
            "ledger": { "retry_failed_after_days": 14 },
            "retention": { "max_age_days": 365 },
            "logging": { "level": "debug", "json": true }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/gifhoard/store.db"));
        assert_eq!(config.channels().len(), 2);
        assert_eq!(config.transcoder.kind, TranscoderKind::Gfycat);
        assert!(config.logging.json);

        let settings = config.scheduler_settings();
        assert!(settings.one_shot);
        assert_eq!(settings.pause_between_sweeps.as_secs(), 30);
        assert_eq!(settings.max_age, Some(chrono::Duration::days(365)));
    }

    #[test]
    fn test_rejects_no_channels() {
        let result = load_config_from_str(r#"{ "channels": { "sfw": [], "nsfw": [] } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_duplicate_channels() {
        let result =
            load_config_from_str(r#"{ "channels": { "sfw": ["gifs"], "nsfw": ["GIFS"] } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidChannel { .. })));
    }

    #[test]
    fn test_rejects_bad_channel_name() {
        let result = load_config_from_str(r#"{ "channels": { "sfw": ["gifs/../x"] } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidChannel { .. })));
    }

    #[test]
    fn test_rejects_no_instances() {
        let result = load_config_from_str(r#"{ "transcoder": { "instances": [] } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_bad_instance() {
        let result = load_config_from_str(r#"{ "transcoder": { "instances": ["gifs1"] } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidInstance { .. })));
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let result = load_config_from_str(r#"{ "source": { "base_url": " " } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("DATABASE_URL", "sqlite:///tmp/g.db"), ("RUST_LOG", "gifhoard=trace")]),
        );
        assert_eq!(config.database.path, PathBuf::from("/tmp/g.db"));
        assert_eq!(config.logging.level, "gifhoard=trace");
    }

    #[test]
    fn test_env_overrides_plain_path_and_empty_values() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("DATABASE_URL", "data/g.db"), ("RUST_LOG", "")]),
        );
        assert_eq!(config.database.path, PathBuf::from("data/g.db"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_resolve_config_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gifhoard.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{ "channels": {{ "sfw": ["gifs"], "nsfw": [] }} }}"#).unwrap();

        std::env::set_var(CONFIG_ENV, &path);
        std::env::set_var("DATABASE_URL", "sqlite://override.db");
        let config = resolve_config(None);
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var("DATABASE_URL");

        let config = config.unwrap();
        assert_eq!(config.channels.sfw, vec!["gifs".to_string()]);
        assert_eq!(config.database.path, PathBuf::from("override.db"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_missing_file() {
        std::env::remove_var(CONFIG_ENV);
        let result = resolve_config(Some(PathBuf::from("/nonexistent/gifhoard.json")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    #[serial]
    fn test_resolve_config_defaults() {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var("DATABASE_URL");
        let config = resolve_config(None).unwrap();
        assert_eq!(config.database.path, PathBuf::from("gifhoard.db"));
    }
}
