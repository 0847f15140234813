//! Configuration validation utilities.
//!
//! Everything that can be checked without touching the network is checked
//! here, so a bad configuration fails before any adapter connects.

use sluice_core::env::process_env;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, PluginConfig, SluiceConfig};
use crate::registry::AdapterSettings;

/// Validates the entire configuration against the process environment.
pub fn validate_config(config: &SluiceConfig) -> ConfigResult<()> {
    validate_config_with(config, process_env)
}

/// Validates the entire configuration, resolving environment variables
/// through `lookup`.
pub fn validate_config_with<F>(config: &SluiceConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    validate_logging(&config.logging)?;

    for adapter in &config.adapters {
        if adapter.name.is_empty() {
            return Err(ConfigError::missing_field("adapters[].name"));
        }
        AdapterSettings::from_config(adapter, &lookup)?;
    }

    for plugin in &config.plugins {
        validate_plugin(plugin)?;
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_plugin(plugin: &PluginConfig) -> ConfigResult<()> {
    if plugin.image.trim().is_empty() {
        return Err(ConfigError::missing_field("plugins[].image"));
    }
    if plugin.environment.keys().any(|k| k.is_empty() || k.contains('=')) {
        return Err(ConfigError::validation(format!(
            "Plugin '{}' has an environment key that is empty or contains '='",
            plugin.image
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::AdapterConfig;

    fn valid_config() -> SluiceConfig {
        SluiceConfig {
            adapters: vec![
                AdapterConfig {
                    name: "slack".to_string(),
                    environment: BTreeMap::from([("key".to_string(), "xoxb".to_string())]),
                },
                AdapterConfig {
                    name: "http".to_string(),
                    environment: BTreeMap::from([("port".to_string(), "8080".to_string())]),
                },
            ],
            plugins: vec![PluginConfig {
                image: "org/echo".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config_with(&valid_config(), no_env).is_ok());
    }

    #[test]
    fn test_chat_key_is_mandatory() {
        let mut config = valid_config();
        config.adapters[0].environment.clear();
        assert!(matches!(
            validate_config_with(&config, no_env),
            Err(ConfigError::ValidationError { .. })
        ));

        // ... unless the environment provides it.
        let result = validate_config_with(&config, |name| {
            (name == "SLACK_KEY").then(|| "xoxb".to_string())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_http_port_must_be_valid() {
        for port in ["0", "65536", "eighty", ""] {
            let mut config = valid_config();
            config.adapters[1]
                .environment
                .insert("port".to_string(), port.to_string());
            assert!(
                validate_config_with(&config, no_env).is_err(),
                "port {port:?} accepted"
            );
        }
    }

    #[test]
    fn test_unknown_adapter() {
        let mut config = valid_config();
        config.adapters.push(AdapterConfig {
            name: "irc".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            validate_config_with(&config, no_env),
            Err(ConfigError::UnknownAdapter(_))
        ));
    }

    #[test]
    fn test_plugin_image_is_mandatory() {
        let mut config = valid_config();
        config.plugins[0].image = "  ".to_string();
        assert!(matches!(
            validate_config_with(&config, no_env),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = valid_config();
        config.logging.output = LogOutput::File;
        assert!(validate_config_with(&config, no_env).is_err());

        config.logging.file_path = Some("sluice.log".into());
        assert!(validate_config_with(&config, no_env).is_ok());
    }
}
