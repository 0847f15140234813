//! Adapter factory.
//!
//! Adapters are selected by their configured `name`. The same name prefixes
//! the environment variables that override their settings, so an adapter
//! named `slack` reads its key from `SLACK_KEY` before its `key` entry.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use sluice_adapter_chat::{ChatAdapter, ChatConfig};
use sluice_adapter_http::{HttpAdapter, HttpConfig};
use sluice_core::{AdapterResult, BoxedAdapter};

use crate::config::{AdapterConfig, ConfigError, ConfigResult};
use crate::error::{RuntimeError, RuntimeResult};

/// Adapter kinds known to the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Chat,
    Http,
}

impl AdapterKind {
    /// Every accepted adapter name.
    pub const NAMES: &'static [&'static str] = &["slack", "chat", "http"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "slack" | "chat" => Some(Self::Chat),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

/// Parsed settings of one adapter.
#[derive(Debug, Clone)]
pub enum AdapterSettings {
    Chat(ChatConfig),
    Http(HttpConfig),
}

impl AdapterSettings {
    /// Parses and checks the settings of `config`.
    ///
    /// `lookup` resolves environment variables, which win over the
    /// configuration file.
    pub fn from_config<F>(config: &AdapterConfig, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = AdapterKind::from_name(&config.name)
            .ok_or_else(|| ConfigError::UnknownAdapter(config.name.clone()))?;
        let settings: BTreeMap<String, String> = config.settings();

        let parsed = match kind {
            AdapterKind::Chat => {
                ChatConfig::from_environment(&config.name, &settings, lookup).map(Self::Chat)
            }
            AdapterKind::Http => {
                HttpConfig::from_environment(&config.name, &settings, lookup).map(Self::Http)
            }
        };
        parsed.map_err(|e| ConfigError::validation(e.to_string()))
    }

    /// Constructs the adapter. For a chat adapter this performs the
    /// handshake; for HTTP it binds the listener.
    pub async fn build(self, name: &str) -> AdapterResult<BoxedAdapter> {
        let adapter: BoxedAdapter = match self {
            Self::Chat(config) => Arc::new(ChatAdapter::connect(name, config).await?),
            Self::Http(config) => Arc::new(HttpAdapter::bind(name, config).await?),
        };
        Ok(adapter)
    }
}

/// Constructs every configured adapter in order. The first failure aborts.
pub async fn build_adapters<F>(configs: &[AdapterConfig], lookup: F) -> RuntimeResult<Vec<BoxedAdapter>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut adapters = Vec::with_capacity(configs.len());
    for config in configs {
        let settings = AdapterSettings::from_config(config, &lookup)?;
        debug!(adapter = %config.name, settings = ?settings, "Constructing adapter");

        let adapter = settings
            .build(&config.name)
            .await
            .map_err(|source| RuntimeError::Adapter {
                name: config.name.clone(),
                source,
            })?;

        info!(adapter = %config.name, "Adapter loaded");
        adapters.push(adapter);
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(name: &str, entries: &[(&str, &str)]) -> AdapterConfig {
        AdapterConfig {
            name: name.to_string(),
            environment: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(AdapterKind::from_name("slack"), Some(AdapterKind::Chat));
        assert_eq!(AdapterKind::from_name("Chat"), Some(AdapterKind::Chat));
        assert_eq!(AdapterKind::from_name("http"), Some(AdapterKind::Http));
        assert_eq!(AdapterKind::from_name("irc"), None);
    }

    #[test]
    fn test_settings_accept_uppercase_keys() {
        let settings =
            AdapterSettings::from_config(&adapter("http", &[("PORT", "8080")]), |_| None).unwrap();
        assert!(matches!(settings, AdapterSettings::Http(ref c) if c.port == 8080));
    }

    #[test]
    fn test_environment_wins_over_file() {
        let settings = AdapterSettings::from_config(&adapter("slack", &[("key", "from-file")]), |name| {
            (name == "SLACK_KEY").then(|| "from-env".to_string())
        })
        .unwrap();
        assert!(matches!(settings, AdapterSettings::Chat(ref c) if c.key == "from-env"));
    }

    #[test]
    fn test_unknown_adapter() {
        let err = AdapterSettings::from_config(&adapter("irc", &[]), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAdapter(ref name) if name == "irc"));
    }

    #[tokio::test]
    async fn test_build_failure_names_the_adapter() {
        // Port 1 on an unroutable host cannot be bound.
        let configs = vec![adapter("http", &[("port", "1"), ("host", "192.0.2.1")])];
        let Err(err) = build_adapters(&configs, |_| None).await else {
            panic!("binding an unroutable address should fail");
        };
        assert!(matches!(err, RuntimeError::Adapter { ref name, .. } if name == "http"));
    }
}
