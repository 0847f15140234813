//! Configuration of the chat adapter.
//!
//! Read from the adapter's `environment` map. Every key can be overridden by
//! the variable `<ADAPTER>_<KEY>`, e.g. `SLACK_KEY`.
//!
//! ```yaml
//! adapters:
//!   - name: slack
//!     environment:
//!       key: xoxb-...
//!       api_url: https://slack.com/api       # optional
//!       reconnect_initial_delay_ms: 1000     # optional
//!       reconnect_max_delay_ms: 30000        # optional
//!       reconnect_max_retries: 10            # optional, unlimited by default
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use sluice_core::env::lookup_with;
use sluice_core::{AdapterError, AdapterResult};
use sluice_transport::RetryPolicy;

/// Default handshake API base URL.
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Resolved chat adapter configuration.
#[derive(Clone, PartialEq)]
pub struct ChatConfig {
    /// Bot token used for the handshake.
    pub key: String,
    /// Base URL of the handshake API.
    pub api_url: String,
    /// Backoff between reconnection attempts.
    pub reconnect: RetryPolicy,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

impl ChatConfig {
    /// Creates a configuration with defaults for everything but the key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            reconnect: RetryPolicy::default(),
        }
    }

    /// Reads the configuration of adapter `name` from its environment map.
    ///
    /// `lookup` resolves environment variables; they win over the map.
    pub fn from_environment<F>(
        name: &str,
        environment: &BTreeMap<String, String>,
        lookup: F,
    ) -> AdapterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup_with(name, environment, key, &lookup).filter(|v| !v.is_empty());

        let key = get("key").ok_or_else(|| {
            AdapterError::invalid_config(format!(
                "'key' is mandatory in the environment of adapter '{name}'"
            ))
        })?;

        let mut config = Self::new(key);
        if let Some(api_url) = get("api_url") {
            config.api_url = api_url;
        }
        if let Some(ms) = get("reconnect_initial_delay_ms") {
            config.reconnect.initial_delay = Duration::from_millis(parse(name, "reconnect_initial_delay_ms", &ms)?);
        }
        if let Some(ms) = get("reconnect_max_delay_ms") {
            config.reconnect.max_delay = Duration::from_millis(parse(name, "reconnect_max_delay_ms", &ms)?);
        }
        if let Some(retries) = get("reconnect_max_retries") {
            config.reconnect.max_retries = Some(parse(name, "reconnect_max_retries", &retries)?);
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(name: &str, key: &str, value: &str) -> AdapterResult<T> {
    value.trim().parse().map_err(|_| {
        AdapterError::invalid_config(format!(
            "'{key}' of adapter '{name}' should be a non-negative integer, got '{value}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_is_mandatory() {
        let err = ChatConfig::from_environment("slack", &BTreeMap::new(), |_| None).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidConfig(_)));
    }

    #[test]
    fn test_defaults() {
        let config =
            ChatConfig::from_environment("slack", &environment(&[("key", "xoxb")]), |_| None)
                .unwrap();
        assert_eq!(config.key, "xoxb");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.reconnect, RetryPolicy::default());
    }

    #[test]
    fn test_environment_variable_wins() {
        let config = ChatConfig::from_environment(
            "slack",
            &environment(&[("key", "from-file")]),
            |name| (name == "SLACK_KEY").then(|| "from-env".to_string()),
        )
        .unwrap();
        assert_eq!(config.key, "from-env");
    }

    #[test]
    fn test_reconnect_settings() {
        let config = ChatConfig::from_environment(
            "chat",
            &environment(&[
                ("key", "k"),
                ("reconnect_initial_delay_ms", "50"),
                ("reconnect_max_delay_ms", "200"),
                ("reconnect_max_retries", "3"),
            ]),
            |_| None,
        )
        .unwrap();
        assert_eq!(config.reconnect.initial_delay, Duration::from_millis(50));
        assert_eq!(config.reconnect.max_delay, Duration::from_millis(200));
        assert_eq!(config.reconnect.max_retries, Some(3));
    }

    #[test]
    fn test_invalid_number() {
        let err = ChatConfig::from_environment(
            "chat",
            &environment(&[("key", "k"), ("reconnect_max_retries", "many")]),
            |_| None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("reconnect_max_retries"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", ChatConfig::new("xoxb-secret"));
        assert!(!rendered.contains("xoxb-secret"));
    }
}
