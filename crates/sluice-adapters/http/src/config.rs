//! Configuration of the HTTP adapter.
//!
//! ```yaml
//! adapters:
//!   - name: http
//!     environment:
//!       port: 8080
//!       host: 0.0.0.0          # optional
//!       path: /                # optional
//!       reply_timeout_secs: 30 # optional
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use sluice_core::env::lookup_with;
use sluice_core::{AdapterError, AdapterResult};

/// Resolved HTTP adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Path accepting POST requests.
    pub path: String,
    /// How long a request waits for its reply.
    pub reply_timeout: Duration,
}

impl HttpConfig {
    pub fn new(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
            path: "/".to_string(),
            reply_timeout: Duration::from_secs(30),
        }
    }

    /// Address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
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

        let port = get("port").ok_or_else(|| {
            AdapterError::invalid_config(format!(
                "'port' is mandatory in the environment of adapter '{name}'"
            ))
        })?;
        let port = port.trim().parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
            AdapterError::invalid_config(format!(
                "'port' of adapter '{name}' should be an integer between 1 and 65535, got '{port}'"
            ))
        })?;

        let mut config = Self::new(port);
        if let Some(host) = get("host") {
            config.host = host;
        }
        if let Some(path) = get("path") {
            config.path = path;
        }
        if let Some(secs) = get("reply_timeout_secs") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                AdapterError::invalid_config(format!(
                    "'reply_timeout_secs' of adapter '{name}' should be a non-negative integer, got '{secs}'"
                ))
            })?;
            config.reply_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
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
    fn test_port_is_mandatory() {
        let err = HttpConfig::from_environment("http", &BTreeMap::new(), |_| None).unwrap_err();
        assert!(err.to_string().contains("'port' is mandatory"));
    }

    #[test]
    fn test_port_must_be_an_integer() {
        for bad in ["eighty", "0", "70000", "-1"] {
            let result = HttpConfig::from_environment("http", &environment(&[("port", bad)]), |_| None);
            assert!(result.is_err(), "port {bad} should be rejected");
        }
    }

    #[test]
    fn test_defaults() {
        let config =
            HttpConfig::from_environment("http", &environment(&[("port", "8080")]), |_| None)
                .unwrap();
        assert_eq!(config, HttpConfig::new(8080));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = HttpConfig::from_environment(
            "http",
            &environment(&[("port", "8080"), ("path", "/hook"), ("reply_timeout_secs", "5")]),
            |name| (name == "HTTP_PORT").then(|| "9090".to_string()),
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.path, "/hook");
        assert_eq!(config.reply_timeout, Duration::from_secs(5));
    }
}
