//! Lookup of configuration values overridable through environment variables.
//!
//! A value for `key` under a `prefix` (an adapter name or a plugin image) is
//! looked up in the variable `PREFIX_KEY`, uppercased, with `/` and `-` in the
//! prefix replaced by `_`. For example the key `token` of the image
//! `org/echo-bot` maps to `ORG_ECHO_BOT_TOKEN`.

use std::collections::BTreeMap;

/// Builds the environment variable name for `key` under `prefix`.
pub fn variable_name(prefix: &str, key: &str) -> String {
    let prefix: String = prefix
        .chars()
        .map(|c| if c == '/' || c == '-' { '_' } else { c })
        .collect();
    format!("{prefix}_{key}").to_uppercase()
}

/// Looks up `key`, preferring the environment over `values`.
///
/// `lookup` resolves an environment variable name; pass [`process_env`] for
/// the real process environment.
pub fn lookup_with<F>(
    prefix: &str,
    values: &BTreeMap<String, String>,
    key: &str,
    lookup: F,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&variable_name(prefix, key))
        .filter(|v| !v.is_empty())
        .or_else(|| values.get(key).cloned())
}

/// Reads a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name_is_sanitized() {
        assert_eq!(variable_name("a/b-c", "d"), "A_B_C_D");
        assert_eq!(variable_name("slack", "key"), "SLACK_KEY");
    }

    #[test]
    fn test_environment_has_preference() {
        let values = BTreeMap::from([("d".to_string(), "from-map".to_string())]);
        let found = lookup_with("a/b-c", &values, "d", |name| {
            (name == "A_B_C_D").then(|| "value".to_string())
        });
        assert_eq!(found.as_deref(), Some("value"));
    }

    #[test]
    fn test_falls_back_to_map() {
        let values = BTreeMap::from([("port".to_string(), "8080".to_string())]);
        assert_eq!(
            lookup_with("http", &values, "port", |_| None).as_deref(),
            Some("8080")
        );
        assert_eq!(lookup_with("http", &values, "host", |_| None), None);
    }

    #[test]
    fn test_process_env() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("SLUICE_CORE_ENV_TEST_KEY", "value");
        }
        let found = lookup_with("sluice-core/env-test", &BTreeMap::new(), "key", process_env);
        assert_eq!(found.as_deref(), Some("value"));
        unsafe {
            std::env::remove_var("SLUICE_CORE_ENV_TEST_KEY");
        }
    }
}
