//! Sandbox environment and volume preparation.

use std::collections::BTreeMap;

use tracing::warn;

use sluice_core::env::variable_name;

/// Renders a plugin environment as `KEY=value` entries.
///
/// Entries with an empty value are resolved through `lookup` using the
/// variable `<IMAGE>_<KEY>`. An unresolved entry is kept with an empty value
/// and a warning is logged; it never fails plugin construction.
pub fn resolve_environment<F>(
    image: &str,
    environment: &BTreeMap<String, String>,
    lookup: F,
) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    environment
        .iter()
        .map(|(key, value)| {
            if !value.is_empty() {
                return format!("{key}={value}");
            }

            let variable = variable_name(image, key);
            match lookup(&variable).filter(|v| !v.is_empty()) {
                Some(resolved) => format!("{key}={resolved}"),
                None => {
                    warn!(
                        image = %image,
                        key = %key,
                        variable = %variable,
                        "Environment value not found, passing it empty"
                    );
                    format!("{key}=")
                }
            }
        })
        .collect()
}

/// Normalizes volumes to `host:container`, mounting at the host path when no
/// container path is given.
pub fn ensure_mount_points(volumes: &[String]) -> Vec<String> {
    volumes
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| {
            if v.contains(':') {
                v.to_string()
            } else {
                format!("{v}:{v}")
            }
        })
        .collect()
}
