//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `yaml-config` *(default)*: `sluice.yml`, `sluice.yaml`
//! - `toml-config`: `sluice.toml`
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic defaults ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`sluice.{profile}.yaml`)
//! 4. Main config file (`sluice.yaml`)
//! 5. Environment variables (`SLUICE_*`)
//!
//! Unlike a library default, a gateway without any configuration file has
//! nothing to do, so failing to find one is an error.
//!
//! # Environment Variable Mapping
//!
//! - `SLUICE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SLUICE_LOGGING__FORMAT=pretty` → `logging.format = "pretty"`
//!
//! Secrets of individual adapters and plugins are better passed through
//! their own variables (`SLACK_KEY`, `ORG_ECHO_TOKEN`), which are resolved
//! per entry instead of by figment.
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/sluice.yaml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::SluiceConfig;

/// Environment variable selecting the profile.
pub const PROFILE_VAR: &str = "SLUICE_PROFILE";

/// Prefix of figment-mapped environment variables.
pub const ENV_PREFIX: &str = "SLUICE_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` abbreviations.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Reads `SLUICE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Base names searched in every search path, in order.
fn base_names() -> Vec<&'static str> {
    let mut names = Vec::new();
    #[cfg(feature = "yaml-config")]
    names.extend(["sluice.yml", "sluice.yaml"]);
    #[cfg(feature = "toml-config")]
    names.push("sluice.toml");
    names
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading `SLUICE_*` environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically. Files and
    /// environment variables still override it.
    pub fn merge(mut self, config: SluiceConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<SluiceConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: SluiceConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            adapters = config.adapters.len(),
            plugins = config.plugins.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SluiceConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment)?;
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        Ok(figment)
    }

    /// Merges a single config file into the figment, dispatching on file
    /// extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("sluice"));
        }
        paths
    }

    /// Searches `search_paths × base_names`; the first base file found is
    /// loaded together with its profile-specific variant.
    fn load_config_files(&self, mut figment: Figment) -> ConfigResult<Figment> {
        let search_paths = self.resolve_search_paths();
        let names = base_names();

        for search_path in &search_paths {
            for base_name in &names {
                let base_path = search_path.join(base_name);
                if !base_path.exists() {
                    continue;
                }

                if let Some((stem, ext)) = base_name.rsplit_once('.') {
                    let profile_path =
                        search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile-specific config");
                        figment = Self::merge_config_file(figment, &profile_path)?;
                    }
                }

                info!(path = %base_path.display(), "Loading configuration file");
                return Self::merge_config_file(figment, &base_path);
            }
        }

        Err(ConfigError::NoConfigFile {
            candidates: search_paths
                .iter()
                .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
                .map(|p| p.display().to_string())
                .collect(),
        })
    }
}

/// Loads the configuration from the default search locations.
pub fn load_config() -> ConfigResult<SluiceConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<SluiceConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
