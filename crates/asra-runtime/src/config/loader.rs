//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic merges ([`ConfigLoader::merge`])
//! 3. Main config file (`asra.toml` or `config.toml`)
//! 4. Profile-specific config file (`asra.{profile}.toml`) next to it
//! 5. Environment variables (`ASRA_*`)
//!
//! # Environment Variable Mapping
//!
//! Variables use the `ASRA_` prefix with `__` as the nesting separator:
//!
//! - `ASRA_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `ASRA_EVENTS__CLIENT_DIR=bot/events` → `events.client_dir = "bot/events"`
//! - `ASRA_EMBED__MAIN=16711680` → `embed.main = 16711680`
//!
//! # Example
//!
//! ```rust,ignore
//! use asra_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/asra.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::schema::AsraConfig;
use crate::config::error::{ConfigError, ConfigResult};

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
    /// Parses a profile name. `prod`/`dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `ASRA_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("ASRA_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
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

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("asra"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: AsraConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<AsraConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: AsraConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            client_dir = %config.events.client_dir.display(),
            transport_dir = %config.events.transport_dir.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(AsraConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.clone() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
            figment = self.merge_profile_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment)?;
        }

        if self.load_env {
            trace!("Loading environment variables with ASRA_ prefix");
            figment = figment.merge(Env::prefixed("ASRA_").split("__"));
        }

        Ok(figment)
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Merges `stem.{profile}.ext` from next to `base`, if present.
    fn merge_profile_file(&self, figment: Figment, base: &Path) -> ConfigResult<Figment> {
        let (Some(stem), Some(ext)) = (
            base.file_stem().and_then(|s| s.to_str()),
            base.extension().and_then(|e| e.to_str()),
        ) else {
            return Ok(figment);
        };

        let profile_path = base.with_file_name(format!("{stem}.{}.{ext}", self.profile));
        if profile_path.exists() {
            debug!(path = %profile_path.display(), "Loading profile-specific config");
            return Self::merge_config_file(figment, &profile_path);
        }
        Ok(figment)
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("asra"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Loads the first base file found in the search paths, plus its profile file.
    fn load_config_files(&self, figment: Figment) -> ConfigResult<Figment> {
        #[cfg(feature = "toml-config")]
        for search_path in self.resolve_search_paths() {
            for base_name in ["asra.toml", "config.toml"] {
                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    let figment = Self::merge_config_file(figment, &base_path)?;
                    return self.merge_profile_file(figment, &base_path);
                }
            }
        }

        warn!("No configuration file found, using defaults");
        Ok(figment)
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<AsraConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<AsraConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
