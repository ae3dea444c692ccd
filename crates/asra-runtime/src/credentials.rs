//! Login token selection.
//!
//! A deployment-mode variable picks which of two token variables is read.
//! `production` (or `prod`) selects the production token; any other value,
//! or no value at all, selects the development token.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::CredentialsConfig;

/// Deployment mode the client runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Production,
    Development,
}

impl DeploymentMode {
    /// Interprets the value of the mode variable.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("production" | "prod") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Lowercase name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The selected credential is unset or blank.
#[derive(Debug, Clone, Error)]
#[error("no login token for {mode} mode: environment variable {variable} is unset or empty")]
pub struct MissingCredential {
    /// Mode that selected the variable.
    pub mode: DeploymentMode,
    /// Variable that was read.
    pub variable: String,
}

/// A login token. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// The raw token, for handing to the gateway.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Variable lookup used by [`CredentialSource`].
pub type VarLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves the login token from the environment (or any other lookup).
#[derive(Clone)]
pub struct CredentialSource {
    config: CredentialsConfig,
    lookup: VarLookup,
}

impl CredentialSource {
    /// Reads variables from the process environment.
    pub fn from_env(config: CredentialsConfig) -> Self {
        Self::with_lookup(config, |name| std::env::var(name).ok())
    }

    /// Reads variables through `lookup`.
    pub fn with_lookup<F>(config: CredentialsConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            config,
            lookup: Arc::new(lookup),
        }
    }

    /// Current deployment mode.
    pub fn mode(&self) -> DeploymentMode {
        DeploymentMode::from_value((self.lookup)(&self.config.mode_var).as_deref())
    }

    /// Token variable read in `mode`.
    pub fn variable(&self, mode: DeploymentMode) -> &str {
        match mode {
            DeploymentMode::Production => &self.config.production_var,
            DeploymentMode::Development => &self.config.development_var,
        }
    }

    /// Reads the token for the current mode.
    pub fn resolve(&self) -> Result<Credential, MissingCredential> {
        let mode = self.mode();
        let variable = self.variable(mode);
        debug!(%mode, variable, "Resolving login token");

        match (self.lookup)(variable) {
            Some(token) if !token.trim().is_empty() => Ok(Credential(token)),
            _ => Err(MissingCredential {
                mode,
                variable: variable.to_string(),
            }),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
