//! Deployment configuration for the authentication engine.
//!
//! Configuration is loaded from YAML files and validated before use.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Root configuration for the authenticator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Ordered list of SASL mechanisms offered to clients.
    #[serde(default = "default_mechanisms")]
    pub mechanisms: Vec<Mechanism>,

    /// Credential verification backend.
    pub backend: BackendConfig,
}

/// A SASL mechanism supported by the negotiation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Mechanism {
    /// Username/password credentials in a single NUL-delimited token.
    #[serde(rename = "PLAIN")]
    Plain,

    /// Identity taken from the client certificate the transport captured.
    #[serde(rename = "EXTERNAL")]
    External,
}

impl Mechanism {
    /// The mechanism name as it appears on the wire.
    #[must_use]
    pub fn mechanism_name(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::External => "EXTERNAL",
        }
    }
}

/// Credential verification backend selection.
///
/// Names a backend kind plus its settings; resolved to a concrete
/// implementation by [`create_backend`](crate::backend::create_backend) at
/// process start. Directory-service and login-module backends are injected
/// by the embedding server rather than configured here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Credential table, either inline or loaded from a file.
    Table {
        /// Inline username/password entries.
        #[serde(default)]
        users: Vec<UserCredential>,

        /// Path to a `username:password` credentials file.
        #[serde(default)]
        file: Option<PathBuf>,
    },
}

/// A single inline username/password entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserCredential {
    /// The account name.
    pub username: String,

    /// The password.
    /// Supports environment variable expansion: "${DB_PASSWORD}"
    pub password: String,
}

impl UserCredential {
    /// Get the password with environment variables expanded.
    #[must_use]
    pub fn password(&self) -> String {
        expand_env_vars(&self.password)
    }
}

/// Expand environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable
/// `VAR_NAME`. If the variable is not set, replaces with an empty string.
fn expand_env_vars(s: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex");
    re.replace_all(s, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .to_string()
}

fn default_mechanisms() -> Vec<Mechanism> {
    vec![Mechanism::Plain]
}

impl AuthConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the mechanism list is empty or the backend
    /// settings are incoherent.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.mechanisms.is_empty() {
            return Err(ConfigError::NoMechanisms);
        }
        match &self.backend {
            BackendConfig::Table { users, file } => match (users.is_empty(), file) {
                (true, None) => Err(ConfigError::EmptyCredentialTable),
                (false, Some(_)) => Err(ConfigError::AmbiguousCredentialTable),
                _ => Ok(()),
            },
        }
    }
}
