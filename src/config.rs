//! Configuration System
//!
//! Layered configuration for the policy engine: built-in defaults, the user's
//! global config file, workspace config files, then `CONTENT_POLICY__*`
//! environment variables. Validation collects every problem instead of
//! stopping at the first.

use crate::error::PolicyError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;

/// Schemes never subject to filtering.
pub const DEFAULT_WHITELIST_SCHEMES: &str = "about chrome file irc moz-safe-about news resource \
     snews x-jsd addbook cid imap mailbox nntp pop data javascript moz-icon";

pub const DEFAULT_CLIENT_IDENTIFIER: &str = "Mozilla/5.0 (content-policy)";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Filter list files loaded in order.
    #[serde(default)]
    pub filter_lists: Vec<PathBuf>,
}

/// User preferences consulted on every decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Master switch for filtering.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Don't collapse blocked visual elements unless a filter asks for it.
    #[serde(default)]
    pub fast_collapse: bool,

    /// Exempt schemes. Accepts a list or a space-separated string.
    #[serde(
        default = "default_whitelist_schemes",
        deserialize_with = "deserialize_schemes"
    )]
    pub whitelist_schemes: Vec<String>,

    /// Identifier of the client, covered by site-key signatures.
    #[serde(default = "default_client_identifier")]
    pub client_identifier: String,
}

fn default_true() -> bool {
    true
}

fn default_whitelist_schemes() -> Vec<String> {
    split_schemes(DEFAULT_WHITELIST_SCHEMES)
}

fn default_client_identifier() -> String {
    DEFAULT_CLIENT_IDENTIFIER.to_string()
}

fn split_schemes(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|scheme| scheme.to_ascii_lowercase())
        .collect()
}

fn deserialize_schemes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Schemes {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Schemes::deserialize(deserializer)? {
        Schemes::Joined(value) => split_schemes(&value),
        Schemes::List(list) => list
            .iter()
            .flat_map(|item| split_schemes(item))
            .collect(),
    })
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enabled: true,
            fast_collapse: false,
            whitelist_schemes: default_whitelist_schemes(),
            client_identifier: default_client_identifier(),
        }
    }
}

impl Preferences {
    pub fn validate(&self) -> Result<(), String> {
        if self.client_identifier.trim().is_empty() {
            return Err("client_identifier cannot be empty".to_string());
        }
        if let Some(scheme) = self
            .whitelist_schemes
            .iter()
            .find(|scheme| scheme.is_empty() || scheme.contains(':'))
        {
            return Err(format!("Invalid whitelist scheme '{}'", scheme));
        }
        Ok(())
    }
}

/// Messaging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Bound on asynchronous request/response waits. Unset waits until the
    /// response or teardown.
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
}

impl MessagingConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.response_timeout_ms {
            Some(0) => Err("response_timeout_ms must be greater than zero".to_string()),
            _ => Ok(()),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Preferences(String),
    Messaging(String),
    Logging(String),
    FilterList(PathBuf, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Preferences(msg) => write!(f, "Preferences: {}", msg),
            ValidationError::Messaging(msg) => write!(f, "Messaging: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
            ValidationError::FilterList(path, msg) => {
                write!(f, "Filter list '{}': {}", path.display(), msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl PolicyConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.preferences.validate() {
            errors.push(ValidationError::Preferences(e));
        }
        if let Err(e) = self.messaging.validate() {
            errors.push(ValidationError::Messaging(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }
        for path in &self.filter_lists {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::FilterList(
                    path.clone(),
                    "path cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolve relative filter list paths against `base`.
    pub fn resolve_filter_lists(&self, base: &Path) -> Vec<PathBuf> {
        self.filter_lists
            .iter()
            .map(|path| {
                if path.is_absolute() {
                    path.clone()
                } else {
                    base.join(path)
                }
            })
            .collect()
    }
}

/// Turn validation errors into a single configuration error.
pub(crate) fn validation_failure(errors: Vec<ValidationError>) -> PolicyError {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    PolicyError::ConfigError(format!(
        "Configuration validation failed:\n{}",
        messages.join("\n")
    ))
}
