//! Merge rules: defaults, override order, conflict handling.

use crate::config::{DEFAULT_CLIENT_IDENTIFIER, DEFAULT_WHITELIST_SCHEMES};
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key: defaults, global file,
/// workspace files, environment.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("preferences.enabled", true)?
        .set_default("preferences.fast_collapse", false)?
        .set_default("preferences.whitelist_schemes", DEFAULT_WHITELIST_SCHEMES)?
        .set_default("preferences.client_identifier", DEFAULT_CLIENT_IDENTIFIER)
}
