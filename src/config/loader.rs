//! Configuration loading facade.

use crate::config::merge::merge_policy;
use crate::config::sources::{global_file, workspace_file};
use crate::config::{validation_failure, PolicyConfig};
use crate::error::PolicyError;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_PREFIX: &str = "CONTENT_POLICY";

/// Loads [`PolicyConfig`] from the layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    global_file: Option<PathBuf>,
    env_name: Option<String>,
    use_environment: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            global_file: global_file::global_config_path(),
            env_name: None,
            use_environment: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load with default sources for the workspace at `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<PolicyConfig, PolicyError> {
        Self::new().load_workspace(workspace_root)
    }

    /// Override (or with `None`, skip) the global config file.
    pub fn global_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_file = path;
        self
    }

    /// Select `config/{name}.toml` instead of reading `CONTENT_POLICY_ENV`.
    pub fn env_name(mut self, name: impl Into<String>) -> Self {
        self.env_name = Some(name.into());
        self
    }

    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    pub fn load_workspace(&self, workspace_root: &Path) -> Result<PolicyConfig, PolicyError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, self.global_file.as_deref())?;
        let builder = match &self.env_name {
            Some(env_name) => {
                workspace_file::add_to_builder_for_env(builder, workspace_root, env_name)?
            }
            None => workspace_file::add_to_builder(builder, workspace_root)?,
        };
        self.finish(builder)
    }

    /// Load defaults plus one explicit file, which must exist.
    pub fn load_file(&self, path: &Path) -> Result<PolicyConfig, PolicyError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        self.finish(builder)
    }

    fn finish(&self, builder: ConfigBuilder<DefaultState>) -> Result<PolicyConfig, PolicyError> {
        let builder = if self.use_environment {
            builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
        } else {
            builder
        };

        let config: PolicyConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(validation_failure)?;
        debug!(
            enabled = config.preferences.enabled,
            filter_lists = config.filter_lists.len(),
            "Configuration loaded"
        );
        Ok(config)
    }
}
