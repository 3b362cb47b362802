//! CLI route: single route table and run context.

use crate::cli::output::{format_decision, format_elemhide_status, format_lint_report};
use crate::cli::parse::{Commands, OutputFormat};
use crate::config::{ConfigLoader, PolicyConfig};
use crate::error::PolicyError;
use crate::filters::{FilterEngine, FilterList};
use crate::policy::Policy;
use crate::types::{ElemHideQuery, RequestDescriptor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace root and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: PolicyConfig,
}

impl RunContext {
    /// Load configuration from `config_path` if given, otherwise from the workspace.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PolicyError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::new().load_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: PolicyConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, PolicyError> {
        match command {
            Commands::Check {
                content_type,
                location,
                frames,
                lists,
                private,
                fast_collapse,
            } => {
                let mut preferences = self.config.preferences.clone();
                if let Some(fast_collapse) = fast_collapse {
                    preferences.fast_collapse = *fast_collapse;
                }
                let engine = FilterEngine::from_list(&self.load_lists(lists)?);
                let policy = Policy::from_engine(&engine, preferences);

                let mut request = RequestDescriptor::new(content_type, location, frames.clone());
                if *private {
                    request = request.private();
                }
                let decision = policy.should_allow(&request);
                info!(location = %location, allow = decision.allow, "Checked request");
                format_decision(&decision)
            }
            Commands::Elemhide {
                frames,
                lists,
                private,
            } => {
                let engine = FilterEngine::from_list(&self.load_lists(lists)?);
                let policy = Policy::from_engine(&engine, self.config.preferences.clone());
                let status = policy.elemhide_enabled(&ElemHideQuery {
                    frames: frames.clone(),
                    is_private: *private,
                });
                format_elemhide_status(&status)
            }
            Commands::Lint { lists, format } => {
                let list = read_lists(lists.iter().map(PathBuf::as_path))?;
                format_lint_report(&list, *format == OutputFormat::Json)
            }
        }
    }

    /// Lists from the config followed by those given on the command line.
    fn load_lists(&self, extra: &[PathBuf]) -> Result<FilterList, PolicyError> {
        let configured = self.config.resolve_filter_lists(&self.workspace_root);
        read_lists(configured.iter().chain(extra).map(PathBuf::as_path))
    }
}

fn read_lists<'a>(paths: impl Iterator<Item = &'a Path>) -> Result<FilterList, PolicyError> {
    let mut combined = FilterList::default();
    for path in paths {
        let list = FilterList::from_file(path)?;
        debug!(path = %path.display(), filters = list.len(), "Loaded filter list");
        combined.extend(list);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, Frame};
    use std::fs;
    use tempfile::TempDir;

    fn context_with_list(list: &str) -> (TempDir, RunContext, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, list).unwrap();
        let context = RunContext::from_config(dir.path().to_path_buf(), PolicyConfig::default());
        (dir, context, path)
    }

    #[test]
    fn check_blocks_listed_request() {
        let (_dir, context, list) = context_with_list("||ads.example^\n");
        let output = context
            .execute(&Commands::Check {
                content_type: "IMAGE".to_string(),
                location: "http://ads.example/banner.png".to_string(),
                frames: vec![Frame::new("http://site.example/")],
                lists: vec![list],
                private: false,
                fast_collapse: None,
            })
            .unwrap();
        let decision: Decision = serde_json::from_str(&output).unwrap();
        assert!(!decision.allow);
        assert!(decision.collapse);
    }

    #[test]
    fn configured_lists_are_resolved_against_workspace() {
        let (_dir, mut context, _) = context_with_list("||ads.example^\n");
        context.config.filter_lists = vec![PathBuf::from("list.txt")];
        let output = context
            .execute(&Commands::Check {
                content_type: "SCRIPT".to_string(),
                location: "http://ads.example/a.js".to_string(),
                frames: vec![Frame::new("http://site.example/")],
                lists: Vec::new(),
                private: false,
                fast_collapse: None,
            })
            .unwrap();
        let decision: Decision = serde_json::from_str(&output).unwrap();
        assert!(!decision.allow);
        assert!(!decision.collapse);
    }

    #[test]
    fn missing_list_is_an_io_error() {
        let (dir, context, _) = context_with_list("");
        let result = context.execute(&Commands::Lint {
            lists: vec![dir.path().join("absent.txt")],
            format: OutputFormat::Text,
        });
        assert!(matches!(result, Err(PolicyError::FilterListIo { .. })));
    }

    #[test]
    fn elemhide_reports_document_exception() {
        let (_dir, context, list) = context_with_list("##.ad\n@@||site.example^$elemhide\n");
        let output = context
            .execute(&Commands::Elemhide {
                frames: vec![Frame::new("http://site.example/page")],
                lists: vec![list],
                private: false,
            })
            .unwrap();
        let status: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(status["enabled"], false);
    }
}
