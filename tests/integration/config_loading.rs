//! Layered configuration loading and its use by the CLI run context

use super::test_utils::with_env;
use content_policy::cli::{Commands, RunContext};
use content_policy::config::ConfigLoader;
use content_policy::error::PolicyError;
use content_policy::types::{Decision, Frame};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write_workspace_config(root: &Path, name: &str, contents: &str) {
    let dir = root.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

fn loader() -> ConfigLoader {
    ConfigLoader::new().global_file(None).without_environment()
}

#[test]
fn env_specific_file_overrides_base() {
    let workspace = TempDir::new().unwrap();
    write_workspace_config(
        workspace.path(),
        "config.toml",
        r#"
filter_lists = ["lists/easylist.txt"]

[preferences]
fast_collapse = true
whitelist_schemes = "about data"
"#,
    );
    write_workspace_config(
        workspace.path(),
        "staging.toml",
        r#"
[preferences]
fast_collapse = false

[messaging]
response_timeout_ms = 250
"#,
    );

    let config = loader()
        .env_name("staging")
        .load_workspace(workspace.path())
        .unwrap();
    assert!(!config.preferences.fast_collapse);
    assert_eq!(config.preferences.whitelist_schemes, vec!["about", "data"]);
    assert_eq!(
        config.messaging.response_timeout(),
        Some(Duration::from_millis(250))
    );
    assert_eq!(
        config.resolve_filter_lists(workspace.path()),
        vec![workspace.path().join("lists/easylist.txt")]
    );
}

#[test]
fn environment_variables_override_files() {
    let workspace = TempDir::new().unwrap();
    write_workspace_config(
        workspace.path(),
        "config.toml",
        "[preferences]\nenabled = true\n",
    );

    let config = with_env(
        &[
            ("CONTENT_POLICY__PREFERENCES__ENABLED", Some("false")),
            ("CONTENT_POLICY_ENV", None),
        ],
        || {
            ConfigLoader::new()
                .global_file(None)
                .load_workspace(workspace.path())
        },
    )
    .unwrap();
    assert!(!config.preferences.enabled);
}

#[test]
fn invalid_values_are_reported_together() {
    let workspace = TempDir::new().unwrap();
    write_workspace_config(
        workspace.path(),
        "config.toml",
        r#"
[messaging]
response_timeout_ms = 0

[logging]
level = "loud"
"#,
    );

    let err = loader().load_workspace(workspace.path()).unwrap_err();
    let PolicyError::ConfigError(message) = err else {
        panic!("expected a configuration error, got {:?}", err);
    };
    assert!(message.contains("Messaging"), "{}", message);
    assert!(message.contains("Logging"), "{}", message);
}

#[test]
fn run_context_uses_configured_lists() {
    let workspace = TempDir::new().unwrap();
    fs::write(workspace.path().join("easylist.txt"), "||ads.example^\n").unwrap();
    let config_file = workspace.path().join("policy.toml");
    fs::write(
        &config_file,
        format!(
            "filter_lists = [{:?}]\n",
            workspace.path().join("easylist.txt").display().to_string()
        ),
    )
    .unwrap();

    let context = RunContext::new(workspace.path().to_path_buf(), Some(config_file)).unwrap();
    let output = context
        .execute(&Commands::Check {
            content_type: "IMAGE".to_string(),
            location: "http://ads.example/banner.gif".to_string(),
            frames: vec![Frame::new("http://site.example/")],
            lists: Vec::new(),
            private: false,
            fast_collapse: Some(true),
        })
        .unwrap();
    let decision: Decision = serde_json::from_str(&output).unwrap();
    assert!(!decision.allow);
    assert!(!decision.collapse);
}
