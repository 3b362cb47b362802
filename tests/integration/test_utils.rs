//! Shared helpers for integration tests

use content_policy::config::Preferences;
use content_policy::filters::{FilterEngine, FilterList};
use content_policy::policy::Policy;
use content_policy::types::Frame;
use std::sync::Mutex;

/// Serializes tests that read or write process environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Build an engine from list text and a policy over it.
pub fn policy_for(list: &str, preferences: Preferences) -> (FilterEngine, Policy) {
    let engine = FilterEngine::from_list(&FilterList::parse(list));
    let policy = Policy::from_engine(&engine, preferences);
    (engine, policy)
}

/// Frames without site keys, innermost first.
pub fn frames(locations: &[&str]) -> Vec<Frame> {
    locations.iter().map(|location| Frame::new(*location)).collect()
}

/// Run `f` with the given variables set, restoring previous values afterwards.
pub fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(name, _)| (name.to_string(), std::env::var(name).ok()))
        .collect();

    for (name, value) in vars {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    let result = f();

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(&name, value),
            None => std::env::remove_var(&name),
        }
    }
    result
}
