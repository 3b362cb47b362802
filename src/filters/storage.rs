//! Filter hit bookkeeping.

use crate::filters::filter::Filter;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Storage of per-filter state the engine writes to.
pub trait FilterStorage: Send + Sync {
    /// Record one new hit of `filter`. Every call counts.
    fn increase_hit_count(&self, filter: &Filter);

    fn hit_count(&self, filter_text: &str) -> u64;
}

/// Per-filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub hit_count: u64,
    pub last_hit: Option<DateTime<Utc>>,
    pub disabled: bool,
}

/// In-memory filter storage keyed by filter text.
#[derive(Default)]
pub struct MemoryFilterStorage {
    stats: Mutex<HashMap<String, FilterStats>>,
}

impl MemoryFilterStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, filter_text: &str) -> Option<FilterStats> {
        self.stats.lock().get(filter_text).cloned()
    }

    pub fn is_disabled(&self, filter_text: &str) -> bool {
        self.stats
            .lock()
            .get(filter_text)
            .is_some_and(|stats| stats.disabled)
    }

    pub fn set_disabled(&self, filter_text: &str, disabled: bool) {
        self.stats
            .lock()
            .entry(filter_text.to_string())
            .or_default()
            .disabled = disabled;
    }

    pub fn reset_hits(&self) {
        for stats in self.stats.lock().values_mut() {
            stats.hit_count = 0;
            stats.last_hit = None;
        }
    }
}

impl FilterStorage for MemoryFilterStorage {
    fn increase_hit_count(&self, filter: &Filter) {
        let mut stats = self.stats.lock();
        let entry = stats.entry(filter.text().to_string()).or_default();
        entry.hit_count += 1;
        entry.last_hit = Some(Utc::now());
    }

    fn hit_count(&self, filter_text: &str) -> u64 {
        self.stats
            .lock()
            .get(filter_text)
            .map_or(0, |stats| stats.hit_count)
    }
}
