//! Bundle of the in-memory matcher, element hiding registry and storage.

use crate::filters::elemhide::ElemHideRegistry;
use crate::filters::filter::Filter;
use crate::filters::list::FilterList;
use crate::filters::matcher::CombinedMatcher;
use crate::filters::storage::MemoryFilterStorage;
use std::sync::Arc;
use tracing::debug;

/// Filter state shared by the policy engine.
///
/// Disabling a filter flips its flag in storage and takes it out of the
/// matcher and registry; its text is never edited.
#[derive(Clone, Default)]
pub struct FilterEngine {
    pub matcher: Arc<CombinedMatcher>,
    pub elemhide: Arc<ElemHideRegistry>,
    pub storage: Arc<MemoryFilterStorage>,
    filters: Arc<parking_lot::RwLock<Vec<Arc<Filter>>>>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(list: &FilterList) -> Self {
        let engine = Self::new();
        for filter in list.filters() {
            engine.add_filter(Arc::clone(filter));
        }
        debug!(
            filters = list.len(),
            active = engine.matcher.len(),
            "Filter engine loaded"
        );
        engine
    }

    /// Add a filter; comments and invalid filters are kept but never match.
    pub fn add_filter(&self, filter: Arc<Filter>) {
        {
            let mut filters = self.filters.write();
            if filters.iter().any(|f| f.text() == filter.text()) {
                return;
            }
            filters.push(Arc::clone(&filter));
        }
        if !self.storage.is_disabled(filter.text()) {
            self.activate(filter);
        }
    }

    pub fn remove_filter(&self, text: &str) -> bool {
        let removed = {
            let mut filters = self.filters.write();
            let before = filters.len();
            filters.retain(|f| f.text() != text);
            before != filters.len()
        };
        if removed {
            self.deactivate(text);
        }
        removed
    }

    pub fn set_disabled(&self, text: &str, disabled: bool) {
        self.storage.set_disabled(text, disabled);
        let filter = self
            .filters
            .read()
            .iter()
            .find(|f| f.text() == text)
            .cloned();
        let Some(filter) = filter else {
            return;
        };
        if disabled {
            self.deactivate(text);
        } else {
            self.activate(filter);
        }
    }

    pub fn filters(&self) -> Vec<Arc<Filter>> {
        self.filters.read().clone()
    }

    fn activate(&self, filter: Arc<Filter>) {
        match filter.as_ref() {
            Filter::Blocking(_) | Filter::Whitelist(_) => {
                self.matcher.add(filter);
            }
            Filter::ElemHide(_) | Filter::ElemHideException(_) => {
                self.elemhide.add(filter);
            }
            Filter::Comment { .. } | Filter::Invalid { .. } => {}
        }
    }

    fn deactivate(&self, text: &str) {
        self.matcher.remove(text);
        self.elemhide.remove(text);
    }
}
