//! Element hiding filter lookup.
//!
//! Hidden elements are reported back by key; the registry maps keys to
//! filters and finds exceptions that cancel a filter on a given domain.

use crate::filters::filter::Filter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub trait ElemHideLookup: Send + Sync {
    /// Element hiding filter registered under `key`.
    fn filter_by_key(&self, key: &str) -> Option<Arc<Filter>>;

    /// Exception cancelling `filter` on `doc_domain`, if one applies.
    fn exception_for(&self, filter: &Filter, doc_domain: Option<&str>) -> Option<Arc<Filter>>;
}

#[derive(Default)]
struct ElemHideIndex {
    next_key: u64,
    filters_by_key: HashMap<String, Arc<Filter>>,
    keys_by_text: HashMap<String, String>,
    exceptions_by_selector: HashMap<String, Vec<Arc<Filter>>>,
}

#[derive(Default)]
pub struct ElemHideRegistry {
    index: RwLock<ElemHideIndex>,
}

impl ElemHideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element hiding filter or exception.
    ///
    /// Returns the key assigned to a hiding filter; exceptions get no key.
    pub fn add(&self, filter: Arc<Filter>) -> Option<String> {
        let mut index = self.index.write();
        match filter.as_ref() {
            Filter::ElemHide(_) => {
                if let Some(key) = index.keys_by_text.get(filter.text()) {
                    return Some(key.clone());
                }
                index.next_key += 1;
                let key = format!("H{}", index.next_key);
                index
                    .keys_by_text
                    .insert(filter.text().to_string(), key.clone());
                index.filters_by_key.insert(key.clone(), filter);
                Some(key)
            }
            Filter::ElemHideException(exception) => {
                let list = index
                    .exceptions_by_selector
                    .entry(exception.selector().to_string())
                    .or_default();
                if !list.iter().any(|f| f.text() == filter.text()) {
                    list.push(Arc::clone(&filter));
                }
                None
            }
            _ => None,
        }
    }

    pub fn remove(&self, text: &str) -> bool {
        let mut index = self.index.write();
        if let Some(key) = index.keys_by_text.remove(text) {
            index.filters_by_key.remove(&key);
            return true;
        }
        let mut removed = false;
        for list in index.exceptions_by_selector.values_mut() {
            let before = list.len();
            list.retain(|f| f.text() != text);
            removed |= before != list.len();
        }
        removed
    }

    pub fn key_for(&self, text: &str) -> Option<String> {
        self.index.read().keys_by_text.get(text).cloned()
    }

    pub fn clear(&self) {
        *self.index.write() = ElemHideIndex::default();
    }
}

impl ElemHideLookup for ElemHideRegistry {
    fn filter_by_key(&self, key: &str) -> Option<Arc<Filter>> {
        self.index.read().filters_by_key.get(key).cloned()
    }

    fn exception_for(&self, filter: &Filter, doc_domain: Option<&str>) -> Option<Arc<Filter>> {
        let selector = filter.as_elemhide()?.selector();
        let index = self.index.read();
        index
            .exceptions_by_selector
            .get(selector)?
            .iter()
            .find(|exception| {
                exception
                    .as_elemhide()
                    .is_some_and(|e| e.is_active_on_domain(doc_domain))
            })
            .cloned()
    }
}
