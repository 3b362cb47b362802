//! Hit recording and observers.

use crate::filters::filter::Filter;
use crate::filters::storage::FilterStorage;
use crate::types::{ContentType, HitRecord};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::trace;

/// One recorded hit as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitEvent {
    pub record: HitRecord,
    pub is_private: bool,
}

/// Receives every hit the engine records, private ones included.
pub trait HitObserver: Send + Sync {
    fn on_hit(&self, event: &HitEvent);
}

/// Forwards hits to filter storage and registered observers.
pub struct HitRecorder {
    storage: Arc<dyn FilterStorage>,
    observers: RwLock<Vec<Arc<dyn HitObserver>>>,
}

impl HitRecorder {
    pub fn new(storage: Arc<dyn FilterStorage>) -> Self {
        Self {
            storage,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn HitObserver>) {
        self.observers.write().push(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn HitObserver>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|existing| !Arc::ptr_eq(existing, observer));
        before != observers.len()
    }

    pub fn storage(&self) -> &Arc<dyn FilterStorage> {
        &self.storage
    }

    pub fn record(&self, record: &HitRecord, filter: Option<&Filter>, is_private: bool) {
        if let Some(filter) = filter {
            if !is_private {
                self.storage.increase_hit_count(filter);
            }
        }

        let observers = self.observers.read().clone();
        if observers.is_empty() {
            return;
        }
        let event = HitEvent {
            record: record.clone(),
            is_private,
        };
        for observer in observers {
            observer.on_hit(&event);
        }
    }
}

/// Hit totals since creation or the last [`HitStatistics::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitSummary {
    pub total: u64,
    pub by_filter: HashMap<String, u64>,
    pub by_content_type: HashMap<ContentType, u64>,
}

/// Aggregates non-private hits per filter and per content type.
#[derive(Default)]
pub struct HitStatistics {
    summary: Mutex<HitSummary>,
}

impl HitStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> HitSummary {
        self.summary.lock().clone()
    }

    pub fn filter_hits(&self, filter_text: &str) -> u64 {
        self.summary
            .lock()
            .by_filter
            .get(filter_text)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        *self.summary.lock() = HitSummary::default();
    }
}

impl HitObserver for HitStatistics {
    fn on_hit(&self, event: &HitEvent) {
        if event.is_private {
            return;
        }
        let mut summary = self.summary.lock();
        summary.total += 1;
        *summary
            .by_content_type
            .entry(event.record.content_type)
            .or_insert(0) += 1;
        if let Some(text) = &event.record.filter_text {
            *summary.by_filter.entry(text.clone()).or_insert(0) += 1;
        }
    }
}

/// Publishes hit events on a channel, for consumers on another thread.
pub struct ChannelObserver {
    sender: Mutex<mpsc::Sender<HitEvent>>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<HitEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    pub fn new_pair() -> (Self, mpsc::Receiver<HitEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self::new(sender), receiver)
    }
}

impl HitObserver for ChannelObserver {
    fn on_hit(&self, event: &HitEvent) {
        if self.sender.lock().send(event.clone()).is_err() {
            trace!("Hit channel closed; dropping event");
        }
    }
}
