//! Pending request correlation.
//!
//! Each outstanding request gets a fresh id and an entry expecting one
//! response per recipient. The entry is removed and its resolver fired
//! exactly once, when the last response arrives, when it is cancelled, or
//! when the table is torn down.

use crate::error::MessagingError;
use crate::messaging::aggregate::ResponseProcessor;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Outcome delivered to a waiting requester.
pub type Resolution = Result<Option<Value>, MessagingError>;

struct PendingCorrelation {
    message_name: String,
    expected: usize,
    received: usize,
    responses: ResponseProcessor,
    resolver: oneshot::Sender<Resolution>,
}

#[derive(Default)]
pub struct CorrelationTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingCorrelation>>,
    closed: AtomicBool,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an entry expecting `expected` responses.
    ///
    /// With no expected responses the request resolves at once with no value.
    pub fn register(
        &self,
        message_name: &str,
        expected: usize,
    ) -> (u64, oneshot::Receiver<Resolution>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (resolver, receiver) = oneshot::channel();

        if self.is_closed() {
            let _ = resolver.send(Err(MessagingError::Closed(message_name.to_string())));
            return (id, receiver);
        }
        if expected == 0 {
            let _ = resolver.send(Ok(None));
            return (id, receiver);
        }

        self.pending.lock().insert(
            id,
            PendingCorrelation {
                message_name: message_name.to_string(),
                expected,
                received: 0,
                responses: ResponseProcessor::new(message_name),
                resolver,
            },
        );
        (id, receiver)
    }

    /// Count one response for `id`. Returns whether the request resolved.
    pub fn deliver(&self, id: u64, response: Option<Value>) -> bool {
        let finished = {
            let mut pending = self.pending.lock();
            let Some(entry) = pending.get_mut(&id) else {
                trace!(callback_id = id, "Response for unknown or finished request");
                return false;
            };
            entry.received += 1;
            entry.responses.add(response);
            if entry.received < entry.expected {
                return false;
            }
            pending.remove(&id)
        };

        match finished {
            Some(entry) => {
                let _ = entry.resolver.send(Ok(entry.responses.finish()));
                true
            }
            None => false,
        }
    }

    /// Resolve `id` with an error, e.g. after a timeout.
    pub fn cancel(&self, id: u64, error: MessagingError) -> bool {
        let Some(entry) = self.pending.lock().remove(&id) else {
            return false;
        };
        let _ = entry.resolver.send(Err(error));
        true
    }

    /// Reject every pending request and refuse new ones.
    pub fn discard_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<PendingCorrelation> =
            self.pending.lock().drain().map(|(_, entry)| entry).collect();
        let count = drained.len();
        for entry in drained {
            let _ = entry
                .resolver
                .send(Err(MessagingError::Disconnected(entry.message_name)));
        }
        if count > 0 {
            debug!(discarded = count, "Discarded pending requests");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
