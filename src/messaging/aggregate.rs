//! Aggregation of several responses into one value.

use serde_json::Value;
use tracing::warn;

/// Folds responses: the first defined value wins.
///
/// A later defined value that differs is a protocol-usage error. It is logged
/// and dropped; it never fails the request.
#[derive(Debug, Clone)]
pub struct ResponseProcessor {
    message_name: String,
    value: Option<Value>,
    conflicts: usize,
}

impl ResponseProcessor {
    pub fn new(message_name: impl Into<String>) -> Self {
        Self {
            message_name: message_name.into(),
            value: None,
            conflicts: 0,
        }
    }

    pub fn add(&mut self, response: Option<Value>) {
        let Some(response) = response else {
            return;
        };
        match &self.value {
            None => self.value = Some(response),
            Some(existing) if *existing == response => {}
            Some(existing) => {
                self.conflicts += 1;
                warn!(
                    message = %self.message_name,
                    kept = %existing,
                    dropped = %response,
                    "Got multiple responses to a message"
                );
            }
        }
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn finish(self) -> Option<Value> {
        self.value
    }
}
