//! Message envelopes carried between ports.

use crate::messaging::correlation::CorrelationTable;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

static NEXT_PORT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a port within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(u64);

impl PortId {
    pub(crate) fn next() -> Self {
        PortId(NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port-{}", self.0)
    }
}

/// What a handler knows about the message it is handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageContext {
    pub sender: PortId,
    /// The sender is blocked until every recipient answers.
    pub sync: bool,
}

/// Answers one correlated request on the sender's correlation table.
///
/// Dropping an unused handle answers with "no value", so a request that is
/// never handled still counts towards the expected responses.
pub struct ReplyHandle {
    table: Option<Weak<CorrelationTable>>,
    callback_id: u64,
}

impl ReplyHandle {
    pub(crate) fn new(table: Weak<CorrelationTable>, callback_id: u64) -> Self {
        Self {
            table: Some(table),
            callback_id,
        }
    }

    pub fn callback_id(&self) -> u64 {
        self.callback_id
    }

    pub fn send(mut self, value: Option<Value>) {
        self.deliver(value);
    }

    fn deliver(&mut self, value: Option<Value>) {
        if let Some(table) = self.table.take().and_then(|weak| weak.upgrade()) {
            table.deliver(self.callback_id, value);
        }
    }
}

impl Drop for ReplyHandle {
    fn drop(&mut self) {
        self.deliver(None);
    }
}

impl fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("callback_id", &self.callback_id)
            .field("pending", &self.table.is_some())
            .finish()
    }
}

/// A request as delivered to the receiving port.
#[derive(Debug)]
pub struct Request {
    pub message_name: String,
    pub payload: Value,
    pub origin: PortId,
    pub sync: bool,
    /// `None` for fire-and-forget messages.
    pub reply: Option<ReplyHandle>,
}

impl Request {
    pub fn context(&self) -> MessageContext {
        MessageContext {
            sender: self.origin,
            sync: self.sync,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Envelope {
    Request(Request),
    /// Stops a serving thread.
    Close,
}
