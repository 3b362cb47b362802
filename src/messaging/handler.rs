//! Message handler registry.

use crate::messaging::aggregate::ResponseProcessor;
use crate::messaging::envelope::MessageContext;
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What a handler produced for one message.
pub enum HandlerResult {
    /// The handler does not answer this message.
    NoValue,
    Value(Value),
    /// The answer is computed later.
    Deferred(BoxFuture<'static, Option<Value>>),
}

impl HandlerResult {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Option<Value>> + Send + 'static,
    {
        HandlerResult::Deferred(future.boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, HandlerResult::Deferred(_))
    }
}

impl From<Option<Value>> for HandlerResult {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => HandlerResult::Value(value),
            None => HandlerResult::NoValue,
        }
    }
}

impl std::fmt::Debug for HandlerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerResult::NoValue => f.write_str("NoValue"),
            HandlerResult::Value(value) => f.debug_tuple("Value").field(value).finish(),
            HandlerResult::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

pub type Handler = Arc<dyn Fn(Value, &MessageContext) -> HandlerResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Aggregated outcome of dispatching one message to all its handlers.
pub enum Dispatch {
    Ready(Option<Value>),
    Deferred(BoxFuture<'static, Option<Value>>),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Dispatch::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Handlers per message name, invoked in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<String, Vec<(HandlerId, Handler)>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, message_name: &str, handler: F) -> HandlerId
    where
        F: Fn(Value, &MessageContext) -> HandlerResult + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(message_name.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    pub fn off(&self, message_name: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(message_name) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = before != list.len();
        if list.is_empty() {
            handlers.remove(message_name);
        }
        removed
    }

    pub fn has_handlers(&self, message_name: &str) -> bool {
        self.handlers.read().contains_key(message_name)
    }

    /// Invoke every handler for `message_name` and fold their results.
    pub fn dispatch(&self, message_name: &str, payload: Value, context: &MessageContext) -> Dispatch {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(message_name)
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        let results: Vec<HandlerResult> = handlers
            .iter()
            .map(|handler| handler(payload.clone(), context))
            .collect();

        if !results.iter().any(HandlerResult::is_deferred) {
            let mut responses = ResponseProcessor::new(message_name);
            for result in results {
                if let HandlerResult::Value(value) = result {
                    responses.add(Some(value));
                }
            }
            return Dispatch::Ready(responses.finish());
        }

        let pending: Vec<BoxFuture<'static, Option<Value>>> = results
            .into_iter()
            .map(|result| match result {
                HandlerResult::NoValue => future::ready(None).boxed(),
                HandlerResult::Value(value) => future::ready(Some(value)).boxed(),
                HandlerResult::Deferred(future) => future,
            })
            .collect();
        let message_name = message_name.to_string();
        Dispatch::Deferred(
            async move {
                let mut responses = ResponseProcessor::new(message_name);
                for value in future::join_all(pending).await {
                    responses.add(value);
                }
                responses.finish()
            }
            .boxed(),
        )
    }
}
