//! Ports: one messaging endpoint per execution context.
//!
//! A port owns its handler registry, its correlation table and an inbox.
//! Requests travel to peer inboxes; responses are written straight into the
//! requesting port's correlation table, so a caller blocked on a synchronous
//! request is resolved without its own inbox being pumped.
//!
//! Inboxes are processed either by [`Port::pump`] on the caller's thread or
//! by a dedicated thread started with [`Port::serve`], never both.

use crate::config::MessagingConfig;
use crate::error::MessagingError;
use crate::messaging::correlation::{CorrelationTable, Resolution};
use crate::messaging::envelope::{Envelope, MessageContext, PortId, ReplyHandle, Request};
use crate::messaging::handler::{Dispatch, HandlerId, HandlerRegistry, HandlerResult};
use futures::future::{self, BoxFuture, Either, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

/// A connected peer as seen from one port.
#[derive(Clone)]
struct Endpoint {
    id: PortId,
    sender: Sender<Envelope>,
    closed: Arc<AtomicBool>,
}

impl Endpoint {
    fn is_live(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

struct PortInner {
    id: PortId,
    name: String,
    config: MessagingConfig,
    sender: Sender<Envelope>,
    inbox: Mutex<Receiver<Envelope>>,
    peers: RwLock<Vec<Endpoint>>,
    handlers: HandlerRegistry,
    correlations: Arc<CorrelationTable>,
    /// Peers whose synchronous requests are being dispatched, with nesting depth.
    dispatching_sync: Mutex<HashMap<PortId, usize>>,
    closed: Arc<AtomicBool>,
    runtime: Option<Handle>,
}

#[derive(Clone)]
pub struct Port {
    inner: Arc<PortInner>,
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, MessagingConfig::default())
    }

    /// Deferred handler results and response timeouts use the Tokio runtime
    /// current at creation, if any, otherwise a short-lived thread.
    pub fn with_config(name: impl Into<String>, config: MessagingConfig) -> Self {
        let (sender, receiver) = channel();
        Self {
            inner: Arc::new(PortInner {
                id: PortId::next(),
                name: name.into(),
                config,
                sender,
                inbox: Mutex::new(receiver),
                peers: RwLock::new(Vec::new()),
                handlers: HandlerRegistry::new(),
                correlations: Arc::new(CorrelationTable::new()),
                dispatching_sync: Mutex::new(HashMap::new()),
                closed: Arc::new(AtomicBool::new(false)),
                runtime: Handle::try_current().ok(),
            }),
        }
    }

    /// Link two ports so each can message the other.
    pub fn connect(a: &Port, b: &Port) {
        a.add_peer(b);
        b.add_peer(a);
        debug!(a = %a.id(), b = %b.id(), "Ports connected");
    }

    fn add_peer(&self, other: &Port) {
        let mut peers = self.inner.peers.write();
        peers.retain(Endpoint::is_live);
        if peers.iter().any(|peer| peer.id == other.id()) {
            return;
        }
        peers.push(Endpoint {
            id: other.id(),
            sender: other.inner.sender.clone(),
            closed: Arc::clone(&other.inner.closed),
        });
    }

    pub fn id(&self) -> PortId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Connected peers that have not shut down.
    pub fn peer_ids(&self) -> Vec<PortId> {
        self.live_peers().iter().map(|peer| peer.id).collect()
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.correlations.pending_count()
    }

    // Handler registration

    pub fn on<F>(&self, message_name: &str, handler: F) -> HandlerId
    where
        F: Fn(Value, &MessageContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner.handlers.on(message_name, handler)
    }

    /// Register a handler with a typed payload and answer.
    ///
    /// A payload that fails to decode is logged and left unanswered.
    pub fn on_request<P, R, F>(&self, message_name: &str, handler: F) -> HandlerId
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(P, &MessageContext) -> Option<R> + Send + Sync + 'static,
    {
        let name = message_name.to_string();
        self.on(message_name, move |payload, context| {
            let Some(payload) = decode_payload::<P>(&name, payload) else {
                return HandlerResult::NoValue;
            };
            encode_answer(&name, handler(payload, context)).into()
        })
    }

    /// Register a handler whose typed answer is produced asynchronously.
    pub fn on_request_async<P, R, F, Fut>(&self, message_name: &str, handler: F) -> HandlerId
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(P, MessageContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<R>> + Send + 'static,
    {
        let name = message_name.to_string();
        self.on(message_name, move |payload, context| {
            let Some(payload) = decode_payload::<P>(&name, payload) else {
                return HandlerResult::NoValue;
            };
            let future = handler(payload, *context);
            let name = name.clone();
            HandlerResult::deferred(async move { encode_answer(&name, future.await) })
        })
    }

    pub fn off(&self, message_name: &str, id: HandlerId) -> bool {
        self.inner.handlers.off(message_name, id)
    }

    // Sending

    /// Fire-and-forget to every live peer.
    pub fn emit<P: Serialize + ?Sized>(&self, message_name: &str, payload: &P) -> Result<(), MessagingError> {
        self.ensure_open(message_name)?;
        let payload = encode_payload(message_name, payload)?;
        for peer in self.live_peers() {
            let request = Request {
                message_name: message_name.to_string(),
                payload: payload.clone(),
                origin: self.id(),
                sync: false,
                reply: None,
            };
            if peer.sender.send(Envelope::Request(request)).is_err() {
                trace!(peer = %peer.id, message = message_name, "Peer inbox gone");
            }
        }
        Ok(())
    }

    /// Request an answer from every live peer and wait asynchronously.
    ///
    /// Resolves with the first defined answer, or `None` when no peer
    /// answered with a value.
    pub async fn emit_with_response<P, T>(
        &self,
        message_name: &str,
        payload: &P,
    ) -> Result<Option<T>, MessagingError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_payload(message_name, payload)?;
        let (id, receiver) = self.send_request(message_name, payload, false, None)?;
        let value = self.await_response(message_name, id, receiver).await?;
        decode_answer(message_name, value)
    }

    /// Like [`Port::emit_with_response`] but addressed to a single peer.
    pub async fn emit_with_response_to<P, T>(
        &self,
        peer: PortId,
        message_name: &str,
        payload: &P,
    ) -> Result<Option<T>, MessagingError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_payload(message_name, payload)?;
        let (id, receiver) = self.send_request(message_name, payload, false, Some(peer))?;
        let value = self.await_response(message_name, id, receiver).await?;
        decode_answer(message_name, value)
    }

    /// Request an answer from every live peer, blocking the calling thread.
    ///
    /// Fails with [`MessagingError::Reentrant`] when called while this port
    /// is dispatching a synchronous request from one of those peers, since
    /// that peer is blocked and could never answer.
    pub fn emit_sync<P, T>(&self, message_name: &str, payload: &P) -> Result<Option<T>, MessagingError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_payload(message_name, payload)?;
        let (_, receiver) = self.send_request(message_name, payload, true, None)?;
        let value = futures::executor::block_on(receiver)
            .unwrap_or_else(|_| Err(MessagingError::Disconnected(message_name.to_string())))?;
        decode_answer(message_name, value)
    }

    fn send_request(
        &self,
        message_name: &str,
        payload: Value,
        sync: bool,
        target: Option<PortId>,
    ) -> Result<(u64, oneshot::Receiver<Resolution>), MessagingError> {
        self.ensure_open(message_name)?;

        let mut recipients = self.live_peers();
        if let Some(target) = target {
            recipients.retain(|peer| peer.id == target);
            if recipients.is_empty() {
                return Err(MessagingError::NoRecipients(message_name.to_string()));
            }
        }

        if sync {
            let dispatching = self.inner.dispatching_sync.lock();
            if recipients.iter().any(|peer| dispatching.contains_key(&peer.id)) {
                error!(
                    port = %self.id(),
                    message = message_name,
                    "Synchronous request to a peer blocked on this port"
                );
                return Err(MessagingError::Reentrant(message_name.to_string()));
            }
        }

        let (id, receiver) = self
            .inner
            .correlations
            .register(message_name, recipients.len());
        trace!(
            port = %self.id(),
            message = message_name,
            callback_id = id,
            recipients = recipients.len(),
            sync,
            "Sending request"
        );

        for peer in recipients {
            let request = Request {
                message_name: message_name.to_string(),
                payload: payload.clone(),
                origin: self.id(),
                sync,
                reply: Some(ReplyHandle::new(
                    Arc::downgrade(&self.inner.correlations),
                    id,
                )),
            };
            // A failed send drops the request, and its reply handle answers
            // with no value.
            if peer.sender.send(Envelope::Request(request)).is_err() {
                trace!(peer = %peer.id, message = message_name, "Peer inbox gone");
            }
        }
        Ok((id, receiver))
    }

    async fn await_response(
        &self,
        message_name: &str,
        id: u64,
        receiver: oneshot::Receiver<Resolution>,
    ) -> Resolution {
        let disconnected = || MessagingError::Disconnected(message_name.to_string());
        let Some(limit) = self.inner.config.response_timeout() else {
            return receiver.await.unwrap_or_else(|_| Err(disconnected()));
        };

        let answered = match self.inner.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => {
                // The timer binds to the runtime when it is created, so it
                // fires even when this future is polled by another executor.
                let timed = {
                    let _guard = handle.enter();
                    tokio::time::timeout(limit, receiver)
                };
                timed.await.ok()
            }
            None => match future::select(receiver, thread_timer(limit)).await {
                Either::Left((resolution, _)) => Some(resolution),
                Either::Right(_) => None,
            },
        };

        match answered {
            Some(resolution) => resolution.unwrap_or_else(|_| Err(disconnected())),
            None => {
                let error = MessagingError::Timeout(message_name.to_string());
                warn!(message = message_name, callback_id = id, "Request timed out");
                self.inner.correlations.cancel(id, error.clone());
                Err(error)
            }
        }
    }

    /// Live peers; endpoints of peers that shut down are dropped.
    fn live_peers(&self) -> Vec<Endpoint> {
        let mut peers = self.inner.peers.write();
        peers.retain(Endpoint::is_live);
        peers.clone()
    }

    fn ensure_open(&self, message_name: &str) -> Result<(), MessagingError> {
        if self.is_closed() {
            Err(MessagingError::Closed(message_name.to_string()))
        } else {
            Ok(())
        }
    }

    // Receiving

    /// Handle every message already in the inbox on the calling thread.
    pub fn pump(&self) -> usize {
        let mut count = 0usize;
        loop {
            let envelope = match self.inner.inbox.try_lock() {
                Some(inbox) => inbox.try_recv(),
                None => break,
            };
            match envelope {
                Ok(Envelope::Request(request)) => {
                    self.handle_request(request);
                    count += 1;
                }
                Ok(Envelope::Close) => {}
                Err(_) => break,
            }
        }
        count
    }

    /// Handle messages on a dedicated thread until [`Port::disconnect`].
    pub fn serve(&self) -> std::io::Result<JoinHandle<()>> {
        let port = self.clone();
        std::thread::Builder::new()
            .name(format!("{}-{}", self.inner.name, self.id()))
            .spawn(move || port.run())
    }

    fn run(&self) {
        debug!(port = %self.id(), name = %self.inner.name, "Port serving");
        loop {
            let envelope = self.inner.inbox.lock().recv();
            match envelope {
                Ok(Envelope::Request(request)) => self.handle_request(request),
                Ok(Envelope::Close) | Err(_) => break,
            }
        }
        debug!(port = %self.id(), "Port stopped serving");
    }

    fn handle_request(&self, request: Request) {
        if self.is_closed() {
            // Dropping the reply handle answers with no value.
            return;
        }

        let context = request.context();
        let Request {
            message_name,
            payload,
            reply,
            ..
        } = request;

        if context.sync {
            *self
                .inner
                .dispatching_sync
                .lock()
                .entry(context.sender)
                .or_insert(0) += 1;
        }
        let dispatch = self.inner.handlers.dispatch(&message_name, payload, &context);
        if context.sync {
            let mut dispatching = self.inner.dispatching_sync.lock();
            if let Some(depth) = dispatching.get_mut(&context.sender) {
                *depth -= 1;
                if *depth == 0 {
                    dispatching.remove(&context.sender);
                }
            }
        }

        match (dispatch, reply) {
            (Dispatch::Ready(value), Some(reply)) => reply.send(value),
            (Dispatch::Ready(_), None) => {}
            (Dispatch::Deferred(_), Some(reply)) if context.sync => {
                error!(
                    message = %message_name,
                    sender = %context.sender,
                    "Asynchronous response to a synchronous request"
                );
                reply.send(None);
            }
            (Dispatch::Deferred(future), Some(reply)) => {
                self.spawn(async move { reply.send(future.await) }.boxed());
            }
            (Dispatch::Deferred(future), None) => {
                self.spawn(
                    async move {
                        future.await;
                    }
                    .boxed(),
                );
            }
        }
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        match self.inner.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => {
                handle.spawn(task);
            }
            None => {
                let spawned = std::thread::Builder::new()
                    .name(format!("{}-deferred", self.inner.name))
                    .spawn(move || futures::executor::block_on(task));
                if let Err(e) = spawned {
                    error!(error = %e, "Failed to run deferred response");
                }
            }
        }
    }

    /// Tear the port down: reject everything pending, stop serving and
    /// answer queued requests with no value.
    pub fn disconnect(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let discarded = self.inner.correlations.discard_all();
        self.inner.peers.write().clear();
        if let Some(inbox) = self.inner.inbox.try_lock() {
            while inbox.try_recv().is_ok() {}
        }
        let _ = self.inner.sender.send(Envelope::Close);
        debug!(port = %self.id(), discarded, "Port disconnected");
    }
}

/// Completes after `limit` without needing an async runtime.
fn thread_timer(limit: Duration) -> BoxFuture<'static, ()> {
    let (fire, fired) = oneshot::channel::<()>();
    let spawned = std::thread::Builder::new()
        .name("port-timeout".to_string())
        .spawn(move || {
            std::thread::sleep(limit);
            let _ = fire.send(());
        });
    match spawned {
        Ok(_) => fired.map(|_| ()).boxed(),
        Err(e) => {
            warn!(error = %e, "Failed to start response timer; waiting without timeout");
            future::pending().boxed()
        }
    }
}

fn encode_payload<P: Serialize + ?Sized>(message_name: &str, payload: &P) -> Result<Value, MessagingError> {
    serde_json::to_value(payload).map_err(|e| MessagingError::Encode {
        message: message_name.to_string(),
        reason: e.to_string(),
    })
}

fn decode_answer<T: DeserializeOwned>(
    message_name: &str,
    value: Option<Value>,
) -> Result<Option<T>, MessagingError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| MessagingError::Decode {
                message: message_name.to_string(),
                reason: e.to_string(),
            }),
    }
}

fn decode_payload<P: DeserializeOwned>(message_name: &str, payload: Value) -> Option<P> {
    match serde_json::from_value(payload) {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!(message = message_name, error = %e, "Malformed message payload");
            None
        }
    }
}

fn encode_answer<R: Serialize>(message_name: &str, answer: Option<R>) -> Option<Value> {
    let answer = answer?;
    match serde_json::to_value(answer) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(message = message_name, error = %e, "Failed to encode answer");
            None
        }
    }
}
