//! Cross-context messaging with request/response correlation.
//!
//! Each execution context owns a [`Port`]. Ports exchange fire-and-forget
//! messages, asynchronous requests and blocking synchronous requests; answers
//! from several peers are folded into one value, first defined answer wins.

pub mod aggregate;
pub mod correlation;
pub mod envelope;
pub mod handler;
pub mod port;

pub use aggregate::ResponseProcessor;
pub use correlation::{CorrelationTable, Resolution};
pub use envelope::{MessageContext, PortId, ReplyHandle, Request};
pub use handler::{Dispatch, HandlerId, HandlerRegistry, HandlerResult};
pub use port::Port;
