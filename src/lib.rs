//! Content Policy: Request Classification and Blocking Decisions
//!
//! Decides whether a resource load should be allowed, blocked or collapsed by
//! consulting filter lists against the request's frame hierarchy, and carries
//! those decisions between execution contexts over correlated message ports.

pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod logging;
pub mod messaging;
pub mod policy;
pub mod service;
pub mod types;

pub use error::{MessagingError, PolicyError};
pub use filters::{FilterEngine, FilterList};
pub use messaging::Port;
pub use policy::Policy;
pub use service::{register_policy_handlers, ContentPolicyClient};
pub use types::{Decision, ElemHideStatus, Frame, HitRecord, RequestDescriptor};
