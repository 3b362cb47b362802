//! Request classification and blocking decisions.
//!
//! [`Policy`] combines the frame-chain whitelist walk, site-key validation and
//! the filter matcher into one verdict per request, and records every hit.

pub mod classify;
pub mod composer;
pub mod elemhide;
pub mod recorder;
pub mod sitekey;
pub mod whitelist;

pub use composer::{Policy, PolicyDeps};
pub use recorder::{ChannelObserver, HitEvent, HitObserver, HitRecorder, HitStatistics, HitSummary};
pub use sitekey::{RsaSha1Verifier, SignatureVerifier, SiteKey, SiteKeyValidator};
pub use whitelist::{WhitelistHit, WhitelistKind, WhitelistResolver};
