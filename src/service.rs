//! Wiring between the policy engine and the messaging layer.
//!
//! The parent side answers `shouldAllow`, `elemhideEnabled` and
//! `registerElemHideHit` on its port. Interception points in other contexts
//! use [`ContentPolicyClient`], which falls back to a safe default whenever no
//! verdict arrives.

use crate::error::MessagingError;
use crate::messaging::{HandlerId, Port};
use crate::policy::Policy;
use crate::types::{
    Decision, ElemHideHitRequest, ElemHideQuery, ElemHideStatus, HitRecord, RequestDescriptor,
};
use std::sync::Arc;
use tracing::warn;

pub const SHOULD_ALLOW: &str = "shouldAllow";
pub const ELEMHIDE_ENABLED: &str = "elemhideEnabled";
pub const REGISTER_ELEMHIDE_HIT: &str = "registerElemHideHit";

/// Handlers registered by [`register_policy_handlers`].
pub struct PolicyHandlers {
    port: Port,
    ids: Vec<(&'static str, HandlerId)>,
}

impl PolicyHandlers {
    pub fn unregister(self) {
        for (name, id) in self.ids {
            self.port.off(name, id);
        }
    }
}

/// Answer policy messages arriving on `port` with `policy`.
pub fn register_policy_handlers(port: &Port, policy: Arc<Policy>) -> PolicyHandlers {
    let mut ids = Vec::with_capacity(3);

    let should_allow = Arc::clone(&policy);
    ids.push((
        SHOULD_ALLOW,
        port.on_request(SHOULD_ALLOW, move |request: RequestDescriptor, _| {
            Some(should_allow.should_allow(&request))
        }),
    ));

    let elemhide = Arc::clone(&policy);
    ids.push((
        ELEMHIDE_ENABLED,
        port.on_request(ELEMHIDE_ENABLED, move |query: ElemHideQuery, _| {
            Some(elemhide.elemhide_enabled(&query))
        }),
    ));

    ids.push((
        REGISTER_ELEMHIDE_HIT,
        port.on_request(REGISTER_ELEMHIDE_HIT, move |request: ElemHideHitRequest, _| {
            policy.register_elemhide_hit(&request)
        }),
    ));

    PolicyHandlers {
        port: port.clone(),
        ids,
    }
}

/// Content-side access to the policy over a port.
#[derive(Debug, Clone)]
pub struct ContentPolicyClient {
    port: Port,
}

impl ContentPolicyClient {
    pub fn new(port: Port) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Blocking verdict for a request; blocks it when no verdict arrives.
    ///
    /// Must not be called from an async task; use
    /// [`ContentPolicyClient::should_allow_async`] there.
    pub fn should_allow(&self, request: &RequestDescriptor) -> Decision {
        let result = self.port.emit_sync(SHOULD_ALLOW, request);
        decision_or_fail_safe(request, result)
    }

    pub async fn should_allow_async(&self, request: &RequestDescriptor) -> Decision {
        let result = self.port.emit_with_response(SHOULD_ALLOW, request).await;
        decision_or_fail_safe(request, result)
    }

    /// Element hiding status; "not enabled" when no answer arrives.
    pub fn elemhide_enabled(&self, query: &ElemHideQuery) -> ElemHideStatus {
        match self.port.emit_sync::<_, ElemHideStatus>(ELEMHIDE_ENABLED, query) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!("No element hiding status received; hiding disabled");
                ElemHideStatus::disabled()
            }
            Err(e) => {
                warn!(error = %e, "Element hiding status request failed; hiding disabled");
                ElemHideStatus::disabled()
            }
        }
    }

    pub async fn register_elemhide_hit(
        &self,
        request: &ElemHideHitRequest,
    ) -> Result<Option<HitRecord>, MessagingError> {
        self.port
            .emit_with_response(REGISTER_ELEMHIDE_HIT, request)
            .await
    }
}

fn decision_or_fail_safe(
    request: &RequestDescriptor,
    result: Result<Option<Decision>, MessagingError>,
) -> Decision {
    match result {
        Ok(Some(decision)) => decision,
        Ok(None) => {
            warn!(location = %request.location, "No verdict received; blocking request");
            Decision::fail_safe()
        }
        Err(e) => {
            warn!(location = %request.location, error = %e, "Verdict request failed; blocking request");
            Decision::fail_safe()
        }
    }
}
