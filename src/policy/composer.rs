//! Decision composition for intercepted requests.

use crate::config::Preferences;
use crate::filters::elemhide::ElemHideLookup;
use crate::filters::engine::FilterEngine;
use crate::filters::filter::{Filter, TypeMask};
use crate::filters::matcher::{MatchQuery, Matcher};
use crate::filters::storage::FilterStorage;
use crate::policy::classify::{host_of, is_blockable_scheme, is_third_party, strip_fragment};
use crate::policy::recorder::HitRecorder;
use crate::policy::sitekey::{RsaSha1Verifier, SignatureVerifier, SiteKeyValidator};
use crate::policy::whitelist::{WhitelistKind, WhitelistResolver};
use crate::types::{ContentType, Decision, Frame, HitRecord, RequestDescriptor};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Collaborators the policy consults.
pub struct PolicyDeps {
    pub matcher: Arc<dyn Matcher>,
    pub elemhide: Arc<dyn ElemHideLookup>,
    pub storage: Arc<dyn FilterStorage>,
}

impl From<&FilterEngine> for PolicyDeps {
    fn from(engine: &FilterEngine) -> Self {
        Self {
            matcher: engine.matcher.clone(),
            elemhide: engine.elemhide.clone(),
            storage: engine.storage.clone(),
        }
    }
}

/// The blocking decision engine.
///
/// Stateless apart from its collaborators; safe to share across threads.
pub struct Policy {
    pub(super) matcher: Arc<dyn Matcher>,
    pub(super) elemhide: Arc<dyn ElemHideLookup>,
    pub(super) recorder: Arc<HitRecorder>,
    pub(super) preferences: RwLock<Preferences>,
    pub(super) verifier: Arc<dyn SignatureVerifier>,
}

impl Policy {
    pub fn new(deps: PolicyDeps, preferences: Preferences) -> Self {
        Self {
            matcher: deps.matcher,
            elemhide: deps.elemhide,
            recorder: Arc::new(HitRecorder::new(deps.storage)),
            preferences: RwLock::new(preferences),
            verifier: Arc::new(RsaSha1Verifier),
        }
    }

    pub fn from_engine(engine: &FilterEngine, preferences: Preferences) -> Self {
        Self::new(PolicyDeps::from(engine), preferences)
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn recorder(&self) -> &Arc<HitRecorder> {
        &self.recorder
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.read().clone()
    }

    pub fn set_preferences(&self, preferences: Preferences) {
        *self.preferences.write() = preferences;
    }

    /// Decide whether a request may proceed.
    ///
    /// ELEMHIDE requests are only blocked while filtering is enabled.
    pub fn should_allow(&self, request: &RequestDescriptor) -> Decision {
        let prefs = self.preferences.read().clone();
        let content_type = ContentType::normalize(&request.content_type);

        if content_type != ContentType::Popup
            && !is_blockable_scheme(&request.location, &prefs.whitelist_schemes)
        {
            return Decision::allowed();
        }

        let validator = SiteKeyValidator::new(self.verifier.as_ref(), &prefs.client_identifier);
        let mut hits = Vec::new();
        let mut nogeneric = false;

        if prefs.enabled {
            let resolver = WhitelistResolver::new(self.matcher.as_ref(), &validator);
            let is_elemhide = content_type == ContentType::ElemHide;
            if let Some(hit) = resolver.resolve(&request.frames, is_elemhide) {
                self.push_hit(&mut hits, hit.to_record(), Some(hit.filter.as_ref()), request.is_private);
                if hit.kind.is_generic() {
                    nogeneric = true;
                } else {
                    debug!(
                        location = %request.location,
                        filter = hit.filter.text(),
                        "Request allowed by frame exception"
                    );
                    return Decision {
                        allow: true,
                        collapse: false,
                        hits,
                    };
                }
            }
        }

        let doc_domain = request.frames.first().and_then(|f| host_of(&f.location));
        let site_key = validator.find(&request.frames);
        let site_key = site_key.as_ref().map(|k| k.key.as_str());

        if content_type == ContentType::ElemHide {
            return self.elemhide_decision(request, &prefs, doc_domain, nogeneric, hits);
        }

        let third_party = is_third_party(&request.location, doc_domain.as_deref());
        let mut matched = None;
        let mut collapse = false;

        if prefs.enabled {
            let query = MatchQuery::new(&request.location, TypeMask::of(content_type))
                .doc_domain(doc_domain.as_deref())
                .third_party(third_party)
                .site_key(site_key)
                .specific_only(nogeneric);
            matched = self
                .matcher
                .matches_any(&query)
                .filter(|f| matches!(f.as_ref(), Filter::Blocking(_) | Filter::Whitelist(_)));

            if let Some(Filter::Blocking(pattern)) = matched.as_deref() {
                if content_type.is_visual() {
                    collapse = pattern.collapse().unwrap_or(!prefs.fast_collapse);
                }
            }
        }

        let record = HitRecord {
            frame_index: None,
            content_type,
            doc_domain,
            third_party,
            location: request.location.clone(),
            filter_text: matched.as_ref().map(|f| f.text().to_string()),
            filter_kind: matched.as_ref().map(|f| f.kind()),
        };
        self.push_hit(&mut hits, record, matched.as_deref(), request.is_private);

        let allow = matched.as_ref().map_or(true, |f| f.is_whitelist());
        debug!(
            location = %request.location,
            content_type = %content_type,
            allow,
            collapse,
            filter = matched.as_ref().map(|f| f.text()),
            "Request classified"
        );
        Decision {
            allow,
            collapse,
            hits,
        }
    }

    /// ELEMHIDE requests carry an element hiding filter key as their location.
    ///
    /// With filtering disabled every ELEMHIDE request is allowed, even when
    /// the key resolves to an active hiding filter.
    fn elemhide_decision(
        &self,
        request: &RequestDescriptor,
        prefs: &Preferences,
        doc_domain: Option<String>,
        nogeneric: bool,
        mut hits: Vec<HitRecord>,
    ) -> Decision {
        let allowed = |hits: Vec<HitRecord>| Decision {
            allow: true,
            collapse: false,
            hits,
        };

        if !prefs.enabled {
            return allowed(hits);
        }
        let Some(filter) = self.elemhide.filter_by_key(&request.location) else {
            return allowed(hits);
        };
        let Some(elemhide) = filter.as_elemhide() else {
            return allowed(hits);
        };
        if !elemhide.is_active_on_domain(doc_domain.as_deref()) {
            return allowed(hits);
        }

        let record = |filter: &Filter| HitRecord {
            frame_index: None,
            content_type: ContentType::ElemHide,
            doc_domain: doc_domain.clone(),
            third_party: false,
            location: elemhide.hit_location(),
            filter_text: Some(filter.text().to_string()),
            filter_kind: Some(filter.kind()),
        };

        if let Some(exception) = self.elemhide.exception_for(&filter, doc_domain.as_deref()) {
            self.push_hit(&mut hits, record(&exception), Some(exception.as_ref()), request.is_private);
            return allowed(hits);
        }
        if nogeneric && elemhide.is_generic() {
            return allowed(hits);
        }

        self.push_hit(&mut hits, record(&filter), Some(filter.as_ref()), request.is_private);
        Decision {
            allow: false,
            collapse: false,
            hits,
        }
    }

    fn push_hit(
        &self,
        hits: &mut Vec<HitRecord>,
        record: HitRecord,
        filter: Option<&Filter>,
        is_private: bool,
    ) {
        self.recorder.record(&record, filter, is_private);
        hits.push(record);
    }

    /// Whitelist filter exempting the page at `url`, if any.
    ///
    /// `parent_url` supplies the domain the page is embedded in; without it the
    /// page is treated as top-level.
    pub fn is_whitelisted(
        &self,
        url: &str,
        parent_url: Option<&str>,
        site_key: Option<&str>,
    ) -> Option<Arc<Filter>> {
        if url.is_empty() {
            return None;
        }
        let prefs = self.preferences.read();
        if !is_blockable_scheme(url, &prefs.whitelist_schemes) {
            return None;
        }
        drop(prefs);

        let url = strip_fragment(url);
        let parent_domain = host_of(parent_url.unwrap_or(url));
        let site_key = site_key.map(|key| key.trim_end_matches('='));
        let query = MatchQuery::new(url, TypeMask::DOCUMENT)
            .doc_domain(parent_domain.as_deref())
            .site_key(site_key);
        self.matcher.matches_any(&query).filter(|f| f.is_whitelist())
    }

    /// Document or element hiding exception covering a frame chain.
    ///
    /// Generic exceptions do not count.
    pub fn check_whitelisted(&self, frames: &[Frame], is_elemhide: bool) -> Option<Arc<Filter>> {
        let prefs = self.preferences.read().clone();
        let validator = SiteKeyValidator::new(self.verifier.as_ref(), &prefs.client_identifier);
        let hit = WhitelistResolver::new(self.matcher.as_ref(), &validator)
            .resolve(frames, is_elemhide)?;
        match hit.kind {
            WhitelistKind::Document | WhitelistKind::ElemHide => Some(hit.filter),
            WhitelistKind::GenericBlock | WhitelistKind::GenericHide => None,
        }
    }
}
