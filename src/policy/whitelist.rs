//! Frame-chain whitelist resolution.

use crate::filters::filter::{Filter, TypeMask};
use crate::filters::matcher::{MatchQuery, Matcher};
use crate::policy::classify::host_of;
use crate::policy::sitekey::SiteKeyValidator;
use crate::types::{ContentType, FilterKind, Frame, HitRecord};
use std::sync::Arc;

/// Which kind of exception whitelisted a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistKind {
    Document,
    ElemHide,
    GenericBlock,
    GenericHide,
}

impl WhitelistKind {
    pub fn content_type(self) -> ContentType {
        match self {
            WhitelistKind::Document => ContentType::Document,
            WhitelistKind::ElemHide => ContentType::ElemHide,
            WhitelistKind::GenericBlock => ContentType::GenericBlock,
            WhitelistKind::GenericHide => ContentType::GenericHide,
        }
    }

    /// Generic exceptions only switch off generic filters.
    pub fn is_generic(self) -> bool {
        matches!(self, WhitelistKind::GenericBlock | WhitelistKind::GenericHide)
    }
}

/// A whitelist filter that applied to one frame of the chain.
#[derive(Debug, Clone)]
pub struct WhitelistHit {
    pub frame_index: usize,
    pub kind: WhitelistKind,
    pub parent_domain: Option<String>,
    pub location: String,
    pub filter: Arc<Filter>,
}

impl WhitelistHit {
    pub fn to_record(&self) -> HitRecord {
        HitRecord {
            frame_index: Some(self.frame_index),
            content_type: self.kind.content_type(),
            doc_domain: self.parent_domain.clone(),
            third_party: false,
            location: self.location.clone(),
            filter_text: Some(self.filter.text().to_string()),
            filter_kind: Some(FilterKind::Whitelist),
        }
    }
}

pub struct WhitelistResolver<'a> {
    matcher: &'a dyn Matcher,
    site_keys: &'a SiteKeyValidator<'a>,
}

impl<'a> WhitelistResolver<'a> {
    pub fn new(matcher: &'a dyn Matcher, site_keys: &'a SiteKeyValidator<'a>) -> Self {
        Self { matcher, site_keys }
    }

    /// Walk `frames` from the requesting frame to the top-level document.
    ///
    /// Returns the first document (or element hiding) exception; failing that,
    /// the first generic exception met along the way.
    pub fn resolve(&self, frames: &[Frame], is_elemhide: bool) -> Option<WhitelistHit> {
        let mut document_mask = TypeMask::DOCUMENT;
        if is_elemhide {
            document_mask |= TypeMask::ELEMHIDE;
        }
        let (generic_mask, generic_kind) = if is_elemhide {
            (TypeMask::GENERICHIDE, WhitelistKind::GenericHide)
        } else {
            (TypeMask::GENERICBLOCK, WhitelistKind::GenericBlock)
        };

        let mut site_key = self.site_keys.find(frames);
        let mut generic_hit = None;

        for (index, frame) in frames.iter().enumerate() {
            let parent_index = (index + 1).min(frames.len() - 1);
            let parent_domain = host_of(&frames[parent_index].location);
            let key = site_key.as_ref().map(|k| k.key.as_str());

            let query = MatchQuery::new(&frame.location, document_mask)
                .doc_domain(parent_domain.as_deref())
                .site_key(key);
            if let Some(filter) = whitelist_only(self.matcher.matches_any(&query)) {
                let kind = match filter.as_pattern() {
                    Some(pattern) if pattern.content_types().contains(TypeMask::DOCUMENT) => {
                        WhitelistKind::Document
                    }
                    _ => WhitelistKind::ElemHide,
                };
                return Some(WhitelistHit {
                    frame_index: index,
                    kind,
                    parent_domain,
                    location: frame.location.clone(),
                    filter,
                });
            }

            if generic_hit.is_none() {
                let query = MatchQuery::new(&frame.location, generic_mask)
                    .doc_domain(parent_domain.as_deref())
                    .site_key(key);
                if let Some(filter) = whitelist_only(self.matcher.matches_any(&query)) {
                    generic_hit = Some(WhitelistHit {
                        frame_index: index,
                        kind: generic_kind,
                        parent_domain: parent_domain.clone(),
                        location: frame.location.clone(),
                        filter,
                    });
                }
            }

            if site_key.as_ref().is_some_and(|k| k.frame_index == index) {
                site_key = self.site_keys.find_from(frames, index + 1);
            }
        }

        generic_hit
    }
}

fn whitelist_only(filter: Option<Arc<Filter>>) -> Option<Arc<Filter>> {
    filter.filter(|f| f.is_whitelist())
}
