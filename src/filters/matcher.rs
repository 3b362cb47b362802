//! Filter matching.
//!
//! The decision engine only depends on the [`Matcher`] trait. [`CombinedMatcher`]
//! is the in-memory implementation used by [`crate::filters::FilterEngine`].

use crate::filters::filter::{Filter, TypeMask};
use parking_lot::RwLock;
use std::sync::Arc;

/// Normalized request description handed to a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchQuery<'a> {
    pub location: &'a str,
    pub type_mask: TypeMask,
    pub doc_domain: Option<&'a str>,
    pub third_party: bool,
    pub site_key: Option<&'a str>,
    /// Skip generic blocking filters (a generic exception applies).
    pub specific_only: bool,
}

impl<'a> MatchQuery<'a> {
    pub fn new(location: &'a str, type_mask: TypeMask) -> Self {
        Self {
            location,
            type_mask,
            doc_domain: None,
            third_party: false,
            site_key: None,
            specific_only: false,
        }
    }

    pub fn doc_domain(mut self, doc_domain: Option<&'a str>) -> Self {
        self.doc_domain = doc_domain;
        self
    }

    pub fn third_party(mut self, third_party: bool) -> Self {
        self.third_party = third_party;
        self
    }

    pub fn site_key(mut self, site_key: Option<&'a str>) -> Self {
        self.site_key = site_key;
        self
    }

    pub fn specific_only(mut self, specific_only: bool) -> Self {
        self.specific_only = specific_only;
        self
    }
}

/// Returns the single highest-precedence filter matching a request.
///
/// Contract: a whitelist filter always outranks a blocking filter; among
/// filters of the same kind the most specific wins; ties go to the filter
/// added last.
pub trait Matcher: Send + Sync {
    fn matches_any(&self, query: &MatchQuery<'_>) -> Option<Arc<Filter>>;
}

#[derive(Default)]
struct FilterSets {
    blocking: Vec<Arc<Filter>>,
    whitelist: Vec<Arc<Filter>>,
}

/// Blocking and whitelist filters kept in insertion order.
#[derive(Default)]
pub struct CombinedMatcher {
    sets: RwLock<FilterSets>,
}

impl CombinedMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blocking or whitelist filter; other kinds are ignored.
    pub fn add(&self, filter: Arc<Filter>) -> bool {
        let mut sets = self.sets.write();
        let target = match filter.as_ref() {
            Filter::Blocking(_) => &mut sets.blocking,
            Filter::Whitelist(_) => &mut sets.whitelist,
            _ => return false,
        };
        if target.iter().any(|existing| existing.text() == filter.text()) {
            return false;
        }
        target.push(filter);
        true
    }

    pub fn remove(&self, text: &str) -> bool {
        let mut sets = self.sets.write();
        let before = sets.blocking.len() + sets.whitelist.len();
        sets.blocking.retain(|f| f.text() != text);
        sets.whitelist.retain(|f| f.text() != text);
        before != sets.blocking.len() + sets.whitelist.len()
    }

    pub fn clear(&self) {
        let mut sets = self.sets.write();
        sets.blocking.clear();
        sets.whitelist.clear();
    }

    pub fn len(&self) -> usize {
        let sets = self.sets.read();
        sets.blocking.len() + sets.whitelist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn best_match<'f>(
    filters: &'f [Arc<Filter>],
    query: &MatchQuery<'_>,
    skip_generic: bool,
) -> Option<&'f Arc<Filter>> {
    let mut best: Option<(&Arc<Filter>, (bool, usize))> = None;
    for filter in filters {
        let Some(pattern) = filter.as_pattern() else {
            continue;
        };
        if skip_generic && pattern.is_generic() {
            continue;
        }
        if !pattern.matches(
            query.location,
            query.type_mask,
            query.doc_domain,
            query.third_party,
            query.site_key,
        ) {
            continue;
        }
        let rank = pattern.specificity();
        match best {
            Some((_, best_rank)) if rank < best_rank => {}
            _ => best = Some((filter, rank)),
        }
    }
    best.map(|(filter, _)| filter)
}

impl Matcher for CombinedMatcher {
    fn matches_any(&self, query: &MatchQuery<'_>) -> Option<Arc<Filter>> {
        let sets = self.sets.read();
        if let Some(filter) = best_match(&sets.whitelist, query, false) {
            return Some(Arc::clone(filter));
        }
        best_match(&sets.blocking, query, query.specific_only).map(Arc::clone)
    }
}
