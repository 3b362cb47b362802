//! Domain restrictions (`domain=a.example|~b.a.example`, `a.example,~b.example##sel`).

use std::collections::HashMap;

/// Parsed include/exclude domain list of a filter.
///
/// Lookup walks from the full document domain up through its parents; the
/// first listed domain decides. Unlisted domains fall back to `default`, which
/// is `true` only when the list has no included domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRestriction {
    entries: HashMap<String, bool>,
    default: bool,
}

impl DomainRestriction {
    /// Parse a separator-delimited domain list. Returns `None` for an empty list.
    pub fn parse(source: &str, separator: char) -> Option<Self> {
        let mut entries = HashMap::new();
        let mut has_includes = false;

        for raw in source.split(separator) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (domain, include) = match raw.strip_prefix('~') {
                Some(rest) => (rest, false),
                None => {
                    has_includes = true;
                    (raw, true)
                }
            };
            if domain.is_empty() {
                continue;
            }
            entries.insert(normalize_domain(domain), include);
        }

        if entries.is_empty() {
            return None;
        }

        Some(Self {
            entries,
            default: !has_includes,
        })
    }

    /// True when at least one domain is explicitly included.
    pub fn has_includes(&self) -> bool {
        !self.default
    }

    pub fn is_active_on(&self, doc_domain: Option<&str>) -> bool {
        let Some(doc_domain) = doc_domain else {
            return self.default;
        };

        let normalized = normalize_domain(doc_domain);
        let mut current = normalized.as_str();
        loop {
            if let Some(include) = self.entries.get(current) {
                return *include;
            }
            match current.find('.') {
                Some(dot) => current = &current[dot + 1..],
                None => break,
            }
        }
        self.default
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}
