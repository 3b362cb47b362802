//! Filter classes.
//!
//! A filter's kind is fixed when its text is parsed; callers dispatch on the
//! [`Filter`] variant and never re-derive it.

use crate::filters::domains::DomainRestriction;
use crate::filters::pattern;
use crate::types::{ContentType, FilterKind};
use bitflags::bitflags;
use regex::Regex;
use std::fmt;

bitflags! {
    /// Set of content types a filter applies to, or a request is checked for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeMask: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUBDOCUMENT = 1 << 5;
        const DOCUMENT = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const OBJECT_SUBREQUEST = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
        const WEBSOCKET = 1 << 12;
        const ELEMHIDE = 1 << 13;
        const POPUP = 1 << 14;
        const GENERICHIDE = 1 << 15;
        const GENERICBLOCK = 1 << 16;
    }
}

impl TypeMask {
    pub fn of(content_type: ContentType) -> TypeMask {
        match content_type {
            ContentType::Other => TypeMask::OTHER,
            ContentType::Script => TypeMask::SCRIPT,
            ContentType::Image => TypeMask::IMAGE,
            ContentType::Stylesheet => TypeMask::STYLESHEET,
            ContentType::Object => TypeMask::OBJECT,
            ContentType::Subdocument => TypeMask::SUBDOCUMENT,
            ContentType::Document => TypeMask::DOCUMENT,
            ContentType::XmlHttpRequest => TypeMask::XMLHTTPREQUEST,
            ContentType::ObjectSubrequest => TypeMask::OBJECT_SUBREQUEST,
            ContentType::Font => TypeMask::FONT,
            ContentType::Media => TypeMask::MEDIA,
            ContentType::Ping => TypeMask::PING,
            ContentType::WebSocket => TypeMask::WEBSOCKET,
            ContentType::ElemHide => TypeMask::ELEMHIDE,
            ContentType::Popup => TypeMask::POPUP,
            ContentType::GenericHide => TypeMask::GENERICHIDE,
            ContentType::GenericBlock => TypeMask::GENERICBLOCK,
        }
    }

    /// Types a filter applies to when it names none explicitly.
    pub fn default_for_filters() -> TypeMask {
        TypeMask::all()
            - (TypeMask::DOCUMENT
                | TypeMask::ELEMHIDE
                | TypeMask::POPUP
                | TypeMask::GENERICHIDE
                | TypeMask::GENERICBLOCK)
    }

    /// Resolve a filter option name (already upper-cased, `-` mapped to `_`).
    fn from_option(name: &str) -> Option<TypeMask> {
        let mask = match name {
            "BACKGROUND" | "IMAGESET" => TypeMask::IMAGE,
            "XBL" | "DTD" => TypeMask::OTHER,
            "BEACON" => TypeMask::PING,
            "FETCH" => TypeMask::XMLHTTPREQUEST,
            other => TypeMask::of(other.parse::<ContentType>().ok()?),
        };
        Some(mask)
    }
}

/// A parsed filter.
#[derive(Debug, Clone)]
pub enum Filter {
    Blocking(PatternFilter),
    Whitelist(PatternFilter),
    ElemHide(ElemHideFilter),
    ElemHideException(ElemHideFilter),
    Comment { text: String },
    Invalid { text: String, reason: String },
}

impl Filter {
    /// Parse one line of filter text.
    pub fn parse(text: &str) -> Filter {
        let text = text.trim();
        if text.is_empty() || text.starts_with('!') || text.starts_with("[Adblock") {
            return Filter::Comment {
                text: text.to_string(),
            };
        }

        if let Some(filter) = ElemHideFilter::parse(text) {
            return filter;
        }

        match PatternFilter::parse(text) {
            Ok((filter, true)) => Filter::Whitelist(filter),
            Ok((filter, false)) => Filter::Blocking(filter),
            Err(reason) => Filter::Invalid {
                text: text.to_string(),
                reason,
            },
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Filter::Blocking(f) | Filter::Whitelist(f) => &f.text,
            Filter::ElemHide(f) | Filter::ElemHideException(f) => &f.text,
            Filter::Comment { text } | Filter::Invalid { text, .. } => text,
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Blocking(_) => FilterKind::Blocking,
            Filter::Whitelist(_) => FilterKind::Whitelist,
            Filter::ElemHide(_) => FilterKind::ElemHide,
            Filter::ElemHideException(_) => FilterKind::ElemHideException,
            Filter::Comment { .. } => FilterKind::Comment,
            Filter::Invalid { .. } => FilterKind::Invalid,
        }
    }

    pub fn is_whitelist(&self) -> bool {
        matches!(self, Filter::Whitelist(_))
    }

    pub fn as_pattern(&self) -> Option<&PatternFilter> {
        match self {
            Filter::Blocking(f) | Filter::Whitelist(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_elemhide(&self) -> Option<&ElemHideFilter> {
        match self {
            Filter::ElemHide(f) | Filter::ElemHideException(f) => Some(f),
            _ => None,
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.text() == other.text()
    }
}

impl Eq for Filter {}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Blocking or whitelist filter matched against request URLs.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    text: String,
    regex: Regex,
    content_types: TypeMask,
    domains: Option<DomainRestriction>,
    third_party: Option<bool>,
    site_keys: Vec<String>,
    collapse: Option<bool>,
    literal_len: usize,
}

impl PatternFilter {
    /// Returns the filter and whether it is a whitelist (`@@`) filter.
    fn parse(text: &str) -> Result<(PatternFilter, bool), String> {
        let (is_whitelist, body) = match text.strip_prefix("@@") {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (pattern_text, options) = split_options(body);

        let mut content_types: Option<TypeMask> = None;
        let mut match_case = false;
        let mut domains = None;
        let mut third_party = None;
        let mut site_keys = Vec::new();
        let mut collapse = None;

        for option in options {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (option, None),
            };
            let name = name.to_ascii_uppercase().replace('-', "_");

            if let Some(inverted) = name.strip_prefix('~') {
                if let Some(mask) = TypeMask::from_option(inverted) {
                    let current = content_types.unwrap_or_else(TypeMask::default_for_filters);
                    content_types = Some(current - mask);
                    continue;
                }
            } else if let Some(mask) = TypeMask::from_option(&name) {
                content_types = Some(content_types.unwrap_or(TypeMask::empty()) | mask);
                continue;
            }

            match (name.as_str(), value) {
                ("MATCH_CASE", None) => match_case = true,
                ("~MATCH_CASE", None) => match_case = false,
                ("DOMAIN", Some(value)) => domains = DomainRestriction::parse(value, '|'),
                ("THIRD_PARTY", None) => third_party = Some(true),
                ("~THIRD_PARTY", None) => third_party = Some(false),
                ("COLLAPSE", None) => collapse = Some(true),
                ("~COLLAPSE", None) => collapse = Some(false),
                ("SITEKEY", Some(value)) => {
                    site_keys = value
                        .split('|')
                        .map(|key| key.trim_end_matches('=').to_string())
                        .filter(|key| !key.is_empty())
                        .collect();
                }
                _ => return Err(format!("Unknown option {}", option)),
            }
        }

        let regex = pattern::compile(pattern_text, match_case)
            .map_err(|e| format!("Invalid regular expression: {}", e))?;

        Ok((
            PatternFilter {
                text: text.to_string(),
                regex,
                content_types: content_types.unwrap_or_else(TypeMask::default_for_filters),
                domains,
                third_party,
                site_keys,
                collapse,
                literal_len: pattern::literal_len(pattern_text),
            },
            is_whitelist,
        ))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content_types(&self) -> TypeMask {
        self.content_types
    }

    /// Explicit `collapse` / `~collapse` option, if any.
    pub fn collapse(&self) -> Option<bool> {
        self.collapse
    }

    pub fn site_keys(&self) -> &[String] {
        &self.site_keys
    }

    /// A filter is generic when it is restricted neither to domains nor site-keys.
    pub fn is_generic(&self) -> bool {
        self.site_keys.is_empty()
            && self
                .domains
                .as_ref()
                .map_or(true, |domains| !domains.has_includes())
    }

    /// Ranking among filters of the same kind: domain-specific first, then
    /// longer patterns.
    pub fn specificity(&self) -> (bool, usize) {
        (!self.is_generic(), self.literal_len)
    }

    pub fn is_active_on_domain(&self, doc_domain: Option<&str>, site_key: Option<&str>) -> bool {
        if !self.site_keys.is_empty() {
            match site_key {
                Some(key) if self.site_keys.iter().any(|k| k == key) => {}
                _ => return false,
            }
        }
        self.domains
            .as_ref()
            .map_or(true, |domains| domains.is_active_on(doc_domain))
    }

    pub fn matches(
        &self,
        location: &str,
        type_mask: TypeMask,
        doc_domain: Option<&str>,
        third_party: bool,
        site_key: Option<&str>,
    ) -> bool {
        self.content_types.intersects(type_mask)
            && self.third_party.map_or(true, |expected| expected == third_party)
            && self.is_active_on_domain(doc_domain, site_key)
            && self.regex.is_match(location)
    }
}

/// Element hiding filter or exception (`domains##selector`, `domains#@#selector`).
#[derive(Debug, Clone)]
pub struct ElemHideFilter {
    text: String,
    selector: String,
    domains: Option<DomainRestriction>,
}

impl ElemHideFilter {
    fn parse(text: &str) -> Option<Filter> {
        let (index, is_exception) = match (text.find("#@#"), text.find("##")) {
            (Some(exception), Some(hide)) if exception < hide => (exception, true),
            (_, Some(hide)) => (hide, false),
            (Some(exception), None) => (exception, true),
            (None, None) => return None,
        };

        let domain_source = &text[..index];
        let separator_len = if is_exception { 3 } else { 2 };
        let selector = text[index + separator_len..].trim();

        if selector.is_empty()
            || selector.contains(['{', '}'])
            || domain_source.contains(['/', '*', '|', '@', '"', '!'])
        {
            return None;
        }

        let filter = ElemHideFilter {
            text: text.to_string(),
            selector: selector.to_string(),
            domains: DomainRestriction::parse(domain_source, ','),
        };
        Some(if is_exception {
            Filter::ElemHideException(filter)
        } else {
            Filter::ElemHide(filter)
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn is_generic(&self) -> bool {
        self.domains
            .as_ref()
            .map_or(true, |domains| !domains.has_includes())
    }

    pub fn is_active_on_domain(&self, doc_domain: Option<&str>) -> bool {
        self.domains
            .as_ref()
            .map_or(true, |domains| domains.is_active_on(doc_domain))
    }

    /// Location reported in hit records: the text from the first `#` on.
    pub fn hit_location(&self) -> String {
        match self.text.find('#') {
            Some(index) => self.text[index..].to_string(),
            None => self.text.clone(),
        }
    }
}

/// Split `pattern$opt1,opt2` into the pattern and its option list.
///
/// A trailing `$...` is only treated as options when every comma-separated
/// item looks like `~?name(=value)?`; otherwise `$` is part of the pattern.
fn split_options(body: &str) -> (&str, Vec<&str>) {
    let Some(dollar) = body.rfind('$') else {
        return (body, Vec::new());
    };
    let tail = &body[dollar + 1..];
    if tail.is_empty() {
        return (body, Vec::new());
    }
    let options: Vec<&str> = tail.split(',').collect();
    let well_formed = options.iter().all(|option| {
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (*option, None),
        };
        let name = name.strip_prefix('~').unwrap_or(name);
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && value.map_or(true, |v| !v.is_empty() && !v.contains(char::is_whitespace))
    });
    if well_formed {
        (&body[..dollar], options)
    } else {
        (body, Vec::new())
    }
}
