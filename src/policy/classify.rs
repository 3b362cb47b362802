//! Request classification helpers: scheme exemption, hosts, third-party checks.

use std::net::IpAddr;
use url::Url;

/// Scheme of a location (`http`, `about`, ...), lower-cased.
pub fn scheme_of(location: &str) -> Option<String> {
    let (scheme, _) = location.split_once(':')?;
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}

/// False for locations whose scheme is exempt from filtering.
pub fn is_blockable_scheme(location: &str, exempt_schemes: &[String]) -> bool {
    match scheme_of(location) {
        Some(scheme) => !exempt_schemes
            .iter()
            .any(|exempt| exempt.eq_ignore_ascii_case(&scheme)),
        None => true,
    }
}

/// Host of a location, or `None` when it has none or does not parse.
pub fn host_of(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// Registrable ("base") domain of a host, per the public suffix list.
///
/// IP addresses, and hosts that are themselves a public suffix, are returned
/// unchanged.
pub fn base_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return host;
    }
    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}

/// Whether `location` belongs to a different site than the document.
///
/// Missing information counts as third-party.
pub fn is_third_party(location: &str, doc_domain: Option<&str>) -> bool {
    let (Some(host), Some(doc_domain)) = (host_of(location), doc_domain) else {
        return true;
    };
    if doc_domain.is_empty() {
        return true;
    }
    base_domain(&host) != base_domain(doc_domain)
}

/// Location with any fragment identifier removed.
pub fn strip_fragment(location: &str) -> &str {
    match location.find('#') {
        Some(index) => &location[..index],
        None => location,
    }
}
