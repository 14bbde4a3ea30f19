/// Focus-domain normalization and matching for FocusBrowse
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9+.\-]*://").expect("scheme pattern is valid"));

/// Normalize a user-entered focus domain
///
/// Algorithm:
/// 1. Trim and lower-case the input
/// 2. Strip any scheme (`https://`, `http://`, ...)
/// 3. Strip a leading `www.`
/// 4. Keep everything before the first `/` or `?`
/// 5. Trim again; an empty result is not a domain
///
/// Examples:
/// - `https://www.Docs.Google.com/document` → `docs.google.com`
/// - `school.edu?ref=x` → `school.edu`
/// - `https://` → None
pub fn normalize_domain(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = SCHEME_PREFIX.replace(&lowered, "");
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(&*without_scheme);

    let domain = without_www
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
        .trim();

    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

/// Normalize every entry of a stored list, dropping empties and later duplicates.
/// Insertion order is kept.
pub fn normalize_domain_list<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|entry| normalize_domain(entry.as_ref()))
        .filter(|domain| seen.insert(domain.clone()))
        .collect()
}

/// Extract the comparable host from a candidate URL (lower-cased, no leading `www.`)
fn candidate_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);

    if host.is_empty() { None } else { Some(host) }
}

/// A host matches `domain` when it is the domain itself or any dotted subdomain of it.
/// The configured domain may have any number of labels.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Decide whether `url` belongs to one of the configured focus domains.
///
/// Unparsable URLs, and URLs without a host, are never in scope.
pub fn is_in_scope<S: AsRef<str>>(url: &str, domains: &[S]) -> bool {
    let Some(host) = candidate_host(url) else {
        return false;
    };

    domains
        .iter()
        .filter_map(|domain| normalize_domain(domain.as_ref()))
        .any(|domain| host_matches(&host, &domain))
}

/// Comparable hostname of a URL, if it parses
pub fn host_of(url: &str) -> Option<String> {
    candidate_host(url)
}
