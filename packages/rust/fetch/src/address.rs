//! Address construction for same-site fetches.
//!
//! Every helper joins against `prefix` with a single trailing `/` stripped.

use base64::prelude::*;
use url::Url;

use docenrich_shared::{EnrichError, Result};

fn trim_prefix(prefix: &str) -> &str {
    prefix.strip_suffix('/').unwrap_or(prefix)
}

/// The site-relative part of a uri (`foo.com/pages/1` → `/pages/1`).
pub fn uri_path(uri: &str) -> &str {
    match uri.find('/') {
        Some(idx) => &uri[idx..],
        None => "",
    }
}

/// The host part of a uri (`foo.com/pages/1` → `foo.com`).
pub fn uri_host(uri: &str) -> &str {
    match uri.find('/') {
        Some(idx) => &uri[..idx],
        None => uri,
    }
}

/// Drop a leading `scheme://` from a public address.
pub fn strip_scheme(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    }
}

/// JSON representation of a page: `<prefix><path>.json`.
pub fn page_json_url(prefix: &str, uri: &str) -> String {
    format!("{}{}.json", trim_prefix(prefix), uri_path(uri))
}

/// Published variant of a page: `<prefix><path>@published`.
pub fn published_url(prefix: &str, uri: &str) -> String {
    format!("{}{}@published", trim_prefix(prefix), uri_path(uri))
}

/// Site-wide publishing schedule.
pub fn schedule_url(prefix: &str) -> String {
    format!("{}/schedule", trim_prefix(prefix))
}

/// Canonical-uri lookup for a public address.
///
/// The key is the standard base64 of the address without its scheme.
pub fn uri_lookup_url(prefix: &str, public_url: &str) -> String {
    let encoded = BASE64_STANDARD.encode(strip_scheme(public_url));
    format!("{}/uris/{encoded}", trim_prefix(prefix))
}

/// The address a page is listed under in the publishing schedule.
///
/// Scheme and port come from the prefix, host and path from the uri. The
/// port separator is always present, so a prefix without a port yields
/// `http://foo.com:/pages/1`.
pub fn publish_address(prefix: &str, uri: &str) -> Result<String> {
    let base = Url::parse(prefix)
        .map_err(|e| EnrichError::validation(format!("invalid prefix '{prefix}': {e}")))?;
    let port = base.port().map(|p| p.to_string()).unwrap_or_default();

    Ok(format!(
        "{}://{}:{}{}",
        base.scheme(),
        uri_host(uri),
        port,
        uri_path(uri)
    ))
}
