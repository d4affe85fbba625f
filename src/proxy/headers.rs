//! Hop-by-hop header handling.
//!
//! Headers that only make sense for a single connection (RFC 2616
//! §13.5.1) must not cross the broadcaster. [`strip_hop_by_hop`] removes
//! both the standard set and anything the client named in `Connection`.
//! [`append_headers`] copies an upstream header set onto the caller's
//! response without replacing what is already there.

use std::sync::LazyLock;

use http::header::{HeaderMap, HeaderName, CONNECTION};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        // non-standard, still sent by libcurl
        "proxy-connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Header names listed as connection-scoped in every `Connection` value.
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| HeaderName::from_bytes(token.as_bytes()).ok())
        .collect()
}

/// Remove connection-named headers first, then the fixed hop-by-hop set.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in connection_tokens(headers) {
        headers.remove(&name);
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Append every value of `src` to `dst`, keeping existing `dst` values.
pub fn append_headers(dst: &mut HeaderMap, src: &HeaderMap) {
    for (name, value) in src {
        dst.append(name.clone(), value.clone());
    }
}
