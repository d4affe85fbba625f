//! Per-backend rewriting of an inbound request.
//!
//! [`transform`] produces the outbound copy of an [`InboundRequest`] for one
//! backend: scheme and authority come from the backend URL, the path and
//! query are joined with the backend's base path and query, `Host` is
//! dropped so the client derives it from the new authority, and
//! hop-by-hop headers are stripped. The inbound request is never mutated.

use bytes::Bytes;
use http::header::{HeaderValue, HOST, USER_AGENT};
use http::{HeaderMap, Method, Request, Uri};
use http_body_util::Full;
use url::Url;

use super::headers::strip_hop_by_hop;

/// One caller request, with its body fully buffered so it can be shared.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type OutboundRequest = Request<Full<Bytes>>;

/// Join two path segments with exactly one `/` between them.
#[must_use]
pub fn single_joining_slash(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{a}{}", &b[1..]),
        (false, false) => format!("{a}/{b}"),
        _ => format!("{a}{b}"),
    }
}

/// Merge a backend query with an inbound query.
#[must_use]
pub fn merge_query(target: &str, inbound: &str) -> String {
    if target.is_empty() || inbound.is_empty() {
        format!("{target}{inbound}")
    } else {
        format!("{target}&{inbound}")
    }
}

fn authority(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

pub fn transform(
    inbound: &InboundRequest,
    target: &Url,
) -> Result<OutboundRequest, http::Error> {
    let path = single_joining_slash(target.path(), inbound.uri.path());
    let query = merge_query(
        target.query().unwrap_or_default(),
        inbound.uri.query().unwrap_or_default(),
    );

    let mut uri = format!("{}://{}{}", target.scheme(), authority(target), path);
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query);
    }

    let mut headers = inbound.headers.clone();
    if !headers.contains_key(USER_AGENT) {
        // Present but empty, so nothing downstream fills in a default.
        headers.insert(USER_AGENT, HeaderValue::from_static(""));
    }
    headers.remove(HOST);
    // Dropping `Connection` here also means the outbound request never asks
    // for `close`, so the client pool can keep the connection.
    strip_hop_by_hop(&mut headers);

    // Bytes clones share the buffer; an empty body goes out without payload.
    let body = if inbound.body.is_empty() {
        Full::new(Bytes::new())
    } else {
        Full::new(inbound.body.clone())
    };

    let mut request = Request::builder()
        .method(inbound.method.clone())
        .uri(uri)
        .body(body)?;
    *request.headers_mut() = headers;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn inbound(uri: &str, headers: &[(&'static str, &'static str)]) -> InboundRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(*value));
        }
        InboundRequest {
            method: Method::POST,
            uri: uri.parse().unwrap(),
            headers: map,
            body: Bytes::from_static(b"payload"),
        }
    }

    fn target(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn joining_slash_handles_all_combinations() {
        assert_eq!(single_joining_slash("/api/", "/foo"), "/api/foo");
        assert_eq!(single_joining_slash("/api", "/foo"), "/api/foo");
        assert_eq!(single_joining_slash("/api/", "foo"), "/api/foo");
        assert_eq!(single_joining_slash("/api", "foo"), "/api/foo");
        assert_eq!(single_joining_slash("", "/foo"), "/foo");
    }

    #[test]
    fn query_merging() {
        assert_eq!(merge_query("v=1", ""), "v=1");
        assert_eq!(merge_query("", "a=2"), "a=2");
        assert_eq!(merge_query("v=1", "a=2"), "v=1&a=2");
        assert_eq!(merge_query("", ""), "");
    }

    #[test]
    fn rewrites_scheme_authority_path_and_query() {
        let req = transform(
            &inbound("/foo?a=2", &[]),
            &target("https://backend:8443/api/?v=1"),
        )
        .unwrap();
        assert_eq!(req.uri(), "https://backend:8443/api/foo?v=1&a=2");
        assert_eq!(req.method(), Method::POST);
    }

    #[test]
    fn root_backend_keeps_inbound_path() {
        let req = transform(&inbound("/orders/42", &[]), &target("http://b1:9091")).unwrap();
        assert_eq!(req.uri(), "http://b1:9091/orders/42");
        assert!(req.uri().query().is_none());
    }

    #[test]
    fn strips_hop_by_hop_and_connection_tokens() {
        let req = transform(
            &inbound(
                "/",
                &[
                    ("connection", "close, X-Debug"),
                    ("x-debug", "1"),
                    ("transfer-encoding", "chunked"),
                    ("upgrade", "websocket"),
                    ("keep-alive", "timeout=5"),
                    ("content-type", "application/json"),
                ],
            ),
            &target("http://b1:9091"),
        )
        .unwrap();
        let headers = req.headers();
        for name in ["connection", "x-debug", "transfer-encoding", "upgrade", "keep-alive"] {
            assert!(headers.get(name).is_none(), "{name} should be stripped");
        }
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn missing_user_agent_becomes_empty() {
        let req = transform(&inbound("/", &[]), &target("http://b1:9091")).unwrap();
        assert_eq!(req.headers().get(USER_AGENT).unwrap(), "");
    }

    #[test]
    fn existing_user_agent_is_kept() {
        let req = transform(
            &inbound("/", &[("user-agent", "curl/8.0")]),
            &target("http://b1:9091"),
        )
        .unwrap();
        assert_eq!(req.headers().get(USER_AGENT).unwrap(), "curl/8.0");
    }

    #[test]
    fn host_header_is_cleared() {
        let req = transform(
            &inbound("/", &[("host", "broadcaster:9090")]),
            &target("http://b1:9091"),
        )
        .unwrap();
        assert!(req.headers().get(HOST).is_none());
    }

    #[test]
    fn inbound_headers_are_not_mutated() {
        let original = inbound("/", &[("connection", "x-debug"), ("x-debug", "1")]);
        let _ = transform(&original, &target("http://b1:9091")).unwrap();
        let _ = transform(&original, &target("http://b2:9092")).unwrap();
        assert!(original.headers.get("connection").is_some());
        assert!(original.headers.get("x-debug").is_some());
        assert!(original.headers.get(USER_AGENT).is_none());
    }

    #[test]
    fn multi_valued_headers_survive() {
        let req = transform(
            &inbound("/", &[("accept", "text/html"), ("accept", "application/json")]),
            &target("http://b1:9091"),
        )
        .unwrap();
        let values: Vec<_> = req.headers().get_all("accept").iter().collect();
        assert_eq!(values, ["text/html", "application/json"]);
    }

    #[tokio::test]
    async fn body_is_shared_and_empty_body_stays_empty() {
        let req = transform(&inbound("/", &[]), &target("http://b1:9091")).unwrap();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"payload");

        let mut empty = inbound("/", &[]);
        empty.body = Bytes::new();
        let req = transform(&empty, &target("http://b1:9091")).unwrap();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
