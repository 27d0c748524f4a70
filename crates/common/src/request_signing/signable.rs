//! Canonical request identity used as signature input.
//!
//! A [`SignableRequest`] holds exactly the parts of an HTTP request that a
//! signature covers. The client builds one from its own parameters before
//! sending; the server rebuilds one from the inbound request. For a genuine,
//! unmodified request both must be byte-identical, so reconstruction only
//! removes the `signature` pair from the query and otherwise keeps every byte.

use chrono::{DateTime, SecondsFormat, Utc};
use error_stack::Report;
use http::uri::Authority;

use crate::constants::{HMAC_LINE_SEPARATOR, SIGNATURE_QUERY_PARAM};
use crate::error::SignatureError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableRequest {
    method: String,
    host: String,
    path: String,
    query: String,
    body: Vec<u8>,
}

/// Inbound request data as reported by the receiving transport.
///
/// All values must be captured before any middleware consumes or rewrites
/// the body or query string.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    pub method: &'a str,
    /// Host name reported by the transport (`SERVER_NAME`-like).
    pub server_name: &'a str,
    /// Raw request URI, possibly including a `?query` suffix.
    pub request_uri: &'a str,
    /// Full raw query string, including the `signature` pair.
    pub query_string: Option<&'a str>,
    pub body: &'a [u8],
}

impl SignableRequest {
    /// Stores every field verbatim. No validation is performed.
    pub fn new(
        method: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        query: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            query: query.into(),
            body: body.into(),
        }
    }

    /// Starts a request with path `/`, an empty query and an empty body.
    pub fn builder(method: impl Into<String>, host: impl Into<String>) -> SignableRequestBuilder {
        SignableRequestBuilder {
            request: Self::new(method, host, "/", "", Vec::<u8>::new()),
        }
    }

    /// Rebuilds the request a client signed from inbound transport data.
    ///
    /// `known_host` overrides the transport-reported host. Pass it whenever a
    /// proxy or load balancer sits in front of the server: the reported host
    /// is client controlled and would otherwise let a token signed for one
    /// host be replayed against another.
    #[must_use]
    pub fn from_incoming_request(incoming: IncomingRequest<'_>, known_host: Option<&str>) -> Self {
        let host = known_host.unwrap_or(incoming.server_name);

        let path = match incoming.request_uri.split_once('?') {
            Some((path, _)) => path,
            None => incoming.request_uri,
        };

        let query = incoming
            .query_string
            .filter(|query| !query.is_empty())
            .map(strip_signature_param)
            .unwrap_or_default();

        Self::new(incoming.method, host, path, query, incoming.body)
    }

    /// Rebuilds the signed request from an [`http::Request`].
    ///
    /// The host is taken from `known_host`, then the URI authority, then the
    /// `Host` header. Ports are dropped from the latter two, matching
    /// [`host_without_port`] on the signing side.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidRequest`] when no host can be
    /// determined.
    pub fn from_http_request<B: AsRef<[u8]>>(
        req: &http::Request<B>,
        known_host: Option<&str>,
    ) -> Result<Self, Report<SignatureError>> {
        let reported_host = req.uri().host().map(str::to_string).or_else(|| {
            req.headers()
                .get(http::header::HOST)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<Authority>().ok())
                .map(|authority| authority.host().to_string())
        });

        let server_name = match (known_host, reported_host.as_deref()) {
            (Some(host), _) => host,
            (None, Some(host)) => host,
            (None, None) => {
                return Err(Report::new(SignatureError::InvalidRequest {
                    message: "Request carries no host and no known host was supplied".into(),
                }))
            }
        };

        let request_uri = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path(), http::uri::PathAndQuery::as_str);

        Ok(Self::from_incoming_request(
            IncomingRequest {
                method: req.method().as_str(),
                server_name,
                request_uri,
                query_string: req.uri().query(),
                body: req.body().as_ref(),
            },
            None,
        ))
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Builds the HMAC input for this request at `issued_at` with `nonce`.
    ///
    /// Lines, in order: upper-cased method, lower-cased host, path, query,
    /// body, RFC 3339 timestamp with a `+00:00` offset, nonce. Case folding
    /// touches ASCII letters only.
    #[must_use]
    pub fn canonical_string(&self, issued_at: &DateTime<Utc>, nonce: &str) -> Vec<u8> {
        let method = self.method.to_ascii_uppercase();
        let host = self.host.to_ascii_lowercase();
        let timestamp = format_timestamp(issued_at);
        let lines: [&[u8]; 7] = [
            method.as_bytes(),
            host.as_bytes(),
            self.path.as_bytes(),
            self.query.as_bytes(),
            &self.body,
            timestamp.as_bytes(),
            nonce.as_bytes(),
        ];

        lines.join(&HMAC_LINE_SEPARATOR)
    }
}

pub struct SignableRequestBuilder {
    request: SignableRequest,
}

impl SignableRequestBuilder {
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request.path = path.into();
        self
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = query.into();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.request.body = body.into();
        self
    }

    #[must_use]
    pub fn build(self) -> SignableRequest {
        self.request
    }
}

/// Strips any port from a `host[:port]` value; IPv6 literals keep their
/// brackets. Values that do not parse as an authority are returned as is.
#[must_use]
pub fn host_without_port(host: &str) -> String {
    host.parse::<Authority>()
        .map_or_else(|_| host.to_string(), |authority| authority.host().to_string())
}

/// Renders a timestamp the way it appears in tokens and HMAC input.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Removes every `signature=...` pair from a raw query string.
///
/// Other pairs keep their order and their original encoding.
#[must_use]
pub fn strip_signature_param(query: &str) -> String {
    query
        .split('&')
        .filter(|part| param_name(part) != SIGNATURE_QUERY_PARAM)
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns the decoded `signature` value from a raw query string, if present.
#[must_use]
pub fn signature_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .find(|part| param_name(part) == SIGNATURE_QUERY_PARAM)
        .and_then(|part| part.split_once('='))
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

fn param_name(part: &str) -> &str {
    part.split_once('=').map_or(part, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn incoming<'a>(uri: &'a str, query: Option<&'a str>) -> IncomingRequest<'a> {
        IncomingRequest {
            method: "GET",
            server_name: "api.example.com",
            request_uri: uri,
            query_string: query,
            body: b"",
        }
    }

    #[test]
    fn test_builder_defaults() {
        let request = SignableRequest::builder("GET", "api.example.com").build();

        assert_eq!(request.path(), "/");
        assert_eq!(request.query(), "");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_new_stores_fields_verbatim() {
        let request = SignableRequest::new("get", "API.Example.com", "/Videos", "b=2&a=1", " x ");

        assert_eq!(request.method(), "get");
        assert_eq!(request.host(), "API.Example.com");
        assert_eq!(request.path(), "/Videos");
        assert_eq!(request.query(), "b=2&a=1");
        assert_eq!(request.body(), b" x ");
    }

    #[test]
    fn test_canonical_string_layout() {
        let request = SignableRequest::new("post", "API.Example.COM", "/v", "a=1", "body");
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let canonical = request.canonical_string(&issued_at, "42");

        assert_eq!(
            String::from_utf8(canonical).unwrap(),
            "POST\napi.example.com\n/v\na=1\nbody\n2024-01-02T03:04:05+00:00\n42"
        );
    }

    #[test]
    fn test_canonical_string_keeps_path_case_and_whitespace() {
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let lower = SignableRequest::new("GET", "h", "/a", "", "").canonical_string(&issued_at, "1");
        let upper = SignableRequest::new("GET", "h", "/A", "", "").canonical_string(&issued_at, "1");
        let spaced = SignableRequest::new("GET", "h", "/a ", "", "").canonical_string(&issued_at, "1");

        assert_ne!(lower, upper);
        assert_ne!(lower, spaced);
    }

    #[test]
    fn test_strip_signature_param() {
        assert_eq!(
            strip_signature_param("token=XYZ&signature=abc%3D%3D&x=1"),
            "token=XYZ&x=1"
        );
        assert_eq!(strip_signature_param("signature=abc"), "");
        assert_eq!(strip_signature_param("token=XYZ"), "token=XYZ");
        assert_eq!(
            strip_signature_param("signatures=keep&signature"),
            "signatures=keep"
        );
    }

    #[test]
    fn test_signature_from_query_decodes_value() {
        assert_eq!(
            signature_from_query("token=XYZ&signature=c2hh%2B%2F%3D"),
            Some("c2hh+/=".to_string())
        );
        assert_eq!(signature_from_query("token=XYZ"), None);
    }

    #[test]
    fn test_from_incoming_request_strips_query_and_signature() {
        let request = SignableRequest::from_incoming_request(
            incoming(
                "/videos/abc123.json?token=XYZ&signature=abc",
                Some("token=XYZ&signature=abc"),
            ),
            None,
        );

        assert_eq!(
            request,
            SignableRequest::new("GET", "api.example.com", "/videos/abc123.json", "token=XYZ", "")
        );
    }

    #[test]
    fn test_from_incoming_request_without_query() {
        let request = SignableRequest::from_incoming_request(incoming("/videos.json", None), None);

        assert_eq!(request.path(), "/videos.json");
        assert_eq!(request.query(), "");

        let empty = SignableRequest::from_incoming_request(incoming("/videos.json?", Some("")), None);
        assert_eq!(empty.path(), "/videos.json");
        assert_eq!(empty.query(), "");
    }

    #[test]
    fn test_from_incoming_request_prefers_known_host() {
        let request = SignableRequest::from_incoming_request(
            incoming("/", None),
            Some("trusted.example.com"),
        );

        assert_eq!(request.host(), "trusted.example.com");
    }

    #[test]
    fn test_from_http_request() {
        let req = http::Request::builder()
            .method("POST")
            .uri("https://api.example.com/videos.json?token=XYZ&signature=abc&x=1")
            .body(b"title=Hello".to_vec())
            .unwrap();

        let request = SignableRequest::from_http_request(&req, None).unwrap();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.host(), "api.example.com");
        assert_eq!(request.path(), "/videos.json");
        assert_eq!(request.query(), "token=XYZ&x=1");
        assert_eq!(request.body(), b"title=Hello");
    }

    #[test]
    fn test_from_http_request_uses_host_header() {
        let req = http::Request::builder()
            .uri("/videos.json")
            .header(http::header::HOST, "api.example.com:8080")
            .body(Vec::<u8>::new())
            .unwrap();

        let request = SignableRequest::from_http_request(&req, None).unwrap();
        assert_eq!(request.host(), "api.example.com");

        let overridden = SignableRequest::from_http_request(&req, Some("internal.example.com")).unwrap();
        assert_eq!(overridden.host(), "internal.example.com");
    }

    #[test]
    fn test_from_http_request_without_host_fails() {
        let req = http::Request::builder()
            .uri("/videos.json")
            .body(Vec::<u8>::new())
            .unwrap();

        let result = SignableRequest::from_http_request(&req, None);
        assert!(result.is_err(), "should fail without any host");
    }

    #[test]
    fn test_from_http_request_ipv6_host_header() {
        let req = http::Request::builder()
            .uri("/videos.json")
            .header(http::header::HOST, "[::1]:8080")
            .body(Vec::<u8>::new())
            .unwrap();

        let request = SignableRequest::from_http_request(&req, None).unwrap();
        assert_eq!(request.host(), "[::1]");
    }

    #[test]
    fn test_host_without_port() {
        assert_eq!(host_without_port("localhost:8080"), "localhost");
        assert_eq!(host_without_port("api.example.com"), "api.example.com");
        assert_eq!(host_without_port("[::1]:8080"), "[::1]");
        assert_eq!(host_without_port("[::1]"), "[::1]");
    }

    #[test]
    fn test_canonical_string_folds_ascii_only() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let request = SignableRequest::new("get", "Straße.Example", "/", "", Vec::<u8>::new());

        let canonical = String::from_utf8(request.canonical_string(&at, "1")).unwrap();
        assert!(canonical.starts_with("GET\nstraße.example\n"));
    }
}
