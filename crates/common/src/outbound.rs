//! Client-side construction of signed API requests.
//!
//! [`ApiRequest`] turns an endpoint call into an [`http::Request`] carrying the
//! caller's public `token` and a `signature` query parameter. Sending it is up
//! to whatever HTTP client the caller uses; [`classify_status`] maps the
//! response status back onto [`SignatureError`].
//!
//! The `signature` pair is always appended last, after every parameter it
//! covers, so the server's reconstruction (which only strips that pair) sees
//! the exact query string that was signed.

use error_stack::{Report, ResultExt};
use http::{header, Method, StatusCode};

use crate::constants::{SIGNATURE_QUERY_PARAM, TOKEN_QUERY_PARAM, USER_AGENT};
use crate::error::SignatureError;
use crate::request_signing::{host_without_port, sign, SignableRequest, SignatureConfig};

/// Public token and shared secret identifying an API client.
#[derive(Clone)]
pub struct ApiCredentials {
    pub token: String,
    pub secret: Option<String>,
}

impl ApiCredentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: Some(secret.into()),
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("token", &self.token)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    credentials: ApiCredentials,
    https: bool,
    method: Method,
    hostname: String,
    endpoint: String,
    get_parameters: Vec<(String, String)>,
    post_parameters: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(
        credentials: ApiCredentials,
        method: Method,
        hostname: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            https: true,
            method,
            hostname: hostname.into(),
            endpoint: endpoint.into(),
            get_parameters: Vec::new(),
            post_parameters: Vec::new(),
        }
    }

    pub fn get(
        credentials: ApiCredentials,
        hostname: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::new(credentials, Method::GET, hostname, endpoint)
    }

    pub fn post(
        credentials: ApiCredentials,
        hostname: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::new(credentials, Method::POST, hostname, endpoint)
    }

    pub fn delete(
        credentials: ApiCredentials,
        hostname: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::new(credentials, Method::DELETE, hostname, endpoint)
    }

    #[must_use]
    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    /// Adds a query string parameter. The reserved `token` and `signature`
    /// names are ignored.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name == TOKEN_QUERY_PARAM || name == SIGNATURE_QUERY_PARAM {
            log::warn!("Ignoring reserved query parameter '{}'", name);
            return self;
        }
        self.get_parameters.push((name, value.into()));
        self
    }

    /// Adds a form-encoded body parameter.
    #[must_use]
    pub fn with_form_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.post_parameters.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The query string covered by the signature: caller parameters in
    /// insertion order, then `token`.
    #[must_use]
    pub fn query_string(&self) -> String {
        let token = (TOKEN_QUERY_PARAM.to_string(), self.credentials.token.clone());
        let params: Vec<(String, String)> = self
            .get_parameters
            .iter()
            .cloned()
            .chain(std::iter::once(token))
            .collect();

        build_query_string(&params).unwrap_or_default()
    }

    /// Form-encoded body, or `None` without body parameters.
    #[must_use]
    pub fn body(&self) -> Option<String> {
        build_query_string(&self.post_parameters)
    }

    /// The request as the server will rebuild it. The port, if any, is not
    /// part of the signed host.
    #[must_use]
    pub fn to_signable_request(&self) -> SignableRequest {
        SignableRequest::new(
            self.method.as_str(),
            host_without_port(&self.hostname),
            self.endpoint.as_str(),
            self.query_string(),
            self.body().unwrap_or_default(),
        )
    }

    /// Query string with the `signature` parameter appended.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if no secret is set.
    pub fn signed_query_string(
        &self,
        config: &SignatureConfig,
    ) -> Result<String, Report<SignatureError>> {
        let secret = self.credentials.secret.as_deref().unwrap_or_default();
        let token = sign(&self.to_signable_request(), secret.as_bytes(), config)
            .attach(format!("while signing {} {}", self.method, self.endpoint))?;

        Ok(format!(
            "{}&{}={}",
            self.query_string(),
            SIGNATURE_QUERY_PARAM,
            urlencoding::encode(&token)
        ))
    }

    /// Full signed URL.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if no secret is set.
    pub fn url(&self, config: &SignatureConfig) -> Result<String, Report<SignatureError>> {
        let scheme = if self.https { "https" } else { "http" };

        Ok(format!(
            "{}://{}{}?{}",
            scheme,
            self.hostname,
            self.endpoint,
            self.signed_query_string(config)?
        ))
    }

    /// Builds the signed request, ready for any HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if no secret is set, or
    /// [`SignatureError::InvalidRequest`] if hostname or endpoint do not form
    /// a valid URI.
    pub fn prepare(
        &self,
        config: &SignatureConfig,
    ) -> Result<http::Request<Vec<u8>>, Report<SignatureError>> {
        let url = self.url(config)?;
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(url.as_str())
            .header(header::USER_AGENT, USER_AGENT);

        let body = match self.body() {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                body.into_bytes()
            }
            None => Vec::new(),
        };

        builder
            .body(body)
            .change_context(SignatureError::InvalidRequest {
                message: "Failed to build signed request".into(),
            })
            .attach(format!("url: {url}"))
    }
}

/// Maps an API response status onto the client's error taxonomy.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidAuth`] for 401 and 403, and
/// [`SignatureError::Api`] for anything else but 200.
pub fn classify_status(status: StatusCode, body: &str) -> Result<(), Report<SignatureError>> {
    match status.as_u16() {
        200 => Ok(()),
        code @ (401 | 403) => Err(Report::new(SignatureError::InvalidAuth {
            message: format!("API rejected credentials with status {code}"),
        })),
        code => Err(Report::new(SignatureError::Api {
            status: code,
            message: body.to_string(),
        })),
    }
}

fn build_query_string(params: &[(String, String)]) -> Option<String> {
    if params.is_empty() {
        return None;
    }

    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();

    Some(pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_signing::{signature_from_query, verify};

    fn credentials() -> ApiCredentials {
        ApiCredentials::new("XYZ", "s3cr3t")
    }

    #[test]
    fn test_query_string_appends_token() {
        let request = ApiRequest::get(credentials(), "api.example.com", "/videos.json")
            .with_query_param("page", "2")
            .with_query_param("q", "cats & dogs");

        assert_eq!(request.query_string(), "page=2&q=cats%20%26%20dogs&token=XYZ");
    }

    #[test]
    fn test_reserved_params_are_ignored() {
        let request = ApiRequest::get(credentials(), "api.example.com", "/")
            .with_query_param("token", "other")
            .with_query_param("signature", "forged");

        assert_eq!(request.query_string(), "token=XYZ");
    }

    #[test]
    fn test_body() {
        let get = ApiRequest::get(credentials(), "api.example.com", "/");
        assert_eq!(get.body(), None);

        let post = ApiRequest::post(credentials(), "api.example.com", "/videos.json")
            .with_form_param("title", "Hello World");
        assert_eq!(post.body().as_deref(), Some("title=Hello%20World"));
    }

    #[test]
    fn test_to_signable_request() {
        let request = ApiRequest::post(credentials(), "api.example.com", "/videos.json")
            .with_query_param("a", "1")
            .with_form_param("title", "x");

        assert_eq!(
            request.to_signable_request(),
            SignableRequest::new("POST", "api.example.com", "/videos.json", "a=1&token=XYZ", "title=x")
        );
    }

    #[test]
    fn test_url_carries_verifiable_signature() {
        let config = SignatureConfig::default();
        let request = ApiRequest::get(credentials(), "api.example.com", "/videos/abc123.json");

        let url = request.url(&config).unwrap();
        assert!(url.starts_with("https://api.example.com/videos/abc123.json?token=XYZ&signature="));

        let query = url.split_once('?').map(|(_, q)| q).unwrap();
        let token = signature_from_query(query).unwrap();
        assert!(verify(&token, &request.to_signable_request(), b"s3cr3t", &config));
    }

    #[test]
    fn test_plain_http_url() {
        let request = ApiRequest::delete(credentials(), "localhost", "/videos/1.json").with_https(false);
        let url = request.url(&SignatureConfig::default()).unwrap();

        assert!(url.starts_with("http://localhost/videos/1.json?token=XYZ&signature="));
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let credentials = ApiCredentials {
            token: "XYZ".into(),
            secret: None,
        };
        let request = ApiRequest::get(credentials, "api.example.com", "/");

        let err = request.url(&SignatureConfig::default()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            SignatureError::Configuration { .. }
        ));
    }

    #[test]
    fn test_prepare_sets_headers_and_body() {
        let request = ApiRequest::post(credentials(), "api.example.com", "/videos.json")
            .with_form_param("title", "Hello");

        let prepared = request.prepare(&SignatureConfig::default()).unwrap();

        assert_eq!(prepared.method(), &Method::POST);
        assert_eq!(prepared.uri().host(), Some("api.example.com"));
        assert_eq!(
            prepared.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(prepared.headers().get(header::USER_AGENT).unwrap(), USER_AGENT);
        assert_eq!(prepared.body(), b"title=Hello");
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK, "").is_ok());

        let auth = classify_status(StatusCode::FORBIDDEN, "").unwrap_err();
        assert!(matches!(auth.current_context(), SignatureError::InvalidAuth { .. }));

        let api = classify_status(StatusCode::INTERNAL_SERVER_ERROR, "boom").unwrap_err();
        assert!(matches!(
            api.current_context(),
            SignatureError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        assert!(!format!("{:?}", credentials()).contains("s3cr3t"));
    }
}
