//! Server-side verification of signed inbound requests.

use crate::request_signing::{
    signature_from_query, verify, IncomingRequest, SignableRequest, SignatureConfig,
};

/// Verifies an inbound request described by raw transport data.
///
/// The token is read from the `signature` query parameter. A missing
/// parameter counts as an invalid signature.
#[must_use]
pub fn verify_incoming(
    incoming: IncomingRequest<'_>,
    known_host: Option<&str>,
    key: &[u8],
    config: &SignatureConfig,
) -> bool {
    let Some(token) = incoming.query_string.and_then(signature_from_query) else {
        log::debug!("Rejecting request without a signature parameter");
        return false;
    };

    let request = SignableRequest::from_incoming_request(incoming, known_host);
    verify(&token, &request, key, config)
}

/// Verifies an [`http::Request`] carrying a `signature` query parameter.
///
/// Requests without a resolvable host or signature are rejected.
#[must_use]
pub fn verify_http_request<B: AsRef<[u8]>>(
    req: &http::Request<B>,
    known_host: Option<&str>,
    key: &[u8],
    config: &SignatureConfig,
) -> bool {
    let Some(token) = req.uri().query().and_then(signature_from_query) else {
        log::debug!("Rejecting request without a signature parameter");
        return false;
    };

    match SignableRequest::from_http_request(req, known_host) {
        Ok(request) => verify(&token, &request, key, config),
        Err(e) => {
            log::debug!("Rejecting request: {e}");
            false
        }
    }
}
