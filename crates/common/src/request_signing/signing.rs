//! Request signing and verification with a shared secret key.
//!
//! A signature binds a [`SignableRequest`] to the second it was issued and to
//! a random nonce under the shared key. Verification recomputes the HMAC from
//! the verifier's own view of the request, combined with the timestamp and
//! nonce carried in the token, and rejects tokens outside the validity window.
//!
//! The nonce is not a secret. Its job is to make two signatures of the same
//! request issued in the same second differ; uniqueness is the property relied
//! upon, not unpredictability. Nothing here remembers nonces: callers that
//! need replay protection inside the window can key a cache on
//! [`extract_nonce`].

use chrono::{DateTime, SubsecRound, Utc};
use error_stack::Report;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{DEFAULT_VALIDITY_WINDOW_SECS, SIGNATURE_SEPARATOR};
use crate::error::SignatureError;
use crate::request_signing::algorithm::SignatureAlgorithm;
use crate::request_signing::signable::SignableRequest;
use crate::request_signing::token::SignatureToken;

/// Algorithm and freshness settings shared by signer and verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct SignatureConfig {
    #[serde(default)]
    pub algorithm: SignatureAlgorithm,
    /// Maximum distance, in either direction, between a token's timestamp
    /// and the verifier's clock.
    #[serde(default = "default_validity_window_secs")]
    #[validate(range(min = 1))]
    pub validity_window_secs: u64,
}

fn default_validity_window_secs() -> u64 {
    DEFAULT_VALIDITY_WINDOW_SECS
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            validity_window_secs: DEFAULT_VALIDITY_WINDOW_SECS,
        }
    }
}

/// Signs `request` with `key`, issuing at the current second with a fresh nonce.
///
/// # Errors
///
/// Returns [`SignatureError::Configuration`] if `key` is empty.
pub fn sign(
    request: &SignableRequest,
    key: &[u8],
    config: &SignatureConfig,
) -> Result<String, Report<SignatureError>> {
    let nonce = generate_nonce();
    let issued_at = Utc::now().trunc_subsecs(0);

    sign_at(request, key, config.algorithm, issued_at, &nonce)
}

/// Signs `request` with an explicit timestamp and nonce.
///
/// The timestamp is truncated to whole seconds.
///
/// # Errors
///
/// Returns [`SignatureError::Configuration`] if `key` is empty or if `nonce`
/// is empty or contains the token separator.
pub fn sign_at(
    request: &SignableRequest,
    key: &[u8],
    algorithm: SignatureAlgorithm,
    issued_at: DateTime<Utc>,
    nonce: &str,
) -> Result<String, Report<SignatureError>> {
    if key.is_empty() {
        return Err(Report::new(SignatureError::configuration(
            "Private key was not set",
        )));
    }
    if nonce.is_empty() || nonce.contains(SIGNATURE_SEPARATOR) {
        return Err(Report::new(SignatureError::configuration(format!(
            "Nonce must be non-empty and must not contain '{SIGNATURE_SEPARATOR}'"
        ))));
    }

    let issued_at = issued_at.trunc_subsecs(0);
    let hmac = algorithm.compute_hex(key, &request.canonical_string(&issued_at, nonce));

    Ok(SignatureToken {
        algorithm: algorithm.as_str().to_string(),
        issued_at,
        nonce: nonce.to_string(),
        hmac,
    }
    .pack())
}

/// Checks `token` against `request` and `key` at the current time.
///
/// Returns `false` for every kind of failure; the reason is only logged.
#[must_use]
pub fn verify(
    token: &str,
    request: &SignableRequest,
    key: &[u8],
    config: &SignatureConfig,
) -> bool {
    verify_at(token, request, key, config, Utc::now())
}

/// Checks `token` against `request` and `key` as if the current time were `now`.
///
/// The freshness window is symmetric: a token issued up to
/// `validity_window_secs` in the future is accepted as well, which absorbs
/// clock skew between signer and verifier.
#[must_use]
pub fn verify_at(
    token: &str,
    request: &SignableRequest,
    key: &[u8],
    config: &SignatureConfig,
    now: DateTime<Utc>,
) -> bool {
    if key.is_empty() {
        log::warn!("Signature verification attempted without a key");
        return false;
    }

    let info = match SignatureToken::unpack(token) {
        Ok(info) => info,
        Err(e) => {
            log::debug!("Rejecting signature: {e}");
            return false;
        }
    };

    let algorithm = match info.algorithm.parse::<SignatureAlgorithm>() {
        Ok(algorithm) => algorithm,
        Err(e) => {
            log::debug!("Rejecting signature: {e}");
            return false;
        }
    };

    let age = now.signed_duration_since(info.issued_at).num_seconds();
    if age.unsigned_abs() > config.validity_window_secs {
        log::debug!(
            "Rejecting signature: issued {}s from now, window is {}s",
            age,
            config.validity_window_secs
        );
        return false;
    }

    let message = request.canonical_string(&info.issued_at, &info.nonce);
    let valid = algorithm.verify_hex(key, &message, &info.hmac);
    if !valid {
        log::debug!("Rejecting signature: HMAC mismatch");
    }

    valid
}

/// Returns the nonce embedded in `token` without verifying it.
///
/// # Errors
///
/// Returns [`SignatureError::MalformedToken`] if the token cannot be decoded.
pub fn extract_nonce(token: &str) -> Result<String, Report<SignatureError>> {
    SignatureToken::unpack(token).map(|info| info.nonce)
}

/// Draws a nonce: decimal digits only, so it can never contain the separator.
fn generate_nonce() -> String {
    rand::thread_rng().gen::<u64>().to_string()
}

/// Holds a shared key and signature settings for repeated use.
///
/// Immutable once built, so one instance can serve any number of threads.
#[derive(Clone)]
pub struct RequestSigner {
    key: Vec<u8>,
    config: SignatureConfig,
}

impl RequestSigner {
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if `key` is empty.
    pub fn new(key: impl Into<Vec<u8>>, config: SignatureConfig) -> Result<Self, Report<SignatureError>> {
        let key = key.into();
        if key.is_empty() {
            return Err(Report::new(SignatureError::configuration(
                "Private key was not set",
            )));
        }

        Ok(Self { key, config })
    }

    #[must_use]
    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// # Errors
    ///
    /// See [`sign`].
    pub fn sign(&self, request: &SignableRequest) -> Result<String, Report<SignatureError>> {
        sign(request, &self.key, &self.config)
    }

    #[must_use]
    pub fn verify(&self, token: &str, request: &SignableRequest) -> bool {
        verify(token, request, &self.key, &self.config)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key", &"<redacted>")
            .field("config", &self.config)
            .finish()
    }
}
