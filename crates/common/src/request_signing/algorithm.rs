//! Keyed-hash algorithms usable for request signatures.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Hash function used for the request HMAC.
///
/// The identifier (`sha256`, `sha384`, `sha512`) travels inside every token,
/// so a verifier always recomputes with the algorithm the signer chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignatureAlgorithm {
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

impl SignatureAlgorithm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Computes the HMAC of `message` under `key`, lowercase hex encoded.
    #[must_use]
    pub fn compute_hex(self, key: &[u8], message: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(keyed::<HmacSha256>(key, message).finalize().into_bytes()),
            Self::Sha384 => hex::encode(keyed::<HmacSha384>(key, message).finalize().into_bytes()),
            Self::Sha512 => hex::encode(keyed::<HmacSha512>(key, message).finalize().into_bytes()),
        }
    }

    /// Checks a hex encoded HMAC against `message` in constant time.
    ///
    /// Hex that does not decode, or decodes to the wrong length, never matches.
    #[must_use]
    pub fn verify_hex(self, key: &[u8], message: &[u8], expected_hex: &str) -> bool {
        let Ok(expected) = hex::decode(expected_hex) else {
            return false;
        };

        match self {
            Self::Sha256 => keyed::<HmacSha256>(key, message).verify_slice(&expected),
            Self::Sha384 => keyed::<HmacSha384>(key, message).verify_slice(&expected),
            Self::Sha512 => keyed::<HmacSha512>(key, message).verify_slice(&expected),
        }
        .is_ok()
    }
}

fn keyed<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> M {
    let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(SignatureError::configuration(format!(
                "Unsupported signature algorithm: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = SignatureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignatureAlgorithm> for String {
    fn from(algorithm: SignatureAlgorithm) -> Self {
        algorithm.as_str().to_string()
    }
}
