//! Packing and unpacking of signature tokens.
//!
//! A token is `algorithm$$issued_at$$nonce$$hmac`, base64 encoded. None of
//! the four fields may contain the `$$` separator: the algorithm is an
//! identifier, the timestamp is RFC 3339, the nonce is decimal digits and the
//! HMAC is hex.

use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};

use crate::constants::SIGNATURE_SEPARATOR;
use crate::error::SignatureError;
use crate::request_signing::signable::format_timestamp;

const TOKEN_FIELD_COUNT: usize = 4;

/// The four fields carried inside a signature token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureToken {
    /// Identifier of the hash function, as written by the signer.
    pub algorithm: String,
    pub issued_at: DateTime<Utc>,
    pub nonce: String,
    /// Lowercase hex HMAC.
    pub hmac: String,
}

impl SignatureToken {
    /// Joins the fields with the separator and base64 encodes the result.
    #[must_use]
    pub fn pack(&self) -> String {
        let joined = [
            self.algorithm.as_str(),
            format_timestamp(&self.issued_at).as_str(),
            self.nonce.as_str(),
            self.hmac.as_str(),
        ]
        .join(SIGNATURE_SEPARATOR);

        general_purpose::STANDARD.encode(joined)
    }

    /// Decodes a token produced by [`SignatureToken::pack`].
    ///
    /// Accepts the standard base64 alphabet and, for tokens that went through
    /// a URL-safe transport, the URL-safe one.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::MalformedToken`] if the token is not base64,
    /// not UTF-8, does not split into exactly four fields, or carries an
    /// unparseable timestamp.
    pub fn unpack(token: &str) -> Result<Self, Report<SignatureError>> {
        let token = token.trim();
        let decoded = general_purpose::STANDARD
            .decode(token)
            .or_else(|_| general_purpose::URL_SAFE.decode(token))
            .change_context(SignatureError::malformed("Token is not valid base64"))?;

        let joined = String::from_utf8(decoded)
            .change_context(SignatureError::malformed("Token is not valid UTF-8"))?;

        let fields: Vec<&str> = joined.split(SIGNATURE_SEPARATOR).collect();
        let [algorithm, issued_at, nonce, hmac] = fields[..] else {
            return Err(Report::new(SignatureError::malformed(format!(
                "Expected {TOKEN_FIELD_COUNT} fields, found {}",
                fields.len()
            ))));
        };

        let issued_at = DateTime::parse_from_rfc3339(issued_at)
            .change_context(SignatureError::malformed("Token timestamp is not RFC 3339"))
            .attach(format!("timestamp: {issued_at}"))?
            .with_timezone(&Utc);

        Ok(Self {
            algorithm: algorithm.to_string(),
            issued_at,
            nonce: nonce.to_string(),
            hmac: hmac.to_string(),
        })
    }
}
