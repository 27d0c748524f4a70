//! Error types for request signing and the signed API client.
//!
//! Fallible operations return `Result<T, Report<SignatureError>>`. Signature
//! verification never returns an error to its caller; every failure on that
//! path collapses to `false`.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum SignatureError {
    /// Missing or unusable configuration, such as an empty signing key.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// A signature token that does not decode into its four fields.
    #[display("Malformed signature token: {message}")]
    MalformedToken { message: String },

    /// Inbound request data the signable form cannot be built from.
    #[display("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The API rejected the request's credentials (401 or 403).
    #[display("Invalid authentication: {message}")]
    InvalidAuth { message: String },

    /// The API answered with an unexpected status.
    #[display("API error [{status}]: {message}")]
    Api { status: u16, message: String },
}

impl SignatureError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }
}
