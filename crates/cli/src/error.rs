//! CLI error types.

use std::fmt;

use error_stack::Report;
use framebase_common::error::SignatureError;

#[derive(Debug)]
pub enum CliError {
    /// Configuration file or argument error
    Config(String),
    /// Signing or token decoding error
    Signature(String),
    /// Signature did not verify
    InvalidSignature,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Signature(msg) => write!(f, "Signature error: {}", msg),
            CliError::InvalidSignature => write!(f, "Signature is not valid"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<Report<SignatureError>> for CliError {
    fn from(report: Report<SignatureError>) -> Self {
        match report.current_context() {
            SignatureError::Configuration { .. } => CliError::Config(format!("{:?}", report)),
            _ => CliError::Signature(format!("{:?}", report)),
        }
    }
}
