/// Separator between the packed fields of a signature token.
pub const SIGNATURE_SEPARATOR: &str = "$$";

/// Query parameter carrying the signature token.
pub const SIGNATURE_QUERY_PARAM: &str = "signature";

/// Query parameter carrying the caller's public API token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Separator between the lines of the HMAC input.
pub const HMAC_LINE_SEPARATOR: u8 = b'\n';

/// Default freshness window for signature verification.
pub const DEFAULT_VALIDITY_WINDOW_SECS: u64 = 3600;

/// Prefix for environment variables overriding settings values.
pub const ENVIRONMENT_PREFIX: &str = "FRAMEBASE";

pub const USER_AGENT: &str = "Framebase Rust API/1.0";
