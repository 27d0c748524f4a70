//! Signing, verification and token inspection commands.
//!
//! The signing key is resolved from `--key` (or `FRAMEBASE_SECRET`), then
//! from the config file's `[server]` secret, then from its `[client]` secret.

use std::path::{Path, PathBuf};

use clap::Args;
use framebase_common::request_signing::{
    extract_nonce, sign, verify, SignableRequest, SignatureAlgorithm, SignatureConfig,
    SignatureToken,
};
use framebase_common::settings::Settings;
use serde_json::json;
use validator::Validate;

use crate::error::CliError;
use crate::OutputFormat;

/// Request fields covered by the signature.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(long, short, default_value = "GET")]
    pub method: String,

    /// Host the request is addressed to
    #[arg(long)]
    pub host: String,

    /// URL path
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Raw query string, without the signature parameter
    #[arg(long, short, default_value = "")]
    pub query: String,

    /// Raw request body
    #[arg(long, short, default_value = "")]
    pub body: String,
}

impl RequestArgs {
    pub fn to_signable_request(&self) -> SignableRequest {
        SignableRequest::new(
            self.method.as_str(),
            self.host.as_str(),
            self.path.as_str(),
            self.query.as_str(),
            self.body.as_bytes(),
        )
    }
}

/// Key and signature settings shared by `sign` and `verify`.
#[derive(Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// Shared secret key
    #[arg(long, short, env = "FRAMEBASE_SECRET", hide_env_values = true)]
    pub key: Option<String>,

    /// TOML config file providing the secret and signing settings
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Override the signature algorithm
    #[arg(long)]
    pub algorithm: Option<SignatureAlgorithm>,

    /// Override the validity window in seconds
    #[arg(long)]
    pub window: Option<u64>,
}

impl KeyArgs {
    fn resolve(&self) -> Result<(Vec<u8>, SignatureConfig), CliError> {
        let settings = match &self.config {
            Some(path) => Some(load_settings(path)?),
            None => None,
        };

        let mut config = settings
            .as_ref()
            .map(|settings| settings.signing)
            .unwrap_or_default();
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(window) = self.window {
            config.validity_window_secs = window;
        }
        config
            .validate()
            .map_err(|e| CliError::Config(format!("Invalid signing settings: {e}")))?;

        let key = self
            .key
            .clone()
            .or_else(|| {
                settings.as_ref().and_then(|settings| {
                    settings.server.secret.clone().or_else(|| {
                        settings
                            .client
                            .as_ref()
                            .and_then(|client| client.secret.clone())
                    })
                })
            })
            .unwrap_or_default();

        Ok((key.into_bytes(), config))
    }
}

pub(crate) fn load_settings(path: &Path) -> Result<Settings, CliError> {
    Settings::from_file(path)
        .map_err(|e| CliError::Config(format!("Failed to load {}: {:?}", path.display(), e)))
}

/// Signs the request and returns the token, or a JSON description of it.
pub fn sign_command(
    request: &RequestArgs,
    key: &KeyArgs,
    format: &OutputFormat,
) -> Result<String, CliError> {
    let (secret, config) = key.resolve()?;
    let token = sign(&request.to_signable_request(), &secret, &config)?;
    log::debug!("Signed {} {}{}", request.method, request.host, request.path);

    match format {
        OutputFormat::Text => Ok(token),
        OutputFormat::Json => {
            let info = SignatureToken::unpack(&token)?;
            Ok(describe(&token, &info).to_string())
        }
    }
}

/// Verifies a token against the request; an invalid token is an error.
pub fn verify_command(token: &str, request: &RequestArgs, key: &KeyArgs) -> Result<String, CliError> {
    let (secret, config) = key.resolve()?;

    if verify(token, &request.to_signable_request(), &secret, &config) {
        Ok("valid".to_string())
    } else {
        Err(CliError::InvalidSignature)
    }
}

pub fn nonce_command(token: &str) -> Result<String, CliError> {
    Ok(extract_nonce(token)?)
}

/// Decodes a token without verifying it.
pub fn inspect_command(token: &str, format: &OutputFormat) -> Result<String, CliError> {
    let info = SignatureToken::unpack(token)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "algorithm: {}\nissued_at: {}\nnonce:     {}\nhmac:      {}",
            info.algorithm,
            info.issued_at.to_rfc3339(),
            info.nonce,
            info.hmac
        )),
        OutputFormat::Json => serde_json::to_string_pretty(&describe(token, &info))
            .map_err(|e| CliError::Signature(format!("Failed to serialize token: {e}"))),
    }
}

fn describe(token: &str, info: &SignatureToken) -> serde_json::Value {
    json!({
        "token": token,
        "algorithm": info.algorithm,
        "issued_at": info.issued_at.to_rfc3339(),
        "nonce": info.nonce,
        "hmac": info.hmac,
    })
}
