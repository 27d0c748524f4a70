//! Configuration commands.
//!
//! Configuration is loaded from TOML files and merged with environment variables
//! prefixed with `FRAMEBASE__`. For example, `FRAMEBASE__CLIENT__HOSTNAME`
//! will override `client.hostname` in the TOML file.

use std::path::Path;

use http::Method;

use crate::error::CliError;
use crate::signature::load_settings;

/// Validate configuration file.
pub fn validate(file: &Path, verbose: bool) -> Result<String, CliError> {
    let settings = load_settings(file)?;

    let mut lines = vec![
        "Configuration is valid".to_string(),
        format!("  File: {}", file.display()),
        format!("  Algorithm: {}", settings.signing.algorithm),
        format!("  Validity window: {}s", settings.signing.validity_window_secs),
    ];

    if verbose {
        match &settings.client {
            Some(client) => lines.push(format!(
                "  Client: token={} host={} https={} secret={}",
                client.token,
                client.hostname,
                client.https,
                if client.secret.is_some() { "set" } else { "missing" }
            )),
            None => lines.push("  Client: not configured".to_string()),
        }
        lines.push(format!(
            "  Server: host={} secret={}",
            settings.server.hostname.as_deref().unwrap_or("<transport>"),
            if settings.server.secret.is_some() { "set" } else { "missing" }
        ));
    }

    Ok(lines.join("\n"))
}

/// Build a signed URL for an endpoint using the `[client]` section.
pub fn signed_url(
    file: &Path,
    method: &str,
    endpoint: &str,
    params: &[(String, String)],
) -> Result<String, CliError> {
    let settings = load_settings(file)?;
    let client = settings.client()?;

    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| CliError::Config(format!("Invalid method '{method}': {e}")))?;

    let request = params
        .iter()
        .fold(client.request(method, endpoint), |request, (name, value)| {
            request.with_query_param(name.as_str(), value.as_str())
        });

    Ok(request.url(&settings.signing)?)
}

/// Parses a `name=value` query parameter argument.
pub fn parse_param(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{arg}'"))
}
