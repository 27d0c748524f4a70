//! Configuration for API clients and verifying servers.
//!
//! Settings are read from TOML and merged with environment variables prefixed
//! with `FRAMEBASE__`, using `__` as the section separator. For example
//! `FRAMEBASE__SIGNING__VALIDITY_WINDOW_SECS=60` overrides
//! `signing.validity_window_secs`.

use std::fs;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use http::Method;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::ENVIRONMENT_PREFIX;
use crate::error::SignatureError;
use crate::outbound::{ApiCredentials, ApiRequest};
use crate::request_signing::{RequestSigner, SignatureConfig};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Client {
    /// Public identifier sent as the `token` query parameter.
    #[validate(length(min = 1))]
    pub token: String,
    pub secret: Option<String>,
    #[validate(length(min = 1))]
    pub hostname: String,
    #[serde(default = "default_https")]
    pub https: bool,
}

fn default_https() -> bool {
    true
}

impl Client {
    #[must_use]
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            token: self.token.clone(),
            secret: self.secret.clone(),
        }
    }

    /// Starts a request against the configured host.
    #[must_use]
    pub fn request(&self, method: Method, endpoint: impl Into<String>) -> ApiRequest {
        ApiRequest::new(self.credentials(), method, self.hostname.as_str(), endpoint)
            .with_https(self.https)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Server {
    /// Authoritative host name used when rebuilding inbound requests.
    pub hostname: Option<String>,
    /// Shared secret for verifying inbound signatures.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub signing: SignatureConfig,
    #[validate(nested)]
    pub client: Option<Client>,
    #[serde(default)]
    #[validate(nested)]
    pub server: Server,
}

impl Settings {
    /// Parses settings from TOML, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if the TOML is invalid or
    /// does not match the settings layout.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<SignatureError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_PREFIX)
            .separator("__")
            .try_parsing(true);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(SignatureError::configuration("Failed to build configuration"))?;

        config
            .try_deserialize()
            .change_context(SignatureError::configuration("Failed to deserialize configuration"))
    }

    /// Reads, parses and validates a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if the file cannot be read,
    /// parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, Report<SignatureError>> {
        let content = fs::read_to_string(path)
            .change_context(SignatureError::configuration("Failed to read settings file"))
            .attach(format!("path: {}", path.display()))?;

        let settings = Self::from_toml(&content).attach(format!("path: {}", path.display()))?;
        settings
            .validate()
            .change_context(SignatureError::configuration("Settings validation failed"))?;

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] without a `[client]` section.
    pub fn client(&self) -> Result<&Client, Report<SignatureError>> {
        self.client
            .as_ref()
            .ok_or_else(|| Report::new(SignatureError::configuration("No [client] section configured")))
    }

    /// Builds a signer from the `[server]` secret and the signing settings.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Configuration`] if no server secret is set.
    pub fn server_signer(&self) -> Result<RequestSigner, Report<SignatureError>> {
        let secret = self.server.secret.as_deref().unwrap_or_default();
        RequestSigner::new(secret, self.signing).attach("while reading [server] secret")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_signing::SignatureAlgorithm;

    const CLIENT_TOML: &str = r#"
        [signing]
        algorithm = "sha256"
        validity_window_secs = 600

        [client]
        token = "XYZ"
        secret = "s3cr3t"
        hostname = "api.example.com"

        [server]
        hostname = "api.example.com"
        secret = "s3cr3t"
        "#;

    const OVERRIDE_VARS: [&str; 2] = [
        "FRAMEBASE__SIGNING__VALIDITY_WINDOW_SECS",
        "FRAMEBASE__CLIENT__HOSTNAME",
    ];

    fn parse_without_overrides(toml_str: &str) -> Settings {
        temp_env::with_vars_unset(OVERRIDE_VARS, || {
            Settings::from_toml(toml_str).expect("should parse settings")
        })
    }

    #[test]
    fn test_settings_from_valid_toml() {
        let settings = parse_without_overrides(CLIENT_TOML);

        assert_eq!(settings.signing.algorithm, SignatureAlgorithm::Sha256);
        assert_eq!(settings.signing.validity_window_secs, 600);

        let client = settings.client().unwrap();
        assert_eq!(client.token, "XYZ");
        assert_eq!(client.secret.as_deref(), Some("s3cr3t"));
        assert!(client.https, "https should default to true");
        assert_eq!(settings.server.hostname.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_signing_defaults() {
        let settings = parse_without_overrides("[server]\nsecret = \"k\"\n");

        assert_eq!(settings.signing, SignatureConfig::default());
        assert!(settings.client().is_err(), "client section should be optional");
    }

    #[test]
    fn test_settings_invalid_toml_syntax() {
        let toml_str = r#"
            [client
            token = "XYZ"
            "#;

        assert!(Settings::from_toml(toml_str).is_err(), "Should fail with invalid TOML syntax");
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let toml_str = r#"
            [signing]
            algorithm = "md5"
            "#;

        assert!(Settings::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_window_and_empty_token() {
        let zero_window = parse_without_overrides("[signing]\nvalidity_window_secs = 0\n");
        assert!(zero_window.validate().is_err());

        let empty_token = Settings::from_toml(
            "[client]\ntoken = \"\"\nhostname = \"api.example.com\"\n",
        )
        .unwrap();
        assert!(empty_token.validate().is_err());
    }

    #[test]
    fn test_override_env() {
        temp_env::with_vars(
            [
                (OVERRIDE_VARS[0], Some("60")),
                (OVERRIDE_VARS[1], Some("staging.example.com")),
            ],
            || {
                let settings = Settings::from_toml(CLIENT_TOML).unwrap();

                assert_eq!(settings.signing.validity_window_secs, 60);
                assert_eq!(settings.client().unwrap().hostname, "staging.example.com");
            },
        );
    }

    #[test]
    fn test_client_request_uses_settings() {
        let settings = parse_without_overrides(CLIENT_TOML);
        let request = settings.client().unwrap().request(Method::GET, "/videos.json");

        assert_eq!(request.query_string(), "token=XYZ");
        let url = request.url(&settings.signing).unwrap();
        assert!(url.starts_with("https://api.example.com/videos.json?token=XYZ&signature="));
    }

    #[test]
    fn test_server_signer_verifies_client_signature() {
        let settings = Settings::from_toml(CLIENT_TOML).unwrap();
        let request = settings.client().unwrap().request(Method::GET, "/videos.json");
        let signer = settings.server_signer().unwrap();

        let token = crate::request_signing::sign(
            &request.to_signable_request(),
            b"s3cr3t",
            &settings.signing,
        )
        .unwrap();
        assert!(signer.verify(&token, &request.to_signable_request()));
    }

    #[test]
    fn test_server_signer_requires_secret() {
        let settings = parse_without_overrides("");
        assert!(settings.server_signer().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = Settings::from_file(Path::new("/nonexistent/framebase.toml"));
        assert!(result.is_err());
    }
}
