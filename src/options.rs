use std::path::PathBuf;

use serde::Deserialize;

/// Configures HTTP timeout, retry and TLS behavior.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of attempts per call, shared by transient retries and
    /// credential escalations.
    pub max_attempts: usize,
    /// Fixed delay before retrying a transient failure, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Accept gateway certificates that fail validation. Test clusters
    /// commonly serve certificates whose subject does not match the address.
    pub accept_invalid_certs: bool,
    /// Extra PEM-encoded CA bundle to trust.
    pub ca_certificate: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_attempts: 10,
            retry_backoff_ms: 30_000,
            accept_invalid_certs: false,
            ca_certificate: None,
        }
    }
}

/// File-friendly client settings.
///
/// The endpoint list and HSTS expectation are usually derived from a parsed
/// cluster manifest by the caller and written here.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewaySettings {
    pub endpoints: Vec<String>,
    pub thumbprint: Option<String>,
    pub certificate_dir: Option<PathBuf>,
    pub authorization: Option<String>,
    /// Token answering `Negotiate` challenges with integrated credentials.
    pub negotiate_token: Option<String>,
    pub hsts_header: String,
    pub options: ClientOptions,
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("endpoints", &self.endpoints)
            .field("thumbprint", &self.thumbprint)
            .field("certificate_dir", &self.certificate_dir)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "negotiate_token",
                &self.negotiate_token.as_ref().map(|_| "<redacted>"),
            )
            .field("hsts_header", &self.hsts_header)
            .field("options", &self.options)
            .finish()
    }
}

impl GatewaySettings {
    /// Parses settings from JSON text.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text)
            .map_err(|err| crate::GatewayError::Config(format!("invalid settings JSON: {err}")))
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            crate::GatewayError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }
}
