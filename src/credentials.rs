//! Credentials attached to gateway requests and the store they come from.

use std::{fmt, path::PathBuf};

/// PEM bundle (certificate chain plus private key) for one client certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub thumbprint: String,
    pub pem: Vec<u8>,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("thumbprint", &self.thumbprint)
            .field("pem", &"<redacted>")
            .finish()
    }
}

/// Source of escalation credentials.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Finds the client certificate whose thumbprint matches.
    fn client_certificate(&self, thumbprint: &str) -> Result<ClientCertificate, String>;

    /// Produces a token answering a `Negotiate` challenge for `uri`.
    fn negotiate_token(&self, uri: &str) -> Result<String, String>;
}

/// Looks up `<dir>/<thumbprint>.pem`, matching the thumbprint case-insensitively.
#[derive(Clone, Debug)]
pub struct PemDirectoryStore {
    dir: PathBuf,
    negotiate_token: Option<String>,
}

impl PemDirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            negotiate_token: None,
        }
    }

    /// Token handed out for `Negotiate` challenges.
    pub fn with_negotiate_token(mut self, token: impl Into<String>) -> Self {
        self.negotiate_token = Some(token.into());
        self
    }
}

impl CredentialStore for PemDirectoryStore {
    fn client_certificate(&self, thumbprint: &str) -> Result<ClientCertificate, String> {
        let wanted = normalize_thumbprint(thumbprint);
        if wanted.is_empty() {
            return Err("client certificate thumbprint is empty".to_owned());
        }

        let entries = std::fs::read_dir(&self.dir)
            .map_err(|err| format!("cannot open {}: {err}", self.dir.display()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            let matches = path.extension().is_some_and(|ext| ext == "pem")
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| normalize_thumbprint(stem) == wanted);
            if matches {
                let pem = std::fs::read(&path)
                    .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
                return Ok(ClientCertificate {
                    thumbprint: wanted,
                    pem,
                });
            }
        }

        Err(format!(
            "no certificate with thumbprint {wanted} in {}",
            self.dir.display()
        ))
    }

    fn negotiate_token(&self, _uri: &str) -> Result<String, String> {
        self.negotiate_token
            .clone()
            .ok_or_else(|| "integrated credentials are not configured".to_owned())
    }
}

/// Credential escalation state for one dispatch call. Moves forward only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CredentialState {
    #[default]
    Anonymous,
    ClientCertificateAttached(ClientCertificate),
    DefaultCredentialsAttached(String),
}

impl CredentialState {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// Credential placed on a single outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub enum AttachedCredential {
    None,
    Authorization(String),
    ClientCertificate(ClientCertificate),
    Negotiate(String),
}

impl AttachedCredential {
    /// Certificate and integrated credentials take precedence over the
    /// client-wide authorization header.
    pub fn for_state(state: &CredentialState, authorization: Option<&str>) -> Self {
        match state {
            CredentialState::ClientCertificateAttached(certificate) => {
                Self::ClientCertificate(certificate.clone())
            }
            CredentialState::DefaultCredentialsAttached(token) => Self::Negotiate(token.clone()),
            CredentialState::Anonymous => authorization
                .map(|value| Self::Authorization(value.to_owned()))
                .unwrap_or(Self::None),
        }
    }
}

impl fmt::Debug for AttachedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Authorization(_) => f.write_str("Authorization(<redacted>)"),
            Self::ClientCertificate(certificate) => {
                f.debug_tuple("ClientCertificate").field(certificate).finish()
            }
            Self::Negotiate(_) => f.write_str("Negotiate(<redacted>)"),
        }
    }
}

fn normalize_thumbprint(thumbprint: &str) -> String {
    thumbprint
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        AttachedCredential, ClientCertificate, CredentialState, CredentialStore, PemDirectoryStore,
    };

    #[test]
    fn pem_store_matches_thumbprint_case_insensitively() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        std::fs::write(dir.path().join("ab12cd.pem"), b"-----BEGIN CERTIFICATE-----")
            .expect("must write pem");
        std::fs::write(dir.path().join("ab12cd.txt"), b"not a pem").expect("must write txt");

        let store = PemDirectoryStore::new(dir.path());
        let certificate = store.client_certificate("AB 12 CD").expect("must find cert");
        assert_eq!(certificate.thumbprint, "AB12CD");
        assert!(certificate.pem.starts_with(b"-----BEGIN"));

        assert!(store.client_certificate("FFFF").is_err());
        assert!(store.client_certificate("  ").is_err());
    }

    #[test]
    fn pem_store_reports_missing_directory() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let store = PemDirectoryStore::new(dir.path().join("absent"));

        let err = store.client_certificate("AB12").expect_err("must fail");
        assert!(err.contains("cannot open"), "{err}");
    }

    #[test]
    fn pem_store_negotiate_requires_configuration() {
        let store = PemDirectoryStore::new(std::env::temp_dir());
        assert!(store.negotiate_token("https://n0:19080/").is_err());

        let store = store.with_negotiate_token("tok");
        assert_eq!(store.negotiate_token("https://n0:19080/").as_deref(), Ok("tok"));
    }

    #[test]
    fn escalated_credentials_replace_authorization_header() {
        let certificate = ClientCertificate {
            thumbprint: "AB".to_owned(),
            pem: Vec::new(),
        };

        assert_eq!(
            AttachedCredential::for_state(&CredentialState::Anonymous, None),
            AttachedCredential::None
        );
        assert_eq!(
            AttachedCredential::for_state(&CredentialState::Anonymous, Some("Bearer x")),
            AttachedCredential::Authorization("Bearer x".to_owned())
        );
        assert_eq!(
            AttachedCredential::for_state(
                &CredentialState::ClientCertificateAttached(certificate.clone()),
                Some("Bearer x")
            ),
            AttachedCredential::ClientCertificate(certificate)
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let attached = AttachedCredential::Authorization("secret-token".to_owned());
        assert!(!format!("{attached:?}").contains("secret-token"));
    }
}
