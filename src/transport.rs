//! HTTP exchange seam between the dispatcher and the network.

use std::{fmt, future::Future, time::Duration};

use reqwest::{
    header::{self, HeaderMap},
    Method, StatusCode,
};

use crate::{credentials::AttachedCredential, error::BoxError, ClientOptions, GatewayError, Result};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// One fully prepared attempt.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub uri: String,
    pub body: Option<Vec<u8>>,
    pub credential: AttachedCredential,
    pub timeout: Duration,
}

/// Fully read response. The connection is released before this value exists.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Reason phrase when the server sent a non-canonical one.
    pub reason: Option<String>,
    pub body: Vec<u8>,
}

/// Exchange that produced no response.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct TransportFailure {
    timed_out: bool,
    #[source]
    source: BoxError,
}

impl TransportFailure {
    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self {
            timed_out: true,
            source: source.into(),
        }
    }

    pub fn other(source: impl Into<BoxError>) -> Self {
        Self {
            timed_out: false,
            source: source.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        Self {
            timed_out: err.is_timeout(),
            source: Box::new(err),
        }
    }
}

/// Executes one HTTP attempt.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: PreparedRequest,
    ) -> impl Future<Output = std::result::Result<RawResponse, TransportFailure>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    options: ClientOptions,
    ca_bundle: Option<Vec<u8>>,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("options", &self.options)
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let ca_bundle = options
            .ca_certificate
            .as_ref()
            .map(|path| {
                std::fs::read(path).map_err(|err| {
                    GatewayError::Config(format!("cannot read CA bundle {}: {err}", path.display()))
                })
            })
            .transpose()?;

        let http = build_client(options, ca_bundle.as_deref(), None)
            .map_err(|err| GatewayError::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(Self {
            http,
            options: options.clone(),
            ca_bundle,
        })
    }

    // reqwest binds client identities at client construction, so a
    // certificate attempt gets its own client.
    fn client_for(
        &self,
        credential: &AttachedCredential,
    ) -> std::result::Result<reqwest::Client, TransportFailure> {
        match credential {
            AttachedCredential::ClientCertificate(certificate) => {
                let identity = reqwest::Identity::from_pem(&certificate.pem).map_err(|err| {
                    TransportFailure::other(format!(
                        "client certificate {} is not a usable PEM identity: {err}",
                        certificate.thumbprint
                    ))
                })?;
                build_client(&self.options, self.ca_bundle.as_deref(), Some(identity))
                    .map_err(TransportFailure::from)
            }
            _ => Ok(self.http.clone()),
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: PreparedRequest,
    ) -> std::result::Result<RawResponse, TransportFailure> {
        let http = self.client_for(&request.credential)?;
        let mut builder = http
            .request(request.method.clone(), &request.uri)
            .timeout(request.timeout);

        if request.method == Method::POST || request.method == Method::PUT {
            builder = builder
                .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(request.body.unwrap_or_default());
        }

        builder = match &request.credential {
            AttachedCredential::Authorization(value) => {
                builder.header(header::AUTHORIZATION, value)
            }
            AttachedCredential::Negotiate(token) => {
                builder.header(header::AUTHORIZATION, format!("Negotiate {token}"))
            }
            AttachedCredential::None | AttachedCredential::ClientCertificate(_) => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
            .map(str::to_owned);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            reason,
            body,
        })
    }
}

fn build_client(
    options: &ClientOptions,
    ca_bundle: Option<&[u8]>,
    identity: Option<reqwest::Identity>,
) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(options.accept_invalid_certs);

    if let Some(pem) = ca_bundle {
        for certificate in reqwest::Certificate::from_pem_bundle(pem)? {
            builder = builder.add_root_certificate(certificate);
        }
    }
    if let Some(identity) = identity {
        builder = builder.identity(identity);
    }

    builder.build()
}
