//! `fabric-gateway-http` is an async test client for a cluster-management HTTP gateway.
//!
//! The crate sends versioned REST calls to a pool of equivalent gateway
//! endpoints and decides the outcome of each call:
//! - [`GatewayClient::execute`] runs an [`Operation`] from the [`operations`] catalog
//! - [`GatewayClient::query`] and [`GatewayClient::collect_pages`] decode JSON results
//! - [`Dispatcher`] retries transient failures, escalates credentials on
//!   403 and 401/Negotiate, and enforces the security header contract

mod client;
mod codec;
mod credentials;
mod dispatch;
mod endpoint;
mod error;
mod headers;
mod options;
mod transport;

pub mod operations;
pub mod resources;
pub mod uri;
pub mod wire;

pub use client::{
    GatewayClient, AUTHORIZATION_ENV, CERT_DIR_ENV, ENDPOINTS_ENV, HSTS_ENV, NEGOTIATE_TOKEN_ENV,
    THUMBPRINT_ENV,
};
pub use codec::{BodyCodec, JsonCodec};
pub use credentials::{
    AttachedCredential, ClientCertificate, CredentialState, CredentialStore, PemDirectoryStore,
};
pub use dispatch::{DispatchState, Dispatcher, GatewayResponse, Outcome, RequestDescriptor};
pub use endpoint::{EndpointPool, RandomSource, SeededRandom, ThreadRandom};
pub use error::{BoxError, GatewayError};
pub use headers::{HeaderContract, NOSNIFF};
pub use operations::{Operation, Target};
pub use options::{ClientOptions, GatewaySettings};
pub use transport::{
    PreparedRequest, RawResponse, ReqwestTransport, Transport, TransportFailure, JSON_CONTENT_TYPE,
};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, GatewayError>;
