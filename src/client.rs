use std::{fmt, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    codec::{BodyCodec, JsonCodec},
    credentials::{CredentialStore, PemDirectoryStore},
    dispatch::{Dispatcher, Outcome, RequestDescriptor},
    endpoint::{EndpointPool, RandomSource, ThreadRandom},
    headers::HeaderContract,
    operations::{Operation, Target},
    resources::{API_1_0, API_VERSION_PARAMETER, CONTINUATION_TOKEN_PARAMETER},
    transport::{ReqwestTransport, Transport},
    uri::{append_query, compose_flat, compose_structured},
    wire::PagedList,
    ClientOptions, GatewayError, GatewaySettings, Result,
};

pub const ENDPOINTS_ENV: &str = "FABRIC_GATEWAY_ENDPOINTS";
pub const THUMBPRINT_ENV: &str = "FABRIC_GATEWAY_THUMBPRINT";
pub const CERT_DIR_ENV: &str = "FABRIC_GATEWAY_CERT_DIR";
pub const AUTHORIZATION_ENV: &str = "FABRIC_GATEWAY_AUTHORIZATION";
pub const HSTS_ENV: &str = "FABRIC_GATEWAY_HSTS";
pub const NEGOTIATE_TOKEN_ENV: &str = "FABRIC_GATEWAY_NEGOTIATE_TOKEN";

/// Test client for a cluster-management HTTP gateway.
///
/// Every call picks one endpoint from the pool, composes a versioned URI and
/// runs it through the retry/escalation [`Dispatcher`].
#[derive(Clone)]
pub struct GatewayClient<T = ReqwestTransport, C = JsonCodec> {
    pool: EndpointPool,
    random: Arc<dyn RandomSource>,
    dispatcher: Dispatcher<T>,
    codec: C,
}

impl<T, C> fmt::Debug for GatewayClient<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("endpoints", &self.pool.endpoints())
            .field("random", &self.random)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl GatewayClient {
    /// Creates a client over `reqwest` with default options.
    pub fn new<I, S>(endpoints: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = ClientOptions::default();
        let transport = ReqwestTransport::new(&options)?;
        Self::with_transport(endpoints, transport, options)
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `FABRIC_GATEWAY_ENDPOINTS`: comma-separated gateway base URIs (required)
    /// - `FABRIC_GATEWAY_THUMBPRINT`: client certificate used after a 403
    /// - `FABRIC_GATEWAY_CERT_DIR`: directory holding `<thumbprint>.pem`
    /// - `FABRIC_GATEWAY_AUTHORIZATION`: raw `Authorization` header value
    /// - `FABRIC_GATEWAY_HSTS`: expected `Strict-Transport-Security` value
    /// - `FABRIC_GATEWAY_NEGOTIATE_TOKEN`: token sent after a `Negotiate` challenge
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fabric_gateway_http::GatewayClient;
    ///
    /// let client = GatewayClient::from_env().expect("missing FABRIC_GATEWAY_* env vars");
    /// ```
    pub fn from_env() -> Result<Self> {
        let endpoints = optional_env(ENDPOINTS_ENV).ok_or_else(|| {
            GatewayError::Config(format!("missing {ENDPOINTS_ENV} environment variable"))
        })?;

        Self::from_settings(GatewaySettings {
            endpoints: EndpointPool::parse_list(&endpoints).endpoints().to_vec(),
            thumbprint: optional_env(THUMBPRINT_ENV),
            certificate_dir: optional_env(CERT_DIR_ENV).map(Into::into),
            authorization: optional_env(AUTHORIZATION_ENV),
            negotiate_token: optional_env(NEGOTIATE_TOKEN_ENV),
            hsts_header: optional_env(HSTS_ENV).unwrap_or_default(),
            options: ClientOptions::default(),
        })
    }

    /// Creates a client from parsed [`GatewaySettings`].
    pub fn from_settings(settings: GatewaySettings) -> Result<Self> {
        let transport = ReqwestTransport::new(&settings.options)?;
        let mut client = Self::with_transport(settings.endpoints, transport, settings.options)?
            .with_hsts_header(settings.hsts_header);

        if let Some(authorization) = settings.authorization {
            client = client.with_authorization(authorization);
        }
        if let Some(thumbprint) = &settings.thumbprint {
            if settings.certificate_dir.is_none() {
                return Err(GatewayError::Config(
                    "a client certificate thumbprint needs a certificate directory".to_owned(),
                ));
            }
            client = client.with_client_certificate(thumbprint.clone());
        }
        if settings.thumbprint.is_some() || settings.negotiate_token.is_some() {
            let mut store = PemDirectoryStore::new(settings.certificate_dir.unwrap_or_default());
            if let Some(token) = settings.negotiate_token {
                store = store.with_negotiate_token(token);
            }
            client = client.with_credential_store(Arc::new(store));
        }

        Ok(client)
    }
}

impl<C: BodyCodec> GatewayClient<ReqwestTransport, C> {
    /// Applies timeout, retry and TLS options. Rebuilds the HTTP client.
    pub fn with_options(self, options: ClientOptions) -> Result<Self> {
        let transport = ReqwestTransport::new(&options)?;
        Ok(Self {
            dispatcher: self.dispatcher.with_transport(transport).with_options(options),
            ..self
        })
    }
}

impl<T: Transport, C: BodyCodec> GatewayClient<T, C> {
    /// Creates a client over a custom transport.
    pub fn with_transport<I, S>(endpoints: I, transport: T, options: ClientOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: Default,
    {
        let pool = EndpointPool::new(endpoints);
        if pool.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "at least one gateway endpoint is required".to_owned(),
            ));
        }

        Ok(Self {
            pool,
            random: Arc::new(ThreadRandom),
            dispatcher: Dispatcher::new(transport, options),
            codec: C::default(),
        })
    }

    /// Sends `authorization` verbatim as the `Authorization` header.
    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.dispatcher = self.dispatcher.with_authorization(authorization);
        self
    }

    /// Sends a bearer token. The `Bearer ` prefix is added when missing.
    pub fn with_bearer(self, token: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(token.as_ref());
        self.with_authorization(authorization)
    }

    /// Expected `Strict-Transport-Security` value. Empty means the header must be absent.
    pub fn with_hsts_header(mut self, value: impl Into<String>) -> Self {
        self.dispatcher = self
            .dispatcher
            .with_header_contract(HeaderContract::new(value));
        self
    }

    /// Certificate thumbprint attached after the first 403.
    pub fn with_client_certificate(mut self, thumbprint: impl Into<String>) -> Self {
        self.dispatcher = self.dispatcher.with_client_certificate(thumbprint);
        self
    }

    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.dispatcher = self.dispatcher.with_credential_store(store);
        self
    }

    /// Replaces the source used for endpoint and route choices.
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_codec<D: BodyCodec>(self, codec: D) -> GatewayClient<T, D> {
        GatewayClient {
            pool: self.pool,
            random: self.random,
            dispatcher: self.dispatcher,
            codec,
        }
    }

    pub fn endpoints(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn options(&self) -> &ClientOptions {
        self.dispatcher.options()
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Turns an operation into a request: picks the endpoint and route,
    /// composes the URI and encodes the body.
    pub fn resolve(&self, operation: &Operation) -> Result<RequestDescriptor> {
        let base = self.pool.select(operation.endpoint, self.random.as_ref())?;

        let uri = match &operation.target {
            Target::Flat(routes) => {
                let route = match routes.len() {
                    0 => None,
                    1 => routes.first(),
                    n => routes.get(self.random.next_index(n)),
                };
                let mut suffix = route
                    .ok_or_else(|| {
                        GatewayError::InvalidArgument("operation has no route".to_owned())
                    })?
                    .clone();
                append_query(&mut suffix, &operation.query);
                compose_flat(base, &suffix)?
            }
            Target::Resource {
                types,
                ids,
                api_version,
            } => compose_structured(
                base,
                types.as_slice(),
                ids.as_slice(),
                api_version,
                &operation.query,
            )?,
        };

        let body = operation
            .body
            .as_ref()
            .map(|body| self.codec.encode(body))
            .transpose()?;

        Ok(RequestDescriptor {
            method: operation.method.clone(),
            uri,
            body,
            expected_status: operation.expected_status,
            expected_retry_error_code: operation.tolerated_on_retry.map(str::to_owned),
        })
    }

    /// Dispatches a prepared request.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<Outcome> {
        self.dispatcher.dispatch(request, &CancellationToken::new()).await
    }

    /// Runs `operation` to a terminal outcome.
    pub async fn execute(&self, operation: &Operation) -> Result<Outcome> {
        self.execute_cancellable(operation, &CancellationToken::new())
            .await
    }

    /// Like [`Self::execute`], abandoning retries once `cancel` fires.
    pub async fn execute_cancellable(
        &self,
        operation: &Operation,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let request = self.resolve(operation)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method,
            uri = %request.uri,
            "dispatching gateway request"
        );

        self.dispatcher.dispatch(&request, cancel).await
    }

    /// Runs `operation` with `body` encoded by the client codec in place of
    /// the operation's own body.
    pub async fn execute_with<B: Serialize + ?Sized>(
        &self,
        operation: &Operation,
        body: &B,
    ) -> Result<Outcome> {
        let mut request = self.resolve(operation)?;
        request.body = Some(self.codec.encode(body)?);
        self.dispatcher
            .dispatch(&request, &CancellationToken::new())
            .await
    }

    /// Runs a read operation and decodes the response body.
    ///
    /// An expected failure has no body to decode and is returned as
    /// [`GatewayError::Http`].
    pub async fn query<R: DeserializeOwned>(&self, operation: &Operation) -> Result<R> {
        match self.execute(operation).await? {
            Outcome::Success(response) => self.codec.decode(&response.body),
            Outcome::ExpectedFailure(response) => Err(GatewayError::Http {
                uri: response.uri,
                status: response.status.as_u16(),
                description: response.description,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }),
        }
    }

    /// Follows `ContinuationToken` until the gateway stops returning one and
    /// collects every page's `Items`.
    pub async fn collect_pages<R: DeserializeOwned>(
        &self,
        operation: &Operation,
    ) -> Result<Vec<R>> {
        if !supports_paging(&operation.target) {
            return Err(GatewayError::InvalidArgument(format!(
                "paging is not supported in api-version {API_1_0}"
            )));
        }

        let mut items = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut page_operation = operation.clone();
            if let Some(token) = &continuation {
                page_operation =
                    page_operation.with_query(CONTINUATION_TOKEN_PARAMETER, token.clone());
            }

            let page: PagedList<R> = self.query(&page_operation).await?;
            items.extend(page.items);

            match page.continuation_token {
                Some(token) if !token.trim().is_empty() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(collected = items.len(), "following continuation token");
                    continuation = Some(token);
                }
                _ => return Ok(items),
            }
        }
    }
}

/// Continuation tokens exist from api-version 2.0 on.
fn supports_paging(target: &Target) -> bool {
    let unpaged = format!("{API_VERSION_PARAMETER}={API_1_0}");
    match target {
        Target::Resource { api_version, .. } => api_version != API_1_0,
        Target::Flat(routes) => !routes
            .iter()
            .any(|route| route.split(['?', '&']).any(|pair| pair == unpaged)),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
