//! Retry and credential-escalation state machine.
//!
//! One call to [`Dispatcher::dispatch`] runs attempts until exactly one of:
//! - the response status equals the declared expected status
//! - a tolerated error code shows up after a transient retry
//! - a fatal classification (header contract, unsupported challenge,
//!   attempt bound, unclassified status, transport failure, cancellation)
//!
//! Transient failures (timeout, 503, 504) sleep a fixed backoff before the
//! next attempt. 403 and 401/Negotiate escalate the credential once and retry
//! immediately. Both kinds of retry draw on the same attempt bound.

use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{self, HeaderMap},
    Method, StatusCode,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    credentials::{AttachedCredential, CredentialState, CredentialStore},
    headers::HeaderContract,
    transport::{PreparedRequest, RawResponse, Transport},
    wire::ErrorEnvelope,
    ClientOptions, GatewayError, Result,
};

const NEGOTIATE: &str = "Negotiate";

/// What to send and which outcomes the caller accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub uri: String,
    pub body: Option<Vec<u8>>,
    /// Status the caller wants; may be an error status when probing failure paths.
    pub expected_status: StatusCode,
    /// Error description treated as success once a transient retry has happened.
    pub expected_retry_error_code: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
            expected_status: StatusCode::OK,
            expected_retry_error_code: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = status;
        self
    }

    pub fn tolerate_on_retry(mut self, code: impl Into<String>) -> Self {
        self.expected_retry_error_code = Some(code.into());
        self
    }
}

/// Dispatch progress. Recorded in order on every returned response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Initial,
    Retrying,
    EscalatingToCertificate,
    EscalatingToDefaultCredentials,
    Terminal,
}

/// Final response of a dispatch.
#[derive(Clone, Debug)]
pub struct GatewayResponse {
    pub uri: String,
    pub status: StatusCode,
    /// Reason phrase, gateway error code, or canonical reason.
    pub description: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Attempts issued, including the one that produced this response.
    pub attempts: usize,
    /// Transient retries among those attempts.
    pub retries: usize,
    /// The response carried the tolerated error code of a retried mutation.
    pub completed_on_retry: bool,
    pub trace: Vec<DispatchState>,
}

impl GatewayResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Non-fatal terminal outcome. Fatal outcomes are [`GatewayError`]s.
#[derive(Clone, Debug)]
pub enum Outcome {
    Success(GatewayResponse),
    /// The caller declared this non-success status in advance.
    ExpectedFailure(GatewayResponse),
}

impl Outcome {
    pub fn response(&self) -> &GatewayResponse {
        match self {
            Self::Success(response) | Self::ExpectedFailure(response) => response,
        }
    }

    pub fn into_response(self) -> GatewayResponse {
        match self {
            Self::Success(response) | Self::ExpectedFailure(response) => response,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn status(&self) -> StatusCode {
        self.response().status
    }

    fn response_mut(&mut self) -> &mut GatewayResponse {
        match self {
            Self::Success(response) | Self::ExpectedFailure(response) => response,
        }
    }
}

enum Step {
    Finish(Outcome),
    Transient {
        status: Option<StatusCode>,
        description: String,
    },
    EscalateToCertificate {
        description: String,
    },
    EscalateToDefaultCredentials {
        description: String,
    },
    Fail(GatewayError),
}

/// What the loop does after the attempt bound has been applied.
enum Next {
    Finish(Outcome),
    Backoff,
    Escalate(CredentialState, DispatchState),
    Fail(GatewayError),
}

/// Runs requests through the retry/escalation loop.
#[derive(Clone)]
pub struct Dispatcher<T> {
    transport: T,
    options: ClientOptions,
    contract: HeaderContract,
    authorization: Option<String>,
    thumbprint: Option<String>,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl<T> std::fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .field("contract", &self.contract)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .field("thumbprint", &self.thumbprint)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, options: ClientOptions) -> Self {
        Self {
            transport,
            options,
            contract: HeaderContract::default(),
            authorization: None,
            thumbprint: None,
            credentials: None,
        }
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_header_contract(mut self, contract: HeaderContract) -> Self {
        self.contract = contract;
        self
    }

    /// Authorization header sent while no escalated credential is attached.
    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    /// Thumbprint of the certificate to attach after a 403.
    pub fn with_client_certificate(mut self, thumbprint: impl Into<String>) -> Self {
        self.thumbprint = Some(thumbprint.into());
        self
    }

    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    pub(crate) fn with_transport<U: Transport>(self, transport: U) -> Dispatcher<U> {
        Dispatcher {
            transport,
            options: self.options,
            contract: self.contract,
            authorization: self.authorization,
            thumbprint: self.thumbprint,
            credentials: self.credentials,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs `request` to a terminal outcome.
    pub async fn dispatch(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut credential = CredentialState::Anonymous;
        let mut trace = vec![DispatchState::Initial];
        let mut attempts = 0usize;
        let mut retries = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(request, attempts));
            }
            attempts += 1;

            let prepared = PreparedRequest {
                method: request.method.clone(),
                uri: request.uri.clone(),
                body: request.body.clone(),
                credential: AttachedCredential::for_state(
                    &credential,
                    self.authorization.as_deref(),
                ),
                timeout: Duration::from_millis(self.options.timeout_ms),
            };

            let step = match self.transport.send(prepared).await {
                Ok(response) => match self.contract.validate(&request.uri, &response) {
                    Ok(()) => self.classify(request, &credential, retries > 0, response),
                    Err(err) => Step::Fail(err),
                },
                Err(failure) if failure.is_timeout() => Step::Transient {
                    status: None,
                    description: failure.to_string(),
                },
                Err(failure) => Step::Fail(GatewayError::Transport {
                    uri: request.uri.clone(),
                    source: failure.into_source(),
                }),
            };

            match self.settle(request, step, attempts, max_attempts) {
                Next::Finish(mut outcome) => {
                    trace.push(DispatchState::Terminal);
                    let response = outcome.response_mut();
                    response.attempts = attempts;
                    response.retries = retries;
                    response.trace = trace;
                    log_outcome(&outcome);
                    return Ok(outcome);
                }
                Next::Fail(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        uri = %request.uri,
                        attempt = attempts,
                        error = %err,
                        "request failed"
                    );
                    return Err(err);
                }
                Next::Backoff => {
                    retries += 1;
                    trace.push(DispatchState::Retrying);
                    if !self.wait_before_retry(cancel).await {
                        return Err(self.cancelled(request, attempts));
                    }
                }
                Next::Escalate(next, state) => {
                    credential = next;
                    trace.push(state);
                }
            }
        }
    }

    /// Applies the attempt bound and resolves escalation credentials.
    fn settle(
        &self,
        request: &RequestDescriptor,
        step: Step,
        attempts: usize,
        max_attempts: usize,
    ) -> Next {
        match step {
            Step::Finish(outcome) => Next::Finish(outcome),
            Step::Fail(err) => Next::Fail(err),
            Step::Transient {
                status,
                description,
            } => {
                if attempts >= max_attempts {
                    return Next::Fail(GatewayError::AttemptsExhausted {
                        uri: request.uri.clone(),
                        attempts,
                        status: status.map(|status| status.as_u16()),
                        description,
                    });
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    uri = %request.uri,
                    attempt = attempts,
                    status = status.map(|status| status.as_u16()),
                    "operation failed with {description}, retrying after {} ms",
                    self.options.retry_backoff_ms
                );

                Next::Backoff
            }
            Step::EscalateToCertificate { description } => {
                if attempts >= max_attempts {
                    return Next::Fail(self.exhausted(
                        request,
                        attempts,
                        StatusCode::FORBIDDEN,
                        description,
                    ));
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    uri = %request.uri,
                    attempt = attempts,
                    "{description}, retrying with client certificate"
                );

                match self.client_certificate(&request.uri) {
                    Ok(certificate) => Next::Escalate(
                        CredentialState::ClientCertificateAttached(certificate),
                        DispatchState::EscalatingToCertificate,
                    ),
                    Err(err) => Next::Fail(err),
                }
            }
            Step::EscalateToDefaultCredentials { description } => {
                if attempts >= max_attempts {
                    return Next::Fail(self.exhausted(
                        request,
                        attempts,
                        StatusCode::UNAUTHORIZED,
                        description,
                    ));
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    uri = %request.uri,
                    attempt = attempts,
                    "{description}, retrying with integrated credentials"
                );

                match self.negotiate_token(&request.uri) {
                    Ok(token) => Next::Escalate(
                        CredentialState::DefaultCredentialsAttached(token),
                        DispatchState::EscalatingToDefaultCredentials,
                    ),
                    Err(err) => Next::Fail(err),
                }
            }
        }
    }

    fn classify(
        &self,
        request: &RequestDescriptor,
        credential: &CredentialState,
        retried: bool,
        response: RawResponse,
    ) -> Step {
        let status = response.status;
        let description = describe(&response);

        if status == request.expected_status {
            let response = into_gateway_response(request, response, description, false);
            return Step::Finish(if status.is_success() {
                Outcome::Success(response)
            } else {
                Outcome::ExpectedFailure(response)
            });
        }

        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT {
            return Step::Transient {
                status: Some(status),
                description: format!("{} - {description}", status.as_u16()),
            };
        }

        if status == StatusCode::FORBIDDEN
            && credential.is_anonymous()
            && self.thumbprint.is_some()
        {
            return Step::EscalateToCertificate { description };
        }

        if status == StatusCode::UNAUTHORIZED {
            let challenges = challenge_text(&response.headers);
            if !offers_negotiate(&challenges) {
                return Step::Fail(GatewayError::UnsupportedChallenge {
                    uri: request.uri.clone(),
                    status: status.as_u16(),
                    challenge: challenges,
                });
            }
            if credential.is_anonymous() {
                return Step::EscalateToDefaultCredentials { description };
            }
        }

        if retried && request.expected_retry_error_code.as_deref() == Some(description.as_str()) {
            let response = into_gateway_response(request, response, description, true);
            return Step::Finish(Outcome::Success(response));
        }

        Step::Fail(GatewayError::Http {
            uri: request.uri.clone(),
            status: status.as_u16(),
            description,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        })
    }

    fn client_certificate(&self, uri: &str) -> Result<crate::ClientCertificate> {
        let (Some(store), Some(thumbprint)) = (&self.credentials, &self.thumbprint) else {
            return Err(GatewayError::Credential {
                uri: uri.to_owned(),
                message: "no credential store configured for client certificates".to_owned(),
            });
        };
        store
            .client_certificate(thumbprint)
            .map_err(|message| GatewayError::Credential {
                uri: uri.to_owned(),
                message,
            })
    }

    fn negotiate_token(&self, uri: &str) -> Result<String> {
        let Some(store) = &self.credentials else {
            return Err(GatewayError::Credential {
                uri: uri.to_owned(),
                message: "no credential store configured for integrated credentials".to_owned(),
            });
        };
        store
            .negotiate_token(uri)
            .map_err(|message| GatewayError::Credential {
                uri: uri.to_owned(),
                message,
            })
    }

    /// Sleeps the fixed backoff. Returns `false` when cancelled first.
    async fn wait_before_retry(&self, cancel: &CancellationToken) -> bool {
        let delay = Duration::from_millis(self.options.retry_backoff_ms);
        tokio::select! {
            _ = sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }

    fn cancelled(&self, request: &RequestDescriptor, attempts: usize) -> GatewayError {
        GatewayError::Cancelled {
            uri: request.uri.clone(),
            attempts,
        }
    }

    fn exhausted(
        &self,
        request: &RequestDescriptor,
        attempts: usize,
        status: StatusCode,
        description: String,
    ) -> GatewayError {
        GatewayError::AttemptsExhausted {
            uri: request.uri.clone(),
            attempts,
            status: Some(status.as_u16()),
            description,
        }
    }
}

fn into_gateway_response(
    request: &RequestDescriptor,
    response: RawResponse,
    description: String,
    completed_on_retry: bool,
) -> GatewayResponse {
    GatewayResponse {
        uri: request.uri.clone(),
        status: response.status,
        description,
        headers: response.headers,
        body: response.body,
        attempts: 0,
        retries: 0,
        completed_on_retry,
        trace: Vec::new(),
    }
}

#[cfg(feature = "tracing")]
fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::ExpectedFailure(response) => tracing::debug!(
            uri = %response.uri,
            status = response.status.as_u16(),
            "status {} is an expected failure",
            response.status
        ),
        Outcome::Success(response) if response.completed_on_retry => tracing::info!(
            uri = %response.uri,
            description = %response.description,
            "operation completed with tolerated error on retry"
        ),
        Outcome::Success(_) => {}
    }
}

#[cfg(not(feature = "tracing"))]
fn log_outcome(_outcome: &Outcome) {}

/// Non-canonical reason phrase, else the gateway error code, else the canonical reason.
fn describe(response: &RawResponse) -> String {
    if let Some(reason) = response.reason.as_deref().filter(|reason| !reason.is_empty()) {
        return reason.to_owned();
    }
    if !response.status.is_success() {
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&response.body) {
            return envelope.error.code;
        }
    }
    response.status.canonical_reason().unwrap_or("").to_owned()
}

fn challenge_text(headers: &HeaderMap) -> String {
    headers
        .get_all(header::WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ")
}

fn offers_negotiate(challenges: &str) -> bool {
    challenges.split(',').any(|challenge| {
        challenge
            .split_whitespace()
            .next()
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(NEGOTIATE))
    })
}
