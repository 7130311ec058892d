/// Boxed error carried across the transport seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type returned by this crate.
///
/// Every variant is terminal for the call that produced it: the dispatcher
/// never retries after returning one of these.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Caller-supplied input cannot be used (empty endpoint pool, bad index, malformed URI).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Client configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),
    /// Network failure that is not a timeout.
    #[error("transport error for {uri}: {source}")]
    Transport {
        uri: String,
        #[source]
        source: BoxError,
    },
    /// A response broke the security header contract.
    #[error(
        "{uri} returned {status} without {header}: {expected}, actual header value = '{actual}'"
    )]
    HeaderContractViolation {
        uri: String,
        status: u16,
        header: &'static str,
        expected: String,
        actual: String,
    },
    /// Unclassified HTTP status.
    #[error("{uri} failed with {status}-{description}")]
    Http {
        uri: String,
        status: u16,
        description: String,
        body: String,
    },
    /// Attempt bound reached while the failure was still retryable.
    #[error("{uri} failed after {attempts} attempts; last failure: {description}")]
    AttemptsExhausted {
        uri: String,
        attempts: usize,
        /// `None` when the last attempt ended in a transport timeout.
        status: Option<u16>,
        description: String,
    },
    /// 401 whose `WWW-Authenticate` challenge cannot be answered.
    #[error("{uri} returned {status} with unsupported authentication challenge '{challenge}'")]
    UnsupportedChallenge {
        uri: String,
        status: u16,
        challenge: String,
    },
    /// Credential lookup for an escalation failed.
    #[error("credential error for {uri}: {message}")]
    Credential { uri: String, message: String },
    /// The dispatch was cancelled before reaching a terminal outcome.
    #[error("{uri} was cancelled after {attempts} attempts")]
    Cancelled { uri: String, attempts: usize },
    /// Request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
    /// Response decoding or shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// HTTP status of the final response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HeaderContractViolation { status, .. }
            | Self::Http { status, .. }
            | Self::UnsupportedChallenge { status, .. } => Some(*status),
            Self::AttemptsExhausted { status, .. } => *status,
            _ => None,
        }
    }
}
