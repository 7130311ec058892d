//! Security header contract checked on every gateway response.

use reqwest::header::{self, HeaderMap};

use crate::{transport::RawResponse, GatewayError, Result};

pub const NOSNIFF: &str = "nosniff";

/// Expected security headers for one client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderContract {
    expected_hsts: String,
}

impl HeaderContract {
    /// `expected_hsts` must match `Strict-Transport-Security` exactly; an
    /// empty value means the header must be absent or empty.
    pub fn new(expected_hsts: impl Into<String>) -> Self {
        Self {
            expected_hsts: expected_hsts.into(),
        }
    }

    pub fn expected_hsts(&self) -> &str {
        &self.expected_hsts
    }

    /// Checks a response regardless of its status code.
    pub fn validate(&self, uri: &str, response: &RawResponse) -> Result<()> {
        let headers = &response.headers;

        let has_content_type = !header_text(headers, &header::CONTENT_TYPE).is_empty();
        let content_options = header_text(headers, &header::X_CONTENT_TYPE_OPTIONS);
        if has_content_type && content_options != NOSNIFF {
            return Err(GatewayError::HeaderContractViolation {
                uri: uri.to_owned(),
                status: response.status.as_u16(),
                header: "X-Content-Type-Options",
                expected: NOSNIFF.to_owned(),
                actual: content_options.to_owned(),
            });
        }

        let hsts = header_text(headers, &header::STRICT_TRANSPORT_SECURITY);
        if hsts != self.expected_hsts {
            return Err(GatewayError::HeaderContractViolation {
                uri: uri.to_owned(),
                status: response.status.as_u16(),
                header: "Strict-Transport-Security",
                expected: self.expected_hsts.clone(),
                actual: hsts.to_owned(),
            });
        }

        Ok(())
    }
}

/// Header value as text; absent or non-ASCII values read as empty.
fn header_text<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}
