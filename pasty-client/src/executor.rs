//! The request/response pipeline shared by every API call
//!
//! `RequestExecutor::execute` sends one `RequestDescriptor` and turns the
//! outcome into either a parsed JSON `Response` or a `ClientError`. The
//! status classification lives in [`classify_response`] and the transport
//! failure mapping in [`classify_transport_error`]; both are pure so they
//! can be tested without a server.

use serde_json::Value;
use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result, TransportErrorKind};
use crate::request::RequestDescriptor;

/// Error-chain fragments that show up when a TLS client talks to a
/// plain-text server.
const TLS_MISMATCH_SIGNATURES: &[&str] = &[
    "wrong version number",
    "invalidcontenttype",
    "invalid content type",
    "corrupt message",
    "unknown protocol",
    "record overflow",
];

/// Error-chain fragments that mean the peer dropped the connection.
const RESET_SIGNATURES: &[&str] = &[
    "connection reset",
    "connection closed before message completed",
    "broken pipe",
];

pub fn user_agent() -> String {
    format!("PastyClient {} (rust)", env!("CARGO_PKG_VERSION"))
}

/// A successfully classified response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    /// The `payload` field of the envelope
    pub fn payload(&self) -> Result<&Value> {
        self.body
            .get("payload")
            .ok_or_else(|| ClientError::protocol("Response is missing `payload`"))
    }

    /// A named field inside the envelope's `payload`
    pub fn payload_field(&self, field: &str) -> Result<&Value> {
        self.payload()?
            .get(field)
            .ok_or_else(|| ClientError::protocol(format!("Response is missing `payload.{}`", field)))
    }

    pub fn into_payload(mut self) -> Result<Value> {
        match self.body.get_mut("payload") {
            Some(payload) => Ok(payload.take()),
            None => Err(ClientError::protocol("Response is missing `payload`")),
        }
    }

    /// Succeed only when the response arrived with exactly `expected`
    pub fn expect_status(&self, expected: u16) -> Result<bool> {
        if self.status == expected {
            Ok(true)
        } else {
            Err(ClientError::UnexpectedStatus {
                status: self.status,
            })
        }
    }
}

#[derive(Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    user_agent: String,
    api_version: Option<String>,
}

impl RequestExecutor {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());

        if let Some(timeout) = config.timeout_duration() {
            builder = builder.timeout(timeout);
        }

        #[cfg(feature = "danger-accept-invalid-certs")]
        {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| ClientError::usage(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            user_agent: user_agent(),
            api_version: config.api_version.clone(),
        })
    }

    /// Send one request and classify the outcome.
    ///
    /// Every failure, transport or application level, is reported through
    /// the returned `Result` exactly once.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Response> {
        let headers = request.headers(&self.user_agent, self.api_version.as_deref())?;

        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            auth = request.credentials.kind(),
            "Dispatching request"
        );

        let mut builder = self
            .http
            .request(request.method.into(), request.url.clone())
            .headers(headers);
        if request.method.has_body() {
            builder = builder.body(request.payload().to_vec());
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(transport_error)?;
        let body = String::from_utf8_lossy(&bytes);

        let result = classify_response(status, &body);
        match &result {
            Ok(_) => tracing::debug!(status, "Request succeeded"),
            Err(e) => tracing::debug!(status, error = %e, "Request failed"),
        }
        result.map(|body| Response { status, body })
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    let kind = classify_transport_error(&err, err.is_timeout());
    tracing::warn!(error = %err, ?kind, "Transport failure");
    ClientError::transport(kind)
}

/// Map a transport failure onto one of the fixed error classes.
///
/// The whole `source()` chain is inspected: the interesting `io::Error` or
/// TLS error is usually a few levels below the HTTP client's own error.
pub fn classify_transport_error(
    err: &(dyn StdError + 'static),
    is_timeout: bool,
) -> TransportErrorKind {
    if is_timeout {
        return TransportErrorKind::TimedOut;
    }

    let mut io_kind = None;
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_lowercase();
        if TLS_MISMATCH_SIGNATURES.iter().any(|sig| text.contains(sig)) {
            return TransportErrorKind::TlsMismatch;
        }
        if io_kind.is_none() {
            if let Some(io) = e.downcast_ref::<std::io::Error>() {
                io_kind = Some(io.kind());
            } else if RESET_SIGNATURES.iter().any(|sig| text.contains(sig)) {
                io_kind = Some(ErrorKind::ConnectionReset);
            }
        }
        current = e.source();
    }

    match io_kind {
        Some(ErrorKind::ConnectionRefused) => TransportErrorKind::Refused,
        Some(ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe) => {
            TransportErrorKind::Reset
        }
        Some(ErrorKind::TimedOut) => TransportErrorKind::TimedOut,
        _ => TransportErrorKind::Other,
    }
}

/// Classify a completed response by its HTTP status.
///
/// The body must be JSON whatever the status; the envelope shape is only
/// consulted to pull out error details.
pub fn classify_response(status: u16, body: &str) -> Result<Value> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|_| ClientError::protocol(format!("No valid JSON received: {}", body)))?;

    match status {
        200..=206 => Ok(parsed),
        300..=307 => Err(ClientError::protocol("Redirects not supported")),
        400..=418 => Err(api_error(status, &parsed, true, "Resource not found")),
        500..=505 => Err(api_error(status, &parsed, false, "Internal server error")),
        _ => Err(ClientError::protocol(format!(
            "HTTP Status Code {} is not supported",
            status
        ))),
    }
}

/// Pull `{code, message}` out of an error body.
///
/// Accepted shapes: `{"error": {"code", "message"}}`, `{"error": "message"}`
/// and, when `allow_flat` is set, `{"code", "message"}` at the top level.
fn api_error(status: u16, body: &Value, allow_flat: bool, fallback: &str) -> ClientError {
    let (code, message) = match body.get("error") {
        Some(Value::Object(error)) => (
            error_code(error.get("code")),
            error.get("message").and_then(Value::as_str),
        ),
        Some(Value::String(message)) => (None, Some(message.as_str())),
        _ if allow_flat => match body.get("message").and_then(Value::as_str) {
            Some(message) => (error_code(body.get("code")), Some(message)),
            None => (None, None),
        },
        _ => (None, None),
    };

    ClientError::Api {
        status,
        code: code.unwrap_or(status),
        message: message.unwrap_or(fallback).to_string(),
    }
}

fn error_code(value: Option<&Value>) -> Option<u16> {
    value
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
}
