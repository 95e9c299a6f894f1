use thiserror::Error;

/// Status reported for failures that never produced a usable HTTP answer.
pub const LOCAL_FAILURE_CODE: u16 = 500;

/// Status reported for caller-contract violations.
pub const USAGE_ERROR_CODE: u16 = 400;

/// Class of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Refused,
    Reset,
    TimedOut,
    /// The remote answered a TLS handshake with something that is not TLS.
    TlsMismatch,
    Other,
}

impl TransportErrorKind {
    /// Human-readable message reported for this class of failure.
    pub fn message(self) -> &'static str {
        match self {
            TransportErrorKind::Refused => "Remote server refused the connection",
            TransportErrorKind::Reset => "Remote server hung up on us",
            TransportErrorKind::TimedOut => "Connection to remote server timed out",
            TransportErrorKind::TlsMismatch => "remote does not speak TLS",
            TransportErrorKind::Other => "Unknown transport error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Structured error reported by the server. `status` is the HTTP status
    /// the response arrived with, `code` the code the server put in the body
    /// (or the status when the body carried none).
    #[error("Server returned error: {code} - {message}")]
    Api {
        status: u16,
        code: u16,
        message: String,
    },

    #[error("Unexpected success status: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Usage error: {0}")]
    Usage(String),
}

impl ClientError {
    pub(crate) fn transport(kind: TransportErrorKind) -> Self {
        ClientError::Transport {
            kind,
            message: kind.message().to_string(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        ClientError::Usage(message.into())
    }

    /// The HTTP-style code of this error.
    ///
    /// Local failures (transport, protocol) report 500, structured server
    /// errors report the code the server provided.
    pub fn http_code(&self) -> u16 {
        match self {
            ClientError::Transport { .. } | ClientError::Protocol { .. } => LOCAL_FAILURE_CODE,
            ClientError::Api { code, .. } => *code,
            ClientError::UnexpectedStatus { status } => *status,
            ClientError::Usage(_) => USAGE_ERROR_CODE,
        }
    }

    /// The human-readable message of this error, without the category prefix.
    pub fn message(&self) -> String {
        match self {
            ClientError::Transport { message, .. }
            | ClientError::Protocol { message }
            | ClientError::Api { message, .. } => message.clone(),
            ClientError::UnexpectedStatus { status } => {
                format!("Unexpected HTTP status {}", status)
            }
            ClientError::Usage(message) => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
