use std::fmt;
use thiserror::Error;

pub type ScrapResult<T> = Result<T, ScrapError>;

/// Which side of a swap a mint was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    Input,
    Output,
}

impl fmt::Display for SwapSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapSide::Input => f.write_str("input"),
            SwapSide::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrapError {
    /// `url` and `message` are for logs only; they can carry credentials.
    #[error("upstream request failed")]
    Transport { url: String, message: String },

    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("{side} token {mint} not supported, please change")]
    UnsupportedToken { side: SwapSide, mint: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ScrapError {
    pub fn decode(what: impl Into<String>, err: impl fmt::Display) -> Self {
        ScrapError::Decode {
            what: what.into(),
            message: err.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ScrapError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ScrapError::NotFound(message.into())
    }

    /// Machine-readable error kind exposed to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapError::Transport { .. } => "TRANSPORT_FAILURE",
            ScrapError::UpstreamStatus { .. } | ScrapError::Rpc { .. } => {
                "UPSTREAM_STATUS_FAILURE"
            }
            ScrapError::Decode { .. } => "DECODE_FAILURE",
            ScrapError::UnsupportedToken { .. } | ScrapError::Validation(_) => {
                "VALIDATION_FAILURE"
            }
            ScrapError::NotFound(_) => "NOT_FOUND",
            ScrapError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ScrapError::Transport { .. }
            | ScrapError::UpstreamStatus { .. }
            | ScrapError::Rpc { .. }
            | ScrapError::Decode { .. } => 502,
            ScrapError::UnsupportedToken { .. } | ScrapError::Validation(_) => 400,
            ScrapError::NotFound(_) => 404,
            ScrapError::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for ScrapError {
    fn from(error: sqlx::Error) -> Self {
        ScrapError::Internal(format!("database error: {error}"))
    }
}

impl From<tokio::task::JoinError> for ScrapError {
    fn from(error: tokio::task::JoinError) -> Self {
        ScrapError::Internal(format!("worker task failed: {error}"))
    }
}
