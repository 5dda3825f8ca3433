//! Error taxonomy for the message viewer.

use thiserror::Error;

use crate::models::MessageId;

/// Failures reported by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The principal may not perform the request (HTTP 401/403).
    #[error("authorization failed (status {status})")]
    Authorization { status: u16 },

    /// Network failure or a non-authorization error status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be interpreted.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl ApiError {
    pub const FORBIDDEN: u16 = 403;

    /// HTTP status carried by an authorization failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authorization { status } => Some(*status),
            _ => None,
        }
    }

    /// Only a 403 triggers the header downgrade.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(Self::FORBIDDEN)
    }
}

/// Content that cannot be turned into a structured preview.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content type: {0}")]
    UnsupportedFormat(String),

    #[error("malformed {mime_type} content: {source}")]
    Malformed {
        mime_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{mime_type} content is not a JSON {expected}")]
    UnexpectedShape {
        mime_type: String,
        expected: &'static str,
    },
}

/// The only error the viewer surfaces to the external error handler.
#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    #[error("failed to load message {message_id}: {source}")]
    Fetch {
        message_id: MessageId,
        #[source]
        source: ApiError,
    },
}

impl ViewerError {
    pub fn fetch(message_id: MessageId, source: ApiError) -> Self {
        Self::Fetch { message_id, source }
    }

    /// The underlying API failure.
    pub fn api_error(&self) -> &ApiError {
        match self {
            Self::Fetch { source, .. } => source,
        }
    }
}

/// Convenience alias for `Result<T, ViewerError>`.
pub type Result<T> = std::result::Result<T, ViewerError>;
