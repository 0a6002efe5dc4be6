use thiserror::Error;

pub const MISSING_HISTORY_MESSAGE: &str = "No message history provided";
pub const INVALID_REQUEST_MESSAGE: &str = "The request body could not be parsed.";
pub const PROCESSING_FAILURE_MESSAGE: &str = "An error occurred while processing the request.";

/// Error as seen by the transport layer. The `message` is internal detail for
/// logs; callers only ever receive [`InterfaceError::user_message`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("missing history: {message}")]
    MissingHistory { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn missing_history(correlation_id: impl Into<String>) -> Self {
        Self::MissingHistory {
            message: "message history is empty".to_string(),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn internal(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingHistory { .. } => MISSING_HISTORY_MESSAGE,
            Self::BadRequest { .. } => INVALID_REQUEST_MESSAGE,
            Self::Internal { .. } => PROCESSING_FAILURE_MESSAGE,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingHistory { .. } | Self::BadRequest { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::MissingHistory { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}
