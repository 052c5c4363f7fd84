use shared::error::{ApiError, FailureKind};
use thiserror::Error;

use crate::voice::CaptureError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}: {detail}")]
    Status {
        endpoint: &'static str,
        status: u16,
        detail: String,
    },
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
    #[error("microphone: {0}")]
    Capture(#[from] CaptureError),
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::InvalidUrl(_)
            | ClientError::Transport(_)
            | ClientError::Status { .. }
            | ClientError::Decode { .. } => FailureKind::Transport,
            ClientError::Validation(_) => FailureKind::Validation,
            ClientError::Capture(_) => FailureKind::Device,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.kind(), self.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
