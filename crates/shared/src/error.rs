use serde::{Deserialize, Serialize};

/// How a failed attempt is surfaced. None of these are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Microphone permission or device problems during acquisition.
    Device,
    /// Request never completed, or the server answered non-2xx.
    Transport,
    /// The voice service answered but reported a logical failure.
    Service,
    /// Rejected locally before any request was issued.
    Validation,
}

/// Error body shape returned by the list server on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
