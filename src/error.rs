use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds the orchestration callers can branch on.
///
/// These travel inside [`anyhow::Error`] like every other error of the crate, use
/// `err.downcast_ref::<DeviceFarmError>()` to recover the kind.
#[derive(Debug, Error)]
pub enum DeviceFarmError {
    /// Missing or inconsistent settings, detected before any network call.
    #[error("{0}")]
    Configuration(String),

    #[error("No artifacts found using pattern '{pattern}'")]
    NotFound { pattern: String },

    #[error("More than one match found for pattern '{pattern}':{}", format_matches(.matches))]
    Ambiguous {
        pattern: String,
        matches: Vec<PathBuf>,
    },

    #[error("Unknown {context} artifact to upload: {file}")]
    UnsupportedArtifactType { context: &'static str, file: String },

    /// The signed upload URL rejected the payload. Never retried, the URL may be single-use.
    #[error("Upload returned non-2xx response: {status}")]
    UploadTransport { status: u16 },

    #[error("Upload {name} failed, error message from device farm: '{}'", .details.as_deref().unwrap_or("none"))]
    UploadProcessing {
        name: String,
        details: Option<String>,
    },

    #[error("Max devices must be set when using device selection configuration")]
    InvalidDeviceSelection,

    #[error("Interrupted while waiting for {0}")]
    Cancelled(&'static str),
}

fn format_matches(matches: &[PathBuf]) -> String {
    matches
        .iter()
        .map(|path| format!("\n\t{}", path.display()))
        .collect()
}

impl DeviceFarmError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Returns the typed kind carried by `err`, if any.
pub fn error_kind(err: &anyhow::Error) -> Option<&DeviceFarmError> {
    err.downcast_ref::<DeviceFarmError>()
}
