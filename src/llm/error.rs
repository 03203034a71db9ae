use thiserror::Error;

/// Failures talking to the model endpoint. Any of these aborts the current turn.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse model response: {0}")]
    Parse(String),

    #[error("model response contained no choices")]
    NoChoices,
}
