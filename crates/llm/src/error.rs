use thiserror::Error;

/// Failures raised by a text-generation collaborator. None of these are
/// recovered inside the turn executors; they abort the turn in progress.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The model endpoint could not be reached at all.
    #[error("model endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with a non-success status.
    #[error("model request failed: {0}")]
    Api(String),

    /// The endpoint answered with a payload we could not decode.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}
