//! Error types for sweepd.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Not-found errors
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Cloud account not found: {0}")]
    CloudAccountNotFound(String),

    #[error("Scheduled job not found: {0}")]
    JobNotFound(String),

    // Scheduling errors
    #[error("Scheduled job already exists: {0}")]
    DuplicateJob(String),

    #[error("Invalid schedule expression '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    // Validation errors
    #[error("Pipeline has no policies attached")]
    NoPolicies,

    #[error("Authentication Failed")]
    AuthenticationFailed,

    #[error("Run already in progress for pipeline: {0}")]
    RunInProgress(String),

    // Execution errors
    #[error("Policy engine execution failed: {0}")]
    Execution(String),

    #[error("Unparseable policy engine output: {0}")]
    OutputParse(String),

    // Infrastructure errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP-style status code for errors surfaced synchronously by the
    /// run submission path.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::PipelineNotFound(_)
            | Error::PolicyNotFound(_)
            | Error::CloudAccountNotFound(_)
            | Error::JobNotFound(_) => 404,
            Error::NoPolicies
            | Error::AuthenticationFailed
            | Error::RunInProgress(_)
            | Error::DuplicateJob(_) => 409,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(Error::PipelineNotFound("x".into()).http_status(), 404);
        assert_eq!(Error::NoPolicies.http_status(), 409);
        assert_eq!(Error::AuthenticationFailed.http_status(), 409);
        assert_eq!(Error::Persistence("down".into()).http_status(), 500);
    }
}
