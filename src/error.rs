use crate::config::ConfigError;

/// Pipeline error type used across all modules.
///
/// Content problems (malformed framing, broken attachment tags, unterminated
/// blocks) never surface here; they degrade to visible text instead. Only
/// caller misuse and collaborator failures are errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task error: {0}")]
    Task(String),
}

/// Broad error category, used by the CLI to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Misuse,
    Collaborator,
}

impl PipelineError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Config(_) => ErrorCategory::Misuse,
            PipelineError::Io(_) | PipelineError::Json(_) | PipelineError::Task(_) => {
                ErrorCategory::Collaborator
            }
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Misuse => 2,
            ErrorCategory::Collaborator => 1,
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Task(err.to_string())
    }
}
