use thiserror::Error;

/// Errors surfaced by the dispatch layer.
///
/// Absence of a job is deliberately not represented here: a status query for
/// a job the backend no longer knows returns an empty map instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A spawned process exited non-zero without `permit_nonzero`.
    #[error("execution of '{command}' exited with non-zero return code ({code}): {output}")]
    Execution {
        command: String,
        code: i32,
        output: String,
    },

    /// The child was terminated because the caller was interrupted.
    #[error("execution of '{0}' was interrupted")]
    Interrupted(String),

    /// A scheduler client replied with text we cannot make sense of.
    #[error("unexpected scheduler output: {0}")]
    UnexpectedOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
