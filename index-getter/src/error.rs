#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("User defines no task with a positive weight")]
    NoTasks,

    #[error("Executor failed: {0}")]
    Executor(String),

    #[error("Worker did not finish: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Unable to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
