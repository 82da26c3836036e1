use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistributeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid commit id '{0}': expected 40 hexadecimal digits")]
    InvalidCommitId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source branch '{0}' not found on the remote")]
    BranchNotFound(String),

    #[error("Tracked branch '{0}' not found on the remote")]
    TrackedBranchNotFound(String),

    #[error("Commit {commit} not found in branch '{branch}'")]
    CommitNotFound { commit: String, branch: String },

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DistributeError {
    /// Process exit code for a run that failed before producing a report
    pub fn exit_code(&self) -> i32 {
        match self {
            DistributeError::InvalidRequest(_)
            | DistributeError::InvalidCommitId(_)
            | DistributeError::Config(_) => 2,
            DistributeError::BranchNotFound(_)
            | DistributeError::TrackedBranchNotFound(_)
            | DistributeError::CommitNotFound { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DistributeError>;
