//! gcloud wrapper error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcloudError {
    #[error("gcloud not found. Please install the Google Cloud SDK: https://cloud.google.com/sdk/docs/install")]
    NotInstalled,

    #[error("`{command}` exited with code {exit_code}: {stderr}")]
    ExecutionFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {source}")]
    MalformedResponse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GcloudError {
    /// True when the external process ran and returned a nonzero exit code
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, GcloudError::ExecutionFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, GcloudError>;
