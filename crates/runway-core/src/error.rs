//! Provisioning error types

use runway_gcloud::GcloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Local requirement missing; raised before any cloud mutation
    #[error("{0}")]
    PreconditionMissing(String),

    /// `ExecutionFailed` and `MalformedResponse` from gcloud
    #[error(transparent)]
    Gcloud(#[from] GcloudError),

    #[error("No active account found. Please log in with gcloud.")]
    NoActiveAccount,

    #[error("No billing account found. Please set up billing for your account.")]
    NoBillingAccount,

    #[error("No active gcloud configuration found.")]
    NoActiveConfiguration,

    #[error("Project {0} is not visible to the active account.")]
    ProjectNotFound(String),

    #[error("Invalid provisioning state: {0}")]
    InvalidState(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Settings error: {0}")]
    Config(#[from] runway_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
