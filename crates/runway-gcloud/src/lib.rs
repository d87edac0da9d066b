//! gcloud CLI integration for Runway
//!
//! This crate is the only place where Runway talks to Google Cloud. It runs
//! the `gcloud` binary through a [`CommandRunner`], requests JSON output and
//! decodes it into typed schemas.
//!
//! # Requirements
//!
//! - `gcloud` (Google Cloud SDK) must be installed and on the PATH
//! - Authentication is managed through gcloud configurations
//!
//! # Example
//!
//! ```ignore
//! use runway_gcloud::{Gcloud, ProcessRunner};
//! use std::sync::Arc;
//!
//! let gcloud = Gcloud::new(Arc::new(ProcessRunner::new()));
//! gcloud.check_installed().await?;
//!
//! for project in gcloud.list_projects().await? {
//!     println!("{} ({})", project.name, project.project_id);
//! }
//! ```

pub mod error;
pub mod gcloud;
pub mod models;
pub mod runner;

pub use error::{GcloudError, Result};
pub use gcloud::{
    Gcloud, SECRET_ACCESSOR_ROLE, cloudbuild_service_account, cloudbuild_service_agent,
    compute_service_account, service_account_member,
};
pub use models::{
    Account, Backend, BillingAccount, CliProperties, ComputeCollection, ComputeResource,
    Configuration, Connection, CreateSqlInstanceConfig, CreateTriggerConfig, Describe, Project,
    Repository, RepositoryEventConfig, ResourceDescriptor, Secret, Service, SqlDatabase,
    SqlInstance, Trigger, short_name,
};
pub use runner::{CommandOutput, CommandRunner, ExecOptions, ProcessRunner, display_command};
