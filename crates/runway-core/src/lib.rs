//! Runway provisioning core
//!
//! Drives `gcloud` through an ordered pipeline of select-or-create steps that
//! set up a project for a containerized backend on Cloud Run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    runway CLI                    │
//! │          (clap, inquire prompter, report)        │
//! └────────────────────────┬─────────────────────────┘
//!                          │
//! ┌────────────────────────▼─────────────────────────┐
//! │                   runway-core                    │
//! │  ┌──────────┐  ┌──────────┐  ┌───────────────┐   │
//! │  │ Pipeline │─▶│  Steps   │─▶│   Selector    │   │
//! │  └──────────┘  └────┬─────┘  └───────────────┘   │
//! │  ┌──────────────┐   │   ┌───────────────────┐    │
//! │  │ Environment  │◀──┴──▶│ ProvisioningState │    │
//! │  └──────────────┘       └───────────────────┘    │
//! └────────────────────────┬─────────────────────────┘
//!                          │
//! ┌────────────────────────▼─────────────────────────┐
//! │           runway-gcloud (CommandRunner)          │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod environment;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod selector;
pub mod state;
pub mod steps;

#[cfg(test)]
mod testing;

// Re-exports
pub use context::Context;
pub use environment::{
    EnvironmentEntry, KeywordClassifier, ProductionDefaults, SECRET_KEYWORDS, SecretPredicate,
    TemplateEntry, parse_template,
};
pub use error::{ProvisionError, Result};
pub use pipeline::{Action, Pipeline, RunOptions, RunOutcome, Step};
pub use progress::{StepLogger, StepResult};
pub use prompt::Prompter;
pub use report::{Report, Section};
pub use selector::{ResourceKind, Selection, select_or_create};
pub use state::{
    DatabaseState, EnvVar, LoadBalancerState, ProjectState, ProvisioningState, TriggerState,
};
pub use steps::Outcome;
