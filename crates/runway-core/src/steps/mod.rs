//! Pipeline steps
//!
//! One module per concern. Each step takes the shared [`Context`] and the
//! run's [`ProvisioningState`] and reports an [`Outcome`] for the step logger.
//!
//! [`Context`]: crate::context::Context
//! [`ProvisioningState`]: crate::state::ProvisioningState

pub mod apis;
pub mod auth;
pub mod build_trigger;
pub mod database;
pub mod deploy;
pub mod load_balancer;
pub mod preflight;
pub mod project;
pub mod secrets;

/// How a step ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(Option<String>),
    Skipped(String),
}

impl Outcome {
    pub fn done(message: impl Into<String>) -> Self {
        Self::Done(Some(message.into()))
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }
}
