//! Account and billing checks, or reuse of the active CLI configuration

use super::Outcome;
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::progress;
use crate::state::ProvisioningState;

/// Log in, then require an active account and at least one billing account
pub async fn authenticate(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    ctx.gcloud.login().await?;

    let accounts = ctx.gcloud.list_accounts().await?;
    let active = accounts
        .into_iter()
        .find(|account| account.is_active())
        .ok_or(ProvisionError::NoActiveAccount)?;
    progress::detail(&format!("account {} is active", active.account));
    state.project.account = active.account;

    let billing = ctx.gcloud.list_billing_accounts().await?;
    if billing.is_empty() {
        return Err(ProvisionError::NoBillingAccount);
    }
    progress::detail("billing is set");

    Ok(Outcome::done(format!("signed in as {}", state.project.account)))
}

/// Bind the project of the already active configuration
pub async fn use_active_configuration(
    ctx: &Context,
    state: &mut ProvisioningState,
) -> Result<Outcome> {
    let configurations = ctx.gcloud.list_configurations().await?;
    let active = configurations
        .into_iter()
        .find(|config| config.is_active)
        .ok_or(ProvisionError::NoActiveConfiguration)?;

    let project_id = active.properties.core.project.clone().ok_or_else(|| {
        ProvisionError::InvalidState(format!(
            "configuration {} has no project set",
            active.name
        ))
    })?;
    progress::detail(&format!("fetching {}", project_id));

    let projects = ctx.gcloud.list_projects().await?;
    let project = projects
        .into_iter()
        .find(|project| project.project_id == project_id)
        .ok_or_else(|| ProvisionError::ProjectNotFound(project_id.clone()))?;

    state.configuration = Some(active.name);
    state.project.id = project.project_id;
    state.project.display_name = project.name;
    state.project.number = project.project_number;
    if let Some(account) = active.properties.core.account {
        state.project.account = account;
    }

    Ok(Outcome::done(format!("using {}", state.project.display_name)))
}
