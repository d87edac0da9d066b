//! CLI configuration and project selection

use super::Outcome;
use crate::context::Context;
use crate::error::Result;
use crate::progress;
use crate::selector::{ResourceKind, Selection, select_or_create};
use crate::state::ProvisioningState;
use async_trait::async_trait;
use runway_gcloud::{CliProperties, Configuration, Project};

const DEFAULT_PROJECT_NAME: &str = "Story App";

/// Project id suggested for a display name: lowercase, spaces to hyphens
pub fn project_id_for(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn prompt_name_and_id(ctx: &Context, state: &ProvisioningState) -> Result<(String, String)> {
    let default_name = if state.project.display_name.is_empty() {
        DEFAULT_PROJECT_NAME
    } else {
        state.project.display_name.as_str()
    };
    let name = ctx.prompter.text("Project name", Some(default_name))?;

    let default_id = if state.project.id.is_empty() {
        project_id_for(&name)
    } else {
        state.project.id.clone()
    };
    let id = ctx
        .prompter
        .text("Project id (6-30 characters)", Some(default_id.as_str()))?;
    Ok((name, id))
}

pub struct ConfigurationKind;

#[async_trait]
impl ResourceKind for ConfigurationKind {
    type Item = Configuration;

    fn noun(&self) -> &'static str {
        "configuration"
    }

    async fn list(
        &self,
        ctx: &Context,
        _state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<Configuration>> {
        ctx.gcloud.list_configurations().await
    }

    async fn create(
        &self,
        ctx: &Context,
        state: &mut ProvisioningState,
    ) -> Result<Option<Configuration>> {
        let (name, id) = prompt_name_and_id(ctx, state)?;

        ctx.gcloud.create_configuration(&id).await?;
        ctx.gcloud.activate_configuration(&id).await?;

        // carried over as defaults for project creation
        state.project.display_name = name;
        state.project.id = id.clone();

        Ok(Some(Configuration {
            name: id,
            is_active: true,
            properties: CliProperties::default(),
        }))
    }

    fn bind(&self, item: &Configuration, state: &mut ProvisioningState) -> Result<()> {
        state.configuration = Some(item.name.clone());
        Ok(())
    }
}

pub struct ProjectKind;

#[async_trait]
impl ResourceKind for ProjectKind {
    type Item = Project;

    fn noun(&self) -> &'static str {
        "project"
    }

    async fn list(
        &self,
        ctx: &Context,
        _state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<Project>> {
        ctx.gcloud.list_projects().await
    }

    async fn create(&self, ctx: &Context, state: &mut ProvisioningState) -> Result<Option<Project>> {
        let (name, id) = prompt_name_and_id(ctx, state)?;
        let project = ctx.gcloud.create_project(&id, &name).await?;
        Ok(Some(project))
    }

    fn bind(&self, item: &Project, state: &mut ProvisioningState) -> Result<()> {
        state.project.id = item.project_id.clone();
        state.project.display_name = item.name.clone();
        state.project.number = item.project_number.clone();
        Ok(())
    }
}

/// Select or create the CLI configuration; an existing one is activated
pub async fn select_configuration(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    let selection = select_or_create(&ConfigurationKind, ctx, state).await?;
    match selection {
        Selection::Existing(config) => {
            ctx.gcloud.activate_configuration(&config.name).await?;
            Ok(Outcome::done(format!("activated {}", config.name)))
        }
        Selection::Created(config) => Ok(Outcome::done(format!("created {}", config.name))),
        Selection::Skipped => Ok(Outcome::skipped("no configuration chosen")),
    }
}

/// Select or create the project, then align the CLI properties with it
pub async fn select_project(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    let selection = select_or_create(&ProjectKind, ctx, state).await?;
    let verb = if selection.is_created() { "created" } else { "using" };

    let changed = reconcile_properties(ctx, state).await?;
    Ok(Outcome::done(format!(
        "{} {} ({} properties updated)",
        verb, state.project.id, changed
    )))
}

/// Set every CLI property that differs from the run's project, account, region and zone
pub async fn reconcile_properties(ctx: &Context, state: &ProvisioningState) -> Result<usize> {
    let active = ctx.gcloud.properties().await?;

    let wanted = [
        ("project", active.core.project.as_deref(), state.project.id.as_str()),
        ("account", active.core.account.as_deref(), state.project.account.as_str()),
        ("compute/region", active.compute.region.as_deref(), state.region.as_str()),
        ("compute/zone", active.compute.zone.as_deref(), state.zone.as_str()),
    ];

    let mut changed = 0;
    for (key, current, value) in wanted {
        if value.is_empty() || current == Some(value) {
            continue;
        }
        ctx.gcloud.set_property(key, value).await?;
        progress::detail(&format!("{} set to {}", key, value));
        changed += 1;
    }
    Ok(changed)
}
