//! Cloud Build trigger: host connection, linked repository, trigger

use super::Outcome;
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::progress;
use crate::selector::{ResourceKind, select_or_create};
use crate::state::{ProvisioningState, TriggerState};
use async_trait::async_trait;
use runway_gcloud::{
    Connection, CreateTriggerConfig, Repository, SECRET_ACCESSOR_ROLE, Trigger,
    cloudbuild_service_account, cloudbuild_service_agent, service_account_member,
};

/// Event a trigger fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Branch,
    Tag,
    PullRequest,
}

impl TriggerEvent {
    pub const ALL: [TriggerEvent; 3] = [Self::Branch, Self::Tag, Self::PullRequest];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Branch => "Push to a branch",
            Self::Tag => "Push a new tag",
            Self::PullRequest => "Pull request",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Self::Branch => "--branch-pattern",
            Self::Tag => "--tag-pattern",
            Self::PullRequest => "--pull-request-pattern",
        }
    }

    pub fn default_pattern(&self) -> &'static str {
        match self {
            Self::Branch | Self::PullRequest => "^main$",
            Self::Tag => "^v.*$",
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Tag => write!(f, "tag"),
            Self::PullRequest => write!(f, "pull-request"),
        }
    }
}

fn trigger_state(state: &mut ProvisioningState) -> &mut TriggerState {
    state.build_trigger.get_or_insert_with(TriggerState::default)
}

fn require(value: Option<&str>, what: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| ProvisionError::InvalidState(format!("no {} selected", what)))
}

/// Repository name suggested for a remote URI
///
/// `https://github.com/acme/story-api.git` -> `story-api`
pub fn repository_name_for(remote_uri: &str) -> String {
    let last = remote_uri
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(remote_uri);
    last.trim_end_matches(".git").to_string()
}

pub struct ConnectionKind;

#[async_trait]
impl ResourceKind for ConnectionKind {
    type Item = Connection;

    fn noun(&self) -> &'static str {
        "connection"
    }

    async fn list(
        &self,
        ctx: &Context,
        state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<Connection>> {
        ctx.gcloud.list_connections(&state.region).await
    }

    async fn create(
        &self,
        ctx: &Context,
        state: &mut ProvisioningState,
    ) -> Result<Option<Connection>> {
        let project = &state.project;

        // the service agent stores the host token as a secret
        ctx.gcloud
            .add_project_iam_binding(
                &project.id,
                &service_account_member(&cloudbuild_service_agent(&project.number)),
                "roles/secretmanager.admin",
            )
            .await?;
        progress::detail("access granted to store the connection token");

        let builder = service_account_member(&cloudbuild_service_account(&project.number));
        for role in ["roles/cloudsql.client", SECRET_ACCESSOR_ROLE] {
            ctx.gcloud
                .add_project_iam_binding(&project.id, &builder, role)
                .await?;
        }
        progress::detail("access granted to read secrets and migrate the database");

        let name = ctx.prompter.text(
            "Connection name",
            Some(ctx.settings.build.connection.as_str()),
        )?;
        let connection = ctx
            .gcloud
            .create_connection(&ctx.settings.build.platform, &name, &project.id, &state.region)
            .await?;
        Ok(Some(connection))
    }

    fn bind(&self, item: &Connection, state: &mut ProvisioningState) -> Result<()> {
        if !item.is_ready() {
            tracing::warn!(
                "Connection {} is not fully installed; finish the app installation in the console",
                item.id()
            );
        }
        let trigger = trigger_state(state);
        trigger.connection = item.id().to_string();
        trigger.repository.clear();
        Ok(())
    }
}

pub struct RepositoryKind;

#[async_trait]
impl ResourceKind for RepositoryKind {
    type Item = Repository;

    fn noun(&self) -> &'static str {
        "repository"
    }

    async fn list(
        &self,
        ctx: &Context,
        state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<Repository>> {
        match state.build_trigger.as_ref().map(|t| t.connection.as_str()) {
            Some(connection) if !connection.is_empty() => {
                ctx.gcloud
                    .list_repositories(connection, &state.region)
                    .await
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn create(
        &self,
        ctx: &Context,
        state: &mut ProvisioningState,
    ) -> Result<Option<Repository>> {
        let connection = require(
            state.build_trigger.as_ref().map(|t| t.connection.as_str()),
            "connection",
        )?;

        let remote_uri = ctx
            .prompter
            .text("Repository URL (https://github.com/<owner>/<repo>.git)", None)?;
        let name = ctx
            .prompter
            .text("Repository name", Some(repository_name_for(&remote_uri).as_str()))?;

        let repository = ctx
            .gcloud
            .create_repository(&name, &remote_uri, &connection, &state.region)
            .await?;
        Ok(Some(repository))
    }

    fn bind(&self, item: &Repository, state: &mut ProvisioningState) -> Result<()> {
        trigger_state(state).repository = item.name.clone();
        Ok(())
    }
}

pub struct TriggerKind;

#[async_trait]
impl ResourceKind for TriggerKind {
    type Item = Trigger;

    fn noun(&self) -> &'static str {
        "trigger"
    }

    async fn list(
        &self,
        ctx: &Context,
        state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<Trigger>> {
        let repository = state
            .build_trigger
            .as_ref()
            .map(|t| t.repository.as_str())
            .unwrap_or_default();
        let triggers = ctx.gcloud.list_triggers(&state.region).await?;
        Ok(triggers
            .into_iter()
            .filter(|trigger| trigger.repository() == Some(repository))
            .collect())
    }

    async fn create(&self, ctx: &Context, state: &mut ProvisioningState) -> Result<Option<Trigger>> {
        let repository = require(
            state.build_trigger.as_ref().map(|t| t.repository.as_str()),
            "repository",
        )?;

        let labels: Vec<String> = TriggerEvent::ALL
            .iter()
            .map(|event| event.label().to_string())
            .collect();
        let choice = ctx.prompter.select("Trigger on", &labels)?;
        let event = TriggerEvent::ALL.get(choice).copied().ok_or_else(|| {
            ProvisionError::Prompt(format!("selection {} is out of range", choice))
        })?;

        let default_name = format!("deploy-{}", event);
        let name = ctx
            .prompter
            .text("Trigger name", Some(default_name.as_str()))?;
        let pattern = ctx
            .prompter
            .text("Pattern", Some(event.default_pattern()))?;
        let build_config = ctx.prompter.text(
            "Build config file",
            Some(ctx.settings.build.config_file.as_str()),
        )?;

        let trigger = ctx
            .gcloud
            .create_trigger(&CreateTriggerConfig {
                name,
                repository,
                event_flag: event.flag().to_string(),
                pattern,
                build_config,
                region: state.region.clone(),
            })
            .await?;

        trigger_state(state).event = Some(event.to_string());
        Ok(Some(trigger))
    }

    fn bind(&self, item: &Trigger, state: &mut ProvisioningState) -> Result<()> {
        trigger_state(state).name = item.name.clone();
        Ok(())
    }
}

pub async fn create_build_trigger(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    if select_or_create(&ConnectionKind, ctx, state).await?.is_skipped() {
        return Ok(Outcome::skipped("no connection"));
    }
    if select_or_create(&RepositoryKind, ctx, state).await?.is_skipped() {
        return Ok(Outcome::skipped("no repository"));
    }
    let selection = select_or_create(&TriggerKind, ctx, state).await?;
    let verb = if selection.is_created() { "created" } else { "using" };

    let trigger = trigger_state(state);
    Ok(Outcome::done(format!(
        "{} trigger {} on {}",
        verb, trigger.name, trigger.repository
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Answer, FakeRunner, ScriptedPrompter, bound_state, context};

    const CONNECTION: &str = r#"{
        "name": "projects/story-app/locations/europe-west1/connections/github",
        "installationState": {"stage": "COMPLETE"}
    }"#;

    const REPOSITORY: &str = r#"{
        "name": "projects/story-app/locations/europe-west1/connections/github/repositories/story-api",
        "remoteUri": "https://github.com/acme/story-api.git"
    }"#;

    #[test]
    fn test_repository_name_for() {
        assert_eq!(
            repository_name_for("https://github.com/acme/story-api.git"),
            "story-api"
        );
        assert_eq!(repository_name_for("https://github.com/acme/web/"), "web");
    }

    #[test]
    fn test_trigger_event_flags() {
        assert_eq!(TriggerEvent::Tag.flag(), "--tag-pattern");
        assert_eq!(TriggerEvent::PullRequest.to_string(), "pull-request");
        assert_eq!(TriggerEvent::Tag.default_pattern(), "^v.*$");
    }

    #[tokio::test]
    async fn test_full_creation_flow() {
        let runner = FakeRunner::new();
        runner.on("gcloud builds connections describe", CONNECTION);
        runner.on("gcloud builds repositories describe", REPOSITORY);
        runner.on(
            "gcloud builds triggers create github",
            r#"{"id": "abc-123", "name": "deploy-tag", "filename": "cloudbuild.yaml"}"#,
        );
        let prompter = ScriptedPrompter::new([
            Answer::Default, // connection name
            Answer::Text("https://github.com/acme/story-api.git".into()),
            Answer::Default, // repository name
            Answer::Select(1),
            Answer::Default,
            Answer::Default,
            Answer::Default,
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_build_trigger(&ctx, &mut state).await.unwrap();

        assert_eq!(
            runner.count(
                "gcloud projects add-iam-policy-binding story-app \
                 --member=serviceAccount:service-963664183424@gcp-sa-cloudbuild.iam.gserviceaccount.com \
                 --role=roles/secretmanager.admin"
            ),
            1
        );
        assert_eq!(
            runner.count(
                "gcloud projects add-iam-policy-binding story-app \
                 --member=serviceAccount:963664183424@cloudbuild.gserviceaccount.com"
            ),
            2
        );
        assert_eq!(
            runner.count(
                "gcloud builds connections create github github \
                 --project=story-app --region=europe-west1"
            ),
            1
        );
        assert_eq!(
            runner.count(
                "gcloud builds repositories create story-api \
                 --remote-uri=https://github.com/acme/story-api.git --connection=github"
            ),
            1
        );
        assert_eq!(
            runner.count(
                "gcloud builds triggers create github --name=deploy-tag \
                 --repository=projects/story-app/locations/europe-west1/connections/github/repositories/story-api \
                 --tag-pattern=^v.*$ --build-config=cloudbuild.yaml"
            ),
            1
        );

        let trigger = state.build_trigger.unwrap();
        assert_eq!(trigger.connection, "github");
        assert_eq!(trigger.name, "deploy-tag");
        assert_eq!(trigger.event.as_deref(), Some("tag"));
    }

    #[tokio::test]
    async fn test_existing_connection_and_repository() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud builds connections list",
            format!("[{}]", CONNECTION),
        );
        runner.on(
            "gcloud builds repositories list --connection=github",
            format!("[{}]", REPOSITORY),
        );
        runner.on(
            "gcloud builds triggers list",
            r#"[
                {"id": "t0", "name": "deploy-web",
                 "repositoryEventConfig": {"repository": "projects/story-app/locations/europe-west1/connections/github/repositories/web"}},
                {"id": "t1", "name": "deploy-branch",
                 "repositoryEventConfig": {"repository": "projects/story-app/locations/europe-west1/connections/github/repositories/story-api"}},
                {"id": "t2", "name": "legacy"}
            ]"#,
        );
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Select(0),
            Answer::Select(0),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_build_trigger(&ctx, &mut state).await.unwrap();

        assert_eq!(runner.count("gcloud projects add-iam-policy-binding"), 0);
        assert_eq!(runner.count("gcloud builds triggers create"), 0);
        let trigger = state.build_trigger.unwrap();
        assert_eq!(trigger.name, "deploy-branch");
        assert!(trigger.repository.ends_with("/repositories/story-api"));
    }

    #[tokio::test]
    async fn test_triggers_of_other_repositories_are_not_offered() {
        let runner = FakeRunner::new();
        runner.on("gcloud builds connections list", format!("[{}]", CONNECTION));
        runner.on(
            "gcloud builds repositories list --connection=github",
            format!("[{}]", REPOSITORY),
        );
        runner.on(
            "gcloud builds triggers list",
            r#"[{"id": "t0", "name": "deploy-web",
                 "repositoryEventConfig": {"repository": "projects/story-app/locations/europe-west1/connections/github/repositories/web"}}]"#,
        );
        runner.on(
            "gcloud builds triggers create github",
            r#"{"id": "abc-123", "name": "deploy-branch"}"#,
        );
        // no trigger menu: straight to the trigger type
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Select(0),
            Answer::Select(0),
            Answer::Default,
            Answer::Default,
            Answer::Default,
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_build_trigger(&ctx, &mut state).await.unwrap();

        assert_eq!(runner.count("gcloud builds triggers create github --name=deploy-branch"), 1);
        assert!(!prompter.asked().iter().any(|m| m.contains("existing trigger")));
        assert_eq!(prompter.remaining(), 0);
    }
}
