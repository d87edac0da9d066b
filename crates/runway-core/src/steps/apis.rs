//! Service enablement

use super::Outcome;
use crate::context::Context;
use crate::error::Result;
use crate::progress;
use crate::state::ProvisioningState;
use runway_gcloud::{SECRET_ACCESSOR_ROLE, compute_service_account, service_account_member};

pub const COMPUTE_API: &str = "compute.googleapis.com";

/// Refresh `state.enabled_apis` from the project
pub async fn refresh_enabled(ctx: &Context, state: &mut ProvisioningState) -> Result<()> {
    let services = ctx.gcloud.list_enabled_services().await?;
    state
        .enabled_apis
        .extend(services.into_iter().map(|service| service.config.name));
    Ok(())
}

/// Enable `api` unless the cache says it already is; returns whether it was enabled now
pub async fn ensure_api(ctx: &Context, state: &mut ProvisioningState, api: &str) -> Result<bool> {
    if state.is_api_enabled(api) {
        tracing::debug!("{} is enabled", api);
        return Ok(false);
    }
    ctx.gcloud.enable_service(api).await?;
    state.enabled_apis.insert(api.to_string());
    progress::detail(&format!("{} enabled", api));
    Ok(true)
}

/// Enable compute and the configured APIs
///
/// The compute account gets project-wide secret access the first time compute
/// is switched on.
pub async fn enable_apis(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    refresh_enabled(ctx, state).await?;

    let mut newly_enabled = 0;
    if ensure_api(ctx, state, COMPUTE_API).await? {
        newly_enabled += 1;
        let account = compute_service_account(&state.project.number);
        ctx.gcloud
            .add_project_iam_binding(
                &state.project.id,
                &service_account_member(&account),
                SECRET_ACCESSOR_ROLE,
            )
            .await?;
        progress::detail(&format!("{} authorized to access secrets", account));
    }

    for api in &ctx.settings.needed_apis {
        if ensure_api(ctx, state, api).await? {
            newly_enabled += 1;
        }
    }

    if newly_enabled == 0 {
        Ok(Outcome::skipped("all APIs already enabled"))
    } else {
        Ok(Outcome::done(format!("{} APIs enabled", newly_enabled)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRunner, ScriptedPrompter, bound_state, context};

    fn services_json(names: &[&str]) -> String {
        let entries: Vec<String> = names
            .iter()
            .map(|name| format!(r#"{{"config": {{"name": "{}"}}, "state": "ENABLED"}}"#, name))
            .collect();
        format!("[{}]", entries.join(","))
    }

    #[tokio::test]
    async fn test_everything_enabled_issues_no_enable() {
        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());

        let mut all: Vec<&str> = ctx.settings.needed_apis.iter().map(String::as_str).collect();
        all.push(COMPUTE_API);
        runner.on("gcloud services list --enabled", services_json(&all));

        let mut state = bound_state();
        let outcome = enable_apis(&ctx, &mut state).await.unwrap();

        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(runner.count("gcloud services enable"), 0);
        assert_eq!(runner.count("gcloud projects add-iam-policy-binding"), 0);
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_compute_enable_grants_secret_access() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud services list --enabled",
            services_json(&["run.googleapis.com"]),
        );
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        enable_apis(&ctx, &mut state).await.unwrap();

        assert_eq!(runner.count("gcloud services enable compute.googleapis.com"), 1);
        assert_eq!(runner.count("gcloud services enable run.googleapis.com"), 0);
        assert_eq!(
            runner.count(
                "gcloud projects add-iam-policy-binding story-app \
                 --member=serviceAccount:963664183424-compute@developer.gserviceaccount.com \
                 --role=roles/secretmanager.secretAccessor"
            ),
            1
        );
        assert!(state.is_api_enabled("sqladmin.googleapis.com"));
        assert_eq!(
            runner.count("gcloud services enable"),
            ctx.settings.needed_apis.len()
        );
    }

    #[tokio::test]
    async fn test_compute_already_on_skips_grant() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud services list --enabled",
            services_json(&[COMPUTE_API]),
        );
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        enable_apis(&ctx, &mut state).await.unwrap();
        assert_eq!(runner.count("gcloud projects add-iam-policy-binding"), 0);
    }
}
