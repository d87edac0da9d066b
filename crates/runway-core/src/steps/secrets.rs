//! Secret Manager: collected secrets and the ad-hoc secret loop

use super::Outcome;
use crate::context::Context;
use crate::error::Result;
use crate::progress;
use crate::state::ProvisioningState;
use runway_gcloud::{
    SECRET_ACCESSOR_ROLE, cloudbuild_service_account, compute_service_account,
    service_account_member,
};
use std::collections::BTreeSet;

/// Fully-qualified name of a secret in the bound project
pub fn secret_resource_name(project_number: &str, key: &str) -> String {
    format!("projects/{}/secrets/{}", project_number, key)
}

async fn existing_secret_names(ctx: &Context) -> Result<BTreeSet<String>> {
    let secrets = ctx.gcloud.list_secrets().await?;
    Ok(secrets.into_iter().map(|secret| secret.name).collect())
}

/// Create every collected secret that does not exist yet
///
/// New secrets are readable by the compute account (the service at runtime)
/// and the Cloud Build account (migrations during builds).
pub async fn create_secrets(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    if state.secrets.is_empty() {
        return Ok(Outcome::skipped("no secrets collected"));
    }

    progress::detail("fetching secrets");
    let mut existing = existing_secret_names(ctx).await?;

    let readers = [
        service_account_member(&compute_service_account(&state.project.number)),
        service_account_member(&cloudbuild_service_account(&state.project.number)),
    ];

    let mut created = Vec::new();
    for secret in &state.secrets {
        // insert is false for a name already listed or created in this loop
        if !existing.insert(secret_resource_name(&state.project.number, &secret.key)) {
            progress::detail(&format!("{} already exists", secret.key));
            continue;
        }

        ctx.gcloud.create_secret(&secret.key, &secret.value).await?;
        for member in &readers {
            ctx.gcloud
                .add_secret_iam_binding(&secret.key, member, SECRET_ACCESSOR_ROLE)
                .await?;
        }
        progress::detail(&format!("{} created", secret.key));
        created.push(secret.key.clone());
    }

    let count = created.len();
    state.created_secrets.extend(created);
    if count == 0 {
        Ok(Outcome::skipped("all secrets already exist"))
    } else {
        Ok(Outcome::done(format!("{} secrets created", count)))
    }
}

/// Prompt for key/value pairs until an empty key or value
pub async fn create_ad_hoc_secrets(
    ctx: &Context,
    state: &mut ProvisioningState,
) -> Result<Outcome> {
    let existing: BTreeSet<String> = ctx
        .gcloud
        .list_secrets()
        .await?
        .iter()
        .map(|secret| secret.key().to_string())
        .collect();
    for key in &existing {
        progress::detail(key);
    }

    let mut count = 0;
    loop {
        let key = ctx.prompter.text("Secret name (empty to stop)", None)?;
        let key = key.trim();
        if key.is_empty() {
            break;
        }
        if existing.contains(key) || state.created_secrets.iter().any(|k| k == key) {
            progress::detail(&format!("{} already exists, skipped", key));
            continue;
        }

        let value = ctx.prompter.password(&format!("Value for {}", key))?;
        if value.is_empty() {
            break;
        }

        ctx.gcloud.create_secret(key, &value).await?;
        progress::detail(&format!("{} created", key));
        state.created_secrets.push(key.to_string());
        count += 1;
    }

    if count == 0 {
        Ok(Outcome::skipped("no secrets entered"))
    } else {
        Ok(Outcome::done(format!("{} secrets created", count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EnvVar;
    use crate::testing::{Answer, FakeRunner, ScriptedPrompter, bound_state, context};

    #[tokio::test]
    async fn test_existing_secret_is_not_created_again() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud secrets list",
            r#"[{"name": "projects/963664183424/secrets/APP_KEY"}]"#,
        );
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();
        state.push_variable("APP_KEY", "k3y", true);

        let outcome = create_secrets(&ctx, &mut state).await.unwrap();

        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(runner.count("gcloud secrets create"), 0);
        assert!(state.created_secrets.is_empty());
    }

    #[tokio::test]
    async fn test_new_secret_goes_through_stdin_with_grants() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud secrets list",
            r#"[{"name": "projects/111/secrets/APP_KEY"}]"#,
        );
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();
        state.push_variable("APP_KEY", "k3y", true);

        create_secrets(&ctx, &mut state).await.unwrap();

        let create: Vec<_> = runner
            .calls()
            .into_iter()
            .filter(|c| c.line.starts_with("gcloud secrets create APP_KEY"))
            .collect();
        assert_eq!(create.len(), 1);
        assert_eq!(create[0].stdin.as_deref(), Some("k3y"));
        assert!(!create[0].line.contains("k3y"));

        assert_eq!(
            runner.count(
                "gcloud secrets add-iam-policy-binding APP_KEY \
                 --member=serviceAccount:963664183424-compute@developer.gserviceaccount.com"
            ),
            1
        );
        assert_eq!(
            runner.count(
                "gcloud secrets add-iam-policy-binding APP_KEY \
                 --member=serviceAccount:963664183424@cloudbuild.gserviceaccount.com"
            ),
            1
        );
        assert_eq!(state.created_secrets, vec!["APP_KEY".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_key_is_created_once() {
        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();
        state.secrets.push(EnvVar::new("APP_KEY", "a"));
        state.secrets.push(EnvVar::new("APP_KEY", "b"));

        create_secrets(&ctx, &mut state).await.unwrap();

        assert_eq!(runner.count("gcloud secrets create APP_KEY"), 1);
        assert_eq!(state.created_secrets, vec!["APP_KEY".to_string()]);
    }

    #[tokio::test]
    async fn test_no_collected_secrets_lists_nothing() {
        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_secrets(&ctx, &mut state).await.unwrap();
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ad_hoc_loop() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud secrets list",
            r#"[{"name": "projects/963664183424/secrets/EXISTING"}]"#,
        );
        let prompter = ScriptedPrompter::new([
            Answer::Text("EXISTING".into()),
            Answer::Text("STRIPE_KEY".into()),
            Answer::Password("sk_live".into()),
            Answer::Text("".into()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        let outcome = create_ad_hoc_secrets(&ctx, &mut state).await.unwrap();

        assert_eq!(outcome, Outcome::done("1 secrets created"));
        assert_eq!(runner.count("gcloud secrets create EXISTING"), 0);
        assert_eq!(runner.count("gcloud secrets create STRIPE_KEY"), 1);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn test_ad_hoc_empty_value_ends_loop() {
        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([
            Answer::Text("TOKEN".into()),
            Answer::Password("".into()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        let outcome = create_ad_hoc_secrets(&ctx, &mut state).await.unwrap();
        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(runner.count("gcloud secrets create"), 0);
    }
}
