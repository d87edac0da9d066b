//! Cloud Run deploy command
//!
//! The command is rendered for the operator to run by hand and is never
//! executed by Runway.

use super::Outcome;
use crate::context::Context;
use crate::error::Result;
use crate::state::ProvisioningState;

const DEFAULT_SERVICE_NAME: &str = "production";

/// Quote a value for a POSIX shell
pub fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Delimiters tried, in order, for values that contain commas
const ALTERNATE_DELIMITERS: [char; 5] = ['@', '|', '#', '~', ';'];

/// `KEY=value` for `--set-env-vars`
///
/// gcloud splits the flag on commas. A value containing one switches to the
/// `^D^KEY=value` form with a delimiter the pair does not contain.
pub fn env_var_pair(key: &str, value: &str) -> String {
    let pair = format!("{}={}", key, value);
    if !value.contains(',') {
        return pair;
    }
    match ALTERNATE_DELIMITERS.iter().find(|d| !pair.contains(**d)) {
        Some(delimiter) => format!("^{}^{}", delimiter, pair),
        None => {
            tracing::warn!("No free delimiter for {}, gcloud will split it on commas", key);
            pair
        }
    }
}

/// One clause per line, joined with shell line continuations
pub fn render_deploy_command(service: &str, state: &ProvisioningState) -> String {
    let mut lines = vec![
        format!("gcloud run deploy {}", service),
        "--source .".to_string(),
        format!("--project={}", state.project.id),
        format!("--region={}", state.region),
    ];

    if let Some(db) = &state.database {
        lines.push(format!("--set-cloudsql-instances={}", db.connection_name));
    }
    lines.push("--allow-unauthenticated".to_string());

    lines.extend(state.env_vars.iter().map(|var| {
        format!(
            "--set-env-vars {}",
            shell_escape(&env_var_pair(&var.key, &var.value))
        )
    }));
    lines.extend(
        state
            .secrets
            .iter()
            .map(|secret| format!("--set-secrets {}={}:1", secret.key, secret.key)),
    );

    lines.join(" \\\n")
}

pub async fn assemble_deploy_command(
    ctx: &Context,
    state: &mut ProvisioningState,
) -> Result<Outcome> {
    if !ctx
        .prompter
        .confirm("Do you want to create a Cloud Run service?", true)?
    {
        return Ok(Outcome::skipped("no Cloud Run service"));
    }

    let service = ctx
        .prompter
        .text("Cloud Run service name", Some(DEFAULT_SERVICE_NAME))?;
    let command = render_deploy_command(&service, state);
    state.deferred_command = Some(command);
    Ok(Outcome::done(format!("deploy command for {} ready", service)))
}
