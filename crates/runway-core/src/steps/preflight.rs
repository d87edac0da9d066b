//! Local checks before anything touches the cloud

use super::Outcome;
use crate::context::Context;
use crate::environment;
use crate::error::{ProvisionError, Result};
use runway_gcloud::GcloudError;

/// Template and descriptor must exist, then gcloud must be installed
///
/// The file checks come first so a wrong working directory fails without
/// issuing a single command.
pub async fn run(ctx: &Context) -> Result<Outcome> {
    let template_path = ctx.env_template_path();
    if tokio::fs::metadata(&template_path).await.is_err() {
        return Err(ProvisionError::PreconditionMissing(format!(
            "No {} file found in {}",
            ctx.settings.files.env_template.display(),
            ctx.workdir.display()
        )));
    }

    let entries = environment::load_template(&template_path).await?;
    if entries.is_empty() {
        return Err(ProvisionError::PreconditionMissing(format!(
            "{} looks empty",
            ctx.settings.files.env_template.display()
        )));
    }

    let descriptor_path = ctx.descriptor_path();
    if tokio::fs::metadata(&descriptor_path).await.is_err() {
        return Err(ProvisionError::PreconditionMissing(format!(
            "No {} found in {}",
            ctx.settings.files.descriptor.display(),
            ctx.workdir.display()
        )));
    }

    match ctx.gcloud.check_installed().await {
        Ok(()) => {}
        Err(GcloudError::NotInstalled) => {
            return Err(ProvisionError::PreconditionMissing(
                "gcloud is not installed.".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Outcome::done(format!(
        "{} template entries, gcloud found",
        entries.len()
    )))
}
