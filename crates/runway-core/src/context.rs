//! Collaborators shared by every step

use crate::prompt::Prompter;
use runway_config::Settings;
use runway_gcloud::Gcloud;
use std::path::{Path, PathBuf};

pub struct Context {
    pub gcloud: Gcloud,
    pub prompter: Box<dyn Prompter>,
    pub settings: Settings,
    /// Directory holding the env template and deployment descriptor
    pub workdir: PathBuf,
}

impl Context {
    pub fn new(
        gcloud: Gcloud,
        prompter: Box<dyn Prompter>,
        settings: Settings,
        workdir: impl AsRef<Path>,
    ) -> Self {
        Self {
            gcloud,
            prompter,
            settings,
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn env_template_path(&self) -> PathBuf {
        self.workdir.join(&self.settings.files.env_template)
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.workdir.join(&self.settings.files.descriptor)
    }
}
