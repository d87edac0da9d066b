//! gcloud CLI wrapper
//!
//! Wraps the gcloud commands Runway needs. Structured output is always
//! requested with `--format=json` and decoded into the schemas in
//! [`crate::models`].

use crate::error::{GcloudError, Result};
use crate::models::{
    Account, BillingAccount, CliProperties, ComputeCollection, ComputeResource, Configuration,
    Connection, CreateSqlInstanceConfig, CreateTriggerConfig, Project, Repository, Secret,
    Service, SqlDatabase, SqlInstance, Trigger,
};
use crate::runner::{CommandRunner, ExecOptions, display_command};
use serde::de::DeserializeOwned;
use std::sync::Arc;

const GCLOUD: &str = "gcloud";

/// Role granting read access to secret payloads
pub const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";

fn argv<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// gcloud CLI wrapper
#[derive(Clone)]
pub struct Gcloud {
    runner: Arc<dyn CommandRunner>,
}

impl Gcloud {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Check that `gcloud` is on the PATH
    pub async fn check_installed(&self) -> Result<()> {
        match self
            .runner
            .run("which", &argv([GCLOUD]), &ExecOptions::quiet())
            .await
        {
            Ok(_) => Ok(()),
            Err(GcloudError::ExecutionFailed { .. }) | Err(GcloudError::Io(_)) => {
                Err(GcloudError::NotInstalled)
            }
            Err(e) => Err(e),
        }
    }

    /// Run a gcloud command and return stdout
    pub async fn run(&self, args: Vec<String>, options: ExecOptions) -> Result<String> {
        let output = self.runner.run(GCLOUD, &args, &options).await?;
        Ok(output.stdout)
    }

    /// Run a gcloud command with `--format=json` and decode stdout
    pub async fn json<T: DeserializeOwned>(&self, mut args: Vec<String>) -> Result<T> {
        args.push("--format=json".to_string());
        let stdout = self.run(args.clone(), ExecOptions::quiet()).await?;
        decode(&display_command(GCLOUD, &args), &stdout)
    }

    /// Like [`Gcloud::json`] for list commands; empty output is an empty list
    pub async fn list<T: DeserializeOwned>(&self, mut args: Vec<String>) -> Result<Vec<T>> {
        args.push("--format=json".to_string());
        let stdout = self.run(args.clone(), ExecOptions::quiet()).await?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        decode(&display_command(GCLOUD, &args), &stdout)
    }

    /// Mutating command whose JSON result is needed
    async fn mutate_json<T: DeserializeOwned>(&self, mut args: Vec<String>) -> Result<T> {
        args.push("--format=json".to_string());
        let stdout = self.run(args.clone(), ExecOptions::default()).await?;
        decode(&display_command(GCLOUD, &args), &stdout)
    }

    // ========== Configurations ==========

    pub async fn list_configurations(&self) -> Result<Vec<Configuration>> {
        self.list(argv(["config", "configurations", "list"])).await
    }

    pub async fn create_configuration(&self, name: &str) -> Result<()> {
        self.run(
            argv(["config", "configurations", "create", name]),
            ExecOptions::quiet(),
        )
        .await?;
        Ok(())
    }

    pub async fn activate_configuration(&self, name: &str) -> Result<()> {
        self.run(
            argv(["config", "configurations", "activate", name]),
            ExecOptions::quiet(),
        )
        .await?;
        Ok(())
    }

    /// Properties of the active configuration (`gcloud config list`)
    pub async fn properties(&self) -> Result<CliProperties> {
        self.json(argv(["config", "list"])).await
    }

    pub async fn set_property(&self, key: &str, value: &str) -> Result<()> {
        self.run(argv(["config", "set", key, value]), ExecOptions::quiet())
            .await?;
        Ok(())
    }

    // ========== Auth / billing ==========

    /// Browser based login; the terminal is handed to gcloud
    pub async fn login(&self) -> Result<()> {
        self.run(argv(["auth", "login"]), ExecOptions::interactive())
            .await?;
        Ok(())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.list(argv(["auth", "list"])).await
    }

    pub async fn list_billing_accounts(&self) -> Result<Vec<BillingAccount>> {
        self.list(argv(["billing", "accounts", "list"])).await
    }

    // ========== Projects ==========

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.list(argv(["projects", "list"])).await
    }

    pub async fn create_project(&self, id: &str, name: &str) -> Result<Project> {
        self.mutate_json(argv([
            "projects".to_string(),
            "create".to_string(),
            id.to_string(),
            format!("--name={}", name),
        ]))
        .await
    }

    pub async fn add_project_iam_binding(
        &self,
        project_id: &str,
        member: &str,
        role: &str,
    ) -> Result<()> {
        self.run(
            argv([
                "projects".to_string(),
                "add-iam-policy-binding".to_string(),
                project_id.to_string(),
                format!("--member={}", member),
                format!("--role={}", role),
                "--condition=None".to_string(),
            ]),
            ExecOptions::quiet(),
        )
        .await?;
        Ok(())
    }

    // ========== Services ==========

    pub async fn list_enabled_services(&self) -> Result<Vec<Service>> {
        self.list(argv(["services", "list", "--enabled"])).await
    }

    pub async fn enable_service(&self, api: &str) -> Result<()> {
        self.run(argv(["services", "enable", api]), ExecOptions::default())
            .await?;
        Ok(())
    }

    // ========== Cloud SQL ==========

    pub async fn list_sql_instances(&self) -> Result<Vec<SqlInstance>> {
        self.list(argv(["sql", "instances", "list"])).await
    }

    /// Create a Cloud SQL instance. This blocks for several minutes.
    pub async fn create_sql_instance(&self, config: &CreateSqlInstanceConfig) -> Result<SqlInstance> {
        self.mutate_json(argv([
            "sql".to_string(),
            "instances".to_string(),
            "create".to_string(),
            config.name.clone(),
            format!("--database-version={}", config.database_version),
            format!("--cpu={}", config.cpu),
            format!("--memory={}", config.memory),
            format!("--zone={}", config.zone),
            format!("--root-password={}", config.root_password),
        ]))
        .await
    }

    pub async fn list_databases(&self, instance: &str) -> Result<Vec<SqlDatabase>> {
        self.list(argv([
            "sql".to_string(),
            "databases".to_string(),
            "list".to_string(),
            format!("--instance={}", instance),
        ]))
        .await
    }

    pub async fn create_database(&self, name: &str, instance: &str) -> Result<SqlDatabase> {
        self.mutate_json(argv([
            "sql".to_string(),
            "databases".to_string(),
            "create".to_string(),
            name.to_string(),
            format!("--instance={}", instance),
        ]))
        .await
    }

    // ========== Secret Manager ==========

    pub async fn list_secrets(&self) -> Result<Vec<Secret>> {
        self.list(argv(["secrets", "list"])).await
    }

    /// Create a secret whose first version holds `value`
    ///
    /// The payload travels on stdin so it never appears in the process table.
    pub async fn create_secret(&self, key: &str, value: &str) -> Result<()> {
        self.run(
            argv([
                "secrets",
                "create",
                key,
                "--replication-policy=automatic",
                "--data-file=-",
            ]),
            ExecOptions::default().with_stdin(value),
        )
        .await?;
        Ok(())
    }

    pub async fn add_secret_iam_binding(&self, key: &str, member: &str, role: &str) -> Result<()> {
        self.run(
            argv([
                "secrets".to_string(),
                "add-iam-policy-binding".to_string(),
                key.to_string(),
                format!("--member={}", member),
                format!("--role={}", role),
            ]),
            ExecOptions::quiet(),
        )
        .await?;
        Ok(())
    }

    // ========== Cloud Build ==========

    pub async fn list_connections(&self, region: &str) -> Result<Vec<Connection>> {
        self.list(argv([
            "builds".to_string(),
            "connections".to_string(),
            "list".to_string(),
            format!("--region={}", region),
        ]))
        .await
    }

    /// Create a host connection; gcloud walks the operator through the app install
    pub async fn create_connection(
        &self,
        platform: &str,
        name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<Connection> {
        self.run(
            argv([
                "builds".to_string(),
                "connections".to_string(),
                "create".to_string(),
                platform.to_string(),
                name.to_string(),
                format!("--project={}", project_id),
                format!("--region={}", region),
            ]),
            ExecOptions::interactive(),
        )
        .await?;

        self.json(argv([
            "builds".to_string(),
            "connections".to_string(),
            "describe".to_string(),
            name.to_string(),
            format!("--region={}", region),
        ]))
        .await
    }

    pub async fn list_repositories(&self, connection: &str, region: &str) -> Result<Vec<Repository>> {
        self.list(argv([
            "builds".to_string(),
            "repositories".to_string(),
            "list".to_string(),
            format!("--connection={}", connection),
            format!("--region={}", region),
        ]))
        .await
    }

    pub async fn create_repository(
        &self,
        name: &str,
        remote_uri: &str,
        connection: &str,
        region: &str,
    ) -> Result<Repository> {
        self.run(
            argv([
                "builds".to_string(),
                "repositories".to_string(),
                "create".to_string(),
                name.to_string(),
                format!("--remote-uri={}", remote_uri),
                format!("--connection={}", connection),
                format!("--region={}", region),
            ]),
            ExecOptions::default(),
        )
        .await?;

        self.json(argv([
            "builds".to_string(),
            "repositories".to_string(),
            "describe".to_string(),
            name.to_string(),
            format!("--connection={}", connection),
            format!("--region={}", region),
        ]))
        .await
    }

    pub async fn list_triggers(&self, region: &str) -> Result<Vec<Trigger>> {
        self.list(argv([
            "builds".to_string(),
            "triggers".to_string(),
            "list".to_string(),
            format!("--region={}", region),
        ]))
        .await
    }

    pub async fn create_trigger(&self, config: &CreateTriggerConfig) -> Result<Trigger> {
        self.mutate_json(argv([
            "builds".to_string(),
            "triggers".to_string(),
            "create".to_string(),
            "github".to_string(),
            format!("--name={}", config.name),
            format!("--repository={}", config.repository),
            format!("{}={}", config.event_flag, config.pattern),
            format!("--build-config={}", config.build_config),
            format!("--region={}", config.region),
        ]))
        .await
    }

    // ========== Compute (load balancing) ==========

    fn scope_flag(collection: ComputeCollection, region: &str) -> String {
        if collection.is_regional() {
            format!("--region={}", region)
        } else {
            "--global".to_string()
        }
    }

    /// Look up a compute resource by name
    pub async fn find_compute(
        &self,
        collection: ComputeCollection,
        name: &str,
        region: &str,
    ) -> Result<Option<ComputeResource>> {
        let scope = if collection.is_regional() {
            format!("--regions={}", region)
        } else {
            "--global".to_string()
        };
        let items: Vec<ComputeResource> = self
            .list(argv([
                "compute".to_string(),
                collection.command().to_string(),
                "list".to_string(),
                scope,
            ]))
            .await?;
        Ok(items.into_iter().find(|item| item.name == name))
    }

    /// Create a compute resource and return its description
    pub async fn create_compute(
        &self,
        collection: ComputeCollection,
        name: &str,
        region: &str,
        flags: &[String],
    ) -> Result<ComputeResource> {
        let scope = Self::scope_flag(collection, region);

        let mut args = argv([
            "compute".to_string(),
            collection.command().to_string(),
            "create".to_string(),
            name.to_string(),
            scope.clone(),
        ]);
        args.extend(flags.iter().cloned());
        self.run(args, ExecOptions::default()).await?;

        self.json(argv([
            "compute".to_string(),
            collection.command().to_string(),
            "describe".to_string(),
            name.to_string(),
            scope,
        ]))
        .await
    }

    /// Attach a serverless NEG to a global backend service
    pub async fn add_backend(&self, backend: &str, neg: &str, region: &str) -> Result<()> {
        self.run(
            argv([
                "compute".to_string(),
                "backend-services".to_string(),
                "add-backend".to_string(),
                backend.to_string(),
                "--global".to_string(),
                format!("--network-endpoint-group={}", neg),
                format!("--network-endpoint-group-region={}", region),
            ]),
            ExecOptions::default(),
        )
        .await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(command: &str, stdout: &str) -> Result<T> {
    serde_json::from_str(stdout).map_err(|source| GcloudError::MalformedResponse {
        command: command.to_string(),
        source,
    })
}

/// Default compute service account of a project
pub fn compute_service_account(project_number: &str) -> String {
    format!("{}-compute@developer.gserviceaccount.com", project_number)
}

/// Legacy Cloud Build service account of a project
pub fn cloudbuild_service_account(project_number: &str) -> String {
    format!("{}@cloudbuild.gserviceaccount.com", project_number)
}

/// Cloud Build service agent (P4SA), which stores connection tokens
pub fn cloudbuild_service_agent(project_number: &str) -> String {
    format!(
        "service-{}@gcp-sa-cloudbuild.iam.gserviceaccount.com",
        project_number
    )
}

/// IAM member string for a service account
pub fn service_account_member(email: &str) -> String {
    format!("serviceAccount:{}", email)
}
