//! Cloud SQL instance and application database

use super::Outcome;
use super::apis::ensure_api;
use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::progress;
use crate::selector::{ResourceKind, Selection, select_or_create};
use crate::state::ProvisioningState;
use async_trait::async_trait;
use runway_gcloud::{CreateSqlInstanceConfig, SqlDatabase, SqlInstance};

const SQL_APIS: &[&str] = &["sql-component.googleapis.com", "sqladmin.googleapis.com"];
const DEFAULT_DATABASE_NAME: &str = "production";

pub struct SqlInstanceKind {
    user: String,
}

impl SqlInstanceKind {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

#[async_trait]
impl ResourceKind for SqlInstanceKind {
    type Item = SqlInstance;

    fn noun(&self) -> &'static str {
        "SQL instance"
    }

    async fn list(
        &self,
        ctx: &Context,
        _state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<SqlInstance>> {
        ctx.gcloud.list_sql_instances().await
    }

    async fn create(
        &self,
        ctx: &Context,
        state: &mut ProvisioningState,
    ) -> Result<Option<SqlInstance>> {
        if !ctx
            .prompter
            .confirm("Do you want to create a SQL instance?", true)?
        {
            return Ok(None);
        }

        let name = ctx
            .prompter
            .text("SQL instance id", Some(state.project.id.as_str()))?;
        let root_password = ctx.prompter.password("Root password")?;

        for api in SQL_APIS {
            ensure_api(ctx, state, api).await?;
        }

        progress::detail("creating the instance, this takes a few minutes");
        let db = &ctx.settings.database;
        let instance = ctx
            .gcloud
            .create_sql_instance(&CreateSqlInstanceConfig {
                name,
                database_version: db.engine.clone(),
                cpu: db.cpu,
                memory: db.memory.clone(),
                zone: state.zone.clone(),
                root_password: root_password.clone(),
            })
            .await?;

        // bind() keeps the password of a matching instance
        self.bind(&instance, state)?;
        if let Some(database) = state.database.as_mut() {
            database.password = Some(root_password);
        }
        if let Some(address) = instance.address() {
            progress::detail(&format!("instance running at {}", address));
        }
        Ok(Some(instance))
    }

    fn bind(&self, item: &SqlInstance, state: &mut ProvisioningState) -> Result<()> {
        let password = state
            .database
            .as_ref()
            .filter(|db| db.instance_id == item.name)
            .and_then(|db| db.password.clone());

        state.bind_instance(
            &item.name,
            &item.connection_name,
            item.address().map(String::from),
            &self.user,
        );
        if let Some(database) = state.database.as_mut() {
            database.password = password;
        }
        Ok(())
    }
}

pub struct DatabaseKind;

#[async_trait]
impl ResourceKind for DatabaseKind {
    type Item = SqlDatabase;

    fn noun(&self) -> &'static str {
        "database"
    }

    async fn list(
        &self,
        ctx: &Context,
        state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<SqlDatabase>> {
        match state.instance_id() {
            Some(instance) => ctx.gcloud.list_databases(instance).await,
            None => Ok(Vec::new()),
        }
    }

    async fn create(
        &self,
        ctx: &Context,
        state: &mut ProvisioningState,
    ) -> Result<Option<SqlDatabase>> {
        let instance = state
            .instance_id()
            .ok_or_else(|| {
                ProvisionError::InvalidState("no SQL instance to create a database on".to_string())
            })?
            .to_string();

        let name = ctx
            .prompter
            .text("Database name", Some(DEFAULT_DATABASE_NAME))?;
        let database = ctx.gcloud.create_database(&name, &instance).await?;
        Ok(Some(database))
    }

    fn bind(&self, item: &SqlDatabase, state: &mut ProvisioningState) -> Result<()> {
        state.bind_database(&item.name)
    }
}

pub async fn select_sql_instance(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    let kind = SqlInstanceKind::new(&ctx.settings.database.user);
    match select_or_create(&kind, ctx, state).await? {
        Selection::Existing(instance) => Ok(Outcome::done(format!("using {}", instance.name))),
        Selection::Created(instance) => Ok(Outcome::done(format!("created {}", instance.name))),
        Selection::Skipped => Ok(Outcome::skipped("no SQL instance")),
    }
}

/// Only runs once an instance is bound
pub async fn select_database(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    if state.database.is_none() {
        return Ok(Outcome::skipped("no SQL instance selected"));
    }

    match select_or_create(&DatabaseKind, ctx, state).await? {
        Selection::Existing(db) => Ok(Outcome::done(format!("using {}", db.name))),
        Selection::Created(db) => Ok(Outcome::done(format!("created {}", db.name))),
        Selection::Skipped => Ok(Outcome::skipped("no database")),
    }
}
