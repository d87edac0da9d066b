//! Provisioning state
//!
//! One [`ProvisioningState`] is created per run and threaded by `&mut`
//! through every step. Steps only touch their own fields; later steps and
//! the report read what earlier steps recorded.

use crate::error::{ProvisionError, Result};
use runway_config::Settings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectState {
    pub id: String,
    pub display_name: String,
    pub number: String,
    pub account: String,
}

impl ProjectState {
    pub fn is_bound(&self) -> bool {
        !self.id.is_empty() && !self.number.is_empty()
    }
}

/// Cloud SQL instance plus, once chosen, the application database on it
///
/// The database name lives here so it cannot be recorded without an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseState {
    pub instance_id: String,
    pub connection_name: String,
    pub address: Option<String>,
    pub name: Option<String>,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

/// A `KEY=value` pair bound for the service environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Built up across the connection, repository and trigger selections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerState {
    pub name: String,
    pub connection: String,
    pub repository: String,
    pub event: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerState {
    pub prefix: String,
    pub service: String,
    pub domain: String,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisioningState {
    /// Active gcloud configuration
    pub configuration: Option<String>,
    pub project: ProjectState,
    pub region: String,
    pub zone: String,
    pub database: Option<DatabaseState>,
    /// Plain variables in template order
    pub env_vars: Vec<EnvVar>,
    /// Secret variables in template order
    #[serde(skip_serializing, default)]
    pub secrets: Vec<EnvVar>,
    /// Secrets created during this run
    pub created_secrets: Vec<String>,
    /// Services known to be enabled on the project
    pub enabled_apis: BTreeSet<String>,
    /// Deploy command rendered for the operator to run
    pub deferred_command: Option<String>,
    pub build_trigger: Option<TriggerState>,
    pub load_balancer: Option<LoadBalancerState>,
}

impl ProvisioningState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            region: settings.region.clone(),
            zone: settings.zone.clone(),
            ..Self::default()
        }
    }

    /// Record a SQL instance; any previously chosen database is forgotten
    pub fn bind_instance(
        &mut self,
        instance_id: impl Into<String>,
        connection_name: impl Into<String>,
        address: Option<String>,
        user: impl Into<String>,
    ) {
        self.database = Some(DatabaseState {
            instance_id: instance_id.into(),
            connection_name: connection_name.into(),
            address,
            name: None,
            user: user.into(),
            password: None,
        });
    }

    /// Record the application database; requires a bound instance
    pub fn bind_database(&mut self, name: impl Into<String>) -> Result<()> {
        let database = self.database.as_mut().ok_or_else(|| {
            ProvisionError::InvalidState(
                "a database can only be chosen after a SQL instance".to_string(),
            )
        })?;
        database.name = Some(name.into());
        Ok(())
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.database.as_ref().map(|db| db.instance_id.as_str())
    }

    /// Append a collected variable to the plain or secret list
    pub fn push_variable(&mut self, key: impl Into<String>, value: impl Into<String>, secret: bool) {
        let var = EnvVar::new(key, value);
        // a key lives in exactly one list, once
        self.env_vars.retain(|v| v.key != var.key);
        self.secrets.retain(|v| v.key != var.key);
        if secret {
            self.secrets.push(var);
        } else {
            self.env_vars.push(var);
        }
    }

    pub fn is_api_enabled(&self, api: &str) -> bool {
        self.enabled_apis.contains(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_takes_region_from_settings() {
        let settings = Settings::default();
        let state = ProvisioningState::new(&settings);
        assert_eq!(state.region, "europe-west1");
        assert_eq!(state.zone, "europe-west1-d");
        assert!(state.database.is_none());
        assert!(!state.project.is_bound());
    }

    #[test]
    fn test_database_requires_instance() {
        let mut state = ProvisioningState::default();
        assert!(matches!(
            state.bind_database("production"),
            Err(ProvisionError::InvalidState(_))
        ));

        state.bind_instance("app", "p:europe-west1:app", None, "postgres");
        state.bind_database("production").unwrap();
        assert_eq!(
            state.database.as_ref().unwrap().name.as_deref(),
            Some("production")
        );

        // rebinding the instance drops the database choice
        state.bind_instance("other", "p:europe-west1:other", None, "postgres");
        assert!(state.database.as_ref().unwrap().name.is_none());
    }

    #[test]
    fn test_push_variable_keeps_order() {
        let mut state = ProvisioningState::default();
        state.push_variable("HOST", "0.0.0.0", false);
        state.push_variable("APP_KEY", "k", true);
        state.push_variable("PORT", "8080", false);

        let plain: Vec<_> = state.env_vars.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(plain, vec!["HOST", "PORT"]);
        assert_eq!(state.secrets, vec![EnvVar::new("APP_KEY", "k")]);
    }

    #[test]
    fn test_push_variable_replaces_same_key() {
        let mut state = ProvisioningState::default();
        state.push_variable("APP_KEY", "a", false);
        state.push_variable("APP_KEY", "b", true);

        assert!(state.env_vars.is_empty());
        assert_eq!(state.secrets, vec![EnvVar::new("APP_KEY", "b")]);
    }

    #[test]
    fn test_serialized_state_omits_secret_values() {
        let mut state = ProvisioningState::default();
        state.push_variable("DB_PASS", "hunter2", true);
        state.bind_instance("app", "p:r:app", None, "postgres");
        state.database.as_mut().unwrap().password = Some("hunter2".to_string());

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
