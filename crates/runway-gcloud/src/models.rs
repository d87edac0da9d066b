//! Typed schemas for `gcloud ... --format=json` responses
//!
//! Only the fields Runway reads are modelled; everything else is ignored by
//! serde. A response that lacks a required field fails to decode, which the
//! wrapper reports as [`crate::GcloudError::MalformedResponse`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Uniform view of any listed or created cloud resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Human readable label shown in selection menus
    pub display_name: String,
    /// Identifier understood by gcloud (project id, instance name, ...)
    pub native_id: String,
    /// Additional attributes worth showing or logging
    pub attributes: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    pub fn new(display_name: impl Into<String>, native_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            native_id: native_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Anything that can be shown in a select-or-create menu
pub trait Describe {
    fn describe(&self) -> ResourceDescriptor;
}

/// Last path segment of a fully-qualified resource name
///
/// `projects/123/secrets/API_KEY` -> `API_KEY`
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

// ========== Configurations ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreProperties {
    pub account: Option<String>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeProperties {
    pub region: Option<String>,
    pub zone: Option<String>,
}

/// Properties of a configuration, also the shape of `gcloud config list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliProperties {
    #[serde(default)]
    pub core: CoreProperties,
    #[serde(default)]
    pub compute: ComputeProperties,
}

/// Entry of `gcloud config configurations list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub properties: CliProperties,
}

impl Describe for Configuration {
    fn describe(&self) -> ResourceDescriptor {
        let mut descriptor = ResourceDescriptor::new(&self.name, &self.name);
        if let Some(project) = &self.properties.core.project {
            descriptor = descriptor.with_attribute("project", project);
        }
        if let Some(account) = &self.properties.core.account {
            descriptor = descriptor.with_attribute("account", account);
        }
        descriptor
    }
}

// ========== Auth / billing ==========

/// Entry of `gcloud auth list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account: String,
    pub status: String,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

/// Entry of `gcloud billing accounts list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAccount {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub open: bool,
}

// ========== Projects ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub project_number: String,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
}

impl Describe for Project {
    fn describe(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(&self.name, &self.project_id)
            .with_attribute("number", &self.project_number)
    }
}

// ========== Services ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

/// Entry of `gcloud services list --enabled`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub config: ServiceConfig,
    #[serde(default)]
    pub state: Option<String>,
}

// ========== Cloud SQL ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    pub ip_address: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlInstance {
    pub name: String,
    pub connection_name: String,
    #[serde(default)]
    pub ip_addresses: Vec<IpMapping>,
    #[serde(default)]
    pub database_version: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl SqlInstance {
    /// First reported IP address
    pub fn address(&self) -> Option<&str> {
        self.ip_addresses.first().map(|ip| ip.ip_address.as_str())
    }
}

impl Describe for SqlInstance {
    fn describe(&self) -> ResourceDescriptor {
        let mut descriptor = ResourceDescriptor::new(&self.name, &self.name)
            .with_attribute("connection", &self.connection_name);
        if let Some(address) = self.address() {
            descriptor = descriptor.with_attribute("address", address);
        }
        descriptor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlDatabase {
    pub name: String,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

impl Describe for SqlDatabase {
    fn describe(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(&self.name, &self.name)
    }
}

/// Parameters of `gcloud sql instances create`
#[derive(Debug, Clone)]
pub struct CreateSqlInstanceConfig {
    pub name: String,
    pub database_version: String,
    pub cpu: u32,
    pub memory: String,
    pub zone: String,
    pub root_password: String,
}

// ========== Secret Manager ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    /// Fully-qualified name: `projects/<number>/secrets/<key>`
    pub name: String,
}

impl Secret {
    pub fn key(&self) -> &str {
        short_name(&self.name)
    }
}

impl Describe for Secret {
    fn describe(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.key(), &self.name)
    }
}

// ========== Cloud Build ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationState {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Cloud Build 2nd-gen host connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub name: String,
    #[serde(default)]
    pub installation_state: InstallationState,
    #[serde(default)]
    pub disabled: bool,
}

impl Connection {
    pub fn id(&self) -> &str {
        short_name(&self.name)
    }

    pub fn is_ready(&self) -> bool {
        self.installation_state.stage.as_deref() == Some("COMPLETE")
    }
}

impl Describe for Connection {
    fn describe(&self) -> ResourceDescriptor {
        let stage = self
            .installation_state
            .stage
            .clone()
            .unwrap_or_else(|| "UNKNOWN".to_string());
        ResourceDescriptor::new(self.id(), &self.name).with_attribute("stage", stage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub remote_uri: Option<String>,
}

impl Repository {
    pub fn id(&self) -> &str {
        short_name(&self.name)
    }
}

impl Describe for Repository {
    fn describe(&self) -> ResourceDescriptor {
        let mut descriptor = ResourceDescriptor::new(self.id(), &self.name);
        if let Some(uri) = &self.remote_uri {
            descriptor = descriptor.with_attribute("remote_uri", uri);
        }
        descriptor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub repository_event_config: Option<RepositoryEventConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryEventConfig {
    /// Full repository resource name
    #[serde(default)]
    pub repository: Option<String>,
}

impl Trigger {
    /// Repository the trigger fires on, for 2nd-gen repository triggers
    pub fn repository(&self) -> Option<&str> {
        self.repository_event_config
            .as_ref()
            .and_then(|config| config.repository.as_deref())
    }
}

impl Describe for Trigger {
    fn describe(&self) -> ResourceDescriptor {
        let mut descriptor =
            ResourceDescriptor::new(&self.name, self.id.as_deref().unwrap_or(&self.name));
        if let Some(filename) = &self.filename {
            descriptor = descriptor.with_attribute("build_config", filename);
        }
        descriptor
    }
}

/// Parameters of `gcloud builds triggers create github`
#[derive(Debug, Clone)]
pub struct CreateTriggerConfig {
    pub name: String,
    /// Full repository resource name
    pub repository: String,
    /// `--branch-pattern=...`, `--tag-pattern=...` or `--pull-request-pattern=...`
    pub event_flag: String,
    pub pattern: String,
    pub build_config: String,
    pub region: String,
}

// ========== Compute (load balancing) ==========

/// Minimal shape shared by every compute resource Runway manages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResource {
    pub name: String,
    /// Only present for addresses
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub self_link: Option<String>,
    /// Only present for backend services
    #[serde(default)]
    pub backends: Vec<Backend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backend {
    /// Full URL of the attached instance or network endpoint group
    pub group: String,
}

impl ComputeResource {
    /// Whether the named network endpoint group is attached
    pub fn has_backend_group(&self, neg: &str) -> bool {
        self.backends.iter().any(|backend| short_name(&backend.group) == neg)
    }
}

impl Describe for ComputeResource {
    fn describe(&self) -> ResourceDescriptor {
        let mut descriptor = ResourceDescriptor::new(&self.name, &self.name);
        if let Some(address) = &self.address {
            descriptor = descriptor.with_attribute("address", address);
        }
        descriptor
    }
}

/// Compute collections used to build an HTTPS load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeCollection {
    Address,
    NetworkEndpointGroup,
    BackendService,
    UrlMap,
    SslCertificate,
    TargetHttpsProxy,
    ForwardingRule,
}

impl ComputeCollection {
    /// gcloud command group under `gcloud compute`
    pub fn command(&self) -> &'static str {
        match self {
            Self::Address => "addresses",
            Self::NetworkEndpointGroup => "network-endpoint-groups",
            Self::BackendService => "backend-services",
            Self::UrlMap => "url-maps",
            Self::SslCertificate => "ssl-certificates",
            Self::TargetHttpsProxy => "target-https-proxies",
            Self::ForwardingRule => "forwarding-rules",
        }
    }

    /// Whether the collection is regional (the rest are global)
    pub fn is_regional(&self) -> bool {
        matches!(self, Self::NetworkEndpointGroup)
    }
}

impl std::fmt::Display for ComputeCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Address => "global address",
            Self::NetworkEndpointGroup => "serverless NEG",
            Self::BackendService => "backend service",
            Self::UrlMap => "URL map",
            Self::SslCertificate => "managed SSL certificate",
            Self::TargetHttpsProxy => "target HTTPS proxy",
            Self::ForwardingRule => "forwarding rule",
        };
        write!(f, "{}", label)
    }
}
