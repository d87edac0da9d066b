//! Final report

use crate::state::ProvisioningState;
use colored::Colorize;
use std::fmt::Write as _;

const MASK: &str = "[secret]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

impl Section {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    fn line(mut self, label: &str, value: impl Into<String>) -> Self {
        self.lines.push((label.to_string(), value.into()));
        self
    }

    fn line_opt(self, label: &str, value: Option<&str>) -> Self {
        self.line(label, value.unwrap_or("-"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub sections: Vec<Section>,
    pub deferred_command: Option<String>,
}

impl Report {
    pub fn from_state(state: &ProvisioningState) -> Self {
        let mut sections = Vec::new();

        let project = &state.project;
        sections.push(
            Section::new("Project")
                .line("name", &project.display_name)
                .line("id", &project.id)
                .line("number", &project.number)
                .line("account", &project.account)
                .line("region", &state.region)
                .line("zone", &state.zone),
        );

        if let Some(db) = &state.database {
            sections.push(
                Section::new("Database")
                    .line("instance", &db.instance_id)
                    .line("connection", &db.connection_name)
                    .line_opt("name", db.name.as_deref())
                    .line_opt("address", db.address.as_deref())
                    .line("user", &db.user),
            );
        }

        if let Some(trigger) = &state.build_trigger {
            sections.push(
                Section::new("Build trigger")
                    .line("name", &trigger.name)
                    .line("connection", &trigger.connection)
                    .line("repository", &trigger.repository)
                    .line_opt("event", trigger.event.as_deref()),
            );
        }

        if let Some(lb) = &state.load_balancer {
            sections.push(
                Section::new("Load balancer")
                    .line("service", &lb.service)
                    .line("domain", &lb.domain)
                    .line("prefix", &lb.prefix)
                    .line_opt("address", lb.ip_address.as_deref()),
            );
        }

        if !state.env_vars.is_empty() || !state.secrets.is_empty() {
            let mut environment = Section::new("Environment");
            for var in &state.env_vars {
                environment = environment.line(&var.key, &var.value);
            }
            for secret in &state.secrets {
                environment = environment.line(&secret.key, MASK);
            }
            sections.push(environment);
        }

        if !state.created_secrets.is_empty() {
            sections.push(
                Section::new("Secrets created").line("keys", state.created_secrets.join(", ")),
            );
        }

        Self {
            sections,
            deferred_command: state.deferred_command.clone(),
        }
    }

    /// Text for the terminal, headings colored
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = writeln!(out, "{}", section.title.yellow().bold());
            for (label, value) in &section.lines {
                let _ = writeln!(out, "  {}: {}", label, value);
            }
        }
        if let Some(command) = &self.deferred_command {
            let _ = writeln!(out, "{}", "Cloud Run deploy command:".yellow().bold());
            let _ = writeln!(out, "{}", command);
        }
        out
    }
}
