//! Environment collection
//!
//! Reads the service's env template (`KEY=default` per line), merges it with
//! the production defaults from settings, asks the operator for every value
//! and sorts each key into plain variables or secrets.
//!
//! Production defaults come in two flavours:
//!
//! ```text
//! HOST=0.0.0.0   # used as the suggested value
//! PORT           # provided by the platform at runtime, never prompted
//! ```

use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::progress;
use crate::state::ProvisioningState;
use std::path::Path;

/// Substrings that mark a key as sensitive (matched case-insensitively)
pub const SECRET_KEYWORDS: &[&str] = &[
    "PASSWORD",
    "SECRET",
    "KEY",
    "TOKEN",
    "SALT",
    "HASH",
    "PRIVATE",
    "CERT",
    "PEM",
    "AUTH",
    "PASS",
    "PIN",
    "CODE",
    "CREDENTIAL",
    "CRYPT",
];

/// One `KEY=default` line of the template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub key: String,
    pub default: String,
}

/// A key about to be prompted, with its suggested value and classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentEntry {
    pub key: String,
    pub default_value: String,
    pub is_secret: bool,
}

/// Decides whether a key should be suggested as a secret
pub trait SecretPredicate: Send + Sync {
    fn is_secret(&self, key: &str) -> bool;
}

impl<F> SecretPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_secret(&self, key: &str) -> bool {
        self(key)
    }
}

/// Substring heuristic over [`SECRET_KEYWORDS`]
///
/// Errs towards secrecy: `KEY` also matches harmless names like `CACHE_KEY_PREFIX`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            keywords: SECRET_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add more keywords on top of the defaults
    pub fn with_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords
            .extend(extra.into_iter().map(|k| k.as_ref().to_uppercase()));
        self
    }
}

impl SecretPredicate for KeywordClassifier {
    fn is_secret(&self, key: &str) -> bool {
        let upper = key.to_uppercase();
        self.keywords.iter().any(|k| upper.contains(k.as_str()))
    }
}

/// Production defaults parsed from settings
#[derive(Debug, Clone, Default)]
pub struct ProductionDefaults {
    entries: Vec<(String, String)>,
}

impl ProductionDefaults {
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let entries = lines
            .iter()
            .filter_map(|line| {
                let line = line.as_ref().trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                let (key, value) = line.split_once('=').unwrap_or((line, ""));
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Present without a value: provided by the platform, never prompted
    pub fn is_ignored(&self, key: &str) -> bool {
        self.get(key).is_some_and(str::is_empty)
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse template content; comments and malformed lines are skipped
pub fn parse_template(content: &str) -> Vec<TemplateEntry> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if !is_valid_key(key) {
                tracing::debug!("Skipping malformed template line: {}", line);
                return None;
            }
            Some(TemplateEntry {
                key: key.to_string(),
                default: unquote(value.trim()).to_string(),
            })
        })
        .collect()
}

/// Read and parse the template file
pub async fn load_template(path: &Path) -> Result<Vec<TemplateEntry>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ProvisionError::PreconditionMissing(format!(
            "cannot read env template {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(parse_template(&content))
}

/// Suggested value for a key
///
/// Production default first, then values known from earlier steps for the
/// usual database keys, then the template's own default.
pub fn default_value(
    key: &str,
    template_default: &str,
    defaults: &ProductionDefaults,
    state: &ProvisioningState,
) -> String {
    if let Some(value) = defaults.get(key) {
        return value.to_string();
    }

    let db = state.database.as_ref();
    let derived = match key {
        "PG_HOST" | "DATABASE_HOST" => db.map(|db| format!("/cloudsql/{}", db.connection_name)),
        "PG_DB_NAME" | "DATABASE_NAME" => db.and_then(|db| db.name.clone()),
        "PG_USER" | "DATABASE_USERNAME" => db.map(|db| db.user.clone()),
        "PG_PASSWORD" | "DATABASE_PASSWORD" => db.and_then(|db| db.password.clone()),
        _ => None,
    };

    derived.unwrap_or_else(|| template_default.to_string())
}

/// Keys to prompt for, in template order, with suggestions filled in
///
/// A repeated key is asked once, at its first position, with the default
/// of its last occurrence.
pub fn plan_entries(
    template: &[TemplateEntry],
    defaults: &ProductionDefaults,
    predicate: &dyn SecretPredicate,
    state: &ProvisioningState,
) -> Vec<EnvironmentEntry> {
    let mut unique: Vec<&TemplateEntry> = Vec::new();
    for entry in template {
        match unique.iter_mut().find(|seen| seen.key == entry.key) {
            Some(seen) => {
                tracing::debug!("Duplicate template key {}, keeping the last value", entry.key);
                *seen = entry;
            }
            None => unique.push(entry),
        }
    }

    unique
        .into_iter()
        .filter(|entry| !defaults.is_ignored(&entry.key))
        .map(|entry| EnvironmentEntry {
            key: entry.key.clone(),
            default_value: default_value(&entry.key, &entry.default, defaults, state),
            is_secret: predicate.is_secret(&entry.key),
        })
        .collect()
}

/// Prompt for every template key and record the answers in state
pub async fn collect(
    ctx: &Context,
    predicate: &dyn SecretPredicate,
    state: &mut ProvisioningState,
) -> Result<usize> {
    let template = load_template(&ctx.env_template_path()).await?;
    let defaults = ProductionDefaults::parse(&ctx.settings.production_defaults);
    let entries = plan_entries(&template, &defaults, predicate, state);

    for entry in &entries {
        let value = ctx.prompter.text(&entry.key, Some(entry.default_value.as_str()))?;
        let secret = ctx
            .prompter
            .confirm(&format!("Is {} a secret?", entry.key), entry.is_secret)?;
        state.push_variable(&entry.key, value, secret);
    }

    progress::detail(&format!(
        "{} variables, {} secrets",
        state.env_vars.len(),
        state.secrets.len()
    ));
    Ok(entries.len())
}
