//! Runway settings
//!
//! Every value has a built-in default, so a settings file is optional. When
//! present it only needs the keys being overridden.
//!
//! ```yaml
//! region: us-central1
//! zone: us-central1-a
//! database:
//!   memory: 8GiB
//! needed_apis:
//!   - run.googleapis.com
//!   - sqladmin.googleapis.com
//! ```

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at a settings file
pub const CONFIG_ENV: &str = "RUNWAY_CONFIG";

const LOCAL_CANDIDATES: &[&str] = &["runway.local.yaml", "runway.yaml", ".runway.yaml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: String,
    pub zone: String,
    pub database: DatabaseSettings,
    /// `KEY=value` pairs used as defaults; a bare `KEY` is provided by the platform
    pub production_defaults: Vec<String>,
    /// APIs enabled on every project, in order
    pub needed_apis: Vec<String>,
    pub files: FileSettings,
    pub build: BuildSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: "europe-west1".to_string(),
            zone: "europe-west1-d".to_string(),
            database: DatabaseSettings::default(),
            production_defaults: [
                "PORT",
                // adonis
                "HOST=0.0.0.0",
                "NODE_ENV=production",
                "DRIVE_DISK=local",
                "SESSION_DRIVER=cookie",
                "CACHE_VIEWS=true",
                "DB_CONNECTION=pg",
                "PG_PORT=5432",
                "PG_USER=postgres",
                "SMTP_HOST=smtp.eu.mailgun.org",
                "SMTP_PORT=587",
                // strapi
                "DATABASE_PORT=5432",
                "DATABASE_USERNAME=postgres",
                "DATABASE_SSL=true",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            needed_apis: [
                "run.googleapis.com",
                "cloudbuild.googleapis.com",
                "secretmanager.googleapis.com",
                "sourcerepo.googleapis.com",
                "iam.googleapis.com",
                "sqladmin.googleapis.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            files: FileSettings::default(),
            build: BuildSettings::default(),
        }
    }
}

/// Cloud SQL sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub engine: String,
    pub cpu: u32,
    pub memory: String,
    /// Built-in superuser of the engine
    pub user: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "POSTGRES_15".to_string(),
            cpu: 1,
            memory: "4GiB".to_string(),
            user: "postgres".to_string(),
        }
    }
}

/// Files expected in the working directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub env_template: PathBuf,
    pub descriptor: PathBuf,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            env_template: PathBuf::from(".env"),
            descriptor: PathBuf::from("Dockerfile"),
        }
    }
}

/// Cloud Build defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub connection: String,
    pub platform: String,
    pub config_file: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            connection: "github".to_string(),
            platform: "github".to_string(),
            config_file: "cloudbuild.yaml".to_string(),
        }
    }
}

/// Runway's directory under the user config dir
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("runway"))
}

/// Locate the settings file
///
/// Search order:
/// 1. `explicit` (from `--config`), which must exist
/// 2. `RUNWAY_CONFIG` environment variable, which must exist
/// 3. current directory: runway.local.yaml, runway.yaml, .runway.yaml
/// 4. ~/.config/runway/config.yaml
///
/// Returns `None` when nothing is found; built-in defaults apply then.
pub fn find_settings_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return existing(path.to_path_buf()).map(Some);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return existing(PathBuf::from(path)).map(Some);
    }

    let current_dir = std::env::current_dir()?;
    for filename in LOCAL_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Ok(dir) = get_config_dir() {
        let global = dir.join("config.yaml");
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

fn existing(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(ConfigError::NotFound(path))
    }
}

/// Parse a settings file
pub fn load_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Discover and load settings, falling back to defaults
pub fn load(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    match find_settings_file(explicit)? {
        Some(path) => {
            tracing::debug!("Loading settings from {}", path.display());
            let settings = load_from(&path)?;
            Ok((settings, Some(path)))
        }
        None => {
            tracing::debug!("No settings file found, using defaults");
            Ok((Settings::default(), None))
        }
    }
}
