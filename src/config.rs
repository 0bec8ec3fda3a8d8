use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::nav::NavConfig;
use crate::record::LogLevel;

/// Whether log calls echo locally or ship to the ingestion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

fn default_level() -> LogLevel {
    LogLevel::Info
}

fn default_component() -> String {
    "backend".to_string()
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3000/api/logs".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_max_size_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_age_days() -> u32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            max_size_bytes: default_max_size_bytes(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl FilesConfig {
    /// Error-only output, `logs/fitness-app-error.log`.
    pub fn error_path(&self) -> PathBuf {
        self.dir.join("fitness-app-error.log")
    }

    /// Combined output that captures every level, `logs/fitness-app.log`.
    pub fn combined_path(&self) -> PathBuf {
        self.dir.join("fitness-app.log")
    }
}

/// Resolved once at startup and threaded through constructors; nothing else
/// in the crate reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub mode: Mode,
    #[serde(default = "default_level")]
    pub level: LogLevel,
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub nav: NavConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            level: default_level(),
            component: default_component(),
            endpoint: default_endpoint(),
            listen: default_listen(),
            files: FilesConfig::default(),
            nav: NavConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, expanding `${VAR}` patterns with
    /// environment variable values first. A missing file falls back to
    /// defaults; invalid YAML is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let expanded = expand_env_vars(&contents);
                Ok(serde_yaml::from_str(&expanded)?)
            }
            Err(_) => {
                tracing::info!("no config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }
}

/// Expand `${VAR_NAME}` patterns in a string with environment variable values.
/// Unknown vars become empty strings.
fn expand_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..start],
            value,
            &result[start + end + 1..]
        );
    }
    result
}
