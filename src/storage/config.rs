//! Configuration handling for nonsnapshot
//!
//! Configuration is stored in `nonsnapshot.toml` (project, found by walking
//! up from the current directory) and `~/.config/nonsnapshot/config.toml`
//! (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::UpdateStrategy;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "nonsnapshot.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// How dependency versions follow dirty modules
    pub strategy: UpdateStrategy,

    /// Base version for dirty modules (defaults to each module's current base)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<String>,

    /// Fixed revision identifier (defaults to a UTC timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Mark modules dirty when their references change
    pub propagate: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            strategy: UpdateStrategy::Always,
            base_version: None,
            revision: None,
            propagate: true,
        }
    }
}

impl ProjectConfig {
    /// Checks values serde cannot check
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.base_version {
            if base.trim().is_empty() || base.contains('-') {
                return Err(ConfigError::Invalid(format!(
                    "base_version must be a plain dotted version, got '{}'",
                    base
                )));
            }
        }
        if let Some(revision) = &self.revision {
            if revision.is_empty() || revision.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "revision must be a non-empty token without whitespace, got '{}'",
                    revision
                )));
            }
        }
        Ok(())
    }
}

/// Output format for command results
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let (project, project_root) = match Self::find_project_root() {
            Some(root) => (Self::load_project_config(&root)?, Some(root)),
            None => (ProjectConfig::default(), None),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "nonsnapshot", "nonsnapshot")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Writes a default `nonsnapshot.toml` into `root`
    ///
    /// Fails if the file already exists.
    pub fn init_project(root: &Path) -> Result<PathBuf> {
        let config_path = root.join(PROJECT_CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!("{} already exists", config_path.display());
        }

        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create directory: {}", root.display()))?;

        let content = toml::to_string_pretty(&ProjectConfig::default())
            .context("Failed to serialize project config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))?;

        Ok(config_path)
    }

    /// Finds the project root by looking for `nonsnapshot.toml`
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Finds the project root starting at `start` and walking up
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns the configured revision, or one derived from `now`
    pub fn revision_at(&self, now: DateTime<Utc>) -> String {
        self.project
            .revision
            .clone()
            .unwrap_or_else(|| now.format("%Y%m%d%H%M%S").to_string())
    }

    /// Returns the revision identifier for this run
    pub fn revision(&self) -> String {
        self.revision_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn default_config() -> Config {
        Config {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: None,
        }
    }

    #[test]
    fn defaults() {
        let config = default_config();

        assert_eq!(config.project.strategy, UpdateStrategy::Always);
        assert!(config.project.propagate);
        assert_eq!(config.global.default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
strategy = "same_major_minor"
base_version = "2.1.0"
propagate = false
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.strategy, UpdateStrategy::SameMajorMinor);
        assert_eq!(config.base_version.as_deref(), Some("2.1.0"));
        assert!(!config.propagate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str("default_format = \"json\"\n").unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result: Result<ProjectConfig, _> = toml::from_str("strategy = \"sometimes\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = ProjectConfig {
            base_version: Some("1.0-SNAPSHOT".into()),
            ..ProjectConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ProjectConfig {
            revision: Some("r 1".into()),
            ..ProjectConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn find_project_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let sub_dir = dir.path().join("module").join("src");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn for_project_reads_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "strategy = \"same_base_version\"\nrevision = \"4711\"\n",
        )
        .unwrap();

        let config = Config::for_project(dir.path()).unwrap();
        assert_eq!(config.project.strategy, UpdateStrategy::SameBaseVersion);
        assert_eq!(config.revision(), "4711");
    }

    #[test]
    fn init_project_writes_defaults_once() {
        let dir = TempDir::new().unwrap();

        let path = Config::init_project(dir.path()).unwrap();
        let config: ProjectConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.strategy, UpdateStrategy::Always);
        assert!(config.propagate);
        assert!(config.base_version.is_none());

        assert!(Config::init_project(dir.path()).is_err());
    }

    #[test]
    fn default_revision_is_timestamp() {
        let config = default_config();
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        assert_eq!(config.revision_at(now), "20240309140507");
    }
}
