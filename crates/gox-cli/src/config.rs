use crate::errors::CliError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional project configuration file.
pub const CONFIG_FILE: &str = "gox.yml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_source_paths")]
    pub source_paths: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_source_paths() -> Vec<String> {
    vec!["src".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "gox".to_string(),
            version: default_version(),
            source_paths: default_source_paths(),
        }
    }
}

impl Config {
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        let content =
            std::fs::read_to_string(&config_path).map_err(|e| CliError::ConfigLoadError {
                path: config_path.clone(),
                source: e.into(),
            })?;

        serde_yaml::from_str(&content).map_err(|e| {
            CliError::ConfigLoadError {
                path: config_path,
                source: e.into(),
            }
            .into()
        })
    }

    /// Load the project config, falling back to defaults when no `gox.yml`
    /// exists. A present-but-malformed file is still an error.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        if project_dir.join(CONFIG_FILE).exists() {
            Self::load(project_dir)
        } else {
            Ok(Self::default())
        }
    }
}

/// Find the gox project root by looking for gox.yml or a src/ directory.
pub fn find_project_root(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();

    // Walk up max 5 levels
    for _ in 0..5 {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }

        if current.join("src").is_dir() {
            return Ok(current);
        }

        if let Some(parent) = current.parent() {
            current = parent.to_path_buf();
        } else {
            break;
        }
    }

    Err(CliError::ProjectRootNotFound.into())
}
