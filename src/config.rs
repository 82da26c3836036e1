use crate::errors::{DistributeError, Result};
use crate::request::Signer;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "distribute.json";

fn default_remote() -> String {
    "origin".to_string()
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}

fn default_branch() -> String {
    "master".to_string()
}

/// Startup settings, immutable for the whole run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_repository")]
    pub repository: PathBuf,
    /// Checked out whenever a local branch has to be deleted
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Branches a commit may be distributed to
    pub branches: Vec<String>,
    pub signer: Option<Signer>,
    #[serde(default)]
    pub delete_local_branches: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DistributeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&content)?;

        // A relative repository is relative to the file it is configured in
        match path.parent() {
            Some(dir) if config.repository.is_relative() && !dir.as_os_str().is_empty() => Ok(Self {
                repository: dir.join(&config.repository),
                ..config
            }),
            _ => Ok(config),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)
            .map_err(|e| DistributeError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;

        let mut branches: Vec<String> = Vec::new();
        for branch in config.branches {
            let branch = branch.trim().to_string();
            if !branches.contains(&branch) {
                branches.push(branch);
            }
        }
        config.branches = branches;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(DistributeError::Config("remote must not be empty".to_string()));
        }
        if self.default_branch.trim().is_empty() {
            return Err(DistributeError::Config(
                "default_branch must not be empty".to_string(),
            ));
        }
        if self.branches.is_empty() {
            return Err(DistributeError::Config(
                "at least one branch must be configured".to_string(),
            ));
        }
        if let Some(branch) = self.branches.iter().find(|b| b.trim().is_empty()) {
            return Err(DistributeError::Config(format!(
                "invalid branch name '{}'",
                branch
            )));
        }
        Ok(())
    }

    /// Configured branches except `source`, optionally restricted to `only`
    pub fn target_branches(&self, source: &str, only: &[String]) -> Result<Vec<String>> {
        let only: Vec<String> = only.iter().map(|b| b.trim().to_string()).collect();
        if let Some(unknown) = only.iter().find(|b| !self.branches.contains(b)) {
            return Err(DistributeError::InvalidRequest(format!(
                "branch '{}' is not a configured branch",
                unknown
            )));
        }
        Ok(self
            .branches
            .iter()
            .filter(|b| b.as_str() != source)
            .filter(|b| only.is_empty() || only.contains(b))
            .cloned()
            .collect())
    }
}
