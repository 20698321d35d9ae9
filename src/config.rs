use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::DEFAULT_UPSTREAM_LIMIT;

pub const CONFIG_FILE: &str = "license-gate.toml";
pub const DEFAULT_POLICY_FILE: &str = "license-policy.toml";
pub const DEFAULT_LOCK_FILE: &str = "package-lock.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Output format (table, json)
    pub format: Option<String>,

    /// Policy file, relative to the project directory
    pub policy: Option<PathBuf>,

    /// Lock file, relative to the project directory
    pub lockfile: Option<PathBuf>,

    /// Upstream chains reported per violation
    pub upstream_limit: Option<usize>,

    /// Exit non-zero when violations are found
    pub fail_on_violations: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: Some("table".to_string()),
            policy: Some(PathBuf::from(DEFAULT_POLICY_FILE)),
            lockfile: Some(PathBuf::from(DEFAULT_LOCK_FILE)),
            upstream_limit: Some(DEFAULT_UPSTREAM_LIMIT),
            fail_on_violations: Some(true),
        }
    }
}

impl Config {
    /// Fill unset fields from the defaults.
    fn with_defaults(self) -> Self {
        let defaults = Config::default();
        Self {
            format: self.format.or(defaults.format),
            policy: self.policy.or(defaults.policy),
            lockfile: self.lockfile.or(defaults.lockfile),
            upstream_limit: self.upstream_limit.or(defaults.upstream_limit),
            fail_on_violations: self.fail_on_violations.or(defaults.fail_on_violations),
        }
    }

    pub fn policy_path(&self, project_dir: &Path) -> PathBuf {
        let policy = self.policy.as_deref().unwrap_or(Path::new(DEFAULT_POLICY_FILE));
        project_dir.join(policy)
    }

    pub fn lock_path(&self, project_dir: &Path) -> PathBuf {
        let lockfile = self.lockfile.as_deref().unwrap_or(Path::new(DEFAULT_LOCK_FILE));
        project_dir.join(lockfile)
    }
}

/// Load `license-gate.toml` from `project_dir`; a missing file means defaults.
pub fn load_config_from(project_dir: &Path) -> Result<Config> {
    let config_path = project_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    if let Some(format) = config.format.as_deref() {
        if !matches!(format, "table" | "json") {
            anyhow::bail!("Unknown format '{}' in {} (expected table or json)", format, config_path.display());
        }
    }

    Ok(config.with_defaults())
}

/// Point `license-gate.toml` at `policy`, keeping the rest of the file intact.
pub fn set_policy_path(project_dir: &Path, policy: &Path) -> Result<()> {
    let config_path = project_dir.join(CONFIG_FILE);
    let existing = if config_path.exists() {
        fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?
    } else {
        String::new()
    };

    let mut doc = existing
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    doc["policy"] = toml_edit::value(policy.to_string_lossy().into_owned());

    fs::write(&config_path, doc.to_string())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    Ok(())
}
