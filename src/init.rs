use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{set_policy_path, DEFAULT_POLICY_FILE};

#[derive(Debug, Clone, Copy)]
pub enum InitPreset {
    Permissive,
    WeakCopyleft,
    Strict,
}

/// Write the preset policy into `project_dir` and point `license-gate.toml` at it.
///
/// Refuses to overwrite an existing policy unless `force` is set, since the
/// policy file is an approval ledger.
pub fn generate_policy_at(project_dir: &Path, preset: InitPreset, force: bool) -> Result<PathBuf> {
    let policy_path = project_dir.join(DEFAULT_POLICY_FILE);

    if policy_path.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists. Use --force to replace it.",
            policy_path.display()
        ));
    }

    fs::write(&policy_path, get_preset_policy(preset))
        .with_context(|| format!("Failed to write {}", policy_path.display()))?;
    set_policy_path(project_dir, Path::new(DEFAULT_POLICY_FILE))?;

    Ok(policy_path)
}

fn get_preset_policy(preset: InitPreset) -> &'static str {
    match preset {
        InitPreset::Permissive => include_str!("../data/policy-permissive.toml"),
        InitPreset::WeakCopyleft => include_str!("../data/policy-weak-copyleft.toml"),
        InitPreset::Strict => include_str!("../data/policy-strict.toml"),
    }
}
