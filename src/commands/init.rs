use anyhow::Result;
use std::path::PathBuf;

use super::project_dir;
use crate::cli::InitPreset;
use license_gate::init;

pub fn handle_init(preset: InitPreset, path: Option<PathBuf>, force: bool, quiet: bool) -> Result<()> {
    let init_preset = match preset {
        InitPreset::Permissive => init::InitPreset::Permissive,
        InitPreset::WeakCopyleft => init::InitPreset::WeakCopyleft,
        InitPreset::Strict => init::InitPreset::Strict,
    };

    let project_dir = project_dir(path)?;
    let policy_path = init::generate_policy_at(&project_dir, init_preset, force)?;

    if !quiet {
        println!("✅ Wrote {}", policy_path.display());
    }

    Ok(())
}
