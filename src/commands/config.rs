use anyhow::Result;
use std::path::PathBuf;

use super::project_dir;
use license_gate::config::load_config_from;
use license_gate::license::SpdxCatalog;
use license_gate::policy::storage::write_policy;
use license_gate::policy::{load_policy, Policy};

pub fn handle_config(
    path: Option<PathBuf>,
    show: bool,
    validate: bool,
    normalize: bool,
    quiet: bool,
) -> Result<()> {
    if !show && !validate && !normalize {
        anyhow::bail!("Use --show, --validate or --normalize");
    }

    let project_dir = project_dir(path)?;
    let config = load_config_from(&project_dir)?;

    if show && !quiet {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    if !validate && !normalize {
        return Ok(());
    }

    let policy_path = config.policy_path(&project_dir);
    let policy = load_policy(&policy_path, &SpdxCatalog::builtin())?;

    if validate && !quiet {
        match &policy {
            Policy::Governed(bundle) => println!(
                "✅ Configuration is valid ({}: {} license records, {} exceptions)",
                policy_path.display(),
                bundle.licenses().len(),
                bundle.exceptions().len()
            ),
            Policy::Legacy(_) => println!(
                "⚠️  {} is a legacy allowlist policy; it loads, but only in degraded mode",
                policy_path.display()
            ),
        }
    }

    if normalize {
        let Policy::Governed(bundle) = &policy else {
            anyhow::bail!("Cannot normalize legacy allowlist policy {}", policy_path.display());
        };
        write_policy(&policy_path, bundle)?;
        if !quiet {
            println!("✅ Rewrote {} in canonical order", policy_path.display());
        }
    }

    Ok(())
}
