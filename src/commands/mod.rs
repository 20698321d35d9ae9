pub mod check;
pub mod config;
pub mod fix;
pub mod init;

pub use check::{handle_check, CheckArgs};
pub use config::handle_config;
pub use fix::{handle_fix, FixArgs};
pub use init::handle_init;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use license_gate::config::{load_config_from, Config};
use license_gate::engine::{evaluate, CheckOptions, ComplianceReport};
use license_gate::graph::{build_graph, DEFAULT_UPSTREAM_LIMIT};
use license_gate::license::SpdxCatalog;
use license_gate::npm_lock::{FsManifests, ManifestSource, NoManifests, PackageLockParser};
use license_gate::policy::{load_policy, parse_timestamp, Policy};

/// Resolve the project directory argument, defaulting to the working directory.
pub fn project_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => {
            if !path.is_dir() {
                anyhow::bail!("Project directory not found: {}", path.display());
            }
            Ok(path)
        }
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

pub fn parse_instant(value: Option<&str>) -> Result<DateTime<Utc>> {
    match value {
        Some(value) => parse_timestamp(value)
            .ok_or_else(|| anyhow::anyhow!("Invalid --at timestamp '{}' (expected RFC 3339 or YYYY-MM-DD)", value)),
        None => Ok(Utc::now()),
    }
}

/// Everything a single gate run loaded and produced.
pub struct GateRun {
    pub config: Config,
    pub policy_path: PathBuf,
    pub policy: Policy,
    pub report: ComplianceReport,
}

pub struct GateInputs<'a> {
    pub project_dir: &'a Path,
    pub policy_override: Option<PathBuf>,
    pub now: DateTime<Utc>,
    pub upstream_limit: Option<usize>,
    pub read_manifests: bool,
}

/// Load config, lock and policy for a project and evaluate it.
pub fn run_gate(inputs: GateInputs<'_>) -> Result<GateRun> {
    let project_dir = inputs.project_dir;
    let config = load_config_from(project_dir)?;

    let lock_path = {
        let configured = config.lock_path(project_dir);
        if configured.exists() {
            configured
        } else {
            PackageLockParser::find_lock(project_dir).unwrap_or(configured)
        }
    };
    let lock = PackageLockParser::parse_file(&lock_path)?;

    let manifests: Box<dyn ManifestSource> = if inputs.read_manifests {
        let lock_dir = lock_path.parent().unwrap_or(project_dir);
        Box::new(FsManifests::new(lock_dir))
    } else {
        Box::new(NoManifests)
    };
    let graph = build_graph(&lock, manifests.as_ref())?;

    let policy_path = match inputs.policy_override {
        Some(path) => path,
        None => config.policy_path(project_dir),
    };
    let catalog = SpdxCatalog::builtin();
    let policy = load_policy(&policy_path, &catalog)?;

    let upstream_limit = inputs
        .upstream_limit
        .or(config.upstream_limit)
        .unwrap_or(DEFAULT_UPSTREAM_LIMIT);
    let report = evaluate(
        &graph,
        &policy,
        &catalog,
        CheckOptions {
            now: inputs.now,
            upstream_limit,
        },
    );

    Ok(GateRun {
        config,
        policy_path,
        policy,
        report,
    })
}
