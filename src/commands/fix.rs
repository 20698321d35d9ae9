use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::path::PathBuf;

use super::{project_dir, run_gate, GateInputs};
use license_gate::engine::Violation;
use license_gate::license::tokenize;
use license_gate::policy::storage::append_exceptions;
use license_gate::policy::{ExceptionRecord, ExceptionScope, Policy};

pub struct FixArgs {
    pub path: Option<PathBuf>,
    pub dry_run: bool,
    pub expires_in_days: i64,
    pub evidence: String,
    pub quiet: bool,
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|user| !user.trim().is_empty())
        .unwrap_or_else(|| "license-gate".to_string())
}

/// Expiry timestamp `days` after `now`; errors when it falls outside chrono's range.
fn expiry_after(now: DateTime<Utc>, days: i64) -> Result<String> {
    let expires_at = Duration::try_days(days)
        .and_then(|span| now.checked_add_signed(span))
        .with_context(|| format!("--expires-in-days {} is out of range", days))?;
    Ok(expires_at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn exception_for(
    violation: &Violation,
    now: DateTime<Utc>,
    expires_at: &str,
    args: &FixArgs,
    approver: &str,
) -> ExceptionRecord {
    let entry = &violation.entry;
    ExceptionRecord {
        package: entry.name.clone(),
        detected_licenses: tokenize(entry.license.as_deref()).into_iter().collect(),
        reason: format!("Auto-generated exception for {} ({})", entry.label(), violation.reason_type),
        approved_by: vec![approver.to_string()],
        approved_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        expires_at: Some(expires_at.to_string()),
        evidence_ref: args.evidence.clone(),
        scope: ExceptionScope::Exact {
            version: entry.version.clone(),
        },
    }
}

pub fn handle_fix(args: FixArgs) -> Result<()> {
    if args.expires_in_days <= 0 {
        anyhow::bail!("--expires-in-days must be positive");
    }

    let project_dir = project_dir(args.path.clone())?;
    let now = Utc::now();
    let expires_at = expiry_after(now, args.expires_in_days)?;
    let run = run_gate(GateInputs {
        project_dir: &project_dir,
        policy_override: None,
        now,
        upstream_limit: Some(1),
        read_manifests: false,
    })?;

    if matches!(run.policy, Policy::Legacy(_)) {
        anyhow::bail!(
            "{} uses the legacy allowlist format; migrate it to [settings] before adding exceptions",
            run.policy_path.display()
        );
    }

    if run.report.passed() {
        if !args.quiet {
            println!("No violations found, nothing to fix");
        }
        return Ok(());
    }

    let approver = current_user();
    let exceptions: Vec<ExceptionRecord> = run
        .report
        .violations
        .iter()
        .map(|violation| exception_for(violation, now, &expires_at, &args, &approver))
        .collect();

    if args.dry_run {
        if !args.quiet {
            println!("Would add {} exceptions to {}:", exceptions.len(), run.policy_path.display());
            for exception in &exceptions {
                println!("  - {} {} ({})", exception.package, exception.scope, exception.reason);
            }
        }
        return Ok(());
    }

    append_exceptions(&run.policy_path, &exceptions)?;

    if !args.quiet {
        println!("Added {} exceptions to {}:", exceptions.len(), run.policy_path.display());
        for exception in &exceptions {
            println!(
                "  ✅ {} {} - expires {}",
                exception.package,
                exception.scope,
                exception.expires_at.as_deref().unwrap_or("never")
            );
        }
    }

    Ok(())
}
