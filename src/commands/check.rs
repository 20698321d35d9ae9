use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::{parse_instant, project_dir, run_gate, GateInputs};
use crate::cli::OutputFormat;
use license_gate::output::{format_json_output, format_table_output};

pub struct CheckArgs {
    pub path: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    pub at: Option<String>,
    pub upstream_limit: Option<usize>,
    pub read_manifests: bool,
    pub exit_zero: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// Run the gate. Returns whether the process should exit successfully.
pub fn handle_check(args: CheckArgs) -> Result<bool> {
    let project_dir = project_dir(args.path)?;
    let now = parse_instant(args.at.as_deref())?;

    let run = run_gate(GateInputs {
        project_dir: &project_dir,
        policy_override: args.policy,
        now,
        upstream_limit: args.upstream_limit,
        read_manifests: args.read_manifests,
    })?;
    let report = &run.report;

    // CLI arguments override config values
    let format = args.format.unwrap_or(match run.config.format.as_deref() {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Table,
    });

    let output_content = match format {
        OutputFormat::Json => format_json_output(report)?,
        OutputFormat::Table => format_table_output(report, args.verbose),
    };

    match args.output {
        Some(path) => fs::write(&path, output_content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?,
        None => {
            if !args.quiet {
                println!("{}", output_content);
            }
        }
    }

    if report.passed() {
        return Ok(true);
    }

    if !args.quiet {
        eprintln!(
            "License violations found: {} of {} evaluated dependencies",
            report.summary.violations, report.summary.evaluated
        );
    }

    let fail = run.config.fail_on_violations.unwrap_or(true);
    Ok(args.exit_zero || !fail)
}
