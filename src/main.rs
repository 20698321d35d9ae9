use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{handle_check, handle_config, handle_fix, handle_init, CheckArgs, FixArgs};

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "license_gate=debug"
    } else if quiet {
        "license_gate=error"
    } else {
        "license_gate=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Check {
            path,
            format,
            output,
            policy,
            at,
            upstream_limit,
            read_manifests,
            exit_zero,
        } => handle_check(CheckArgs {
            path,
            format,
            output,
            policy,
            at,
            upstream_limit,
            read_manifests,
            exit_zero,
            quiet: cli.quiet,
            verbose: cli.verbose,
        }),
        Commands::Init { preset, path, force } => handle_init(preset, path, force, cli.quiet).map(|_| true),
        Commands::Fix {
            path,
            dry_run,
            expires_in_days,
            evidence,
        } => handle_fix(FixArgs {
            path,
            dry_run,
            expires_in_days,
            evidence,
            quiet: cli.quiet,
        })
        .map(|_| true),
        Commands::Config {
            path,
            show,
            validate,
            normalize,
        } => handle_config(path, show, validate, normalize, cli.quiet).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
