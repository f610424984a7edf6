// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use devsync::cli::{Cli, Commands};
use devsync::commands;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let project = cli.project.clone();

    match cli.command {
        Commands::Detect { tools, kinds, json } => {
            commands::detect::run(&project, &tools, &kinds, json)?;
        }
        Commands::Install {
            source_dir,
            source,
            source_ref,
            strategy,
            dry_run,
        } => {
            let report = commands::install::run(
                &project,
                &source_dir,
                source.as_deref(),
                &source_ref,
                strategy.as_deref(),
                dry_run,
            )?;
            if report.has_failures() {
                std::process::exit(1);
            }
        }
        Commands::List => {
            commands::list::run(&project)?;
        }
        Commands::Uninstall {
            identity,
            kind,
            path,
            keep_file,
        } => {
            commands::uninstall::run(
                &project,
                &identity,
                kind.as_deref(),
                path.as_deref(),
                keep_file,
            )?;
        }
        Commands::Backups { days } => {
            commands::backups::list(&project, days)?;
        }
        Commands::Restore { bucket, path } => {
            commands::backups::restore(&project, &bucket, &path)?;
        }
        Commands::Prune {
            days,
            no_keep_latest,
        } => {
            commands::backups::prune(&project, days, !no_keep_latest)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
