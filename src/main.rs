//! datasage - Main Entry Point

use clap::Parser;
use datasage::cli::{cmd_eda, cmd_interactive, cmd_run, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datasage=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            data,
            target,
            models_dir,
            seed,
        }) => {
            cmd_run(&data, &target, models_dir, seed)?;
        }
        Some(Commands::Eda { data, target }) => {
            cmd_eda(&data, target.as_deref())?;
        }
        Some(Commands::Train {
            data,
            target,
            models_dir,
            seed,
        }) => {
            cmd_train(&data, &target, models_dir, seed)?;
        }
        None => {
            // Default: interactive mode
            cmd_interactive()?;
        }
    }

    Ok(())
}
