//! tabular-train - Main Entry Point

use clap::Parser;
use tabular_train::cli::{cmd_inspect, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabular_train=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect { model }) => {
            cmd_inspect(&model)?;
        }
        None => {
            let config = cli.run.into_config()?;
            cmd_run(&config)?;
        }
    }

    Ok(())
}
