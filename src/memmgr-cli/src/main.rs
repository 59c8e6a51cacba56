mod cli;
mod commands;
mod config;
mod pattern;
mod process;

use anyhow::{bail, Result};
use clap::Parser;
use config::Config;
use memmgr::Mode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memmgr=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Configure { proc_root, show } => {
            commands::configure::handle(cli.mode, proc_root, show)?;
        }
        command => run(command, &cli.target, cli.mode)?,
    }

    Ok(())
}

/// Run a command against the resolved target process
fn run(command: Commands, target: &TargetArgs, mode: Option<Mode>) -> Result<()> {
    let mut settings = Config::load()?.manager_config();
    if let Some(mode) = mode {
        settings.mode = mode;
    }
    let target = process::resolve(target)?;

    match command {
        Commands::Maps { json, readable } => {
            // Listing needs no memory access
            settings.mode = Mode::None;
            let manager = commands::open_manager(target, settings)?;
            commands::maps::handle_maps(&manager, json, readable)?;
        }

        Commands::Region { address } => {
            settings.mode = Mode::None;
            let manager = commands::open_manager(target, settings)?;
            commands::maps::handle_region(&manager, &address)?;
        }

        Commands::Read { address, length } => {
            let manager = commands::open_manager(target, settings)?;
            commands::raw_memory::handle_read(&manager, &address, length)?;
        }

        Commands::Write { address, bytes } => {
            let manager = commands::open_manager(target, settings)?;
            commands::raw_memory::handle_write(&manager, &address, &bytes)?;
        }

        Commands::Search { pattern, limit } => {
            let manager = commands::open_manager(target, settings)?;
            commands::raw_memory::handle_search(&manager, &pattern, limit)?;
        }

        Commands::Configure { .. } => bail!("configure does not take a target"),
    }

    Ok(())
}
