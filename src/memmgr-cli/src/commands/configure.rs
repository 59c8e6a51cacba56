//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting memmgr CLI defaults.

use crate::config::Config;
use anyhow::Result;
use memmgr::Mode;
use std::path::PathBuf;

/// Handle the configure command
pub fn handle(mode: Option<Mode>, proc_root: Option<PathBuf>, show: bool) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if !apply(&mut config, mode, proc_root) {
        show_usage();
        return Ok(());
    }

    config.save()?;
    show_config(&config);
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

/// Apply the given settings, returning whether anything was set
fn apply(config: &mut Config, mode: Option<Mode>, proc_root: Option<PathBuf>) -> bool {
    let changed = mode.is_some() || proc_root.is_some();
    if mode.is_some() {
        config.mode = mode;
    }
    if proc_root.is_some() {
        config.proc_root = proc_root;
    }
    changed
}

fn show_config(config: &Config) {
    let effective = config.manager_config();
    println!(
        "Mode:       {}{}",
        effective.mode,
        if config.mode.is_none() { " (default)" } else { "" }
    );
    println!(
        "Proc root:  {}{}",
        effective.proc_root.display(),
        if config.proc_root.is_none() { " (default)" } else { "" }
    );

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

fn show_usage() {
    println!("Usage: memmgr configure --mode <none|read|write|rw>");
    println!("   or: memmgr configure --proc-root <path>");
    println!("   or: memmgr configure --show");
}
