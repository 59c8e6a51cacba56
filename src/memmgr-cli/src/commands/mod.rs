//! Command implementations for the memmgr CLI

pub mod configure;
pub mod maps;
pub mod raw_memory;

use anyhow::{Context, Result};
use memmgr::{LinuxMemoryManager, ManagerConfig, MemoryManager, Target};

/// Open a manager for `target` and load its layout
pub fn open_manager(target: Target, config: ManagerConfig) -> Result<LinuxMemoryManager> {
    let mode = config.mode;
    let mut manager = LinuxMemoryManager::with_config(target, config)
        .with_context(|| format!("Failed to open process {} ({} mode)", target, mode))?;
    manager
        .update()
        .with_context(|| format!("Failed to read memory layout of process {}", target))?;
    Ok(manager)
}

/// Parse a hex (0x prefix) or decimal address
pub fn parse_address(address: &str) -> Result<usize> {
    match address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).context("Invalid hex address"),
        None => address.parse::<usize>().context("Invalid address"),
    }
}
