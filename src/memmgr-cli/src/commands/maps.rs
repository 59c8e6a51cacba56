//! Layout listing command handlers

use super::parse_address;
use anyhow::{Context, Result};
use memmgr::{MemoryManager, MemoryRegion};

/// Human-readable size with binary units
fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut size = bytes;
    let mut unit = 0;
    while size >= 1024 && size % 1024 == 0 && unit < UNITS.len() - 1 {
        size /= 1024;
        unit += 1;
    }
    format!("{}{}", size, UNITS[unit])
}

/// One listing line, laid out like the maps file
fn format_region(region: &MemoryRegion) -> String {
    let mut line = format!(
        "{:012x}-{:012x} {} {:>7}",
        region.base(),
        region.end(),
        region.flags(),
        format_size(region.length())
    );
    if let Some(name) = region.path().or(region.name()) {
        line.push_str("  ");
        line.push_str(name);
    }
    if region.is_deleted() {
        line.push_str(" (deleted)");
    }
    line
}

/// Handle the Maps command
pub fn handle_maps(manager: &dyn MemoryManager, json: bool, readable: bool) -> Result<()> {
    let regions: Vec<&MemoryRegion> = manager
        .layout()
        .iter()
        .filter(|region| !readable || region.flags().is_readable())
        .collect();

    if json {
        let output = serde_json::to_string_pretty(&regions).context("Failed to serialize layout")?;
        println!("{}", output);
        return Ok(());
    }

    for region in &regions {
        println!("{}", format_region(region));
    }
    let total: usize = regions.iter().map(|region| region.length()).sum();
    println!(
        "{} regions, {} mapped (process {})",
        regions.len(),
        format_size(total),
        manager.target()
    );

    Ok(())
}

/// Handle the Region command
pub fn handle_region(manager: &dyn MemoryManager, address: &str) -> Result<()> {
    let addr = parse_address(address)?;

    let Some(region) = manager.layout().find_region(addr) else {
        println!("{:#x} is not mapped", addr);
        return Ok(());
    };

    println!("Address:  {:#x} (+{:#x} into region)", addr, addr - region.base());
    println!("Region:   {:#x}-{:#x}", region.base(), region.end());
    println!("Size:     {} ({:#x})", format_size(region.length()), region.length());
    println!("Flags:    {} ({:?})", region.flags(), region.sharing());
    if let Some(name) = region.name() {
        println!("Name:     {}", name);
    }
    if let Some(path) = region.path() {
        let source = region.source();
        println!("Path:     {}", path);
        println!(
            "Source:   offset {:#x}, device {:02x}:{:02x}, inode {}",
            source.offset, source.device_major, source.device_minor, source.inode
        );
    }
    if region.is_special() {
        println!("Kernel pseudo-region");
    }
    if region.is_deleted() {
        println!("Backing file has been deleted");
    }

    Ok(())
}
