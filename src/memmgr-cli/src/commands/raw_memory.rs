//! Raw memory access command handlers
//!
//! Handlers for reading, writing and searching target memory.

use super::parse_address;
use crate::pattern::Pattern;
use anyhow::{bail, Context, Result};
use memmgr::{MemoryManager, MemoryRegion};
use std::fmt::Write as _;
use tracing::debug;

/// Regions larger than this are skipped by searches
const MAX_SEARCH_REGION: usize = 256 * 1024 * 1024;

/// Parse hex bytes from a space-separated string
fn parse_hex_bytes(bytes: &str) -> Result<Vec<u8>> {
    let data = bytes
        .split_whitespace()
        .map(|part| {
            u8::from_str_radix(part, 16).with_context(|| format!("Invalid hex byte: {}", part))
        })
        .collect::<Result<Vec<u8>>>()?;
    if data.is_empty() {
        bail!("No bytes given");
    }
    Ok(data)
}

fn format_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hex dump lines of 16 bytes, labelled with target addresses
fn hex_dump(address: usize, data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("{:012x}  ", address + i * 16);
            for j in 0..16 {
                match chunk.get(j) {
                    Some(byte) => {
                        let _ = write!(line, "{:02x} ", byte);
                    }
                    None => line.push_str("   "),
                }
                if j == 7 {
                    line.push(' ');
                }
            }
            line.push_str(" |");
            line.extend(chunk.iter().map(|&byte| {
                if byte.is_ascii_graphic() || byte == b' ' {
                    byte as char
                } else {
                    '.'
                }
            }));
            line.push('|');
            line
        })
        .collect()
}

/// Handle the Read command
pub fn handle_read(manager: &dyn MemoryManager, address: &str, length: usize) -> Result<()> {
    let addr = parse_address(address)?;
    let data = manager
        .read_bytes(addr, length)
        .with_context(|| format!("Failed to read {} bytes at {:#x}", length, addr))?;

    println!("Reading {} bytes at {:#x}:", length, addr);
    for line in hex_dump(addr, &data) {
        println!("{}", line);
    }

    Ok(())
}

/// Handle the Write command
///
/// Shows the original bytes first when the manager can read.
pub fn handle_write(manager: &dyn MemoryManager, address: &str, bytes: &str) -> Result<()> {
    let addr = parse_address(address)?;
    let data = parse_hex_bytes(bytes)?;

    println!("Writing {} bytes to {:#x}:", data.len(), addr);
    if manager.capabilities().can_read() {
        if let Ok(original) = manager.read_bytes(addr, data.len()) {
            println!("Original: {}", format_bytes(&original));
        }
    }
    println!("New:      {}", format_bytes(&data));

    manager
        .write(addr, &data)
        .with_context(|| format!("Failed to write {} bytes at {:#x}", data.len(), addr))?;
    println!("Write successful!");

    Ok(())
}

/// Search results, keeping at most the requested number of addresses
#[derive(Debug)]
struct Matches {
    addresses: Vec<usize>,
    total: usize,
}

impl Matches {
    fn with_limit(limit: usize) -> Self {
        Self {
            addresses: Vec::with_capacity(limit.min(1024)),
            total: 0,
        }
    }
}

/// Count matches of `pattern` within `region`, recording addresses up to `limit`
fn search_region(
    manager: &dyn MemoryManager,
    region: &MemoryRegion,
    pattern: &Pattern,
    limit: usize,
    matches: &mut Matches,
) -> Result<()> {
    let view = region.view(manager, false)?;
    let data = view.to_vec();
    for offset in pattern.find_iter(&data) {
        matches.total += 1;
        if matches.addresses.len() < limit {
            if let Some(byte) = view.get(offset) {
                matches.addresses.push(byte.address);
            }
        }
    }
    region.invalidate();
    Ok(())
}

/// Search every readable region of the layout
fn search(manager: &dyn MemoryManager, pattern: &Pattern, limit: usize) -> Matches {
    let capabilities = manager.capabilities();
    let mut matches = Matches::with_limit(limit);

    for region in manager.layout() {
        let unreadable =
            capabilities.requires_permissions_for_reading() && !region.flags().is_readable();
        if unreadable || region.length() > MAX_SEARCH_REGION {
            continue;
        }

        if let Err(err) = search_region(manager, region, pattern, limit, &mut matches) {
            debug!(
                base = format_args!("{:#x}", region.base()),
                error = %err,
                "Skipping region"
            );
        }
    }

    matches
}

/// Handle the Search command
pub fn handle_search(manager: &dyn MemoryManager, pattern: &str, limit: usize) -> Result<()> {
    let parsed = Pattern::parse(pattern)?;
    if !manager.capabilities().can_read() {
        bail!("Searching needs a mode that can read (try --mode read)");
    }

    println!("Searching for pattern: {}", pattern);
    let matches = search(manager, &parsed, limit);

    if matches.total == 0 {
        println!("No matches found.");
        return Ok(());
    }

    println!("Found {} matches:", matches.total);
    for (i, addr) in matches.addresses.iter().enumerate() {
        let name = manager
            .layout()
            .find_region(*addr)
            .and_then(|region| region.name())
            .unwrap_or("");
        println!("  {}: {:#x}  {}", i + 1, addr, name);
    }
    if matches.total > matches.addresses.len() {
        println!("  ... and {} more", matches.total - matches.addresses.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_manager;
    use crate::commands::tests::fake_manager;
    use memmgr::{ManagerConfig, Mode, Target};

    fn own_process(mode: Mode) -> impl MemoryManager {
        open_manager(
            Target::Pid(std::process::id()),
            ManagerConfig::with_mode(mode),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("48 8B 05").unwrap(), vec![0x48, 0x8b, 0x05]);
        assert_eq!(parse_hex_bytes("90").unwrap(), vec![0x90]);
        assert!(parse_hex_bytes("48 GG 05").is_err());
        assert!(parse_hex_bytes("   ").is_err());
    }

    #[test]
    fn test_hex_dump_layout() {
        let data: Vec<u8> = (0x41..0x41 + 18).collect();
        let lines = hex_dump(0x1000, &data);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "000000001000  41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  |ABCDEFGHIJKLMNOP|"
        );
        assert!(lines[1].starts_with("000000001010  51 52 "));
        assert!(lines[1].ends_with("|QR|"));
        assert_eq!(lines[0].len(), lines[1].len() + 14);
    }

    #[test]
    fn test_hex_dump_non_printable() {
        let lines = hex_dump(0, &[0x00, b'a', 0xff]);
        assert!(lines[0].ends_with("|.a.|"));
    }

    #[test]
    fn test_read_and_write_own_process() {
        let mut buffer = vec![0u8; 8];
        let address = buffer.as_mut_ptr() as usize;
        let manager = own_process(Mode::ReadWrite);

        handle_write(&manager, &format!("{:#x}", address), "de ad be ef").unwrap();
        handle_read(&manager, &format!("{:#x}", address), 8).unwrap();

        let written = manager.read_bytes(address, 4).unwrap();
        assert_eq!(written, vec![0xde, 0xad, 0xbe, 0xef]);
        drop(buffer);
    }

    #[test]
    fn test_write_needs_write_mode() {
        let value = 0u32;
        let manager = own_process(Mode::Read);
        let address = format!("{:#x}", &value as *const u32 as usize);
        assert!(handle_write(&manager, &address, "01").is_err());
    }

    #[test]
    fn test_search_own_process() {
        let needle: Box<[u8]> = Box::new([0x6d, 0x65, 0x6d, 0x4d, 0x47, 0x52, 0x3a, 0x7e, 0x91]);
        let expected = needle.as_ptr() as usize;
        let manager = own_process(Mode::Read);

        let pattern = Pattern::parse("6d 65 6d 4d 47 52 ?? 7e 91").unwrap();
        let matches = search(&manager, &pattern, usize::MAX);
        assert!(matches.addresses.contains(&expected));
        assert_eq!(matches.total, matches.addresses.len());
        drop(needle);
    }

    #[test]
    fn test_search_keeps_only_limit_addresses() {
        let manager = own_process(Mode::Read);
        let pattern = Pattern::parse("?? ?? ?? ??").unwrap();

        let matches = search(&manager, &pattern, 5);
        assert_eq!(matches.addresses.len(), 5);
        assert!(matches.total > 5);
        assert!(matches.addresses.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_search_without_read_mode() {
        let (_root, manager) = fake_manager();
        assert!(handle_search(&manager, "90 90", 10).is_err());
        assert!(handle_search(&manager, "zz", 10).is_err());
    }
}
