//! Target process lookup

use crate::cli::TargetArgs;
use anyhow::{bail, Result};
use memmgr::Target;
use sysinfo::System;

/// Resolve the command-line target, defaulting to the memmgr process itself
pub fn resolve(args: &TargetArgs) -> Result<Target> {
    if let Some(target) = args.pid {
        return Ok(target);
    }
    match &args.name {
        Some(name) => find_process(name).map(Target::Pid),
        None => Ok(Target::CurrentProcess),
    }
}

/// Find a process whose name contains `name`
///
/// When several match, the one using the most memory is picked.
pub fn find_process(name: &str) -> Result<u32> {
    let mut system = System::new_all();
    system.refresh_all();

    let own_pid = std::process::id();
    let needle = name.to_lowercase();

    let candidates: Vec<(u32, u64)> = system
        .processes()
        .values()
        .filter(|process| process.pid().as_u32() != own_pid)
        .filter(|process| {
            process
                .name()
                .to_string_lossy()
                .to_lowercase()
                .contains(&needle)
        })
        .map(|process| (process.pid().as_u32(), process.memory()))
        .collect();

    match pick_largest(&candidates) {
        Some(pid) => {
            tracing::debug!(query = name, pid, matches = candidates.len(), "Resolved process");
            Ok(pid)
        }
        None => bail!("No running process matches '{}'", name),
    }
}

fn pick_largest(candidates: &[(u32, u64)]) -> Option<u32> {
    candidates
        .iter()
        .max_by_key(|(pid, memory)| (*memory, std::cmp::Reverse(*pid)))
        .map(|(pid, _)| *pid)
}
