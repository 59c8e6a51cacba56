//! Target process identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The process a manager operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// The calling process, addressed through procfs `self`
    CurrentProcess,
    /// Any process by id, always accessed out-of-process
    Pid(u32),
}

impl Target {
    pub fn is_current_process(&self) -> bool {
        matches!(self, Target::CurrentProcess)
    }

    /// Name of the target's directory under the procfs root
    pub fn proc_dir(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::CurrentProcess => f.write_str("self"),
            Target::Pid(pid) => write!(f, "{}", pid),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "self" {
            return Ok(Target::CurrentProcess);
        }
        s.parse::<u32>()
            .map(Target::Pid)
            .map_err(|_| format!("Invalid process id '{}' (expected a number or 'self')", s))
    }
}

impl From<u32> for Target {
    fn from(pid: u32) -> Self {
        Target::Pid(pid)
    }
}
