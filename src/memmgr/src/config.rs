//! Manager configuration.

use crate::manager::Mode;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Settings used when constructing a manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directions routed through the memory interface
    pub mode: Mode,
    /// Root of the procfs tree holding `<target>/maps` and `<target>/mem`
    pub proc_root: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}

impl ManagerConfig {
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}
