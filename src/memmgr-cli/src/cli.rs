//! CLI argument definitions for memmgr

use clap::{Args, Parser, Subcommand};
use memmgr::{Mode, Target};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memmgr")]
#[command(about = "Inspect the memory layout and contents of a Linux process", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Memory interface mode: none, read, write or rw (overrides the configured default)
    #[arg(long, global = true)]
    pub mode: Option<Mode>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Target process id, or "self" for the memmgr process
    #[arg(short, long, global = true, conflicts_with = "name")]
    pub pid: Option<Target>,

    /// Target process name (largest matching process wins)
    #[arg(short, long, global = true)]
    pub name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the mapped regions of the target
    #[command(visible_alias = "m")]
    Maps {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Only show readable regions
        #[arg(short, long)]
        readable: bool,
    },

    /// Show the region containing an address
    Region {
        /// Address (hex with 0x prefix, or decimal)
        address: String,
    },

    /// Hex dump target memory
    #[command(visible_alias = "r")]
    Read {
        /// Address (hex with 0x prefix, or decimal)
        address: String,

        /// Number of bytes to read
        #[arg(default_value = "256")]
        length: usize,
    },

    /// Write bytes to target memory
    #[command(visible_alias = "w")]
    Write {
        /// Address (hex with 0x prefix, or decimal)
        address: String,

        /// Hex bytes (e.g. "90 90 90")
        bytes: String,
    },

    /// Search readable regions for a byte pattern
    #[command(visible_alias = "s")]
    Search {
        /// Hex bytes with ?? wildcards (e.g. "48 8B 05 ?? ?? ?? ??")
        pattern: String,

        /// Maximum number of matches to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Configure default settings (`--mode` sets the default mode)
    #[command(visible_alias = "c")]
    Configure {
        /// Set default procfs root
        #[arg(long)]
        proc_root: Option<PathBuf>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}
