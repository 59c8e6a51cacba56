//! # memmgr
//!
//! Process memory introspection - address-space layouts, region views, and
//! typed reads and writes.
//!
//! This library provides functionality to:
//! - Enumerate the mapped regions of a process with their permissions
//! - Locate the region containing an address
//! - Read and write target memory through `/proc/<pid>/mem` or directly
//! - Snapshot region contents, or view them in place for the calling process
//! - Allocate, free and re-protect pages of the calling process
//!
//! ## Example
//!
//! ```no_run
//! use memmgr::{LinuxMemoryManager, MemoryManager, MemoryManagerExt, Mode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manager = LinuxMemoryManager::external(1234, Mode::Read)?;
//! manager.update()?;
//!
//! for region in manager.layout() {
//!     println!("{:#x}-{:#x} {} {:?}", region.base(), region.end(), region.flags(), region.name());
//! }
//!
//! if let Some(region) = manager.layout().find_region(0x5555_5555_4000) {
//!     let magic = manager.read_value::<u32>(region.base())?;
//!     println!("{:#010x}", magic);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod flags;
pub mod layout;
pub mod manager;
pub mod pod;
pub mod pointer;
pub mod region;
pub mod target;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(test)]
mod mock;

// Re-export commonly used items
#[doc(inline)]
pub use cache::{CachedByte, CachedRegion, LiveView, RegionView};
#[doc(inline)]
pub use config::ManagerConfig;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use flags::{Flags, ProtectionFlags, SharedState};
#[doc(inline)]
pub use layout::MemoryLayout;
#[doc(inline)]
pub use manager::{Capabilities, MemoryManager, MemoryManagerExt, Mode};
#[doc(inline)]
pub use pod::Pod;
#[doc(inline)]
pub use pointer::Pointer;
#[doc(inline)]
pub use region::{MappingSource, MemoryRegion};
#[doc(inline)]
pub use target::Target;

#[cfg(target_os = "linux")]
#[doc(inline)]
pub use linux::LinuxMemoryManager;
