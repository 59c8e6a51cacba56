//! Linux Memory Manager
//!
//! Synchronizes layouts from `/proc/<pid>/maps` and moves bytes through
//! `/proc/<pid>/mem`, or by direct copies when operating on the calling
//! process with direct access enabled.

pub mod mapping;
pub mod maps;

use crate::config::ManagerConfig;
use crate::flags::ProtectionFlags;
use crate::layout::MemoryLayout;
use crate::manager::{Capabilities, MemoryManager, Mode};
use crate::target::Target;
use crate::{Error, Result};

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Memory manager for a Linux process
///
/// The layout is empty until the first [`update`](MemoryManager::update).
pub struct LinuxMemoryManager {
    target: Target,
    config: ManagerConfig,
    capabilities: Capabilities,
    layout: MemoryLayout,
    mem: Option<File>,
}

impl LinuxMemoryManager {
    /// Manager for `target` that only uses the memory interface
    ///
    /// Mapping operations are unavailable even for the calling process; they
    /// need the direct access granted by [`local`](Self::local).
    pub fn open(target: Target, mode: Mode) -> Result<Self> {
        Self::with_config(target, ManagerConfig::with_mode(mode))
    }

    /// Out-of-process manager for `pid`
    pub fn external(pid: u32, mode: Mode) -> Result<Self> {
        Self::open(Target::Pid(pid), mode)
    }

    pub fn with_config(target: Target, config: ManagerConfig) -> Result<Self> {
        Self::build(target, config, false)
    }

    /// Manager for the calling process with direct access
    ///
    /// Directions not covered by `mode` copy straight from or to memory, and
    /// readable regions are viewed without copying.
    ///
    /// # Safety
    ///
    /// Every address passed to a direct read or write must be mapped with the
    /// matching permission in the calling process. Regions must not be
    /// unmapped by other code while a live view of them is in use.
    /// `deallocate` and `protect` must not touch pages still used by live
    /// objects of the calling process.
    pub unsafe fn local(mode: Mode) -> Result<Self> {
        Self::local_with_config(ManagerConfig::with_mode(mode))
    }

    /// # Safety
    ///
    /// Same contract as [`local`](Self::local).
    pub unsafe fn local_with_config(config: ManagerConfig) -> Result<Self> {
        Self::build(Target::CurrentProcess, config, true)
    }

    fn build(target: Target, config: ManagerConfig, direct: bool) -> Result<Self> {
        let capabilities = Capabilities {
            mode: config.mode,
            local: target.is_current_process(),
            direct,
        };
        let mut manager = Self {
            target,
            config,
            capabilities,
            layout: MemoryLayout::new(),
            mem: None,
        };
        manager.mem = manager.open_interface()?;
        Ok(manager)
    }

    fn target_path(&self, file: &str) -> PathBuf {
        self.config
            .proc_root
            .join(self.target.proc_dir())
            .join(file)
    }

    fn open_interface(&self) -> Result<Option<File>> {
        let mode = self.capabilities.mode;
        if mode == Mode::None {
            return Ok(None);
        }

        let path = self.target_path("mem");
        let file = OpenOptions::new()
            .read(mode.reads())
            .write(mode.writes())
            .open(&path)
            .map_err(|source| Error::TargetUnreachable {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), %mode, "Opened memory interface");
        Ok(Some(file))
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Whether the memory interface handle is currently open
    pub fn is_open(&self) -> bool {
        self.mem.is_some()
    }

    /// Release the memory interface handle
    pub fn close(&mut self) {
        if self.mem.take().is_some() {
            debug!(process = %self.target, "Closed memory interface");
        }
    }

    /// Open the memory interface again after [`close`](Self::close)
    pub fn reopen(&mut self) -> Result<()> {
        if self.mem.is_none() {
            self.mem = self.open_interface()?;
        }
        Ok(())
    }

    fn interface(&self) -> Result<&File> {
        self.mem.as_ref().ok_or(Error::InterfaceClosed)
    }

    fn require_mapping(&self, operation: &'static str) -> Result<()> {
        if self.capabilities.supports_mapping() {
            Ok(())
        } else {
            Err(Error::Unsupported { operation })
        }
    }
}

impl MemoryManager for LinuxMemoryManager {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    fn update(&mut self) -> Result<()> {
        let path = self.target_path("maps");
        let contents = fs::read_to_string(&path).map_err(|source| Error::TargetUnreachable {
            path: path.clone(),
            source,
        })?;

        let layout = maps::parse_maps(&contents)?;
        debug!(process = %self.target, regions = layout.len(), "Layout refreshed");
        self.layout = layout;
        Ok(())
    }

    fn page_granularity(&self) -> usize {
        mapping::page_size()
    }

    fn allocate(
        &mut self,
        address: Option<usize>,
        size: usize,
        protection: ProtectionFlags,
    ) -> Result<usize> {
        self.require_mapping("allocate")?;
        let base = mapping::map_anonymous(address, size, protection)?;
        debug!(base = format_args!("{:#x}", base), size, %protection, "Allocated");
        Ok(base)
    }

    fn deallocate(&mut self, address: usize, size: usize) -> Result<()> {
        self.require_mapping("deallocate")?;
        mapping::unmap(address, size)?;
        debug!(address = format_args!("{:#x}", address), size, "Deallocated");
        Ok(())
    }

    fn protect(&mut self, address: usize, size: usize, protection: ProtectionFlags) -> Result<()> {
        self.require_mapping("protect")?;
        mapping::protect(address, size, protection)?;
        debug!(address = format_args!("{:#x}", address), size, %protection, "Protected");
        Ok(())
    }

    fn read(&self, address: usize, buffer: &mut [u8]) -> Result<()> {
        trace!(address = format_args!("{:#x}", address), len = buffer.len(), "read");

        if self.capabilities.mode.reads() {
            return self
                .interface()?
                .read_exact_at(buffer, address as u64)
                .map_err(|e| Error::os("read", address, e));
        }

        if self.capabilities.direct {
            if buffer.is_empty() {
                return Ok(());
            }
            // SAFETY: direct access is only enabled through the unsafe local
            // constructors, whose callers vouch for the address
            unsafe {
                std::ptr::copy_nonoverlapping(
                    address as *const u8,
                    buffer.as_mut_ptr(),
                    buffer.len(),
                );
            }
            return Ok(());
        }

        Err(Error::Unsupported { operation: "read" })
    }

    fn write(&self, address: usize, buffer: &[u8]) -> Result<()> {
        trace!(address = format_args!("{:#x}", address), len = buffer.len(), "write");

        if self.capabilities.mode.writes() {
            return self
                .interface()?
                .write_all_at(buffer, address as u64)
                .map_err(|e| Error::os("write", address, e));
        }

        if self.capabilities.direct {
            if buffer.is_empty() {
                return Ok(());
            }
            // SAFETY: see `read`
            unsafe {
                std::ptr::copy_nonoverlapping(buffer.as_ptr(), address as *mut u8, buffer.len());
            }
            return Ok(());
        }

        Err(Error::Unsupported { operation: "write" })
    }
}
