//! Memory Manager Trait
//!
//! The contract shared by every backend: layout access and refresh, page
//! mapping, and byte-exact reads and writes. What a particular manager can do
//! is described by its [`Capabilities`], so callers can decide up front
//! instead of probing.

use crate::flags::ProtectionFlags;
use crate::layout::MemoryLayout;
use crate::pod::Pod;
use crate::pointer::Pointer;
use crate::target::Target;
use crate::Result;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directions served by the out-of-process memory interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    None,
    Read,
    Write,
    #[default]
    ReadWrite,
}

impl Mode {
    pub fn reads(self) -> bool {
        matches!(self, Mode::Read | Mode::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Mode::Write | Mode::ReadWrite)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::None => "none",
            Mode::Read => "read",
            Mode::Write => "write",
            Mode::ReadWrite => "read-write",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "-" => Ok(Mode::None),
            "read" | "r" => Ok(Mode::Read),
            "write" | "w" => Ok(Mode::Write),
            "read-write" | "rw" => Ok(Mode::ReadWrite),
            other => Err(format!("Unknown mode '{}' (expected none, read, write or rw)", other)),
        }
    }
}

/// What a manager can do, fixed when it is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Directions that go through the memory interface
    pub mode: Mode,
    /// The target is the calling process
    pub local: bool,
    /// Directions not covered by `mode` may copy directly in-process
    pub direct: bool,
}

impl Capabilities {
    pub fn can_read(&self) -> bool {
        self.mode.reads() || self.direct
    }

    pub fn can_write(&self) -> bool {
        self.mode.writes() || self.direct
    }

    /// Reads are direct copies and fault on pages without read permission
    pub fn requires_permissions_for_reading(&self) -> bool {
        self.direct && !self.mode.reads()
    }

    /// Writes are direct copies and fault on pages without write permission
    pub fn requires_permissions_for_writing(&self) -> bool {
        self.direct && !self.mode.writes()
    }

    /// Copies are required; target addresses are not usable as local pointers
    pub fn is_remote_address_space(&self) -> bool {
        !self.local
    }

    /// allocate/deallocate/protect are available
    ///
    /// Only managers with direct access may change the caller's own
    /// mappings, since unmapping or protecting pages in use is undefined.
    pub fn supports_mapping(&self) -> bool {
        self.local && self.direct
    }
}

/// Trait for inspecting and manipulating a target's memory
pub trait MemoryManager {
    fn capabilities(&self) -> Capabilities;

    fn target(&self) -> &Target;

    /// The layout from the most recent [`update`](Self::update)
    ///
    /// Empty until the first update.
    fn layout(&self) -> &MemoryLayout;

    /// Re-synchronize the layout from the target
    ///
    /// Every region and view borrowed from the previous layout is stale
    /// afterwards. On failure the previous layout is kept as it was.
    fn update(&mut self) -> Result<()>;

    /// Smallest unit that can be mapped or protected
    fn page_granularity(&self) -> usize;

    /// Map a new region and return its base address
    ///
    /// With `Some(address)` the mapping is placed exactly there (page aligned)
    /// and fails with [`Error::AddressInUse`](crate::Error::AddressInUse)
    /// instead of displacing an existing mapping. `size` may be rounded up to
    /// the page granularity.
    fn allocate(
        &mut self,
        address: Option<usize>,
        size: usize,
        protection: ProtectionFlags,
    ) -> Result<usize>;

    /// `address` must be page aligned
    fn deallocate(&mut self, address: usize, size: usize) -> Result<()>;

    /// `address` must be page aligned
    fn protect(&mut self, address: usize, size: usize, protection: ProtectionFlags)
        -> Result<()>;

    /// Fill `buffer` from target memory at `address`
    fn read(&self, address: usize, buffer: &mut [u8]) -> Result<()>;

    /// Copy `buffer` to target memory at `address`
    fn write(&self, address: usize, buffer: &[u8]) -> Result<()>;

    /// Read `size` bytes into a new buffer
    fn read_bytes(&self, address: usize, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.read(address, &mut buffer)?;
        Ok(buffer)
    }
}

/// Typed helpers layered over the byte primitives
pub trait MemoryManagerExt: MemoryManager {
    fn pointer(&self, address: usize) -> Pointer<'_, Self> {
        Pointer::new(self, address)
    }

    fn read_value<T: Pod>(&self, address: usize) -> Result<T> {
        self.pointer(address).read_value()
    }

    /// Read into a heap allocation, for types too large for the stack
    fn read_boxed<T: Pod>(&self, address: usize) -> Result<Box<T>> {
        self.pointer(address).read_boxed()
    }

    fn write_value<T: Pod>(&self, address: usize, value: &T) -> Result<()> {
        self.pointer(address).write_value(value)
    }

    /// Read a null-terminated string of at most `max_len` bytes
    fn read_cstring(&self, address: usize, max_len: usize) -> Result<String> {
        let bytes = self.read_bytes(address, max_len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).to_string())
    }
}

impl<M: MemoryManager + ?Sized> MemoryManagerExt for M {}
