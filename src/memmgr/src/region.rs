//! Memory Region Types
//!
//! One contiguous, permission-uniform mapping of a target's address space.

use crate::cache::{CachedRegion, LiveView, RegionView};
use crate::flags::{Flags, SharedState};
use crate::manager::MemoryManager;
use crate::pointer::Pointer;
use crate::{Error, Result};

use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::sync::Arc;

const DELETED_SUFFIX: &str = " (deleted)";

/// File offset, device and inode columns of a maps line
///
/// All zero for anonymous mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MappingSource {
    pub offset: u64,
    pub device_major: u32,
    pub device_minor: u32,
    pub inode: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedData {
    /// Backing path or bracketed pseudo-name, without the deleted marker
    name: String,
    deleted: bool,
    special: bool,
}

impl NamedData {
    fn parse(raw: &str) -> Option<Self> {
        let (name, deleted) = match raw.strip_suffix(DELETED_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };
        if name.is_empty() {
            return None;
        }

        Some(NamedData {
            name: name.to_string(),
            deleted,
            special: name.starts_with('['),
        })
    }
}

/// A mapped address range with its permissions and origin
///
/// Regions are created by a layout refresh and never change afterwards.
/// The byte cache behind [`view`](Self::view) is the only mutable part.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    base: usize,
    length: usize,
    flags: Flags,
    sharing: SharedState,
    source: MappingSource,
    named: Option<NamedData>,
    cache: RefCell<Option<Arc<CachedRegion>>>,
}

impl MemoryRegion {
    pub fn new(base: usize, length: usize, flags: Flags) -> Self {
        Self {
            base,
            length,
            flags,
            sharing: SharedState::default(),
            source: MappingSource::default(),
            named: None,
            cache: RefCell::new(None),
        }
    }

    /// Attach the trailing maps field (path or pseudo-name)
    ///
    /// A `" (deleted)"` suffix is stripped and recorded. Bracketed names mark
    /// kernel pseudo-regions, which are never treated as readable.
    pub fn with_name(mut self, raw: &str) -> Self {
        self.named = NamedData::parse(raw);
        if self.is_special() {
            self.flags = self.flags.without_read();
        }
        self
    }

    pub fn with_sharing(mut self, sharing: SharedState) -> Self {
        self.sharing = sharing;
        self
    }

    pub fn with_source(mut self, source: MappingSource) -> Self {
        self.source = source;
        self
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Exclusive end address
    ///
    /// Wraps for a region reaching the top of the address space; layouts
    /// never hold such a region.
    pub fn end(&self) -> usize {
        self.base.wrapping_add(self.length)
    }

    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address - self.base < self.length
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn sharing(&self) -> SharedState {
        self.sharing
    }

    pub fn source(&self) -> MappingSource {
        self.source
    }

    /// Last path segment of the backing name, or the whole name
    pub fn name(&self) -> Option<&str> {
        self.named.as_ref().map(|named| {
            match named.name.rsplit_once('/') {
                Some((_, last)) if !last.is_empty() => last,
                _ => named.name.as_str(),
            }
        })
    }

    /// Backing file path, for file-backed regions only
    pub fn path(&self) -> Option<&str> {
        self.named
            .as_ref()
            .filter(|named| !named.special && named.name.starts_with('/'))
            .map(|named| named.name.as_str())
    }

    pub fn is_special(&self) -> bool {
        self.named.as_ref().is_some_and(|named| named.special)
    }

    pub fn is_deleted(&self) -> bool {
        self.named.as_ref().is_some_and(|named| named.deleted)
    }

    pub fn begin_pointer<'m, M: MemoryManager + ?Sized>(&self, manager: &'m M) -> Pointer<'m, M> {
        Pointer::new(manager, self.base)
    }

    pub fn end_pointer<'m, M: MemoryManager + ?Sized>(&self, manager: &'m M) -> Pointer<'m, M> {
        Pointer::new(manager, self.end())
    }

    /// Read the whole region into a new snapshot
    ///
    /// `manager` must be the manager whose layout this region came from.
    pub fn cache<M: MemoryManager + ?Sized>(&self, manager: &M) -> Result<CachedRegion> {
        let capabilities = manager.capabilities();
        if capabilities.requires_permissions_for_reading() && !self.flags.is_readable() {
            return Err(Error::Unsupported {
                operation: "direct read of an unreadable region",
            });
        }

        let mut bytes = vec![0u8; self.length];
        manager.read(self.base, &mut bytes)?;
        Ok(CachedRegion::new(self.base, bytes))
    }

    /// Bytes of this region without knowing the manager's backend
    ///
    /// Readable regions of a local manager with direct access are returned as
    /// a zero-copy live view unless `refresh` is set. Otherwise the stored
    /// snapshot is returned, taking a new one first if none exists or
    /// `refresh` is set. A refresh makes every view returned earlier stale.
    pub fn view<M: MemoryManager + ?Sized>(
        &self,
        manager: &M,
        refresh: bool,
    ) -> Result<RegionView<'_>> {
        let capabilities = manager.capabilities();
        if !refresh && capabilities.local && capabilities.direct && self.flags.is_readable() {
            // SAFETY: direct access was granted through an unsafe constructor
            // and the current layout reports the region as readable
            let view = unsafe { LiveView::new(self.base, self.length) };
            return Ok(RegionView::Live(view));
        }

        let mut cache = self.cache.borrow_mut();
        if let Some(snapshot) = cache.as_ref().filter(|_| !refresh) {
            return Ok(RegionView::Cached(Arc::clone(snapshot)));
        }

        let snapshot = Arc::new(self.cache(manager)?);
        *cache = Some(Arc::clone(&snapshot));
        Ok(RegionView::Cached(snapshot))
    }

    /// Drop the stored snapshot
    pub fn invalidate(&self) {
        self.cache.borrow_mut().take();
    }

    pub fn is_cached(&self) -> bool {
        self.cache.borrow().is_some()
    }
}

impl PartialEq for MemoryRegion {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.length == other.length
            && self.flags == other.flags
            && self.sharing == other.sharing
            && self.source == other.source
            && self.named == other.named
    }
}

impl Eq for MemoryRegion {}

#[derive(Serialize)]
struct RegionRecord<'a> {
    base: usize,
    end: usize,
    length: usize,
    flags: Flags,
    sharing: SharedState,
    name: Option<&'a str>,
    path: Option<&'a str>,
    special: bool,
    deleted: bool,
    source: MappingSource,
}

impl Serialize for MemoryRegion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RegionRecord {
            base: self.base,
            end: self.end(),
            length: self.length,
            flags: self.flags,
            sharing: self.sharing,
            name: self.name(),
            path: self.path(),
            special: self.is_special(),
            deleted: self.is_deleted(),
            source: self.source,
        }
        .serialize(serializer)
    }
}
