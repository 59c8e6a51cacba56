//! Address handles bound to a memory manager.

use crate::manager::MemoryManager;
use crate::pod::Pod;
use crate::{Error, Result};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use zerocopy::{FromZeros, IntoBytes};

/// A target address plus the manager that can read and write it
///
/// Equality and ordering only look at the address.
pub struct Pointer<'m, M: ?Sized> {
    manager: &'m M,
    address: usize,
}

impl<'m, M: MemoryManager + ?Sized> Pointer<'m, M> {
    pub fn new(manager: &'m M, address: usize) -> Self {
        Self { manager, address }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn manager(&self) -> &'m M {
        self.manager
    }

    /// Pointer `offset` bytes further, wrapping like raw address arithmetic
    pub fn add(&self, offset: usize) -> Self {
        Self::new(self.manager, self.address.wrapping_add(offset))
    }

    pub fn sub(&self, offset: usize) -> Self {
        Self::new(self.manager, self.address.wrapping_sub(offset))
    }

    pub fn read(&self, buffer: &mut [u8]) -> Result<()> {
        self.manager.read(self.address, buffer)
    }

    pub fn write(&self, buffer: &[u8]) -> Result<()> {
        self.manager.write(self.address, buffer)
    }

    pub fn read_value<T: Pod>(&self) -> Result<T> {
        let mut value = T::new_zeroed();
        self.read(value.as_mut_bytes())?;
        Ok(value)
    }

    /// Read into a heap allocation, for types too large for the stack
    pub fn read_boxed<T: Pod>(&self) -> Result<Box<T>> {
        let mut value = T::new_box_zeroed().map_err(|_| {
            Error::os("alloc", self.address, io::ErrorKind::OutOfMemory.into())
        })?;
        self.read(value.as_mut_bytes())?;
        Ok(value)
    }

    pub fn write_value<T: Pod>(&self, value: &T) -> Result<()> {
        self.write(value.as_bytes())
    }
}

impl<M: ?Sized> Clone for Pointer<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized> Copy for Pointer<'_, M> {}

impl<M: ?Sized> PartialEq for Pointer<'_, M> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl<M: ?Sized> Eq for Pointer<'_, M> {}

impl<M: ?Sized> PartialOrd for Pointer<'_, M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: ?Sized> Ord for Pointer<'_, M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address)
    }
}

impl<M: ?Sized> Hash for Pointer<'_, M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl<M: ?Sized> fmt::Debug for Pointer<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:#x})", self.address)
    }
}

impl<M: ?Sized> fmt::Display for Pointer<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.address)
    }
}
