//! Page mapping primitives for the calling process.

use crate::flags::ProtectionFlags;
use crate::{Error, Result};

use libc::{c_int, c_void};
use std::io;
use std::sync::OnceLock;

const FALLBACK_PAGE_SIZE: usize = 4096;

/// System page size, queried once per process
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no preconditions
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(size)
            .ok()
            .filter(|&size| size > 0)
            .unwrap_or(FALLBACK_PAGE_SIZE)
    })
}

fn to_posix(protection: ProtectionFlags) -> c_int {
    let mut prot = libc::PROT_NONE;
    if protection.is_readable() {
        prot |= libc::PROT_READ;
    }
    if protection.is_writable() {
        prot |= libc::PROT_WRITE;
    }
    if protection.is_executable() {
        prot |= libc::PROT_EXEC;
    }
    prot
}

/// Map anonymous private memory, at exactly `address` if given
pub fn map_anonymous(
    address: Option<usize>,
    size: usize,
    protection: ProtectionFlags,
) -> Result<usize> {
    let mut flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
    let hint = match address {
        Some(address) => {
            flags |= libc::MAP_FIXED_NOREPLACE;
            address as *mut c_void
        }
        None => std::ptr::null_mut(),
    };

    // SAFETY: anonymous mapping without MAP_FIXED never replaces existing pages
    let result = unsafe { libc::mmap(hint, size, to_posix(protection), flags, -1, 0) };
    if result == libc::MAP_FAILED {
        let err = io::Error::last_os_error();
        return match (address, err.raw_os_error()) {
            (Some(address), Some(libc::EEXIST)) => Err(Error::AddressInUse { address }),
            _ => Err(Error::os("mmap", address.unwrap_or(0), err)),
        };
    }

    let base = result as usize;
    if let Some(requested) = address {
        // Kernels before 4.17 treat MAP_FIXED_NOREPLACE as a plain hint
        if base != requested {
            discard(base, size);
            return Err(Error::AddressInUse { address: requested });
        }
    }

    Ok(base)
}

/// Drop a mapping that was placed somewhere other than requested
fn discard(base: usize, size: usize) {
    // SAFETY: only called on a mapping we just created that nothing refers to
    let result = unsafe { libc::munmap(base as *mut c_void, size) };
    if result == -1 {
        tracing::warn!(
            address = format_args!("{:#x}", base),
            size,
            error = %io::Error::last_os_error(),
            "Failed to release misplaced mapping"
        );
    }
}

pub fn unmap(address: usize, size: usize) -> Result<()> {
    // SAFETY: the caller owns the pages; munmap validates the range itself
    let result = unsafe { libc::munmap(address as *mut c_void, size) };
    if result == -1 {
        return Err(Error::os("munmap", address, io::Error::last_os_error()));
    }
    Ok(())
}

pub fn protect(address: usize, size: usize, protection: ProtectionFlags) -> Result<()> {
    // SAFETY: mprotect validates the range and never touches page contents
    let result = unsafe { libc::mprotect(address as *mut c_void, size, to_posix(protection)) };
    if result == -1 {
        return Err(Error::os("mprotect", address, io::Error::last_os_error()));
    }
    Ok(())
}
