//! Mock Memory Manager
//!
//! An in-memory manager over a byte buffer, for testing code layered on
//! the manager contract.

use crate::flags::{Flags, ProtectionFlags};
use crate::layout::MemoryLayout;
use crate::manager::{Capabilities, MemoryManager, Mode};
use crate::region::MemoryRegion;
use crate::target::Target;
use crate::{Error, Result};

use std::cell::RefCell;

pub struct MockMemoryManager {
    data: RefCell<Vec<u8>>,
    base_address: usize,
    layout: MemoryLayout,
    pending: Option<MemoryLayout>,
    target: Target,
}

impl MockMemoryManager {
    /// Create a mock with `data` mapped read-write at `base_address`
    pub fn new(data: Vec<u8>, base_address: usize) -> Self {
        let mut layout = MemoryLayout::new();
        if !data.is_empty() {
            let region =
                MemoryRegion::new(base_address, data.len(), Flags::from_permissions("rw-p"));
            layout.insert(region).expect("single region never overlaps");
        }
        Self {
            data: RefCell::new(data),
            base_address,
            layout,
            pending: None,
            target: Target::Pid(4242),
        }
    }

    /// Layout that the next `update` will install
    pub fn stage_layout(&mut self, layout: MemoryLayout) {
        self.pending = Some(layout);
    }

    fn offset(&self, address: usize, size: usize) -> Result<usize> {
        let len = self.data.borrow().len();
        address
            .checked_sub(self.base_address)
            .filter(|offset| offset.checked_add(size).is_some_and(|end| end <= len))
            .ok_or_else(|| {
                Error::os(
                    "mock access",
                    address,
                    std::io::Error::from_raw_os_error(libc::EIO),
                )
            })
    }
}

impl MemoryManager for MockMemoryManager {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            mode: Mode::ReadWrite,
            local: false,
            direct: false,
        }
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    fn update(&mut self) -> Result<()> {
        if let Some(layout) = self.pending.take() {
            self.layout = layout;
        }
        Ok(())
    }

    fn page_granularity(&self) -> usize {
        0x1000
    }

    fn allocate(&mut self, _: Option<usize>, _: usize, _: ProtectionFlags) -> Result<usize> {
        Err(Error::Unsupported {
            operation: "allocate",
        })
    }

    fn deallocate(&mut self, _: usize, _: usize) -> Result<()> {
        Err(Error::Unsupported {
            operation: "deallocate",
        })
    }

    fn protect(&mut self, _: usize, _: usize, _: ProtectionFlags) -> Result<()> {
        Err(Error::Unsupported {
            operation: "protect",
        })
    }

    fn read(&self, address: usize, buffer: &mut [u8]) -> Result<()> {
        let offset = self.offset(address, buffer.len())?;
        buffer.copy_from_slice(&self.data.borrow()[offset..offset + buffer.len()]);
        Ok(())
    }

    fn write(&self, address: usize, buffer: &[u8]) -> Result<()> {
        let offset = self.offset(address, buffer.len())?;
        self.data.borrow_mut()[offset..offset + buffer.len()].copy_from_slice(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_read_write() {
        let manager = MockMemoryManager::new(vec![0x41, 0x42, 0x43, 0x44], 0x1000);

        assert_eq!(manager.read_bytes(0x1001, 2).unwrap(), vec![0x42, 0x43]);
        manager.write(0x1002, &[0xff]).unwrap();
        assert_eq!(manager.read_bytes(0x1000, 4).unwrap(), vec![0x41, 0x42, 0xff, 0x44]);
    }

    #[test]
    fn test_mock_out_of_bounds() {
        let manager = MockMemoryManager::new(vec![0; 4], 0x1000);
        assert!(manager.read_bytes(0x1002, 10).unwrap_err().is_os());
        assert!(manager.read_bytes(0x500, 4).is_err());
        assert!(manager.write(0x1004, &[1]).is_err());
    }

    #[test]
    fn test_update_installs_staged_layout() {
        let mut manager = MockMemoryManager::new(vec![0; 0x100], 0x1000);
        let mut staged = MemoryLayout::new();
        staged
            .insert(MemoryRegion::new(0x8000, 0x1000, Flags::from_permissions("r-xp")))
            .unwrap();
        staged
            .insert(MemoryRegion::new(0xa000, 0x2000, Flags::from_permissions("rw-p")))
            .unwrap();

        manager.stage_layout(staged);
        assert_eq!(manager.layout().len(), 1);
        assert!(manager.layout().find_region(0x1000).is_some());

        manager.update().unwrap();
        let layout = manager.layout();
        assert_eq!(layout.len(), 2);
        assert!(layout.find_region(0x1000).is_none());
        assert!(layout.find_region(0x8fff).unwrap().flags().is_executable());
        assert_eq!(layout.find_region(0xb000).unwrap().base(), 0xa000);

        // Nothing staged: the layout stays as installed
        manager.update().unwrap();
        assert_eq!(manager.layout().len(), 2);
    }

    #[test]
    fn test_mock_mapping_unsupported() {
        let mut manager = MockMemoryManager::new(vec![0; 4], 0x1000);
        let err = manager
            .allocate(None, 0x1000, ProtectionFlags::READ_WRITE)
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(manager.deallocate(0x1000, 0x1000).unwrap_err().is_unsupported());
        assert!(manager
            .protect(0x1000, 0x1000, ProtectionFlags::READ)
            .unwrap_err()
            .is_unsupported());
    }
}
