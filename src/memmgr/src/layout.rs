//! Address-space layout: non-overlapping regions ordered by base address.

use crate::region::MemoryRegion;
use crate::{Error, Result};

use std::collections::btree_map::{self, BTreeMap};

/// The complete set of regions of a target at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLayout {
    regions: BTreeMap<usize, MemoryRegion>,
}

impl MemoryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region, rejecting empty ones and any overlap with existing regions
    pub fn insert(&mut self, region: MemoryRegion) -> Result<()> {
        let invalid = Error::InvalidRegion {
            base: region.base(),
            length: region.length(),
        };
        if region.length() == 0 || region.base().checked_add(region.length()).is_none() {
            return Err(invalid);
        }

        let overlaps_previous = self
            .regions
            .range(..=region.base())
            .next_back()
            .is_some_and(|(_, previous)| previous.end() > region.base());
        let overlaps_next = self
            .regions
            .range(region.base()..)
            .next()
            .is_some_and(|(&base, _)| base < region.end());
        if overlaps_previous || overlaps_next {
            return Err(invalid);
        }

        self.regions.insert(region.base(), region);
        Ok(())
    }

    /// The region containing `address`, if any
    ///
    /// The end of a region is exclusive: `base + length` belongs to the next
    /// region, never to this one.
    pub fn find_region(&self, address: usize) -> Option<&MemoryRegion> {
        self.regions
            .range(..=address)
            .next_back()
            .map(|(_, region)| region)
            .filter(|region| region.contains(address))
    }

    /// The region starting exactly at `base`
    pub fn get(&self, base: usize) -> Option<&MemoryRegion> {
        self.regions.get(&base)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.regions.values(),
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn first(&self) -> Option<&MemoryRegion> {
        self.regions.values().next()
    }

    pub fn last(&self) -> Option<&MemoryRegion> {
        self.regions.values().next_back()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }
}

/// Regions in ascending base-address order
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: btree_map::Values<'a, usize, MemoryRegion>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a MemoryRegion;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a MemoryLayout {
    type Item = &'a MemoryRegion;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
