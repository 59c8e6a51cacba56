//! Region byte caches and views
//!
//! A region's bytes are exposed either as an owned snapshot
//! ([`CachedRegion`]) or, for readable pages of the calling process, as a
//! zero-copy [`LiveView`]. Both iterate as [`CachedByte`]s, which pair the
//! byte value with the *target* address it was read from rather than its
//! position in the cache.

use std::marker::PhantomData;
use std::sync::Arc;

/// A byte together with the target address it represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedByte {
    pub value: u8,
    pub address: usize,
}

impl From<CachedByte> for u8 {
    fn from(byte: CachedByte) -> u8 {
        byte.value
    }
}

/// Owned snapshot of a region's bytes, populated by a single read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRegion {
    remote_address: usize,
    bytes: Box<[u8]>,
}

impl CachedRegion {
    pub fn new(remote_address: usize, bytes: Vec<u8>) -> Self {
        Self {
            remote_address,
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Target address of the first cached byte
    pub fn remote_address(&self) -> usize {
        self.remote_address
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn get(&self, index: usize) -> Option<CachedByte> {
        self.bytes.get(index).map(|&value| CachedByte {
            value,
            address: self.remote_address + index,
        })
    }

    pub fn iter(&self) -> ByteIter<'_> {
        ByteIter::new(ByteSource::Cached(self), self.len())
    }
}

impl<'a> IntoIterator for &'a CachedRegion {
    type Item = CachedByte;
    type IntoIter = ByteIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Zero-copy window onto the calling process's own memory
///
/// Bytes are fetched with volatile reads on every access, so the view always
/// reflects the current contents of the pages.
#[derive(Debug, Clone, Copy)]
pub struct LiveView<'a> {
    base: usize,
    length: usize,
    _region: PhantomData<&'a ()>,
}

impl<'a> LiveView<'a> {
    /// # Safety
    ///
    /// `[base, base + length)` must stay mapped and readable in the calling
    /// process for `'a`.
    pub(crate) unsafe fn new(base: usize, length: usize) -> Self {
        Self {
            base,
            length,
            _region: PhantomData,
        }
    }

    pub fn address(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get(&self, index: usize) -> Option<CachedByte> {
        if index >= self.length {
            return None;
        }
        let address = self.base + index;
        // SAFETY: in bounds, and the constructor contract keeps the page readable
        let value = unsafe { std::ptr::read_volatile(address as *const u8) };
        Some(CachedByte { value, address })
    }

    /// Copy the current contents out
    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().map(u8::from).collect()
    }

    pub fn iter(&self) -> ByteIter<'a> {
        ByteIter::new(ByteSource::Live(*self), self.length)
    }
}

/// Bytes of a region, as returned by [`MemoryRegion::view`](crate::MemoryRegion::view)
#[derive(Debug, Clone)]
pub enum RegionView<'a> {
    Live(LiveView<'a>),
    Cached(Arc<CachedRegion>),
}

impl RegionView<'_> {
    pub fn is_live(&self) -> bool {
        matches!(self, RegionView::Live(_))
    }

    /// Target address of the first byte
    pub fn address(&self) -> usize {
        match self {
            RegionView::Live(view) => view.address(),
            RegionView::Cached(cache) => cache.remote_address(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RegionView::Live(view) => view.len(),
            RegionView::Cached(cache) => cache.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<CachedByte> {
        match self {
            RegionView::Live(view) => view.get(index),
            RegionView::Cached(cache) => cache.get(index),
        }
    }

    /// Target address of the byte at `index`
    pub fn address_of(&self, index: usize) -> Option<usize> {
        (index < self.len()).then(|| self.address() + index)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            RegionView::Live(view) => view.to_vec(),
            RegionView::Cached(cache) => cache.bytes().to_vec(),
        }
    }

    pub fn iter(&self) -> ByteIter<'_> {
        match self {
            RegionView::Live(view) => view.iter(),
            RegionView::Cached(cache) => cache.iter(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ByteSource<'a> {
    Cached(&'a CachedRegion),
    Live(LiveView<'a>),
}

impl ByteSource<'_> {
    fn get(&self, index: usize) -> Option<CachedByte> {
        match self {
            ByteSource::Cached(cache) => cache.get(index),
            ByteSource::Live(view) => view.get(index),
        }
    }
}

/// Double-ended iterator over [`CachedByte`]s
#[derive(Debug, Clone)]
pub struct ByteIter<'a> {
    source: ByteSource<'a>,
    front: usize,
    back: usize,
}

impl<'a> ByteIter<'a> {
    fn new(source: ByteSource<'a>, len: usize) -> Self {
        Self {
            source,
            front: 0,
            back: len,
        }
    }
}

impl Iterator for ByteIter<'_> {
    type Item = CachedByte;

    fn next(&mut self) -> Option<CachedByte> {
        if self.front >= self.back {
            return None;
        }
        let byte = self.source.get(self.front);
        self.front += 1;
        byte
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for ByteIter<'_> {
    fn next_back(&mut self) -> Option<CachedByte> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.source.get(self.back)
    }
}

impl ExactSizeIterator for ByteIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_bytes_report_target_addresses() {
        let cache = CachedRegion::new(0x7f00_0000, vec![0xaa, 0xbb, 0xcc]);

        let bytes: Vec<_> = cache.iter().collect();
        assert_eq!(
            bytes,
            vec![
                CachedByte { value: 0xaa, address: 0x7f00_0000 },
                CachedByte { value: 0xbb, address: 0x7f00_0001 },
                CachedByte { value: 0xcc, address: 0x7f00_0002 },
            ]
        );
    }

    #[test]
    fn test_cache_iter_reverse_and_len() {
        let cache = CachedRegion::new(0x1000, vec![1, 2, 3, 4]);

        let reversed: Vec<u8> = cache.iter().rev().map(u8::from).collect();
        assert_eq!(reversed, vec![4, 3, 2, 1]);
        assert_eq!(cache.iter().len(), 4);

        let mut iter = cache.iter();
        assert_eq!(iter.next().map(|b| b.address), Some(0x1000));
        assert_eq!(iter.next_back().map(|b| b.address), Some(0x1003));
        assert_eq!(iter.len(), 2);
    }

    #[test]
    fn test_cache_get_out_of_bounds() {
        let cache = CachedRegion::new(0x1000, vec![1]);
        assert!(cache.get(1).is_none());
        assert!(CachedRegion::new(0x1000, Vec::new()).is_empty());
    }

    #[test]
    fn test_live_view_reads_own_memory() {
        let data = [10u8, 20, 30, 40];
        let base = data.as_ptr() as usize;
        let view = unsafe { LiveView::new(base, data.len()) };

        assert_eq!(view.to_vec(), data.to_vec());
        assert_eq!(view.get(2), Some(CachedByte { value: 30, address: base + 2 }));
        assert!(view.get(4).is_none());
    }

    #[test]
    fn test_region_view_dual_addresses() {
        let view = RegionView::Cached(Arc::new(CachedRegion::new(0x5000, vec![9, 8])));
        assert!(!view.is_live());
        assert_eq!(view.address_of(1), Some(0x5001));
        assert_eq!(view.address_of(2), None);
        assert_eq!(view.to_vec(), vec![9, 8]);

        let pairs: Vec<_> = view.iter().map(|b| (b.value, b.address)).collect();
        assert_eq!(pairs, vec![(9, 0x5000), (8, 0x5001)]);
    }
}
