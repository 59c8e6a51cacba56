//! Plain-old-data bound for typed reads and writes.

use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Types that can be copied to and from raw target memory byte for byte
///
/// Implemented for every type zerocopy can convert in both directions.
/// Derive `FromBytes`, `IntoBytes` and `Immutable` on a `#[repr(C)]` struct
/// to read it in one call.
pub trait Pod: FromBytes + IntoBytes + Immutable {}

impl<T: FromBytes + IntoBytes + Immutable> Pod for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::{FromZeros, KnownLayout};

    #[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Debug, PartialEq)]
    #[repr(C)]
    struct Header {
        magic: u32,
        count: u16,
        flags: u16,
    }

    fn assert_pod<T: Pod>() {}

    #[test]
    fn test_primitives_and_arrays_are_pod() {
        assert_pod::<u8>();
        assert_pod::<i64>();
        assert_pod::<f64>();
        assert_pod::<usize>();
        assert_pod::<[u32; 16]>();
        assert_pod::<Header>();
    }

    #[test]
    fn test_struct_bytes_native_order() {
        let header = Header {
            magic: 0x0403_0201,
            count: 7,
            flags: 0,
        };
        assert_eq!(&header.as_bytes()[..4], &0x0403_0201_u32.to_ne_bytes());

        let mut copy = Header::new_zeroed();
        copy.as_mut_bytes().copy_from_slice(header.as_bytes());
        assert_eq!(copy, header);
    }
}
