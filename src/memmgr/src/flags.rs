//! Page permission flags
//!
//! Two forms exist: [`ProtectionFlags`] (read/write/execute) is what callers
//! request when allocating or protecting pages, [`Flags`] additionally carries
//! the private bit observed in `/proc/<pid>/maps`.
//!
//! Parsing is deliberately lenient. Any character other than the expected
//! letter at a position, or a missing character, leaves that bit unset.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const READ: u8 = 1 << 0;
const WRITE: u8 = 1 << 1;
const EXECUTE: u8 = 1 << 2;
const PRIVATE: u8 = 1 << 3;

fn parse_bits(permissions: &str, letters: &[u8]) -> u8 {
    let bytes = permissions.as_bytes();
    letters
        .iter()
        .enumerate()
        .filter(|(i, letter)| bytes.get(*i) == Some(*letter))
        .fold(0, |bits, (i, _)| bits | (1u8 << i))
}

fn render_bits(f: &mut fmt::Formatter<'_>, bits: u8, letters: &[u8]) -> fmt::Result {
    for (i, letter) in letters.iter().enumerate() {
        let c = if bits & (1u8 << i) != 0 {
            *letter as char
        } else {
            '-'
        };
        write!(f, "{}", c)?;
    }
    Ok(())
}

/// Requested page protection (`rwx`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProtectionFlags {
    bits: u8,
}

impl ProtectionFlags {
    pub const NONE: Self = Self { bits: 0 };
    pub const READ: Self = Self { bits: READ };
    pub const READ_WRITE: Self = Self { bits: READ | WRITE };
    pub const READ_EXECUTE: Self = Self {
        bits: READ | EXECUTE,
    };
    pub const ALL: Self = Self {
        bits: READ | WRITE | EXECUTE,
    };

    pub fn new(readable: bool, writable: bool, executable: bool) -> Self {
        let mut bits = 0;
        if readable {
            bits |= READ;
        }
        if writable {
            bits |= WRITE;
        }
        if executable {
            bits |= EXECUTE;
        }
        Self { bits }
    }

    /// Parse 3-character `rwx` notation
    pub fn from_permissions(permissions: &str) -> Self {
        Self {
            bits: parse_bits(permissions, b"rwx"),
        }
    }

    pub fn is_readable(&self) -> bool {
        self.bits & READ != 0
    }

    pub fn is_writable(&self) -> bool {
        self.bits & WRITE != 0
    }

    pub fn is_executable(&self) -> bool {
        self.bits & EXECUTE != 0
    }
}

impl From<&str> for ProtectionFlags {
    fn from(permissions: &str) -> Self {
        Self::from_permissions(permissions)
    }
}

impl fmt::Display for ProtectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_bits(f, self.bits, b"rwx")
    }
}

impl PartialEq<Flags> for ProtectionFlags {
    fn eq(&self, other: &Flags) -> bool {
        other == self
    }
}

/// Observed region permissions (`rwxp`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    bits: u8,
}

impl Flags {
    pub fn new(readable: bool, writable: bool, executable: bool, private: bool) -> Self {
        let mut bits = ProtectionFlags::new(readable, writable, executable).bits;
        if private {
            bits |= PRIVATE;
        }
        Self { bits }
    }

    /// Parse the 4-character permission token from a maps line
    pub fn from_permissions(permissions: &str) -> Self {
        Self {
            bits: parse_bits(permissions, b"rwxp"),
        }
    }

    pub fn is_readable(&self) -> bool {
        self.bits & READ != 0
    }

    pub fn is_writable(&self) -> bool {
        self.bits & WRITE != 0
    }

    pub fn is_executable(&self) -> bool {
        self.bits & EXECUTE != 0
    }

    pub fn is_private(&self) -> bool {
        self.bits & PRIVATE != 0
    }

    /// The read/write/execute part
    pub fn protection(&self) -> ProtectionFlags {
        ProtectionFlags {
            bits: self.bits & !PRIVATE,
        }
    }

    pub(crate) fn without_read(self) -> Self {
        Self {
            bits: self.bits & !READ,
        }
    }
}

impl From<&str> for Flags {
    fn from(permissions: &str) -> Self {
        Self::from_permissions(permissions)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_bits(f, self.bits, b"rwxp")
    }
}

impl PartialEq<ProtectionFlags> for Flags {
    fn eq(&self, other: &ProtectionFlags) -> bool {
        self.protection() == *other
    }
}

/// Sharing state from the fourth permission character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharedState {
    #[default]
    Private,
    MayShare,
    Shared,
}

impl SharedState {
    pub fn from_char(c: char) -> Self {
        match c {
            's' => SharedState::MayShare,
            'S' => SharedState::Shared,
            _ => SharedState::Private,
        }
    }
}

macro_rules! impl_permission_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let permissions = String::deserialize(deserializer)?;
                Ok(Self::from_permissions(&permissions))
            }
        }
    };
}

impl_permission_serde!(ProtectionFlags);
impl_permission_serde!(Flags);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_roundtrip() {
        let flags = Flags::from_permissions("rwxp");
        assert_eq!(flags.to_string(), "rwxp");
        assert!(flags.is_readable());
        assert!(flags.is_writable());
        assert!(flags.is_executable());
        assert!(flags.is_private());
    }

    #[test]
    fn test_flags_read_only_private() {
        let flags = Flags::from_permissions("r--p");
        assert!(flags.is_readable());
        assert!(!flags.is_writable());
        assert!(!flags.is_executable());
        assert!(flags.is_private());
        assert_eq!(flags.to_string(), "r--p");
    }

    #[test]
    fn test_flags_shared_mapping_is_not_private() {
        let flags = Flags::from_permissions("rw-s");
        assert!(!flags.is_private());
        assert_eq!(flags.to_string(), "rw--");
    }

    #[test]
    fn test_malformed_permissions_are_unset() {
        // Wrong letters at a position and short input never error
        let flags = Flags::from_permissions("xrw");
        assert_eq!(flags, Flags::default());
        assert_eq!(flags.to_string(), "----");

        let flags = Flags::from_permissions("r");
        assert!(flags.is_readable());
        assert_eq!(flags.to_string(), "r---");

        assert_eq!(ProtectionFlags::from_permissions("").to_string(), "---");
    }

    #[test]
    fn test_protection_flags() {
        let prot = ProtectionFlags::from_permissions("rw-");
        assert_eq!(prot, ProtectionFlags::READ_WRITE);
        assert_eq!(prot.to_string(), "rw-");
        assert_eq!(ProtectionFlags::new(true, false, true), ProtectionFlags::READ_EXECUTE);
        assert_eq!(ProtectionFlags::ALL.to_string(), "rwx");
        assert_eq!(ProtectionFlags::NONE.to_string(), "---");
    }

    #[test]
    fn test_flags_compare_ignores_private_bit() {
        let private = Flags::from_permissions("rw-p");
        let shared = Flags::from_permissions("rw-s");
        assert_eq!(private, ProtectionFlags::READ_WRITE);
        assert_eq!(shared, ProtectionFlags::READ_WRITE);
        assert_eq!(ProtectionFlags::READ_WRITE, private);
        assert_ne!(private, ProtectionFlags::READ);
    }

    #[test]
    fn test_without_read() {
        let flags = Flags::from_permissions("rw-p").without_read();
        assert_eq!(flags.to_string(), "-w-p");
    }

    #[test]
    fn test_shared_state_from_char() {
        assert_eq!(SharedState::from_char('p'), SharedState::Private);
        assert_eq!(SharedState::from_char('s'), SharedState::MayShare);
        assert_eq!(SharedState::from_char('S'), SharedState::Shared);
        assert_eq!(SharedState::from_char('-'), SharedState::Private);
    }

    #[test]
    fn test_flags_serde() {
        let json = serde_json::to_string(&Flags::from_permissions("r-xp")).unwrap();
        assert_eq!(json, "\"r-xp\"");

        let prot: ProtectionFlags = serde_json::from_str("\"rw-\"").unwrap();
        assert_eq!(prot, ProtectionFlags::READ_WRITE);
    }
}
