//! Parser for `/proc/<pid>/maps`
//!
//! ```text
//! address                   perms offset   dev   inode   pathname
//! 561234560000-561234561000 r-xp 00000000 08:01 1234    /usr/bin/prog
//! 7ffc1c3e2000-7ffc1c403000 rw-p 00000000 00:00 0       [stack]
//! ```
//!
//! The pathname column is optional, may contain spaces and may end in
//! `" (deleted)"`.

use crate::flags::{Flags, SharedState};
use crate::layout::MemoryLayout;
use crate::region::{MappingSource, MemoryRegion};
use crate::{Error, Result};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MapsParseError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("end address {end:#x} is not above start {start:#x}")]
    EmptyRange { start: usize, end: usize },
}

/// One parsed maps line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsEntry<'a> {
    pub start: usize,
    pub end: usize,
    pub permissions: &'a str,
    pub source: MappingSource,
    pub name: Option<&'a str>,
}

impl MapsEntry<'_> {
    pub fn into_region(self) -> MemoryRegion {
        let flags = Flags::from_permissions(self.permissions);
        let sharing = self
            .permissions
            .chars()
            .nth(3)
            .map(SharedState::from_char)
            .unwrap_or_default();

        let region = MemoryRegion::new(self.start, self.end - self.start, flags)
            .with_sharing(sharing)
            .with_source(self.source);
        match self.name {
            Some(name) => region.with_name(name),
            None => region,
        }
    }
}

/// Split off the next whitespace-delimited field
fn next_field<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let trimmed = rest.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (field, remainder) = trimmed.split_at(end);
    *rest = remainder;
    Some(field)
}

fn invalid(field: &'static str, value: &str) -> MapsParseError {
    MapsParseError::InvalidNumber {
        field,
        value: value.to_string(),
    }
}

/// Parse a single non-empty maps line
pub fn parse_line(line: &str) -> std::result::Result<MapsEntry<'_>, MapsParseError> {
    let mut rest = line;

    let range = next_field(&mut rest).ok_or(MapsParseError::MissingField("address"))?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| invalid("address range", range))?;
    let start = usize::from_str_radix(start, 16).map_err(|_| invalid("start address", start))?;
    let end = usize::from_str_radix(end, 16).map_err(|_| invalid("end address", end))?;
    if end <= start {
        return Err(MapsParseError::EmptyRange { start, end });
    }

    let permissions = next_field(&mut rest).ok_or(MapsParseError::MissingField("permissions"))?;

    let offset = next_field(&mut rest).ok_or(MapsParseError::MissingField("offset"))?;
    let offset = u64::from_str_radix(offset, 16).map_err(|_| invalid("offset", offset))?;

    let device = next_field(&mut rest).ok_or(MapsParseError::MissingField("device"))?;
    let (major, minor) = device
        .split_once(':')
        .ok_or_else(|| invalid("device", device))?;
    let device_major =
        u32::from_str_radix(major, 16).map_err(|_| invalid("device major", major))?;
    let device_minor =
        u32::from_str_radix(minor, 16).map_err(|_| invalid("device minor", minor))?;

    let inode = next_field(&mut rest).ok_or(MapsParseError::MissingField("inode"))?;
    let inode = inode.parse::<u64>().map_err(|_| invalid("inode", inode))?;

    let name = rest.trim_start();

    Ok(MapsEntry {
        start,
        end,
        permissions,
        source: MappingSource {
            offset,
            device_major,
            device_minor,
            inode,
        },
        name: (!name.is_empty()).then_some(name),
    })
}

/// Build a layout from the full contents of a maps file
///
/// Blank lines are skipped. Any malformed line fails the whole parse.
pub fn parse_maps(contents: &str) -> Result<MemoryLayout> {
    let mut layout = MemoryLayout::new();

    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: String| Error::MalformedMaps {
            line: index + 1,
            reason,
        };

        let entry = parse_line(line).map_err(|e| malformed(e.to_string()))?;
        layout
            .insert(entry.into_region())
            .map_err(|e| malformed(e.to_string()))?;
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
561234560000-561234561000 r-xp 00000000 08:01 1234                       /usr/bin/prog (deleted)
561234561000-561234562000 rw-p 00001000 08:01 1234                       /usr/bin/prog
5612355a0000-5612355c1000 rw-p 00000000 00:00 0                          [heap]
7f0000000000-7f0000021000 rw-p 00000000 00:00 0
7f1c2a000000-7f1c2a001000 rw-s 00000000 00:05 98765                      /dev/shm/my segment
7ffc1c3e2000-7ffc1c403000 rw-p 00000000 00:00 0                          [stack]
";

    #[test]
    fn test_special_heap_line() {
        let entry = parse_line("7f0000000000-7f0000001000 r--p 00000000 00:00 0 [heap]").unwrap();
        let region = entry.into_region();

        assert_eq!(region.base(), 0x7f00_0000_0000);
        assert_eq!(region.length(), 0x1000);
        assert!(region.is_special());
        assert!(!region.flags().is_readable());
        assert!(!region.flags().is_writable());
        assert!(!region.flags().is_executable());
        assert_eq!(region.name(), Some("[heap]"));
        assert_eq!(region.path(), None);
    }

    #[test]
    fn test_deleted_file_line() {
        let entry = parse_line(
            "561234560000-561234561000 r-xp 00000000 08:01 1234 /usr/bin/prog (deleted)",
        )
        .unwrap();
        assert_eq!(
            entry.source,
            MappingSource {
                offset: 0,
                device_major: 8,
                device_minor: 1,
                inode: 1234,
            }
        );

        let region = entry.into_region();
        assert_eq!(region.path(), Some("/usr/bin/prog"));
        assert_eq!(region.name(), Some("prog"));
        assert!(region.is_deleted());
        assert!(!region.is_special());
        assert!(region.flags().is_readable());
        assert!(region.flags().is_executable());
    }

    #[test]
    fn test_missing_name_field() {
        let entry = parse_line("7f0000000000-7f0000021000 rw-p 00000000 00:00 0").unwrap();
        assert_eq!(entry.name, None);

        // Trailing padding without a name
        let entry = parse_line("7f0000000000-7f0000021000 rw-p 00000000 00:00 0      ").unwrap();
        assert_eq!(entry.name, None);
    }

    #[test]
    fn test_name_with_spaces() {
        let entry =
            parse_line("7f1c2a000000-7f1c2a001000 rw-s 00000000 00:05 98765   /dev/shm/my segment")
                .unwrap();
        assert_eq!(entry.name, Some("/dev/shm/my segment"));

        let region = entry.into_region();
        assert_eq!(region.name(), Some("my segment"));
        assert_eq!(region.sharing(), SharedState::MayShare);
        assert!(!region.flags().is_private());
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(
            parse_line("zzzz-1000 r--p 00000000 00:00 0"),
            Err(MapsParseError::InvalidNumber {
                field: "start address",
                value: "zzzz".to_string(),
            })
        );
        assert!(matches!(
            parse_line("1000 r--p 00000000 00:00 0"),
            Err(MapsParseError::InvalidNumber { field: "address range", .. })
        ));
        assert_eq!(
            parse_line("2000-1000 r--p 00000000 00:00 0"),
            Err(MapsParseError::EmptyRange {
                start: 0x2000,
                end: 0x1000,
            })
        );
        assert_eq!(
            parse_line("1000-2000 r--p 00000000"),
            Err(MapsParseError::MissingField("device"))
        );
        assert!(parse_line("1000-2000 r--p 00000000 0800 0").is_err());
        assert!(parse_line("1000-2000 r--p 00000000 08:00 abc").is_err());
    }

    #[test]
    fn test_parse_maps_sample() {
        let layout = parse_maps(SAMPLE).unwrap();
        assert_eq!(layout.len(), 6);

        let heap = layout.find_region(0x5612_355a_1234).unwrap();
        assert_eq!(heap.name(), Some("[heap]"));

        let anonymous = layout.find_region(0x7f00_0000_0000).unwrap();
        assert_eq!(anonymous.name(), None);
        assert!(anonymous.flags().is_readable());

        let prog = layout.find_region(0x5612_3456_1000).unwrap();
        assert_eq!(prog.source().offset, 0x1000);
        assert!(!prog.is_deleted());

        assert!(layout.find_region(0x5612_3456_2000).is_none());
    }

    #[test]
    fn test_parse_maps_reports_line_number() {
        let contents = "1000-2000 r--p 00000000 00:00 0\n\n3000-zz r--p 00000000 00:00 0\n";
        match parse_maps(contents) {
            Err(Error::MalformedMaps { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected malformed maps error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_maps_rejects_overlap() {
        let contents = "1000-3000 r--p 00000000 00:00 0\n2000-4000 r--p 00000000 00:00 0\n";
        assert!(matches!(
            parse_maps(contents),
            Err(Error::MalformedMaps { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_empty_maps() {
        assert!(parse_maps("").unwrap().is_empty());
        assert!(parse_maps("\n\n").unwrap().is_empty());
    }
}
