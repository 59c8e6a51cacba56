//! Byte patterns with wildcards
//!
//! Patterns are written as hex bytes separated by whitespace, with `??` (or
//! `?`) matching any byte: `"48 8B 05 ?? ?? ?? ??"`. Searching looks for the
//! longest literal run with memchr's memmem finder and verifies the rest of
//! the pattern around each hit.

use anyhow::{bail, Context, Result};
use memchr::memmem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// `None` matches any byte
    bytes: Vec<Option<u8>>,
    /// Offset of `anchor` within the pattern
    anchor_offset: usize,
    /// Longest run without wildcards, empty when every byte is a wildcard
    anchor: Vec<u8>,
}

impl Pattern {
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text
            .split_whitespace()
            .map(|part| match part {
                "??" | "?" => Ok(None),
                _ => u8::from_str_radix(part, 16)
                    .map(Some)
                    .with_context(|| format!("Invalid hex byte: {}", part)),
            })
            .collect::<Result<Vec<_>>>()?;

        if bytes.is_empty() {
            bail!("Pattern is empty");
        }
        let (anchor_offset, anchor) = longest_literal(&bytes);
        Ok(Self {
            bytes,
            anchor_offset,
            anchor,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    fn matches_at(&self, data: &[u8], start: usize) -> bool {
        data.get(start..start + self.len()).is_some_and(|window| {
            window
                .iter()
                .zip(&self.bytes)
                .all(|(actual, expected)| expected.map_or(true, |e| e == *actual))
        })
    }

    /// Offsets in `data` where the pattern matches, in ascending order
    ///
    /// Lazy, so callers can stop after as many hits as they need.
    pub fn find_iter<'a>(&'a self, data: &'a [u8]) -> Box<dyn Iterator<Item = usize> + 'a> {
        let Some(last) = data.len().checked_sub(self.len()) else {
            return Box::new(std::iter::empty());
        };

        if self.anchor.is_empty() {
            return Box::new(0..=last);
        }

        Box::new(
            memmem::find_iter(data, &self.anchor)
                .filter_map(|hit| hit.checked_sub(self.anchor_offset))
                .filter(|&start| self.matches_at(data, start)),
        )
    }
}

/// Offset and bytes of the longest run without wildcards
fn longest_literal(bytes: &[Option<u8>]) -> (usize, Vec<u8>) {
    let mut best = (0, 0);
    let mut start = 0;

    for (i, byte) in bytes.iter().enumerate() {
        if byte.is_none() {
            start = i + 1;
            continue;
        }
        let len = i + 1 - start;
        if len > best.1 {
            best = (start, len);
        }
    }

    let (offset, len) = best;
    let literal = bytes[offset..offset + len].iter().flatten().copied().collect();
    (offset, literal)
}
