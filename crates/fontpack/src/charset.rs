//! Code point sets
//!
//! An ordered, de-duplicated list of code points to pack. Order decides
//! packing order only; lookups in the finished atlas are by code point.

use crate::{FontpackError, Result};
use indexmap::IndexSet;

/// Ordered set of requested code points
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    code_points: IndexSet<u32>,
}

impl CharSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code points 0 through 255, the packer's default request
    pub fn latin1() -> Self {
        (0..=0xFF).collect()
    }

    /// Printable ASCII (space through tilde)
    pub fn ascii_printable() -> Self {
        (0x20..=0x7E).collect()
    }

    /// Every character of `text`, in order of first appearance
    pub fn from_text(text: &str) -> Self {
        text.chars().map(u32::from).collect()
    }

    /// Parse a comma-separated list of code points and inclusive ranges
    ///
    /// Each item is `N` or `A-B`, where numbers are decimal, `0x`-prefixed
    /// hex, or `U+`-prefixed hex: `"0x20-0x7E, 160, U+2022"`.
    pub fn parse_ranges(spec: &str) -> Result<Self> {
        let mut set = Self::new();
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once('-') {
                Some((start, end)) => {
                    let start = parse_code_point(start.trim())?;
                    let end = parse_code_point(end.trim())?;
                    if start > end {
                        return Err(FontpackError::InvalidArgument(format!(
                            "reversed code point range '{}'",
                            item
                        )));
                    }
                    set.extend(start..=end);
                }
                None => {
                    set.insert(parse_code_point(item)?);
                }
            }
        }
        Ok(set)
    }

    /// Add a code point; returns false if it was already present
    pub fn insert(&mut self, code_point: u32) -> bool {
        self.code_points.insert(code_point)
    }

    pub fn contains(&self, code_point: u32) -> bool {
        self.code_points.contains(&code_point)
    }

    pub fn len(&self) -> usize {
        self.code_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code_points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.code_points.iter().copied()
    }
}

impl Extend<u32> for CharSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        self.code_points.extend(iter);
    }
}

impl FromIterator<u32> for CharSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            code_points: iter.into_iter().collect(),
        }
    }
}

fn parse_code_point(text: &str) -> Result<u32> {
    let parsed = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix("U+"))
        .or_else(|| text.strip_prefix("u+"))
    {
        u32::from_str_radix(hex, 16)
    } else {
        text.parse::<u32>()
    };

    match parsed {
        Ok(cp) if cp <= char::MAX as u32 => Ok(cp),
        Ok(cp) => Err(FontpackError::InvalidArgument(format!(
            "code point {:#X} is beyond U+10FFFF",
            cp
        ))),
        Err(_) => Err(FontpackError::InvalidArgument(format!(
            "invalid code point '{}'",
            text
        ))),
    }
}
