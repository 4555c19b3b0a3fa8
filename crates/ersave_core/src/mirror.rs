//! Fixed-layout per-character table embedded in the summary slot.
//!
//! Each character index owns one `0x24C`-byte entry duplicating the name,
//! level, face and body type the game shows on its load screen, plus one
//! availability byte in a separate table just before the entries.

use std::ops::Range;

use crate::gender::Gender;
use crate::reader::{u16_at, u64_at, wide_units_at};

pub const SUMMARY_USER_ID_OFFSET: usize = 0x4;
pub const AVAILABILITY_BASE: usize = 0x1954;
pub const MIRROR_BASE: usize = 0x195E;
pub const MIRROR_STRIDE: usize = 0x24C;
pub const MIRROR_COUNT: usize = 10;

pub const NAME_OFFSET: usize = 0x00;
pub const NAME_BYTES: usize = 0x22;
pub const NAME_UNITS: usize = NAME_BYTES / 2;
pub const LEVEL_OFFSET: usize = 0x22;
pub const FACE_OFFSET: usize = 0x3A;
pub const GENDER_OFFSET: usize = 0x242;

pub fn entry_range(index: usize) -> Option<Range<usize>> {
    if index >= MIRROR_COUNT {
        return None;
    }
    let start = MIRROR_BASE + index * MIRROR_STRIDE;
    Some(start..start + MIRROR_STRIDE)
}

pub fn availability_offset(index: usize) -> Option<usize> {
    (index < MIRROR_COUNT).then_some(AVAILABILITY_BASE + index)
}

pub fn summary_user_id(summary: &[u8]) -> u64 {
    u64_at(summary, SUMMARY_USER_ID_OFFSET).unwrap_or(0)
}

/// Borrowed view over one mirror entry (exactly `MIRROR_STRIDE` bytes, or
/// the tail of an exported character blob).
#[derive(Debug, Clone, Copy)]
pub struct MirrorEntry<'a> {
    bytes: &'a [u8],
}

impl<'a> MirrorEntry<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn at(summary: &'a [u8], index: usize) -> Option<Self> {
        let range = entry_range(index)?;
        summary.get(range).map(Self::new)
    }

    pub fn name_units(&self) -> Vec<u16> {
        wide_units_at(self.bytes, NAME_OFFSET, NAME_UNITS)
    }

    pub fn name(&self) -> String {
        String::from_utf16_lossy(&self.name_units())
    }

    pub fn level(&self) -> u16 {
        u16_at(self.bytes, LEVEL_OFFSET).unwrap_or(0)
    }

    pub fn gender(&self) -> Option<Gender> {
        self.bytes.get(GENDER_OFFSET).copied().map(Gender::from_raw)
    }

    pub fn is_empty(&self) -> bool {
        self.level() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_laid_out_by_stride() {
        assert_eq!(entry_range(0), Some(0x195E..0x195E + 0x24C));
        assert_eq!(entry_range(9).map(|r| r.start), Some(0x195E + 9 * 0x24C));
        assert_eq!(entry_range(10), None);
        assert_eq!(availability_offset(3), Some(0x1957));
        assert_eq!(availability_offset(10), None);
    }

    #[test]
    fn reads_name_level_and_gender() {
        let mut entry = vec![0u8; MIRROR_STRIDE];
        for (i, unit) in "Ranni".encode_utf16().enumerate() {
            entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        entry[LEVEL_OFFSET..LEVEL_OFFSET + 2].copy_from_slice(&42u16.to_le_bytes());
        entry[GENDER_OFFSET] = 1;

        let view = MirrorEntry::new(&entry);
        assert_eq!(view.name(), "Ranni");
        assert_eq!(view.level(), 42);
        assert_eq!(view.gender(), Some(Gender::Male));
        assert!(!view.is_empty());
    }
}
