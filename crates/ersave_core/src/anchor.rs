//! Heuristic offset discovery inside character payloads.
//!
//! The character record has no schema and its layout shifts between save
//! revisions, so fields are located by scanning: the user id through a pair
//! of linked signatures, the level/attribute block through a checksum-like
//! invariant cross-checked against the summary mirror.
//!
//! Each strategy sits behind [`AnchorStrategy`] so a new revision can add a
//! strategy without touching callers.

use crate::gender::Gender;
use crate::mirror::{self, MirrorEntry};
use crate::pattern::{Algorithm, Pattern};
use crate::reader::{i32_at, u32_at, u64_at, wide_units_at};
use crate::slot::STAT_COUNT;

pub trait AnchorStrategy {
    type Hints;

    /// Byte offset of the anchored field inside `data`, if it can be found.
    fn resolve(&self, data: &[u8], hints: &Self::Hints) -> Option<usize>;
}

pub const USER_ID_SCAN_START: usize = 0x1E_0000;
pub const PRIMARY_SIGNATURE: [u8; 8] = [0x4D, 0x4F, 0x45, 0x47, 0x00, 0x26, 0x04, 0x21];
pub const SECONDARY_SIGNATURE: [u8; 8] = [0x46, 0x4F, 0x45, 0x47, 0x00, 0x26, 0x04, 0x21];
pub const USER_ID_DELTA: i64 = 4 + 0x2_0078;

/// Locates the 8-byte user id through the primary/secondary signature chain.
#[derive(Debug, Clone, Copy)]
pub struct UserIdAnchor {
    pub scan_start: usize,
}

impl Default for UserIdAnchor {
    fn default() -> Self {
        Self {
            scan_start: USER_ID_SCAN_START,
        }
    }
}

impl AnchorStrategy for UserIdAnchor {
    type Hints = ();

    fn resolve(&self, data: &[u8], _hints: &()) -> Option<usize> {
        let primary = Pattern::new(&PRIMARY_SIGNATURE, Algorithm::FailureTable);
        let mut from = self.scan_start;
        while let Some(hit) = primary.find_from(data, from) {
            if let Some(offset) = follow_user_id_chain(data, hit) {
                return Some(offset);
            }
            from = hit + 1;
        }
        None
    }
}

fn follow_user_id_chain(data: &[u8], hit: usize) -> Option<usize> {
    let secondary = offset_by(hit, i64::from(i32_at(data, hit.checked_sub(4)?)?) + 4)?;
    if data.get(secondary..secondary.checked_add(SECONDARY_SIGNATURE.len())?)?
        != SECONDARY_SIGNATURE
    {
        return None;
    }
    let block = offset_by(
        secondary,
        i64::from(i32_at(data, secondary.checked_sub(4)?)?),
    )?;
    let user_id = offset_by(block, i64::from(i32_at(data, block)?) + USER_ID_DELTA)?;
    u64_at(data, user_id)?;
    Some(user_id)
}

fn offset_by(base: usize, delta: i64) -> Option<usize> {
    let target = i64::try_from(base).ok()?.checked_add(delta)?;
    usize::try_from(target).ok()
}

// Layout relative to the start of the attribute block.
pub const STAT_LEVEL_OFFSET: usize = 0x2C;
pub const STAT_NAME_OFFSET: usize = 0x60;
pub const STAT_GENDER_OFFSET: usize = STAT_NAME_OFFSET + mirror::NAME_BYTES;
const STAT_WINDOW_SPAN: usize = STAT_GENDER_OFFSET + 1;

/// Sum of the eight attributes always equals the level plus this constant.
pub const STAT_SUM_BIAS: i32 = 79;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatHints {
    pub level: u16,
    pub name: Vec<u16>,
}

impl StatHints {
    pub fn from_mirror(entry: &MirrorEntry<'_>) -> Self {
        Self {
            level: entry.level(),
            name: entry.name_units(),
        }
    }
}

/// Locates the attribute block: eight u32 attributes whose sum is
/// `79 + level`, with the level 0x2C bytes in and the character name 0x60
/// bytes in, both matching the summary mirror.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatBlockAnchor;

impl AnchorStrategy for StatBlockAnchor {
    type Hints = StatHints;

    fn resolve(&self, data: &[u8], hints: &StatHints) -> Option<usize> {
        if data.len() < STAT_WINDOW_SPAN {
            return None;
        }
        let level = i32::from(hints.level);
        (0..=data.len() - STAT_WINDOW_SPAN).find(|&start| {
            if i32_at(data, start + STAT_LEVEL_OFFSET) != Some(level) {
                return false;
            }
            let sum = (0..STAT_COUNT)
                .filter_map(|i| i32_at(data, start + i * 4))
                .fold(0i32, i32::wrapping_add);
            if sum != STAT_SUM_BIAS.wrapping_add(level) {
                return false;
            }
            wide_units_at(data, start + STAT_NAME_OFFSET, mirror::NAME_UNITS) == hints.name
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatBlock {
    pub offset: usize,
    pub level: u16,
    pub stats: [u32; STAT_COUNT],
    pub gender: Gender,
}

pub fn read_stat_block(data: &[u8], offset: usize) -> Option<StatBlock> {
    let mut stats = [0u32; STAT_COUNT];
    for (i, stat) in stats.iter_mut().enumerate() {
        *stat = u32_at(data, offset + i * 4)?;
    }
    let level = u32_at(data, offset + STAT_LEVEL_OFFSET)?;
    let gender = *data.get(offset + STAT_GENDER_OFFSET)?;
    Some(StatBlock {
        offset,
        level: u16::try_from(level).unwrap_or(u16::MAX),
        stats,
        gender: Gender::from_raw(gender),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_i32(data: &mut [u8], at: usize, v: i32) {
        data[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn put_name(data: &mut [u8], at: usize, name: &str) -> Vec<u16> {
        let units: Vec<u16> = name.encode_utf16().collect();
        for (i, unit) in units.iter().enumerate() {
            data[at + i * 2..at + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        units
    }

    fn plant_stats(data: &mut [u8], at: usize, stats: [i32; 8], level: i32, name: &str) -> Vec<u16> {
        for (i, s) in stats.iter().enumerate() {
            put_i32(data, at + i * 4, *s);
        }
        put_i32(data, at + STAT_LEVEL_OFFSET, level);
        put_name(data, at + STAT_NAME_OFFSET, name)
    }

    #[test]
    fn stat_block_requires_sum_level_and_name() {
        let mut data = vec![0u8; 0x1000];
        // Decoy: sum and level fit, name differs.
        plant_stats(&mut data, 0x100, [10, 10, 10, 10, 10, 10, 10, 11], 2, "Other");
        let name = plant_stats(&mut data, 0x400, [10, 10, 10, 10, 10, 10, 10, 11], 2, "Blaidd");
        data[0x400 + STAT_GENDER_OFFSET] = 1;

        let hints = StatHints { level: 2, name };
        assert_eq!(StatBlockAnchor.resolve(&data, &hints), Some(0x400));

        let block = read_stat_block(&data, 0x400).expect("block in range");
        assert_eq!(block.level, 2);
        assert_eq!(block.stats[7], 11);
        assert_eq!(block.gender, Gender::Male);
    }

    #[test]
    fn stat_block_rejects_wrong_level() {
        let mut data = vec![0u8; 0x1000];
        let name = plant_stats(&mut data, 0x200, [9; 8], 0x48 - 79, "Varre");
        let hints = StatHints { level: 5, name };
        assert_eq!(StatBlockAnchor.resolve(&data, &hints), None);
    }

    #[test]
    fn stat_block_needs_room_for_name() {
        let data = vec![0u8; 0x40];
        let hints = StatHints {
            level: 1,
            name: Vec::new(),
        };
        assert_eq!(StatBlockAnchor.resolve(&data, &hints), None);
    }

    fn plant_chain(data: &mut [u8], hit: usize, user_id: u64) -> usize {
        data[hit..hit + 8].copy_from_slice(&PRIMARY_SIGNATURE);
        put_i32(data, hit - 4, 0x100);
        let secondary = hit + 0x104;
        data[secondary..secondary + 8].copy_from_slice(&SECONDARY_SIGNATURE);
        put_i32(data, secondary - 4, 0x10);
        let block = secondary + 0x10;
        put_i32(data, block, 0);
        let at = block + USER_ID_DELTA as usize;
        data[at..at + 8].copy_from_slice(&user_id.to_le_bytes());
        at
    }

    #[test]
    fn user_id_chain_retries_after_broken_candidate() {
        let mut data = vec![0u8; 0x24_0000];
        // A primary hit whose secondary signature is missing.
        let decoy = USER_ID_SCAN_START + 0x40;
        data[decoy..decoy + 8].copy_from_slice(&PRIMARY_SIGNATURE);
        put_i32(&mut data, decoy - 4, 0x20);

        let expected = plant_chain(&mut data, USER_ID_SCAN_START + 0x800, 0x0110_0001_DEAD_BEEF);
        let found = UserIdAnchor::default().resolve(&data, &());
        assert_eq!(found, Some(expected));
        assert_eq!(u64_at(&data, expected), Some(0x0110_0001_DEAD_BEEF));
    }

    #[test]
    fn user_id_ignores_hits_before_scan_start() {
        let mut data = vec![0u8; 0x24_0000];
        plant_chain(&mut data, 0x1000, 7);
        assert_eq!(UserIdAnchor::default().resolve(&data, &()), None);
    }

    #[test]
    fn user_id_chain_out_of_bounds_is_unresolved() {
        let mut data = vec![0u8; USER_ID_SCAN_START + 0x200];
        let hit = USER_ID_SCAN_START + 0x10;
        data[hit..hit + 8].copy_from_slice(&PRIMARY_SIGNATURE);
        put_i32(&mut data, hit - 4, i32::MAX);
        assert_eq!(UserIdAnchor::default().resolve(&data, &()), None);
    }
}
