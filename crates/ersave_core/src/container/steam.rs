use std::io::{Read, Seek};

use tracing::debug;

use crate::digest::DIGEST_LEN;
use crate::error::{Error, Result};
use crate::layout::{ByteRange, RegionLayout};
use crate::reader::{LittleEndianReader, u32_at, wide_string_at};

use super::Framing;

pub const MAGIC: u32 = 0x3444_4E42;
pub const HEADER_LEN: usize = 0x300;

const SLOT_COUNT_OFFSET: usize = 12;
const DESCRIPTOR_BASE: usize = 0x48;
const DESCRIPTOR_STRIDE: usize = 0x20;
const SIZE_FIELD: usize = 0x0;
const OFFSET_FIELD: usize = 0x8;
const NAME_FIELD: usize = 0xC;

/// Reads the fixed header and its descriptor table. Each region starts with
/// a stored digest, so `digest_len` is set on every layout.
pub(super) fn read_framing<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<Framing> {
    r.seek_to(0)?;
    let header = r.read_bytes(HEADER_LEN, "Steam header")?;

    let count = u32_at(&header, SLOT_COUNT_OFFSET).unwrap_or(0) as usize;
    let table_end = count
        .checked_mul(DESCRIPTOR_STRIDE)
        .and_then(|len| len.checked_add(DESCRIPTOR_BASE))
        .filter(|&end| end <= HEADER_LEN)
        .ok_or_else(|| {
            Error::malformed(format!(
                "{count} slot descriptors do not fit in the {HEADER_LEN:#x}-byte header"
            ))
        })?;
    debug!(count, table_end, "Steam descriptor table");

    let mut regions = Vec::with_capacity(count);
    let mut names = Vec::with_capacity(count);
    for index in 0..count {
        let base = DESCRIPTOR_BASE + index * DESCRIPTOR_STRIDE;
        let field = |off: usize| u32_at(&header, base + off).unwrap_or(0);
        let size = u64::from(field(SIZE_FIELD));
        let offset = u64::from(field(OFFSET_FIELD));
        let name_offset = field(NAME_FIELD) as usize;

        let max_units = HEADER_LEN.saturating_sub(name_offset) / 2;
        names.push(wide_string_at(&header, name_offset, max_units));
        regions.push(RegionLayout {
            index,
            range: ByteRange::new(offset, size),
            digest_len: DIGEST_LEN as u64,
        });
    }

    Ok(Framing {
        header,
        regions,
        names,
    })
}
