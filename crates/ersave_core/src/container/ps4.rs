use std::io::{Read, Seek};

use crate::error::Result;
use crate::layout::{ByteRange, RegionLayout};
use crate::reader::LittleEndianReader;
use crate::slot::{CHARACTER_PAYLOAD_LEN, SUMMARY_PAYLOAD_LEN};

use super::Framing;

pub const MAGIC: u32 = 0x2C9C_01CB;
pub const HEADER_LEN: usize = 0x70;

const CHARACTER_REGIONS: usize = 10;
const TRAILING_REGION_LEN: usize = 0x24_0010;

/// Region sizes in file order. The format carries no descriptor table and no
/// stored digests.
pub const REGION_SIZES: [usize; 12] = {
    let mut sizes = [CHARACTER_PAYLOAD_LEN; 12];
    sizes[CHARACTER_REGIONS] = SUMMARY_PAYLOAD_LEN;
    sizes[CHARACTER_REGIONS + 1] = TRAILING_REGION_LEN;
    sizes
};

pub(super) fn read_framing<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<Framing> {
    r.seek_to(0)?;
    let header = r.read_bytes(HEADER_LEN, "PS4 header")?;

    let mut offset = HEADER_LEN as u64;
    let regions = REGION_SIZES
        .iter()
        .enumerate()
        .map(|(index, &size)| {
            let range = ByteRange::new(offset, size as u64);
            offset = range.end;
            RegionLayout {
                index,
                range,
                digest_len: 0,
            }
        })
        .collect();

    Ok(Framing {
        header,
        regions,
        names: vec![String::new(); REGION_SIZES.len()],
    })
}
