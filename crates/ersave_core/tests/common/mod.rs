#![allow(dead_code)]

//! Synthetic save images with planted anchors, mirror entries, faces and a
//! face pool.

use ersave_core::anchor::{
    PRIMARY_SIGNATURE, SECONDARY_SIGNATURE, STAT_GENDER_OFFSET, STAT_LEVEL_OFFSET,
    STAT_NAME_OFFSET, USER_ID_DELTA, USER_ID_SCAN_START,
};
use ersave_core::container::{ps4, steam};
use ersave_core::digest::digest;
use ersave_core::face::{
    FACE_LEN, FACE_SIGNATURE, POOL_BASE, POOL_CAPACITY, POOL_LENGTH_MARKER, POOL_LENGTH_OFFSET,
    POOL_RECORD_LEN, RECORD_FACE_OFFSET, RECORD_GENDER_OFFSET,
};
use ersave_core::mirror::{
    AVAILABILITY_BASE, FACE_OFFSET, GENDER_OFFSET, LEVEL_OFFSET, MIRROR_BASE, MIRROR_STRIDE,
    SUMMARY_USER_ID_OFFSET,
};
use ersave_core::slot::{CHARACTER_PAYLOAD_LEN, SUMMARY_PAYLOAD_LEN};

pub const SUMMARY_USER_ID: u64 = 0x0110_0001_2345_6789;
pub const STAT_AT: usize = 0x1_0000;
pub const FACE_AT: usize = 0x2_0000;
pub const SECOND_FACE_AT: usize = 0x2_8000;
pub const USER_ID_HIT: usize = USER_ID_SCAN_START + 0x100;

const NAME_AREA: usize = 0x1D0;
const NAME_STRIDE: usize = 0x1A;

#[derive(Debug, Clone)]
pub struct CharacterSeed {
    pub name: &'static str,
    pub level: u16,
    pub gender: u8,
    pub face_fill: u8,
    pub filler: u8,
    pub user_id: u64,
    pub available: bool,
}

impl CharacterSeed {
    pub fn new(name: &'static str, level: u16) -> Self {
        Self {
            name,
            level,
            gender: 1,
            face_fill: 0x11,
            filler: 0x5A,
            user_id: 0x0110_0001_AAAA_BBBB,
            available: true,
        }
    }

    /// Eight attributes summing to `79 + level`.
    pub fn stats(&self) -> [u32; 8] {
        let mut stats = [10u32; 8];
        stats[7] = 79 + u32::from(self.level) - 70;
        stats
    }
}

pub fn put_u16(data: &mut [u8], at: usize, v: u16) {
    data[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

pub fn put_u32(data: &mut [u8], at: usize, v: u32) {
    data[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

pub fn put_u64(data: &mut [u8], at: usize, v: u64) {
    data[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

pub fn put_wide(data: &mut [u8], at: usize, s: &str) {
    for (i, unit) in s.encode_utf16().enumerate() {
        put_u16(data, at + i * 2, unit);
    }
}

pub fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// A `0x120`-byte face blob: the signature followed by `fill`.
pub fn face_blob(fill: u8) -> Vec<u8> {
    let mut face = vec![fill; FACE_LEN];
    face[..FACE_SIGNATURE.len()].copy_from_slice(&FACE_SIGNATURE);
    face
}

/// Single-face export file: face plus gender byte.
pub fn face_export(fill: u8, gender: u8) -> Vec<u8> {
    let mut out = face_blob(fill);
    out.push(gender);
    out
}

pub fn pool_record(available: bool, gender: u8, fill: u8) -> Vec<u8> {
    let mut record = vec![0u8; POOL_RECORD_LEN];
    record[0] = u8::from(available);
    record[RECORD_GENDER_OFFSET] = gender;
    record[RECORD_FACE_OFFSET..].copy_from_slice(&face_blob(fill));
    record
}

/// User id location for a payload built by [`character_payload`].
pub fn user_id_offset() -> usize {
    let secondary = USER_ID_HIT + 0x104;
    let block = secondary + 0x10;
    block + USER_ID_DELTA as usize
}

pub fn character_payload(seed: &CharacterSeed) -> Vec<u8> {
    let mut data = vec![0u8; CHARACTER_PAYLOAD_LEN];
    data[0x10..0x100].fill(seed.filler);

    for (i, stat) in seed.stats().iter().enumerate() {
        put_u32(&mut data, STAT_AT + i * 4, *stat);
    }
    put_u32(&mut data, STAT_AT + STAT_LEVEL_OFFSET, u32::from(seed.level));
    put_wide(&mut data, STAT_AT + STAT_NAME_OFFSET, seed.name);
    data[STAT_AT + STAT_GENDER_OFFSET] = seed.gender;

    let face = face_blob(seed.face_fill);
    data[FACE_AT..FACE_AT + FACE_LEN].copy_from_slice(&face);
    data[SECOND_FACE_AT..SECOND_FACE_AT + FACE_LEN].copy_from_slice(&face);

    data[USER_ID_HIT..USER_ID_HIT + 8].copy_from_slice(&PRIMARY_SIGNATURE);
    put_u32(&mut data, USER_ID_HIT - 4, 0x100);
    let secondary = USER_ID_HIT + 0x104;
    data[secondary..secondary + 8].copy_from_slice(&SECONDARY_SIGNATURE);
    put_u32(&mut data, secondary - 4, 0x10);
    put_u64(&mut data, user_id_offset(), seed.user_id);
    data
}

/// Summary payload with mirror entries for the given character indices and
/// an optional face pool.
pub fn summary_payload(
    user_id: u64,
    characters: &[(usize, &CharacterSeed)],
    pool: Option<&[Vec<u8>]>,
) -> Vec<u8> {
    let mut data = vec![0u8; SUMMARY_PAYLOAD_LEN];
    put_u64(&mut data, SUMMARY_USER_ID_OFFSET, user_id);

    for (index, seed) in characters {
        data[AVAILABILITY_BASE + index] = u8::from(seed.available);
        let base = MIRROR_BASE + index * MIRROR_STRIDE;
        put_wide(&mut data, base, seed.name);
        put_u16(&mut data, base + LEVEL_OFFSET, seed.level);
        data[base + FACE_OFFSET..base + FACE_OFFSET + FACE_LEN]
            .copy_from_slice(&face_blob(seed.face_fill));
        data[base + GENDER_OFFSET] = seed.gender;
    }

    if let Some(records) = pool {
        assert!(records.len() <= POOL_CAPACITY);
        put_u32(&mut data, POOL_LENGTH_OFFSET, POOL_LENGTH_MARKER);
        for (i, record) in records.iter().enumerate() {
            let at = POOL_BASE + i * POOL_RECORD_LEN;
            data[at..at + POOL_RECORD_LEN].copy_from_slice(record);
        }
    }
    data
}

pub fn slot_name(index: usize) -> String {
    format!("USER_DATA{index:03}")
}

/// Steam image: header with descriptors and names, then each payload behind
/// its MD5 digest, laid out contiguously.
pub fn steam_image(payloads: &[Vec<u8>]) -> Vec<u8> {
    assert!(NAME_AREA + payloads.len() * NAME_STRIDE <= steam::HEADER_LEN);
    let mut header = vec![0u8; steam::HEADER_LEN];
    put_u32(&mut header, 0, steam::MAGIC);
    put_u32(&mut header, 12, payloads.len() as u32);

    let mut body = Vec::new();
    let mut offset = steam::HEADER_LEN;
    for (i, payload) in payloads.iter().enumerate() {
        let descriptor = 0x48 + i * 0x20;
        let name_at = NAME_AREA + i * NAME_STRIDE;
        put_u32(&mut header, descriptor, (payload.len() + 16) as u32);
        put_u32(&mut header, descriptor + 8, offset as u32);
        put_u32(&mut header, descriptor + 12, name_at as u32);
        put_wide(&mut header, name_at, &slot_name(i));

        body.extend_from_slice(&digest(payload));
        body.extend_from_slice(payload);
        offset += payload.len() + 16;
    }
    header.extend_from_slice(&body);
    header
}

/// PS4 image: fixed header, ten character regions, the summary, then the
/// trailing region.
pub fn ps4_image(characters: &[Vec<u8>], summary: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; ps4::HEADER_LEN];
    put_u32(&mut image, 0, ps4::MAGIC);
    for i in 0..10 {
        match characters.get(i) {
            Some(payload) => image.extend_from_slice(payload),
            None => image.resize(image.len() + CHARACTER_PAYLOAD_LEN, 0),
        }
    }
    image.extend_from_slice(summary);
    image.resize(image.len() + ps4::REGION_SIZES[11], 0);
    image
}

pub fn tarnished() -> CharacterSeed {
    CharacterSeed::new("Tarnished", 12)
}

pub fn melina() -> CharacterSeed {
    CharacterSeed {
        gender: 0,
        face_fill: 0x22,
        filler: 0x33,
        user_id: 0x0110_0001_CCCC_DDDD,
        ..CharacterSeed::new("Melina", 40)
    }
}

/// One character slot plus the summary: the minimal Steam save.
pub fn single_character_steam() -> Vec<u8> {
    let seed = tarnished();
    steam_image(&[
        character_payload(&seed),
        summary_payload(SUMMARY_USER_ID, &[(0, &seed)], None),
    ])
}

/// Slot 0 holds a character, slot 1 is empty, slot 2 is the summary with a
/// face pool whose first two records are in use.
pub fn steam_with_pool() -> Vec<u8> {
    let seed = tarnished();
    let pool = vec![pool_record(true, 1, 0x41), pool_record(true, 0, 0x42)];
    steam_image(&[
        character_payload(&seed),
        vec![0u8; CHARACTER_PAYLOAD_LEN],
        summary_payload(SUMMARY_USER_ID, &[(0, &seed)], Some(&pool)),
    ])
}

/// Offset of a slot's digest header inside a Steam image built here.
pub fn steam_region_offset(payloads_before: &[usize]) -> usize {
    steam::HEADER_LEN + payloads_before.iter().map(|len| len + 16).sum::<usize>()
}
