//! Face appearance blobs: the single face stored in each character slot and
//! the pool of up to 15 saved faces embedded in the summary slot.

use crate::error::{Error, Result};
use crate::gender::Gender;
use crate::pattern::{Algorithm, Pattern};
use crate::reader::u32_at;
use crate::slot::Slot;

pub const FACE_SIGNATURE: [u8; 12] = [
    0x46, 0x41, 0x43, 0x45, 0x04, 0x00, 0x00, 0x00, 0x20, 0x01, 0x00, 0x00,
];
pub const FACE_LEN: usize = 0x120;
/// Single-face export: raw face bytes followed by one gender byte.
pub const FACE_EXPORT_LEN: usize = FACE_LEN + 1;

pub const POOL_LENGTH_OFFSET: usize = 0x1_B4A8;
pub const POOL_BASE: usize = POOL_LENGTH_OFFSET + 4;
pub const POOL_CAPACITY: usize = 15;
pub const POOL_RECORD_LEN: usize = 0x130;
pub const POOL_LENGTH_MARKER: u32 = (POOL_CAPACITY * POOL_RECORD_LEN) as u32;
pub const RECORD_GENDER_OFFSET: usize = 1;
pub const RECORD_FACE_OFFSET: usize = 0x10;

pub fn face_pattern() -> Pattern<'static> {
    Pattern::new(&FACE_SIGNATURE, Algorithm::SkipTable)
}

pub fn check_signature(face: &[u8]) -> Result<()> {
    if face.starts_with(&FACE_SIGNATURE) {
        Ok(())
    } else {
        Err(Error::SignatureMismatch)
    }
}

/// Offsets of every complete face blob inside a character payload.
pub fn locate_faces(payload: &[u8]) -> Vec<usize> {
    face_pattern()
        .find_iter(payload)
        .filter(|&pos| pos + FACE_LEN <= payload.len())
        .collect()
}

/// Splits a single-face export into its face bytes and gender byte. A bare
/// face without the trailing byte is accepted as gender-unknown.
pub fn split_face_export(blob: &[u8]) -> Result<(&[u8], u8)> {
    let gender = match blob.len() {
        FACE_EXPORT_LEN => blob[FACE_LEN],
        FACE_LEN => Gender::UNKNOWN_RAW,
        actual => {
            return Err(Error::LengthMismatch {
                expected: FACE_EXPORT_LEN,
                actual,
            });
        }
    };
    let face = &blob[..FACE_LEN];
    check_signature(face)?;
    Ok((face, gender))
}

/// Checks a batch of pool records before anything is written.
pub fn validate_pool_records(blob: &[u8]) -> Result<()> {
    if blob.is_empty() || blob.len() % POOL_RECORD_LEN != 0 {
        return Err(Error::LengthMismatch {
            expected: (blob.len() / POOL_RECORD_LEN + 1) * POOL_RECORD_LEN,
            actual: blob.len(),
        });
    }
    for record in blob.chunks_exact(POOL_RECORD_LEN) {
        check_signature(&record[RECORD_FACE_OFFSET..])?;
    }
    Ok(())
}

pub fn pool_present(summary: &[u8]) -> bool {
    u32_at(summary, POOL_LENGTH_OFFSET) == Some(POOL_LENGTH_MARKER)
        && summary.len() >= POOL_BASE + POOL_CAPACITY * POOL_RECORD_LEN
}

fn record_range(index: usize) -> std::ops::Range<usize> {
    let start = POOL_BASE + index * POOL_RECORD_LEN;
    start..start + POOL_RECORD_LEN
}

#[derive(Debug, Clone, Copy)]
pub struct FaceRecord<'a> {
    pub index: usize,
    bytes: &'a [u8],
}

impl<'a> FaceRecord<'a> {
    pub fn available(&self) -> bool {
        self.bytes[0] != 0
    }

    pub fn gender(&self) -> Gender {
        Gender::from_raw(self.bytes[RECORD_GENDER_OFFSET])
    }

    pub fn face(&self) -> &'a [u8] {
        &self.bytes[RECORD_FACE_OFFSET..]
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Read-only view over the face pool inside the summary payload.
#[derive(Debug, Clone, Copy)]
pub struct FaceCatalog<'a> {
    summary: &'a [u8],
}

impl<'a> FaceCatalog<'a> {
    pub fn new(summary: &'a [u8]) -> Option<Self> {
        pool_present(summary).then_some(Self { summary })
    }

    pub fn count(&self) -> usize {
        POOL_CAPACITY
    }

    pub fn get(&self, index: usize) -> Option<FaceRecord<'a>> {
        if index >= POOL_CAPACITY {
            return None;
        }
        Some(FaceRecord {
            index,
            bytes: &self.summary[record_range(index)],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = FaceRecord<'a>> + '_ {
        (0..POOL_CAPACITY).filter_map(move |i| self.get(i))
    }

    pub fn next_free(&self, from: usize) -> Option<usize> {
        (from..POOL_CAPACITY).find(|&i| self.get(i).is_some_and(|r| !r.available()))
    }

    /// Concatenates the requested records in the order given.
    pub fn export(&self, indices: &[usize]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(indices.len() * POOL_RECORD_LEN);
        for &index in indices {
            let record = self.get(index).ok_or(Error::FaceIndexOutOfRange {
                index,
                count: POOL_CAPACITY,
            })?;
            if !record.available() {
                return Err(Error::FaceUnavailable { index });
            }
            out.extend_from_slice(record.bytes());
        }
        Ok(out)
    }
}

/// Mutable view over the face pool. Every write goes through the summary
/// slot's tracked payload, so its digest is marked stale.
pub struct FaceCatalogMut<'a> {
    summary: &'a mut Slot,
}

impl<'a> FaceCatalogMut<'a> {
    pub(crate) fn new(summary: &'a mut Slot) -> Result<Self> {
        if !pool_present(summary.data()) {
            return Err(Error::NoFacePool);
        }
        Ok(Self { summary })
    }

    pub fn view(&self) -> FaceCatalog<'_> {
        FaceCatalog {
            summary: self.summary.data(),
        }
    }

    /// Overwrites one record; the stored copy is always flagged available.
    pub fn write(&mut self, index: usize, record: &[u8]) -> Result<()> {
        if index >= POOL_CAPACITY {
            return Err(Error::FaceIndexOutOfRange {
                index,
                count: POOL_CAPACITY,
            });
        }
        if record.len() != POOL_RECORD_LEN {
            return Err(Error::LengthMismatch {
                expected: POOL_RECORD_LEN,
                actual: record.len(),
            });
        }
        let target = &mut self.summary.data_mut()[record_range(index)];
        target.copy_from_slice(record);
        if target[0] == 0 {
            target[0] = 1;
        }
        Ok(())
    }

    /// Imports records in sequence. With `start`, records go to consecutive
    /// indices from there; without it, each goes to the next free record.
    /// Stops quietly once indices run out and returns how many were written.
    pub fn import<'r>(
        &mut self,
        records: impl IntoIterator<Item = &'r [u8]>,
        start: Option<usize>,
    ) -> Result<usize> {
        let mut imported = 0;
        let mut cursor = start.unwrap_or(0);
        for record in records {
            let target = match start {
                Some(_) => (cursor < POOL_CAPACITY).then_some(cursor),
                None => self.view().next_free(cursor),
            };
            let Some(target) = target else {
                break;
            };
            self.write(target, record)?;
            imported += 1;
            cursor = target + 1;
        }
        Ok(imported)
    }
}
