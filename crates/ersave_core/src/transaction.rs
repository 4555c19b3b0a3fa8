//! Export/import, re-sign and checksum maintenance on a parsed container.
//!
//! Every mutating operation validates its input before touching a byte,
//! edits the in-memory slots, then hands the touched slot indices to
//! [`Container::persist`], which re-hashes and writes them in one pass. A
//! failed write restores the touched slots.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::anchor::{STAT_GENDER_OFFSET, StatHints};
use crate::container::{Container, resolve_character_anchors};
use crate::digest::{self, Digest};
use crate::error::{Error, Result};
use crate::face::{self, FACE_LEN, POOL_CAPACITY, POOL_RECORD_LEN};
use crate::gender::Gender;
use crate::mirror::{self, MirrorEntry};
use crate::reader::put_u64_at;
use crate::slot::{Slot, SlotKind};

impl Container {
    /// Character payload followed by its summary mirror entry.
    pub fn export_character(&self, index: usize) -> Result<Vec<u8>> {
        let (slot, _) = self.character(index)?;
        let entry = mirror::entry_range(index).ok_or(Error::MirrorOutOfRange { index })?;
        let tail = self
            .summary()
            .data()
            .get(entry)
            .ok_or(Error::MirrorOutOfRange { index })?;

        let mut out = Vec::with_capacity(slot.data().len() + tail.len());
        out.extend_from_slice(slot.data());
        out.extend_from_slice(tail);
        Ok(out)
    }

    /// Replaces a character with an exported blob and re-signs it with the
    /// container's user id.
    ///
    /// With `keep_face`, the face currently in the slot is carried over into
    /// the imported character when the imported payload has a face to
    /// replace; the face write then performs the final re-sign.
    /// `before_resign` runs right before re-signing when no face is restored.
    pub fn import_character(
        &mut self,
        index: usize,
        blob: &[u8],
        keep_face: bool,
        before_resign: Option<&mut dyn FnMut()>,
    ) -> Result<()> {
        let payload_len = self.character(index)?.0.data().len();
        let entry = mirror::entry_range(index).ok_or(Error::MirrorOutOfRange { index })?;
        let expected = payload_len + mirror::MIRROR_STRIDE;
        if blob.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: blob.len(),
            });
        }
        let (payload, tail) = blob.split_at(payload_len);

        let snapshot = if keep_face {
            self.export_face(index).ok()
        } else {
            None
        };

        let imported = MirrorEntry::new(tail);
        let hints = StatHints::from_mirror(&imported);
        let summary_index = self.summary_index();
        self.rollback_on_error(&[index, summary_index], |container| {
            let (summary, character) = container.summary_and_character_mut(index)?;

            character.data_mut().copy_from_slice(payload);
            if let Some(info) = character.character_mut() {
                info.name = imported.name();
                info.level = hints.level;
                info.gender = imported.gender();
                info.available = true;
            }
            resolve_character_anchors(character, Some(&hints));

            let data = summary.data_mut();
            if let Some(flag) = mirror::availability_offset(index).and_then(|off| data.get_mut(off)) {
                *flag = 1;
            }
            data[entry].copy_from_slice(tail);

            let restorable = snapshot.filter(|_| !face::locate_faces(payload).is_empty());
            match restorable {
                Some(face) => {
                    info!(index, "restoring previous face into imported character");
                    container.import_face(index, &face, true)
                }
                None => {
                    if let Some(callback) = before_resign {
                        callback();
                    }
                    let user_id = container.summary_user_id();
                    container.resign_slot(index, user_id)
                }
            }
        })
    }

    /// First face blob in the character payload followed by the body type
    /// byte, or 255 when the stat block is unresolved.
    pub fn export_face(&self, index: usize) -> Result<Vec<u8>> {
        let (slot, info) = self.character(index)?;
        let data = slot.data();
        let start = *face::locate_faces(data)
            .first()
            .ok_or(Error::FaceNotFound { index })?;

        let gender = info
            .stat_offset
            .and_then(|off| data.get(off + STAT_GENDER_OFFSET))
            .copied()
            .unwrap_or(Gender::UNKNOWN_RAW);

        let mut out = Vec::with_capacity(face::FACE_EXPORT_LEN);
        out.extend_from_slice(&data[start..start + FACE_LEN]);
        out.push(gender);
        Ok(out)
    }

    /// Writes a face into every face blob of the character payload and into
    /// its summary mirror entry. A gender byte of 255 leaves the stored body
    /// type untouched.
    pub fn import_face(&mut self, index: usize, blob: &[u8], resign: bool) -> Result<()> {
        let (face_bytes, gender) = face::split_face_export(blob)?;
        let (slot, _) = self.character(index)?;
        let targets = face::locate_faces(slot.data());
        if targets.is_empty() {
            return Err(Error::FaceNotFound { index });
        }
        let entry = mirror::entry_range(index).ok_or(Error::MirrorOutOfRange { index })?;

        let summary_index = self.summary_index();
        self.rollback_on_error(&[index, summary_index], |container| {
            let (summary, character) = container.summary_and_character_mut(index)?;
            let stat_offset = character.character().and_then(|info| info.stat_offset);
            let data = character.data_mut();
            for &start in &targets {
                data[start..start + FACE_LEN].copy_from_slice(face_bytes);
            }

            let known = gender != Gender::UNKNOWN_RAW;
            if known {
                match stat_offset.and_then(|off| data.get_mut(off + STAT_GENDER_OFFSET)) {
                    Some(byte) => *byte = gender,
                    None => warn!(index, "stat block unresolved; body type not written"),
                }
                if let Some(info) = character.character_mut() {
                    info.gender = Some(Gender::from_raw(gender));
                }
            }

            let mirror_entry = &mut summary.data_mut()[entry];
            let face_at = mirror::FACE_OFFSET;
            mirror_entry[face_at..face_at + FACE_LEN].copy_from_slice(face_bytes);
            if known {
                mirror_entry[mirror::GENDER_OFFSET] = gender;
            }
            info!(index, faces = targets.len(), "imported face");

            if resign {
                let user_id = container.summary_user_id();
                container.resign_slot(index, user_id)
            } else {
                container.persist(&[index, summary_index])
            }
        })
    }

    /// Concatenated face pool records in the order given.
    pub fn export_faces(&self, indices: &[usize]) -> Result<Vec<u8>> {
        self.faces().ok_or(Error::NoFacePool)?.export(indices)
    }

    /// Imports a run of face pool records. With `start`, record `n` lands at
    /// `start + n`; without it, each record takes the next free pool entry.
    /// Records beyond the available entries are dropped. Returns the number
    /// imported.
    pub fn import_faces(&mut self, blob: &[u8], start: Option<usize>) -> Result<usize> {
        if self.faces().is_none() {
            return Err(Error::NoFacePool);
        }
        if let Some(index) = start.filter(|&i| i >= POOL_CAPACITY) {
            return Err(Error::FaceIndexOutOfRange {
                index,
                count: POOL_CAPACITY,
            });
        }
        face::validate_pool_records(blob)?;

        let offered = blob.len() / POOL_RECORD_LEN;
        let summary_index = self.summary_index();
        self.rollback_on_error(&[summary_index], |container| {
            let imported = container
                .faces_mut()?
                .import(blob.chunks_exact(POOL_RECORD_LEN), start)?;
            if imported < offered {
                warn!(offered, imported, "face pool full; remaining records dropped");
            }
            if imported > 0 {
                container.persist(&[summary_index])?;
            }
            Ok(imported)
        })
    }

    /// Writes `user_id` into one character slot and the summary slot, then
    /// persists both.
    pub fn resign_slot(&mut self, index: usize, user_id: u64) -> Result<()> {
        let summary_index = self.summary_index();
        self.rollback_on_error(&[index, summary_index], |container| {
            let (summary, character) = container.summary_and_character_mut(index)?;
            write_character_user_id(character, user_id);
            write_summary_user_id(summary, user_id);
            container.persist(&[index, summary_index])
        })
    }

    /// Writes `user_id` into every character slot with a resolved anchor and
    /// into the summary slot. Returns the number of characters re-signed.
    pub fn resign_all(&mut self, user_id: u64) -> Result<usize> {
        let summary_index = self.summary_index();
        let all: Vec<usize> = (0..self.len()).collect();
        self.rollback_on_error(&all, |container| {
            let mut touched = Vec::new();
            for index in 0..container.len() {
                let slot = container.slot_mut(index)?;
                if slot.kind() == SlotKind::Character && write_character_user_id(slot, user_id) {
                    touched.push(index);
                }
            }
            write_summary_user_id(container.slot_mut(summary_index)?, user_id);

            let resigned = touched.len();
            touched.push(summary_index);
            container.persist(&touched)?;
            Ok(resigned)
        })
    }

    /// Rewrites the stored digest header of every slot whose payload no
    /// longer matches it. Payload bytes are never written. Returns the
    /// number of headers rewritten; always 0 for PS4 saves.
    pub fn fix_hashes(&mut self) -> Result<usize> {
        if !self.save_type().has_stored_digests() {
            return Ok(0);
        }
        let mismatched: Vec<(usize, Digest)> = self
            .slots()
            .iter()
            .filter_map(|slot| {
                let actual = digest::digest(slot.data());
                (actual != *slot.integrity_hash()).then_some((slot.index, actual))
            })
            .collect();

        if !mismatched.is_empty() {
            self.persist_digests(&mismatched)?;
        }
        for index in 0..self.len() {
            self.slot_mut(index)?.refresh_digest();
        }
        info!(fixed = mismatched.len(), "fixed slot checksums");
        Ok(mismatched.len())
    }

    /// True when every stored digest matches its payload. PS4 saves carry no
    /// stored digests and always verify.
    pub fn verify_hashes(&self) -> bool {
        !self.save_type().has_stored_digests() || self.slots().iter().all(|s| s.digest_matches())
    }

    pub fn export_character_to(&self, index: usize, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.export_character(index)?)?;
        Ok(())
    }

    pub fn import_character_from(
        &mut self,
        index: usize,
        path: impl AsRef<Path>,
        keep_face: bool,
    ) -> Result<()> {
        let blob = fs::read(path)?;
        self.import_character(index, &blob, keep_face, None)
    }

    pub fn export_face_to(&self, index: usize, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.export_face(index)?)?;
        Ok(())
    }

    pub fn import_face_from(&mut self, index: usize, path: impl AsRef<Path>) -> Result<()> {
        let blob = fs::read(path)?;
        self.import_face(index, &blob, true)
    }

    pub fn export_faces_to(&self, indices: &[usize], path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.export_faces(indices)?)?;
        Ok(())
    }

    pub fn import_faces_from(&mut self, path: impl AsRef<Path>, start: Option<usize>) -> Result<usize> {
        let blob = fs::read(path)?;
        self.import_faces(&blob, start)
    }
}

fn write_character_user_id(slot: &mut Slot, user_id: u64) -> bool {
    let index = slot.index;
    let Some(offset) = slot.character().and_then(|info| info.user_id_offset) else {
        warn!(index, "user id anchor unresolved; character keeps its user id");
        return false;
    };
    if !put_u64_at(slot.data_mut(), offset, user_id) {
        return false;
    }
    if let Some(info) = slot.character_mut() {
        info.user_id = user_id;
    }
    true
}

fn write_summary_user_id(slot: &mut Slot, user_id: u64) {
    put_u64_at(slot.data_mut(), mirror::SUMMARY_USER_ID_OFFSET, user_id);
    if let Some(info) = slot.summary_mut() {
        info.user_id = user_id;
    }
}
