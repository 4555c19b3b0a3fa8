use std::path::Path;

use crate::container::{Container, SaveType};
use crate::slot::{Slot, SlotKind};

use super::error::{CoreError, CoreErrorCode};
use super::types::{CharacterSummary, ContainerSummary, FaceSummary, SlotSummary};

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

/// One open save. All edits go through the session and are persisted to
/// wherever the save was opened from.
#[derive(Debug)]
pub struct Session {
    container: Container,
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn open_path(&self, path: impl AsRef<Path>) -> Result<Session, CoreError> {
        let path = path.as_ref();
        let container = Container::open(path).map_err(|e| {
            CoreError::new(
                e.code(),
                format!("failed to open {}: {e}", path.display()),
            )
        })?;
        Ok(Session { container })
    }

    pub fn open_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<Session, CoreError> {
        let container = Container::from_bytes(bytes.into())?;
        Ok(Session { container })
    }
}

impl Session {
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn save_type(&self) -> SaveType {
        self.container.save_type()
    }

    pub fn summary(&self) -> ContainerSummary {
        let c = &self.container;
        ContainerSummary {
            save_type: c.save_type(),
            user_id: c.summary_user_id(),
            slot_count: c.len(),
            summary_index: c.summary_index(),
            has_face_pool: c.faces().is_some(),
            checksums_ok: c.verify_hashes(),
        }
    }

    /// Every slot, or only `slot` when given.
    pub fn list_slots(&self, slot: Option<usize>) -> Result<Vec<SlotSummary>, CoreError> {
        match slot {
            Some(index) => Ok(vec![slot_summary(self.container.slot(index)?)]),
            None => Ok(self.container.slots().iter().map(slot_summary).collect()),
        }
    }

    pub fn list_faces(&self) -> Result<Vec<FaceSummary>, CoreError> {
        let faces = self.container.faces().ok_or_else(no_face_pool)?;
        Ok(faces
            .iter()
            .map(|record| FaceSummary {
                index: record.index,
                available: record.available(),
                gender: record.gender(),
            })
            .collect())
    }

    pub fn export_character(&self, slot: usize, path: impl AsRef<Path>) -> Result<(), CoreError> {
        Ok(self.container.export_character_to(slot, path)?)
    }

    /// Imports into `slot`, or into the first empty character slot when no
    /// slot is given. Returns the slot written.
    pub fn import_character(
        &mut self,
        slot: Option<usize>,
        path: impl AsRef<Path>,
        keep_face: bool,
    ) -> Result<usize, CoreError> {
        let index = match slot {
            Some(index) => index,
            None => self.first_empty_character().ok_or_else(|| {
                CoreError::new(CoreErrorCode::Rejected, "no empty character slot")
            })?,
        };
        self.container.import_character_from(index, path, keep_face)?;
        Ok(index)
    }

    pub fn export_face(&self, slot: usize, path: impl AsRef<Path>) -> Result<(), CoreError> {
        Ok(self.container.export_face_to(slot, path)?)
    }

    pub fn import_face(&mut self, slot: usize, path: impl AsRef<Path>) -> Result<(), CoreError> {
        Ok(self.container.import_face_from(slot, path)?)
    }

    /// Exports the given pool records, or every available record when
    /// `indices` is empty.
    pub fn export_faces(&self, indices: &[usize], path: impl AsRef<Path>) -> Result<usize, CoreError> {
        let indices = if indices.is_empty() {
            let faces = self.container.faces().ok_or_else(no_face_pool)?;
            faces
                .iter()
                .filter(|r| r.available())
                .map(|r| r.index)
                .collect()
        } else {
            indices.to_vec()
        };
        self.container.export_faces_to(&indices, path)?;
        Ok(indices.len())
    }

    pub fn import_faces(
        &mut self,
        path: impl AsRef<Path>,
        start: Option<usize>,
    ) -> Result<usize, CoreError> {
        Ok(self.container.import_faces_from(path, start)?)
    }

    /// Re-signs one character slot or all of them. Without `user_id`, the
    /// summary slot's current user id is used. Returns the number of
    /// characters re-signed.
    pub fn resign(&mut self, slot: Option<usize>, user_id: Option<u64>) -> Result<usize, CoreError> {
        let user_id = user_id.unwrap_or_else(|| self.container.summary_user_id());
        match slot {
            Some(index) => {
                self.container.resign_slot(index, user_id)?;
                Ok(1)
            }
            None => Ok(self.container.resign_all(user_id)?),
        }
    }

    pub fn fix_checksums(&mut self) -> Result<usize, CoreError> {
        Ok(self.container.fix_hashes()?)
    }

    pub fn verify_checksums(&self) -> bool {
        self.container.verify_hashes()
    }

    fn first_empty_character(&self) -> Option<usize> {
        self.container
            .slots()
            .iter()
            .find(|s| s.character().is_some_and(|info| info.level == 0))
            .map(|s| s.index)
    }
}

fn no_face_pool() -> CoreError {
    CoreError::new(
        CoreErrorCode::Unsupported,
        "summary slot carries no face pool",
    )
}

fn slot_summary(slot: &Slot) -> SlotSummary {
    let character = match slot.kind() {
        SlotKind::Character => slot.character().map(|info| CharacterSummary {
            name: info.name.clone(),
            level: info.level,
            stats: info.stats,
            available: info.available,
            gender: info.gender,
            user_id: info.user_id,
            user_id_offset: info.user_id_offset,
            stat_offset: info.stat_offset,
        }),
        SlotKind::Summary | SlotKind::Other => None,
    };
    SlotSummary {
        index: slot.index,
        kind: slot.kind(),
        offset: slot.offset,
        file_name: slot.file_name.clone(),
        checksum_ok: slot.digest_matches(),
        character,
    }
}
