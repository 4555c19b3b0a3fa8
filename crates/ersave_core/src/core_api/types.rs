use serde::{Deserialize, Serialize};

use crate::container::SaveType;
use crate::gender::Gender;
use crate::slot::{STAT_COUNT, SlotKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub save_type: SaveType,
    pub user_id: u64,
    pub slot_count: usize,
    pub summary_index: usize,
    pub has_face_pool: bool,
    pub checksums_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub index: usize,
    pub kind: SlotKind,
    pub offset: u64,
    pub file_name: String,
    pub checksum_ok: bool,
    /// Present for character slots only.
    pub character: Option<CharacterSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSummary {
    pub name: String,
    pub level: u16,
    pub stats: [u32; STAT_COUNT],
    pub available: bool,
    pub gender: Option<Gender>,
    pub user_id: u64,
    pub user_id_offset: Option<usize>,
    pub stat_offset: Option<usize>,
}

impl CharacterSummary {
    /// An empty slot has no mirror entry in the summary.
    pub fn is_empty(&self) -> bool {
        self.level == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSummary {
    pub index: usize,
    pub available: bool,
    pub gender: Gender,
}
