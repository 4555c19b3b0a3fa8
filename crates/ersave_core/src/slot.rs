use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::{self, Digest};
use crate::gender::Gender;

pub const CHARACTER_PAYLOAD_LEN: usize = 0x28_0000;
pub const SUMMARY_PAYLOAD_LEN: usize = 0x6_0000;
pub const STAT_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    Character,
    Summary,
    Other,
}

impl SlotKind {
    /// Kind is decided purely by payload size (digest header excluded).
    pub fn from_payload_len(len: usize) -> Self {
        match len {
            CHARACTER_PAYLOAD_LEN => Self::Character,
            SUMMARY_PAYLOAD_LEN => Self::Summary,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Character => "character",
            Self::Summary => "summary",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterInfo {
    /// Name and level come from the summary mirror table, not from the slot.
    pub name: String,
    pub level: u16,
    pub stats: [u32; STAT_COUNT],
    pub user_id_offset: Option<usize>,
    pub user_id: u64,
    pub stat_offset: Option<usize>,
    pub available: bool,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryInfo {
    pub user_id: u64,
    pub has_face_pool: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotDetail {
    Character(CharacterInfo),
    Summary(SummaryInfo),
    Other,
}

/// One region of the container.
///
/// Payload bytes are only reachable mutably through [`Slot::data_mut`],
/// which marks the cached digest stale; the container re-hashes stale slots
/// when it persists them.
#[derive(Debug, Clone)]
pub struct Slot {
    pub index: usize,
    /// Absolute offset of the region in the backing file. For Steam saves
    /// this is where the 16-byte digest header starts.
    pub offset: u64,
    pub file_name: String,
    pub detail: SlotDetail,
    data: Vec<u8>,
    integrity_hash: Digest,
    stale: bool,
}

impl Slot {
    pub fn new(index: usize, offset: u64, file_name: String, data: Vec<u8>, hash: Digest) -> Self {
        let detail = match SlotKind::from_payload_len(data.len()) {
            SlotKind::Character => SlotDetail::Character(CharacterInfo::default()),
            SlotKind::Summary => SlotDetail::Summary(SummaryInfo::default()),
            SlotKind::Other => SlotDetail::Other,
        };
        Self {
            index,
            offset,
            file_name,
            detail,
            data,
            integrity_hash: hash,
            stale: false,
        }
    }

    pub fn kind(&self) -> SlotKind {
        match self.detail {
            SlotDetail::Character(_) => SlotKind::Character,
            SlotDetail::Summary(_) => SlotKind::Summary,
            SlotDetail::Other => SlotKind::Other,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        self.stale = true;
        &mut self.data
    }

    pub fn integrity_hash(&self) -> &Digest {
        &self.integrity_hash
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// True when the cached digest still describes the payload.
    pub fn digest_matches(&self) -> bool {
        digest::digest(&self.data) == self.integrity_hash
    }

    /// Recomputes the digest, caches it and returns it.
    pub(crate) fn refresh_digest(&mut self) -> Digest {
        self.integrity_hash = digest::digest(&self.data);
        self.stale = false;
        self.integrity_hash
    }

    pub fn character(&self) -> Option<&CharacterInfo> {
        match &self.detail {
            SlotDetail::Character(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn character_mut(&mut self) -> Option<&mut CharacterInfo> {
        match &mut self.detail {
            SlotDetail::Character(info) => Some(info),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&SummaryInfo> {
        match &self.detail {
            SlotDetail::Summary(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn summary_mut(&mut self) -> Option<&mut SummaryInfo> {
        match &mut self.detail {
            SlotDetail::Summary(info) => Some(info),
            _ => None,
        }
    }
}
