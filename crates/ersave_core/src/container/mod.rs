//! Container parsing and persistence.
//!
//! A container is a fixed header followed by a list of regions. The Steam
//! variant describes its regions in a descriptor table and prefixes each one
//! with an MD5 digest; the PS4 variant has hard-coded region sizes and no
//! stored digests. After framing, both variants share the same slot model.

pub mod ps4;
pub mod steam;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::anchor::{AnchorStrategy, StatBlockAnchor, StatHints, UserIdAnchor, read_stat_block};
use crate::backing::Backing;
use crate::digest::{self, DIGEST_LEN, Digest};
use crate::error::{Error, Result};
use crate::face::{self, FaceCatalog, FaceCatalogMut};
use crate::gender::Gender;
use crate::layout::{ContainerLayout, RegionLayout};
use crate::mirror::{self, MirrorEntry};
use crate::reader::{LittleEndianReader, u64_at};
use crate::slot::{CharacterInfo, Slot, SlotKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveType {
    Steam,
    #[serde(rename = "PS4")]
    Ps4,
}

impl SaveType {
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            steam::MAGIC => Some(Self::Steam),
            ps4::MAGIC => Some(Self::Ps4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Steam => "Steam",
            Self::Ps4 => "PS4",
        }
    }

    /// Whether each region is preceded by a stored digest on disk.
    pub fn has_stored_digests(&self) -> bool {
        matches!(self, Self::Steam)
    }
}

impl fmt::Display for SaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header bytes plus the region layout decoded from them.
pub(crate) struct Framing {
    pub header: Vec<u8>,
    pub regions: Vec<RegionLayout>,
    pub names: Vec<String>,
}

#[derive(Debug)]
pub struct Container {
    save_type: SaveType,
    header: Vec<u8>,
    slots: Vec<Slot>,
    summary_index: usize,
    backing: Backing,
}

impl Container {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::load(BufReader::new(file), Backing::File(path.to_path_buf()))
    }

    /// Parses an in-memory image. Mutations are persisted into that image,
    /// readable afterwards through [`Container::image`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (save_type, framing, slots) = parse(Cursor::new(bytes.as_slice()))?;
        Self::assemble(save_type, framing.header, slots, Backing::Memory(bytes))
    }

    pub fn load<R: Read + Seek>(reader: R, backing: Backing) -> Result<Self> {
        let (save_type, framing, slots) = parse(reader)?;
        Self::assemble(save_type, framing.header, slots, backing)
    }

    fn assemble(
        save_type: SaveType,
        header: Vec<u8>,
        mut slots: Vec<Slot>,
        backing: Backing,
    ) -> Result<Self> {
        let summaries: Vec<usize> = slots
            .iter()
            .filter(|s| s.kind() == SlotKind::Summary)
            .map(|s| s.index)
            .collect();
        let &[summary_index] = summaries.as_slice() else {
            return Err(Error::SummarySlotCount {
                found: summaries.len(),
            });
        };

        let mirrors: Vec<Option<MirrorState>> = {
            let summary = slots[summary_index].data();
            slots
                .iter()
                .map(|s| {
                    (s.kind() == SlotKind::Character)
                        .then(|| MirrorState::read(summary, s.index))
                        .flatten()
                })
                .collect()
        };

        let summary = &mut slots[summary_index];
        let user_id = mirror::summary_user_id(summary.data());
        let has_face_pool = face::pool_present(summary.data());
        if let Some(info) = summary.summary_mut() {
            info.user_id = user_id;
            info.has_face_pool = has_face_pool;
        }
        debug!(summary_index, user_id, has_face_pool, "summary slot");

        for (slot, state) in slots.iter_mut().zip(&mirrors) {
            if slot.kind() != SlotKind::Character {
                continue;
            }
            if let (Some(state), Some(info)) = (state, slot.character_mut()) {
                state.apply(info);
            }
            let hints = state.as_ref().map(|s| &s.hints);
            resolve_character_anchors(slot, hints);
        }

        Ok(Self {
            save_type,
            header,
            slots,
            summary_index,
            backing,
        })
    }

    pub fn save_type(&self) -> SaveType {
        self.save_type
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&Slot> {
        self.slots.get(index).ok_or(Error::SlotOutOfRange {
            index,
            count: self.slots.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn summary_index(&self) -> usize {
        self.summary_index
    }

    pub fn summary(&self) -> &Slot {
        &self.slots[self.summary_index]
    }

    pub fn summary_user_id(&self) -> u64 {
        self.summary().summary().map_or(0, |s| s.user_id)
    }

    /// The slot at `index`, provided it is a character slot.
    pub fn character(&self, index: usize) -> Result<(&Slot, &CharacterInfo)> {
        let slot = self.slot(index)?;
        match slot.character() {
            Some(info) => Ok((slot, info)),
            None => Err(Error::SlotKindMismatch {
                index,
                expected: SlotKind::Character,
                actual: slot.kind(),
            }),
        }
    }

    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// The persisted container image for memory-backed containers.
    pub fn image(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Memory(image) => Some(image),
            Backing::File(_) => None,
        }
    }

    pub fn faces(&self) -> Option<FaceCatalog<'_>> {
        FaceCatalog::new(self.summary().data())
    }

    pub(crate) fn faces_mut(&mut self) -> Result<FaceCatalogMut<'_>> {
        FaceCatalogMut::new(&mut self.slots[self.summary_index])
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Result<&mut Slot> {
        let count = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(Error::SlotOutOfRange { index, count })
    }

    pub(crate) fn character_slot_mut(&mut self, index: usize) -> Result<&mut Slot> {
        let slot = self.slot_mut(index)?;
        match slot.kind() {
            SlotKind::Character => Ok(slot),
            actual => Err(Error::SlotKindMismatch {
                index,
                expected: SlotKind::Character,
                actual,
            }),
        }
    }

    /// Mutable access to the summary slot and one character slot at once.
    pub(crate) fn summary_and_character_mut(
        &mut self,
        index: usize,
    ) -> Result<(&mut Slot, &mut Slot)> {
        self.character_slot_mut(index)?;
        let summary_index = self.summary_index;
        let (low, high) = self.slots.split_at_mut(summary_index.max(index));
        Ok(if summary_index < index {
            (&mut low[summary_index], &mut high[0])
        } else {
            (&mut high[0], &mut low[index])
        })
    }

    /// Runs `edit` and, if it fails, puts the listed slots back as they were
    /// before it ran. In-memory bytes then never run ahead of the store.
    pub(crate) fn rollback_on_error<T>(
        &mut self,
        indices: &[usize],
        edit: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved: Vec<Slot> = indices
            .iter()
            .filter_map(|&index| self.slots.get(index).cloned())
            .collect();
        let result = edit(self);
        if result.is_err() {
            for slot in saved {
                let index = slot.index;
                self.slots[index] = slot;
            }
            warn!(slots = ?indices, "edit failed; slots restored");
        }
        result
    }

    /// Re-hashes the given slots and writes them to the backing store: digest
    /// header plus payload for Steam, payload only for PS4. The store is
    /// opened once and released before returning.
    pub(crate) fn persist(&mut self, indices: &[usize]) -> Result<()> {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let count = self.slots.len();
        let stored_digests = self.save_type.has_stored_digests();
        let mut writer = self.backing.writer()?;
        for &index in &indices {
            let slot = self
                .slots
                .get_mut(index)
                .ok_or(Error::SlotOutOfRange { index, count })?;
            let digest = slot.refresh_digest();
            if stored_digests {
                writer.write_at(slot.offset, &digest)?;
                writer.write_at(slot.offset + DIGEST_LEN as u64, slot.data())?;
            } else {
                writer.write_at(slot.offset, slot.data())?;
            }
        }
        writer.finish()?;
        info!(slots = ?indices, save_type = %self.save_type, "persisted slots");
        Ok(())
    }

    /// Rewrites only the 16-byte digest headers of the given slots.
    pub(crate) fn persist_digests(&mut self, digests: &[(usize, Digest)]) -> Result<()> {
        let mut writer = self.backing.writer()?;
        for (index, digest) in digests {
            let slot = self.slots.get(*index).ok_or(Error::SlotOutOfRange {
                index: *index,
                count: self.slots.len(),
            })?;
            writer.write_at(slot.offset, digest)?;
        }
        writer.finish()
    }
}

/// Mirror-table fields for one character index, captured before the
/// character slots are borrowed mutably.
struct MirrorState {
    hints: StatHints,
    name: String,
    available: bool,
    gender: Option<Gender>,
}

impl MirrorState {
    fn read(summary: &[u8], index: usize) -> Option<Self> {
        let entry = MirrorEntry::at(summary, index)?;
        if entry.is_empty() {
            return None;
        }
        let available = mirror::availability_offset(index)
            .and_then(|off| summary.get(off))
            .is_some_and(|&b| b != 0);
        Some(Self {
            hints: StatHints::from_mirror(&entry),
            name: entry.name(),
            available,
            gender: entry.gender(),
        })
    }

    fn apply(&self, info: &mut CharacterInfo) {
        info.name = self.name.clone();
        info.level = self.hints.level;
        info.available = self.available;
        info.gender = self.gender;
    }
}

fn parse<R: Read + Seek>(reader: R) -> Result<(SaveType, Framing, Vec<Slot>)> {
    let mut r = LittleEndianReader::new(reader);
    let magic = r.read_u32("container magic")?;
    let save_type = SaveType::from_magic(magic).ok_or(Error::UnrecognizedFormat { magic })?;

    let framing = match save_type {
        SaveType::Steam => steam::read_framing(&mut r)?,
        SaveType::Ps4 => ps4::read_framing(&mut r)?,
    };
    let layout = ContainerLayout {
        header_len: framing.header.len() as u64,
        regions: framing.regions.clone(),
    };
    layout.validate()?;

    let stream_len = r.stream_len()?;
    let mut slots = Vec::with_capacity(framing.regions.len());
    for (region, name) in framing.regions.iter().zip(&framing.names) {
        if region.range.end > stream_len {
            return Err(Error::truncated(format!(
                "slot {} ({:#x}..{:#x}, save is {stream_len:#x} bytes)",
                region.index, region.range.start, region.range.end
            )));
        }
        r.seek_to(region.range.start)?;
        let stored = if region.digest_len > 0 {
            let mut stored = [0u8; DIGEST_LEN];
            r.read_into(&mut stored, &format!("slot {} digest", region.index))?;
            Some(stored)
        } else {
            None
        };
        r.seek_to(region.payload_start())?;
        let payload_len = usize::try_from(region.payload_len())
            .map_err(|_| Error::malformed(format!("slot {} is too large", region.index)))?;
        let data = r.read_bytes(payload_len, &format!("slot {} payload", region.index))?;
        let hash = stored.unwrap_or_else(|| digest::digest(&data));

        let slot = Slot::new(region.index, region.range.start, name.clone(), data, hash);
        debug!(
            index = slot.index,
            kind = %slot.kind(),
            offset = slot.offset,
            len = slot.data().len(),
            name = %slot.file_name,
            "slot"
        );
        slots.push(slot);
    }
    Ok((save_type, framing, slots))
}

/// Runs both anchor strategies over a character slot and refreshes the
/// fields derived from them. An unresolved anchor clears its field.
pub(crate) fn resolve_character_anchors(slot: &mut Slot, hints: Option<&StatHints>) {
    let index = slot.index;
    let user_id_offset = resolve_user_id_anchor(slot);
    let user_id = user_id_offset
        .and_then(|off| u64_at(slot.data(), off))
        .unwrap_or(0);

    let block = hints
        .filter(|h| h.level != 0)
        .and_then(|h| resolve_stat_anchor(slot, h))
        .and_then(|off| read_stat_block(slot.data(), off));

    match user_id_offset {
        Some(off) => debug!(index, offset = off, user_id, "user id anchor"),
        None if hints.is_some_and(|h| h.level != 0) => {
            warn!(index, "user id anchor unresolved; user id will not be rewritten")
        }
        None => debug!(index, "empty character slot has no user id anchor"),
    }
    match (&block, hints) {
        (Some(b), _) => debug!(index, offset = b.offset, level = b.level, "stat anchor"),
        (None, Some(h)) if h.level != 0 => {
            warn!(index, level = h.level, "stat anchor unresolved; gender byte will be skipped")
        }
        _ => {}
    }

    let Some(info) = slot.character_mut() else {
        return;
    };
    info.user_id_offset = user_id_offset;
    info.user_id = user_id;
    match block {
        Some(block) => {
            info.stat_offset = Some(block.offset);
            info.stats = block.stats;
            info.gender = Some(block.gender);
        }
        None => {
            info.stat_offset = None;
            info.stats = Default::default();
        }
    }
}

pub fn resolve_user_id_anchor(slot: &Slot) -> Option<usize> {
    UserIdAnchor::default().resolve(slot.data(), &())
}

pub fn resolve_stat_anchor(slot: &Slot, hints: &StatHints) -> Option<usize> {
    StatBlockAnchor.resolve(slot.data(), hints)
}
