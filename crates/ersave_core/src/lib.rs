//! Save container editing for Steam and PS4 character saves: slot parsing,
//! anchor discovery, face catalog access and checksum-preserving
//! export/import.

pub mod anchor;
pub mod backing;
pub mod container;
pub mod core_api;
pub mod digest;
pub mod error;
pub mod face;
pub mod gender;
pub mod layout;
pub mod mirror;
pub mod pattern;
pub mod reader;
pub mod slot;
mod transaction;

pub use backing::Backing;
pub use container::{Container, SaveType};
pub use error::{Error, Result};
pub use face::{FaceCatalog, FaceRecord};
pub use gender::Gender;
pub use slot::{CharacterInfo, Slot, SlotDetail, SlotKind, SummaryInfo};
