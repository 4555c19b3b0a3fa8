use thiserror::Error;

use crate::slot::SlotKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unrecognized container magic {magic:#010x}")]
    UnrecognizedFormat { magic: u32 },

    #[error("malformed container header: {reason}")]
    MalformedHeader { reason: String },

    #[error("unexpected end of input while reading {context}")]
    Truncated { context: String },

    #[error("container must hold exactly one summary slot, found {found}")]
    SummarySlotCount { found: usize },

    #[error("slot index {index} out of range (container has {count} slots)")]
    SlotOutOfRange { index: usize, count: usize },

    #[error("slot {index} is a {actual} slot, expected {expected}")]
    SlotKindMismatch {
        index: usize,
        expected: SlotKind,
        actual: SlotKind,
    },

    #[error("slot {index} has no entry in the summary mirror table")]
    MirrorOutOfRange { index: usize },

    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("face data does not start with the face signature")]
    SignatureMismatch,

    #[error("no face data found in slot {index}")]
    FaceNotFound { index: usize },

    #[error("summary slot carries no face pool")]
    NoFacePool,

    #[error("face index {index} out of range (pool holds {count} faces)")]
    FaceIndexOutOfRange { index: usize, count: usize },

    #[error("face {index} is empty")]
    FaceUnavailable { index: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn truncated(context: impl Into<String>) -> Self {
        Self::Truncated {
            context: context.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
        }
    }

    /// True for errors raised while the container was being parsed; the
    /// container is unusable afterwards.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedFormat { .. }
                | Self::MalformedHeader { .. }
                | Self::Truncated { .. }
                | Self::SummarySlotCount { .. }
        )
    }
}
