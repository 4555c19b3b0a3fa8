use std::fmt;

use serde::{Deserialize, Serialize};

/// Body type byte stored next to the character name and in the summary
/// mirror. `255` is the sentinel written by face exports when the stat block
/// could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Unknown(u8),
}

impl Gender {
    pub const FEMALE_RAW: u8 = 0;
    pub const MALE_RAW: u8 = 1;
    pub const UNKNOWN_RAW: u8 = 255;

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::FEMALE_RAW => Self::Female,
            Self::MALE_RAW => Self::Male,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match *self {
            Self::Female => Self::FEMALE_RAW,
            Self::Male => Self::MALE_RAW,
            Self::Unknown(other) => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Unknown(Self::UNKNOWN_RAW) => f.write_str("Unknown"),
            Self::Unknown(raw) => write!(f, "Unknown({raw})"),
            known => f.write_str(known.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_values() {
        assert_eq!(Gender::from_raw(0), Gender::Female);
        assert_eq!(Gender::from_raw(1), Gender::Male);
    }

    #[test]
    fn preserves_unknown_values() {
        assert_eq!(Gender::from_raw(255), Gender::Unknown(255));
        assert_eq!(Gender::from_raw(7).raw(), 7);
    }
}
