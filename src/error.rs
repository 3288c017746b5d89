// Structured errors for malformed arena snapshots
//
// These are the only errors the planning core reports to its caller.
// Search failures are ordinary outcomes and never surface here.

use std::fmt;

use crate::types::Position;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridError {
    /// The payload could not be decoded at all (wrong JSON types, truncated body)
    Malformed(String),
    /// A required field is absent. `index` is the position within its list, if any.
    MissingField {
        entity: &'static str,
        index: Option<usize>,
        field: &'static str,
    },
    InvalidMapSize { width: i32, height: i32 },
    OutOfBounds {
        entity: &'static str,
        index: usize,
        pos: Position,
    },
    UnknownMobType { index: usize, kind: String },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed arena state: {}", reason),
            Self::MissingField {
                entity,
                index: Some(index),
                field,
            } => write!(f, "{}[{}] is missing required field '{}'", entity, index, field),
            Self::MissingField {
                entity,
                index: None,
                field,
            } => write!(f, "{} is missing required field '{}'", entity, field),
            Self::InvalidMapSize { width, height } => {
                write!(f, "invalid map size {}x{}", width, height)
            }
            Self::OutOfBounds { entity, index, pos } => write!(
                f,
                "{}[{}] at ({}, {}) lies outside the map",
                entity, index, pos.x, pos.y
            ),
            Self::UnknownMobType { index, kind } => {
                write!(f, "mobs[{}] has unknown type '{}'", index, kind)
            }
        }
    }
}

impl std::error::Error for GridError {}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        GridError::Malformed(e.to_string())
    }
}
