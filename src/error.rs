use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::control::Type;

/// Everything that can go wrong while talking to a device's controls.
///
/// Only [`Error::Open`] and [`Error::NotCompliant`] keep a session from being
/// created. The rest are local to the control they name.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("{} is not a V4L2 device: {source}", .path.display())]
    NotCompliant { path: PathBuf, source: io::Error },

    #[error("failed to read control {id:#010x}: {source}")]
    Get { id: u32, source: io::Error },

    #[error("failed to write control {id:#010x}: {source}")]
    Set { id: u32, source: io::Error },

    #[error("control {id:#010x} has unsupported type {typ}")]
    UnknownKind { id: u32, typ: Type },

    #[error("value {value} is not valid for control {id:#010x} (range {minimum}..={maximum})")]
    OutOfRange {
        id: u32,
        value: i64,
        minimum: i64,
        maximum: i64,
    },

    #[error("control {0:#010x} is grabbed, read-only or inactive")]
    Inactive(u32),

    #[error("control {0:#010x} outlived its device")]
    Detached(u32),

    #[error("no control with id {0:#010x}")]
    NoSuchControl(u32),

    #[error("no control named {0:?}")]
    NoSuchName(String),
}

/// Crate-level Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The control this error is about, if any
    pub fn control_id(&self) -> Option<u32> {
        match self {
            Error::Open { .. } | Error::NotCompliant { .. } | Error::NoSuchName(_) => None,
            Error::Get { id, .. }
            | Error::Set { id, .. }
            | Error::UnknownKind { id, .. }
            | Error::OutOfRange { id, .. } => Some(*id),
            Error::Inactive(id) | Error::Detached(id) | Error::NoSuchControl(id) => Some(*id),
        }
    }

    /// Whether the error prevents a session from existing at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Open { .. } | Error::NotCompliant { .. })
    }
}
