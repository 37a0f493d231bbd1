//! Core error kinds shared by the document model and the synthesis engine.
//!
//! Lookups never fail: a missing id is a plain `None`. Everything that can
//! fail loudly lives here.

use thiserror::Error;

use crate::flags::{ResponseFlag, ResponsePartition};
use crate::ids::EntityKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QreError {
    /// Out-of-domain numeric or enum argument.
    #[error("argument `{argument}` out of range: {value} ({reason})")]
    Range {
        argument: &'static str,
        value: String,
        reason: String,
    },

    /// Two flags from the same exclusive partition on one response.
    #[error("flag {flag:?} conflicts with {existing:?} in the {partition:?} partition")]
    Conflict {
        flag: ResponseFlag,
        existing: ResponseFlag,
        partition: ResponsePartition,
    },

    /// The exact flag is already present on the response.
    #[error("flag {0:?} is already set")]
    DuplicateFlag(ResponseFlag),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("parent {kind} {id} does not exist")]
    UnknownParent { kind: EntityKind, id: u32 },

    #[error("{kind} {id} is already attached")]
    AlreadyAttached { kind: EntityKind, id: u32 },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u32 },
}

impl QreError {
    pub fn range(
        argument: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::Range {
            argument,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type QreResult<T> = Result<T, QreError>;
