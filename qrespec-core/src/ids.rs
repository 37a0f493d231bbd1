//! Identity and timestamps for questionnaire entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Questionnaire,
    Module,
    Section,
    Question,
    Response,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Questionnaire,
        EntityKind::Module,
        EntityKind::Section,
        EntityKind::Question,
        EntityKind::Response,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Questionnaire => "questionnaire",
            EntityKind::Module => "module",
            EntityKind::Section => "section",
            EntityKind::Question => "question",
            EntityKind::Response => "response",
        };
        f.write_str(name)
    }
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const KIND: EntityKind = $kind;

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", Self::KIND, self.0)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Root identity. A document holds exactly one questionnaire.
    QuestionnaireId,
    EntityKind::Questionnaire
);
entity_id!(ModuleId, EntityKind::Module);
entity_id!(SectionId, EntityKind::Section);
entity_id!(QuestionId, EntityKind::Question);
entity_id!(ResponseId, EntityKind::Response);

/// Hands out identities, one counter per entity kind.
///
/// Each document owns its allocator, so an id is unique only within the
/// document that issued it; two documents both start at 1. Ids start at 1. After hydration the counters are raised past every id
/// already present so fresh entities never collide with loaded ones.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: [u32; 5],
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, kind: EntityKind) -> u32 {
        let slot = &mut self.last[kind.slot()];
        *slot = slot.saturating_add(1);
        *slot
    }

    /// Mark `id` as used so it is never handed out.
    pub fn reserve(&mut self, kind: EntityKind, id: u32) {
        let slot = &mut self.last[kind.slot()];
        if id > *slot {
            *slot = id;
        }
    }

    pub fn last_issued(&self, kind: EntityKind) -> u32 {
        self.last[kind.slot()]
    }

    pub fn next_module(&mut self) -> ModuleId {
        ModuleId(self.next(EntityKind::Module))
    }

    pub fn next_section(&mut self) -> SectionId {
        SectionId(self.next(EntityKind::Section))
    }

    pub fn next_question(&mut self) -> QuestionId {
        QuestionId(self.next(EntityKind::Question))
    }

    pub fn next_response(&mut self) -> ResponseId {
        ResponseId(self.next(EntityKind::Response))
    }
}

/// Creation and modification timestamps carried by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stamps {
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

impl Stamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            date_created: now,
            date_modified: now,
        }
    }

    pub fn touch(&mut self) {
        self.date_modified = Utc::now();
    }
}

impl Default for Stamps {
    // Hydrated records missing their timestamps get the epoch, never "now".
    fn default() -> Self {
        Self {
            date_created: DateTime::<Utc>::default(),
            date_modified: DateTime::<Utc>::default(),
        }
    }
}
