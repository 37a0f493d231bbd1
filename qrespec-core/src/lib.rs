//! QreSpec Core - Questionnaire Specification Generator
//!
//! # The Six Laws (Non-Negotiable)
//! 1. Flags Are Truth: derived text is always recomputable from flags
//! 2. Every Entity Has One Parent
//! 3. Sibling Order Is Insertion Order
//! 4. Reserved Codes Are Never User Codes
//! 5. Audit Precedes Layout
//! 6. Loading Never Re-synthesizes

pub mod config;
pub mod document;
pub mod error;
pub mod flags;
pub mod hashing;
pub mod ids;
pub mod interchange;
pub mod language;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod surface;
pub mod synthesis;
pub mod validation;

pub use config::{AuditConfig, FailureMode, LayoutConfig, SpecConfig};
pub use document::{Arena, Document, Member};
pub use error::{QreError, QreResult};
pub use flags::{
    AdcFlag, NonAdcFlag, ProgFlagEntry, QuestionType, ResponseCode, ResponseFlag, RoutingFlag,
};
pub use hashing::{canonical_json, content_fingerprint, document_fingerprint};
pub use ids::{EntityKind, IdAllocator, ModuleId, QuestionId, QuestionnaireId, ResponseId, SectionId};
pub use model::{Entity, Module, NewQuestion, QuestionBlock, Questionnaire, Response, Section};
pub use pipeline::{BuildPipeline, BuildReport, PipelineError};
pub use surface::{GridSurface, RecordingSurface, RenderSurface, SurfaceError};
pub use validation::{AuditResult, Auditor, ValidationViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
