//! Interchange Format - JSON Document Tree
//!
//! The tree mirrors the entity hierarchy. Flags are written by name, absent
//! optional fields are omitted, and missing fields take their defaults on
//! read. Reading goes through the hydrate path: nothing is re-synthesized.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::document::Document;
use crate::error::QreError;
use crate::ids::EntityKind;
use crate::model::{Entity, Module, QuestionBlock, Questionnaire, Response, Section};
use crate::ENGINE_VERSION;

/// Version written into every envelope.
pub const FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid format version: {0}")]
    BadVersion(#[from] semver::Error),

    #[error("format version {found} is not readable by this engine (supports {supported})")]
    UnsupportedVersion { found: String, supported: String },

    #[error("{kind} {id} is nested under {parent_kind} {nested_under} but names {declared} as its parent")]
    ParentMismatch {
        kind: EntityKind,
        id: u32,
        parent_kind: EntityKind,
        nested_under: u32,
        declared: u32,
    },

    #[error("malformed document: {0}")]
    Structure(#[from] QreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    pub questionnaire: QuestionnaireRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireRecord {
    #[serde(flatten)]
    pub questionnaire: Questionnaire,
    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    #[serde(flatten)]
    pub module: Module,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    #[serde(flatten)]
    pub section: Section,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(flatten)]
    pub question: QuestionBlock,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl Envelope {
    pub fn from_document(doc: &Document) -> Self {
        let modules = doc
            .modules()
            .map(|module| ModuleRecord {
                module: module.clone(),
                sections: doc
                    .sections_of(module.id())
                    .map(|section| SectionRecord {
                        section: section.clone(),
                        questions: doc
                            .questions_of(section.id())
                            .map(|question| QuestionRecord {
                                question: question.clone(),
                                responses: doc.responses_of(question.id()).cloned().collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION.to_string(),
            generator: Some(format!("qrespec-core {ENGINE_VERSION}")),
            questionnaire: QuestionnaireRecord {
                questionnaire: doc.questionnaire().clone(),
                modules,
            },
        }
    }

    /// Same major version as [`FORMAT_VERSION`], not newer.
    pub fn check_version(&self) -> Result<(), InterchangeError> {
        let found = semver::Version::parse(&self.format_version)?;
        let supported = semver::Version::parse(FORMAT_VERSION)?;
        if found.major != supported.major || found > supported {
            return Err(InterchangeError::UnsupportedVersion {
                found: self.format_version.clone(),
                supported: FORMAT_VERSION.to_string(),
            });
        }
        Ok(())
    }

    /// Flattens the tree and hydrates a document. Nesting must agree with
    /// every record's declared parent.
    pub fn into_document(self) -> Result<Document, InterchangeError> {
        self.check_version()?;
        let root = self.questionnaire;
        let mut modules = Vec::new();
        let mut sections = Vec::new();
        let mut questions = Vec::new();
        let mut responses = Vec::new();

        for module_record in root.modules {
            let module = module_record.module;
            check_parent(&module, root.questionnaire.id().raw())?;
            for section_record in module_record.sections {
                let section = section_record.section;
                check_parent(&section, module.id().raw())?;
                for question_record in section_record.questions {
                    let question = question_record.question;
                    check_parent(&question, section.id().raw())?;
                    for response in question_record.responses {
                        check_parent(&response, question.id().raw())?;
                        responses.push(response);
                    }
                    questions.push(question);
                }
                sections.push(section);
            }
            modules.push(module);
        }

        Ok(Document::hydrate(
            root.questionnaire,
            modules,
            sections,
            questions,
            responses,
        )?)
    }
}

fn check_parent<T: Entity>(entity: &T, nested_under: u32) -> Result<(), InterchangeError> {
    let declared: u32 = entity.parent_id().into();
    if declared != nested_under {
        return Err(InterchangeError::ParentMismatch {
            kind: T::KIND,
            id: entity.id().into(),
            parent_kind: T::PARENT_KIND,
            nested_under,
            declared,
        });
    }
    Ok(())
}

pub fn to_value(doc: &Document) -> Result<serde_json::Value, InterchangeError> {
    Ok(serde_json::to_value(Envelope::from_document(doc))?)
}

pub fn to_json(doc: &Document) -> Result<String, InterchangeError> {
    Ok(serde_json::to_string_pretty(&Envelope::from_document(doc))?)
}

pub fn from_json(json: &str) -> Result<Document, InterchangeError> {
    let envelope: Envelope = serde_json::from_str(json)?;
    envelope.into_document()
}

pub fn save(doc: &Document, path: &Path) -> Result<(), InterchangeError> {
    fs::write(path, to_json(doc)?)?;
    info!(path = %path.display(), "document saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<Document, InterchangeError> {
    let doc = from_json(&fs::read_to_string(path)?)?;
    info!(
        path = %path.display(),
        questions = doc.count(EntityKind::Question),
        "document loaded"
    );
    Ok(doc)
}
