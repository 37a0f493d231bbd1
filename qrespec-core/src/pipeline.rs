//! Build Pipeline - Single Entry Point
//!
//! CRITICAL: build MUST audit the document before laying it out. No bypass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{FailureMode, SpecConfig};
use crate::document::Document;
use crate::hashing::content_fingerprint;
use crate::ids::EntityKind;
use crate::interchange::InterchangeError;
use crate::layout::{LayoutEngine, LayoutReport};
use crate::surface::{RenderSurface, SurfaceError};
use crate::validation::{AuditResult, Auditor};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static AUDIT_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_audit_call_count() -> u32 {
    AUDIT_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_audit_call_count() {
    AUDIT_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Audit failed: {0}")]
    AuditFailed(String),

    #[error("Rendering failed: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Fingerprint failed: {0}")]
    Fingerprint(#[from] InterchangeError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub content_fingerprint: String,
    pub modules: usize,
    pub questions: usize,
    pub responses: usize,
    pub audit: AuditResult,
    pub layout: LayoutReport,
}

/// The build pipeline - single entry point from document to rendered surface
pub struct BuildPipeline {
    config: SpecConfig,
    auditor: Auditor,
}

impl BuildPipeline {
    pub fn new(config: SpecConfig) -> Self {
        Self {
            config,
            auditor: Auditor::new(),
        }
    }

    pub fn with_auditor(config: SpecConfig, auditor: Auditor) -> Self {
        Self { config, auditor }
    }

    pub fn config(&self) -> &SpecConfig {
        &self.config
    }

    /// Audit a document against the configured rules
    ///
    /// This is the ONLY audit entry point.
    pub fn audit(&self, doc: &Document) -> AuditResult {
        #[cfg(feature = "test-hooks")]
        AUDIT_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let result = self.auditor.audit(doc, &self.config.audit);
        for violation in &result.violations {
            let entity = violation.entity.as_deref().unwrap_or_default();
            match self.config.audit.failure_mode {
                FailureMode::Log => info!(
                    rule = %violation.rule,
                    entity,
                    severity = ?violation.severity,
                    "{}",
                    violation.message
                ),
                FailureMode::Block | FailureMode::Warn => warn!(
                    rule = %violation.rule,
                    entity,
                    severity = ?violation.severity,
                    "{}",
                    violation.message
                ),
            }
        }
        result
    }

    /// Build a document onto a surface
    ///
    /// CRITICAL: This ALWAYS calls audit internally. A blocked audit leaves the
    /// surface untouched.
    pub fn build(
        &self,
        doc: &Document,
        surface: &mut dyn RenderSurface,
    ) -> Result<BuildReport, PipelineError> {
        let audit = self.audit(doc);
        if !audit.valid {
            let messages: Vec<_> = audit
                .violations
                .iter()
                .filter(|v| v.severity == crate::validation::ViolationSeverity::Error)
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(PipelineError::AuditFailed(messages.join("; ")));
        }

        let id = Uuid::new_v4().to_string();
        info!(build = %id, title = doc.questionnaire().title(), "build started");

        let layout = LayoutEngine::new(&self.config.layout).run(doc, surface)?;
        surface.set_page_visible(true)?;
        if !layout.pages.is_empty() {
            surface.activate_first_page()?;
        }

        let report = BuildReport {
            id,
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            content_fingerprint: content_fingerprint(doc)?,
            modules: doc.count(EntityKind::Module),
            questions: doc.count(EntityKind::Question),
            responses: doc.count(EntityKind::Response),
            audit,
            layout,
        };
        info!(
            build = %report.id,
            pages = report.layout.pages.len(),
            rows = report.layout.rows_written,
            "build finished"
        );
        Ok(report)
    }
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new(SpecConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::flags::{NonAdcFlag, ProgFlagEntry};
    use crate::model::{Module, NewQuestion, QuestionBlock, Section};
    use crate::surface::{GridSurface, RecordingSurface, SurfaceOp};

    fn doc(prog: Vec<ProgFlagEntry>) -> Document {
        let mut doc = Document::new("Tracker", "", "Acme");
        let root = doc.questionnaire().id();
        let module = Module::new(doc.ids_mut(), root, 1, "Screener");
        let module = doc.push_child(module).unwrap();
        let section = Section::new(doc.ids_mut(), module, "A", "Intro");
        let section = doc.push_child(section).unwrap();
        let question = QuestionBlock::new(
            doc.ids_mut(),
            section,
            NewQuestion {
                qnum: "Q1".into(),
                prog_flags_non_adc: Some(prog),
                ..NewQuestion::default()
            },
        );
        doc.push_child(question).unwrap();
        doc
    }

    #[test]
    fn build_finalizes_surface() {
        let mut surface = RecordingSurface::new();
        let report = BuildPipeline::default()
            .build(&doc(vec![]), &mut surface)
            .unwrap();
        assert_eq!(report.layout.pages.len(), 1);
        assert_eq!(report.questions, 1);
        assert_eq!(report.content_fingerprint.len(), 64);
        assert_eq!(report.engine_version, ENGINE_VERSION);
        let tail = &surface.ops()[surface.ops().len() - 2..];
        assert_eq!(
            tail,
            [
                SurfaceOp::SetPageVisible { visible: true },
                SurfaceOp::ActivateFirstPage
            ]
        );
    }

    #[test]
    fn blocked_audit_leaves_surface_untouched() {
        let config = SpecConfig {
            audit: AuditConfig {
                failure_mode: FailureMode::Block,
                ..AuditConfig::default()
            },
            ..SpecConfig::default()
        };
        let bad = doc(vec![ProgFlagEntry::plain(NonAdcFlag::ForceNumChars)]);
        let mut surface = GridSurface::new();
        let err = BuildPipeline::new(config).build(&bad, &mut surface).unwrap_err();
        assert!(matches!(err, PipelineError::AuditFailed(_)));
        assert!(surface.pages().is_empty());
    }

    #[test]
    fn warn_mode_builds_with_violations() {
        let bad = doc(vec![ProgFlagEntry::plain(NonAdcFlag::ForceNumChars)]);
        let mut surface = GridSurface::new();
        let report = BuildPipeline::default().build(&bad, &mut surface).unwrap();
        assert!(report.audit.has_errors());
        assert!(surface.is_visible());
    }

    #[test]
    fn empty_document_builds_without_pages() {
        let doc = Document::new("Empty", "", "Acme");
        let mut surface = RecordingSurface::new();
        let report = BuildPipeline::default().build(&doc, &mut surface).unwrap();
        assert!(report.layout.pages.is_empty());
        assert_eq!(surface.ops(), [SurfaceOp::SetPageVisible { visible: true }]);
    }
}
