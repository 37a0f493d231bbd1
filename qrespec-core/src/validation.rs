//! Document Audit - Rule/Policy Separation
//!
//! Rules inspect a (possibly hydrated) document and produce structured
//! violations. The failure mode decides what the violations mean.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::config::{AuditConfig, AuditRules, FailureMode};
use crate::document::Document;
use crate::error::QreError;
use crate::flags::{AdcFlag, ResponseCode};
use crate::layout::page_title;
use crate::model::{Entity, QuestionBlock};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    /// Offending entity, e.g. `question#3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default)]
    pub remediation: Vec<String>,
}

impl ValidationViolation {
    fn new(
        rule: &'static str,
        severity: ViolationSeverity,
        entity: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            entity: Some(entity.to_string()),
            message: message.into(),
            expected: None,
            actual: None,
            remediation: Vec::new(),
        }
    }

    fn expected(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    fn remedy(mut self, remediation: &str) -> Self {
        self.remediation.push(remediation.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub valid: bool,
    pub failure_mode: FailureMode,
    pub violations: Vec<ValidationViolation>,
}

impl AuditResult {
    pub fn has_errors(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn count(&self, severity: ViolationSeverity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

/// Audit rule trait - produces violations
pub trait AuditRule {
    fn name(&self) -> &'static str;
    fn enabled(&self, rules: &AuditRules) -> bool;
    fn check(&self, doc: &Document) -> Vec<ValidationViolation>;
}

fn question_label(question: &QuestionBlock) -> String {
    format!("{} ({})", question.id(), question.qnum())
}

// --- Concrete Rules ---

/// Entered codes must stay below the sentinels; user codes must be unique per question.
pub struct ReservedCodeRule;

impl AuditRule for ReservedCodeRule {
    fn name(&self) -> &'static str {
        "reserved_codes"
    }

    fn enabled(&self, rules: &AuditRules) -> bool {
        rules.reserved_codes
    }

    fn check(&self, doc: &Document) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for question in doc.all_questions() {
            let mut seen = HashSet::new();
            for response in doc.responses_of(question.id()) {
                let entered = response.entered_code();
                if ResponseCode::check_user_code(entered).is_err() {
                    violations.push(
                        ValidationViolation::new(
                            self.name(),
                            ViolationSeverity::Error,
                            response.id(),
                            "entered code collides with a reserved sentinel",
                        )
                        .expected(
                            format!("blank or 0..{}", ResponseCode::LOWEST_SENTINEL),
                            entered.to_string(),
                        )
                        .remedy("Use a response flag to request a reserved role"),
                    );
                }
                let code = response.code();
                if code != ResponseCode::BLANK
                    && !ResponseCode::is_sentinel(code)
                    && !seen.insert(code)
                {
                    violations.push(
                        ValidationViolation::new(
                            self.name(),
                            ViolationSeverity::Warning,
                            response.id(),
                            format!("code {code} is used twice in {}", question_label(question)),
                        )
                        .remedy("Renumber the responses"),
                    );
                }
            }
        }
        violations
    }
}

/// Exclusive partitions that slipped past insertion checks, e.g. hand-edited files.
pub struct FlagPartitionRule;

impl AuditRule for FlagPartitionRule {
    fn name(&self) -> &'static str {
        "flag_partitions"
    }

    fn enabled(&self, rules: &AuditRules) -> bool {
        rules.flag_partitions
    }

    fn check(&self, doc: &Document) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for response in doc.all_responses() {
            let mut by_partition = BTreeMap::new();
            let mut seen = HashSet::new();
            for flag in response.flags() {
                if !seen.insert(*flag) {
                    violations.push(ValidationViolation::new(
                        self.name(),
                        ViolationSeverity::Error,
                        response.id(),
                        format!("flag {flag:?} is set twice"),
                    ));
                    continue;
                }
                let partition = flag.partition();
                if !partition.is_exclusive() {
                    continue;
                }
                if let Some(existing) = by_partition.insert(partition, *flag) {
                    let conflict = QreError::Conflict {
                        flag: *flag,
                        existing,
                        partition,
                    };
                    violations.push(
                        ValidationViolation::new(
                            self.name(),
                            ViolationSeverity::Error,
                            response.id(),
                            conflict.to_string(),
                        )
                        .remedy("Keep one flag per partition"),
                    );
                }
            }
        }
        violations
    }
}

/// Exactly one programming-flag family should drive synthesis.
pub struct ProgFamilyRule;

impl AuditRule for ProgFamilyRule {
    fn name(&self) -> &'static str {
        "prog_family"
    }

    fn enabled(&self, rules: &AuditRules) -> bool {
        rules.prog_family
    }

    fn check(&self, doc: &Document) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for question in doc.all_questions() {
            let adc = question.prog_flag_adc();
            match (question.prog_flags_non_adc(), adc) {
                (Some(_), AdcFlag::None) | (None, AdcFlag::None) => {}
                (Some(_), _) => violations.push(
                    ValidationViolation::new(
                        self.name(),
                        ViolationSeverity::Warning,
                        question_label(question),
                        format!("ADC flag {adc:?} is ignored because Non-ADC flags are set"),
                    )
                    .remedy("Clear one of the two flag families"),
                ),
                (None, _) => violations.push(
                    ValidationViolation::new(
                        self.name(),
                        ViolationSeverity::Warning,
                        question_label(question),
                        format!("ADC flag {adc:?} has no programming text yet"),
                    )
                    .remedy("Write a custom programming instruction"),
                ),
            }

            if let Some(entries) = question.prog_flags_non_adc() {
                let mut seen = HashSet::new();
                for entry in entries {
                    if !seen.insert(entry.flag) {
                        violations.push(ValidationViolation::new(
                            self.name(),
                            ViolationSeverity::Info,
                            question_label(question),
                            format!("{:?} appears more than once; only the first is used", entry.flag),
                        ));
                    }
                }
            }
        }
        violations
    }
}

/// Module titles that a spreadsheet surface would alter or reject.
pub struct PageTitleRule;

impl AuditRule for PageTitleRule {
    fn name(&self) -> &'static str {
        "page_titles"
    }

    fn enabled(&self, rules: &AuditRules) -> bool {
        rules.page_titles
    }

    fn check(&self, doc: &Document) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for module in doc.modules() {
            let title = page_title(module.title(), module.number());
            if title != module.title() {
                violations.push(
                    ValidationViolation::new(
                        self.name(),
                        ViolationSeverity::Info,
                        module.id(),
                        "page title was adjusted",
                    )
                    .expected(title.clone(), module.title()),
                );
            }
            let key = title.to_lowercase();
            if let Some(first) = seen.get(&key) {
                violations.push(
                    ValidationViolation::new(
                        self.name(),
                        ViolationSeverity::Warning,
                        module.id(),
                        format!("page title \"{title}\" duplicates {first}"),
                    )
                    .remedy("Give each module a distinct title"),
                );
            } else {
                seen.insert(key, module.id().to_string());
            }
        }
        violations
    }
}

/// Stored derived text that no longer matches a fresh synthesis.
pub struct DerivedTextDriftRule;

impl DerivedTextDriftRule {
    fn compare(
        &self,
        question: &QuestionBlock,
        field: &str,
        stored: &str,
        fresh: &Result<String, QreError>,
        violations: &mut Vec<ValidationViolation>,
    ) {
        match fresh {
            Ok(text) if text != stored => violations.push(
                ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Warning,
                    question_label(question),
                    format!("{field} differs from its flags"),
                )
                .expected(text.clone(), stored)
                .remedy("Re-apply the flags to regenerate the text"),
            ),
            Ok(_) | Err(QreError::NotImplemented(_)) => {}
            Err(err) => violations.push(
                ValidationViolation::new(
                    self.name(),
                    ViolationSeverity::Error,
                    question_label(question),
                    format!("{field} cannot be synthesized: {err}"),
                )
                .remedy("Fix the flag parameters"),
            ),
        }
    }
}

impl AuditRule for DerivedTextDriftRule {
    fn name(&self) -> &'static str {
        "derived_drift"
    }

    fn enabled(&self, rules: &AuditRules) -> bool {
        rules.derived_drift
    }

    fn check(&self, doc: &Document) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for question in doc.all_questions() {
            let derived = question.derive_text();
            self.compare(
                question,
                "question type",
                question.question_type_label(),
                &Ok(derived.question_type_label.clone()),
                &mut violations,
            );
            self.compare(
                question,
                "programming instruction",
                question.prog_inst(),
                &derived.prog_inst,
                &mut violations,
            );
            self.compare(
                question,
                "routing instruction",
                question.routing_inst(),
                &derived.routing_inst,
                &mut violations,
            );
            self.compare(
                question,
                "respondent instruction",
                question.respondent_inst(),
                &derived.respondent_inst,
                &mut violations,
            );

            for response in doc.responses_of(question.id()) {
                let fresh = response.derived_attributes();
                if fresh.code != response.code() || fresh.text != response.text() {
                    violations.push(
                        ValidationViolation::new(
                            self.name(),
                            ViolationSeverity::Warning,
                            response.id(),
                            "response text or code differs from its flags",
                        )
                        .expected(
                            format!("{} {}", fresh.code, fresh.text),
                            format!("{} {}", response.code(), response.text()),
                        ),
                    );
                }
            }
        }
        violations
    }
}

/// Auditor orchestrates rules and applies policy
pub struct Auditor {
    rules: Vec<Box<dyn AuditRule>>,
}

impl Auditor {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ReservedCodeRule),
                Box::new(FlagPartitionRule),
                Box::new(ProgFamilyRule),
                Box::new(PageTitleRule),
                Box::new(DerivedTextDriftRule),
            ],
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn AuditRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn audit(&self, doc: &Document, config: &AuditConfig) -> AuditResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .filter(|rule| rule.enabled(&config.rules))
            .flat_map(|rule| rule.check(doc))
            .collect();

        let has_errors = violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        AuditResult {
            valid: !(config.failure_mode == FailureMode::Block && has_errors),
            failure_mode: config.failure_mode,
            violations,
        }
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{NonAdcFlag, ProgFlagEntry, QuestionType, ResponseFlag};
    use crate::ids::QuestionId;
    use crate::interchange;
    use crate::model::{Module, NewQuestion, QuestionBlock, Response, Section};

    fn doc_with(spec: NewQuestion) -> (Document, QuestionId) {
        let mut doc = Document::new("Tracker", "", "Acme");
        let root = doc.questionnaire().id();
        let module = Module::new(doc.ids_mut(), root, 1, "Screener");
        let module = doc.push_child(module).unwrap();
        let section = Section::new(doc.ids_mut(), module, "A", "Intro");
        let section = doc.push_child(section).unwrap();
        let question = QuestionBlock::new(doc.ids_mut(), section, spec);
        let question = doc.push_child(question).unwrap();
        (doc, question)
    }

    fn rules_hit(result: &AuditResult) -> Vec<&str> {
        result.violations.iter().map(|v| v.rule.as_str()).collect()
    }

    #[test]
    fn clean_document_has_no_violations() {
        let (mut doc, question) = doc_with(NewQuestion {
            qnum: "Q1".into(),
            question_type: QuestionType::SingleCode,
            prog_flags_non_adc: Some(vec![ProgFlagEntry::plain(NonAdcFlag::RandomizeRows)]),
            ..NewQuestion::default()
        });
        for (code, text) in [(1, "Yes"), (2, "No")] {
            let response = Response::new(doc.ids_mut(), question, code, text, &[]).unwrap();
            doc.push_child(response).unwrap();
        }
        let result = Auditor::new().audit(&doc, &AuditConfig::default());
        assert!(result.violations.is_empty(), "{:?}", result.violations);
        assert!(result.valid);
    }

    #[test]
    fn duplicate_codes_warn() {
        let (mut doc, question) = doc_with(NewQuestion::default());
        for text in ["Yes", "Also yes"] {
            let response = Response::new(doc.ids_mut(), question, 1, text, &[]).unwrap();
            doc.push_child(response).unwrap();
        }
        let result = Auditor::new().audit(&doc, &AuditConfig::default());
        assert_eq!(rules_hit(&result), ["reserved_codes"]);
        assert_eq!(result.count(ViolationSeverity::Warning), 1);
    }

    #[test]
    fn adc_only_question_is_flagged() {
        let (doc, _) = doc_with(NewQuestion {
            prog_flag_adc: AdcFlag::HeartMatrix,
            ..NewQuestion::default()
        });
        let result = Auditor::new().audit(&doc, &AuditConfig::default());
        assert_eq!(rules_hit(&result), ["prog_family"]);
    }

    #[test]
    fn bad_parameters_block_in_block_mode() {
        let (doc, _) = doc_with(NewQuestion {
            prog_flags_non_adc: Some(vec![ProgFlagEntry::plain(NonAdcFlag::ShowNumBoxes)]),
            ..NewQuestion::default()
        });
        let config = AuditConfig {
            failure_mode: FailureMode::Block,
            ..AuditConfig::default()
        };
        let result = Auditor::new().audit(&doc, &config);
        assert!(result.has_errors());
        assert!(!result.valid);

        let relaxed = Auditor::new().audit(&doc, &AuditConfig::default());
        assert!(relaxed.valid);
    }

    #[test]
    fn hand_edited_files_are_caught() {
        let (mut doc, question) = doc_with(NewQuestion {
            qnum: "Q1".into(),
            ..NewQuestion::default()
        });
        let response = Response::new(
            doc.ids_mut(),
            question,
            ResponseCode::BLANK,
            "",
            &[ResponseFlag::RowResponse],
        )
        .unwrap();
        doc.push_child(response).unwrap();

        let mut value = interchange::to_value(&doc).unwrap();
        let q = &mut value["questionnaire"]["modules"][0]["sections"][0]["questions"][0];
        q["routingInst"] = "Typed by hand".into();
        q["responses"][0]["flags"] = serde_json::json!(["RowResponse", "ColumnResponse"]);
        q["responses"][0]["enteredCode"] = 98.into();
        let edited = interchange::from_json(&value.to_string()).unwrap();

        let result = Auditor::new().audit(&edited, &AuditConfig::default());
        let hit = rules_hit(&result);
        assert!(hit.contains(&"reserved_codes"));
        assert!(hit.contains(&"flag_partitions"));
        assert!(hit.contains(&"derived_drift"));
    }

    #[test]
    fn drift_skips_unsupported_synthesis_but_reports_bad_parameters() {
        let (adc, _) = doc_with(NewQuestion {
            prog_flag_adc: AdcFlag::HeartMatrix,
            ..NewQuestion::default()
        });
        assert!(DerivedTextDriftRule.check(&adc).is_empty());

        let (bad, _) = doc_with(NewQuestion {
            prog_flags_non_adc: Some(vec![ProgFlagEntry::plain(NonAdcFlag::ShowNumBoxes)]),
            ..NewQuestion::default()
        });
        let drift = DerivedTextDriftRule.check(&bad);
        assert!(drift.iter().any(|v| v.severity == ViolationSeverity::Error
            && v.message.starts_with("programming instruction cannot be synthesized")));
    }

    #[test]
    fn disabled_rules_do_not_run() {
        let (doc, _) = doc_with(NewQuestion {
            prog_flag_adc: AdcFlag::Gender,
            ..NewQuestion::default()
        });
        let mut config = AuditConfig::default();
        config.rules.prog_family = false;
        assert!(Auditor::new().audit(&doc, &config).violations.is_empty());
    }

    #[test]
    fn duplicate_page_titles_warn() {
        let (mut doc, _) = doc_with(NewQuestion::default());
        let root = doc.questionnaire().id();
        let module = Module::new(doc.ids_mut(), root, 2, "screener");
        doc.push_child(module).unwrap();
        let result = Auditor::new().audit(&doc, &AuditConfig::default());
        assert_eq!(rules_hit(&result), ["page_titles"]);
        assert_eq!(result.count(ViolationSeverity::Warning), 1);
    }
}
