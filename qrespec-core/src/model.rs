//! Document Model - Questionnaire Entities
//!
//! Two construction paths:
//!
//! 1. `new` assigns identity and timestamps and runs synthesis.
//! 2. `serde::Deserialize` hydrates a fully-formed record and derives nothing.
//!
//! Derived strings are persisted alongside the flags they came from, so a
//! hydrated question renders exactly what was saved.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::warn;

use crate::error::{QreError, QreResult};
use crate::flags::{AdcFlag, ProgFlagEntry, QuestionType, ResponseCode, ResponseFlag, RoutingFlag};
use crate::ids::{
    EntityKind, IdAllocator, ModuleId, QuestionId, QuestionnaireId, ResponseId, SectionId, Stamps,
};
use crate::synthesis;

/// Shared contract of every owned entity.
pub trait Entity {
    type Id: Copy + Ord + Hash + Debug + Into<u32> + 'static;
    type ParentId: Copy + Ord + Hash + Debug + Into<u32> + 'static;

    const KIND: EntityKind;
    const PARENT_KIND: EntityKind;

    fn id(&self) -> Self::Id;
    fn parent_id(&self) -> Self::ParentId;
    fn stamps(&self) -> &Stamps;

    /// Re-parenting goes through the document so both adjacency lists move too.
    fn set_parent_id(&mut self, parent: Self::ParentId);
    fn stamps_mut(&mut self) -> &mut Stamps;
}

macro_rules! impl_entity {
    ($ty:ty, $id:ty, $parent:ty) => {
        impl Entity for $ty {
            type Id = $id;
            type ParentId = $parent;

            const KIND: EntityKind = <$id>::KIND;
            const PARENT_KIND: EntityKind = <$parent>::KIND;

            fn id(&self) -> $id {
                self.id
            }

            fn parent_id(&self) -> $parent {
                self.parent
            }

            fn stamps(&self) -> &Stamps {
                &self.stamps
            }

            fn set_parent_id(&mut self, parent: $parent) {
                self.parent = parent;
                self.stamps.touch();
            }

            fn stamps_mut(&mut self) -> &mut Stamps {
                &mut self.stamps
            }
        }
    };
}

fn log_synthesis_failure(kind: EntityKind, id: u32, operation: &'static str, err: &QreError) {
    warn!(
        entity = %kind,
        id,
        operation,
        error = %err,
        "synthesis failed; keeping previous value"
    );
}

// --- Questionnaire ---

/// Root of the document. Owns the ordered module list through the document index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Questionnaire {
    #[serde(rename = "selfId")]
    id: QuestionnaireId,
    #[serde(flatten)]
    stamps: Stamps,
    title: String,
    description: String,
    client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    office: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
}

impl Questionnaire {
    pub fn new(
        ids: &mut IdAllocator,
        title: impl Into<String>,
        description: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        Self {
            id: QuestionnaireId(ids.next(EntityKind::Questionnaire)),
            stamps: Stamps::now(),
            title: title.into(),
            description: description.into(),
            client: client.into(),
            office: None,
            country: None,
        }
    }

    pub fn id(&self) -> QuestionnaireId {
        self.id
    }

    pub fn stamps(&self) -> &Stamps {
        &self.stamps
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn office(&self) -> Option<&str> {
        self.office.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.stamps.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.stamps.touch();
    }

    pub fn set_client(&mut self, client: impl Into<String>) {
        self.client = client.into();
        self.stamps.touch();
    }

    pub fn set_office(&mut self, office: Option<String>) {
        self.office = office;
        self.stamps.touch();
    }

    pub fn set_country(&mut self, country: Option<String>) {
        self.country = country;
        self.stamps.touch();
    }
}

// --- Module ---

/// One page of the rendered document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Module {
    #[serde(rename = "selfId")]
    id: ModuleId,
    #[serde(rename = "parentId")]
    parent: QuestionnaireId,
    #[serde(flatten)]
    stamps: Stamps,
    number: u32,
    title: String,
    description: String,
    show_description: bool,
}

impl_entity!(Module, ModuleId, QuestionnaireId);

impl Module {
    pub fn new(
        ids: &mut IdAllocator,
        parent: QuestionnaireId,
        number: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: ids.next_module(),
            parent,
            stamps: Stamps::now(),
            number,
            title: title.into(),
            description: String::new(),
            show_description: false,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn show_description(&self) -> bool {
        self.show_description
    }

    pub fn set_number(&mut self, number: u32) {
        self.number = number;
        self.stamps.touch();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.stamps.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>, show: bool) {
        self.description = description.into();
        self.show_description = show;
        self.stamps.touch();
    }
}

// --- Section ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    #[serde(rename = "selfId")]
    id: SectionId,
    #[serde(rename = "parentId")]
    parent: ModuleId,
    #[serde(flatten)]
    stamps: Stamps,
    letter: String,
    title: String,
    description: String,
    show_description: bool,
}

impl_entity!(Section, SectionId, ModuleId);

impl Section {
    pub fn new(
        ids: &mut IdAllocator,
        parent: ModuleId,
        letter: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: ids.next_section(),
            parent,
            stamps: Stamps::now(),
            letter: letter.into(),
            title: title.into(),
            description: String::new(),
            show_description: false,
        }
    }

    pub fn letter(&self) -> &str {
        &self.letter
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn show_description(&self) -> bool {
        self.show_description
    }

    /// Banner text of the section header row.
    pub fn header_text(&self) -> String {
        format!("SECTION {}: {}", self.letter, self.title)
    }

    pub fn set_letter(&mut self, letter: impl Into<String>) {
        self.letter = letter.into();
        self.stamps.touch();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.stamps.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>, show: bool) {
        self.description = description.into();
        self.show_description = show;
        self.stamps.touch();
    }
}

// --- QuestionBlock ---

/// Everything a caller supplies to build a question. Unset fields default.
#[derive(Debug, Clone, Default)]
pub struct NewQuestion {
    pub qnum: String,
    pub title: String,
    pub base_label: String,
    pub base_definition: String,
    pub comments: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub custom_question_type: Option<String>,
    pub prog_flags_non_adc: Option<Vec<ProgFlagEntry>>,
    pub prog_flag_adc: AdcFlag,
    pub custom_prog_inst: Option<String>,
    pub routing_flag: RoutingFlag,
    pub routing_target: Option<String>,
    pub custom_routing_inst: Option<String>,
    pub respondent_instruction: Option<String>,
}

/// Fresh synthesis output for a question, field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedText {
    pub question_type_label: String,
    pub prog_inst: QreResult<String>,
    pub routing_inst: QreResult<String>,
    pub respondent_inst: QreResult<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionBlock {
    #[serde(rename = "selfId")]
    id: QuestionId,
    #[serde(rename = "parentId")]
    parent: SectionId,
    #[serde(flatten)]
    stamps: Stamps,

    qnum: String,
    title: String,
    base_label: String,
    base_definition: String,
    comments: String,
    question_text: String,

    question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_question_type: Option<String>,
    question_type_label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    prog_flags_non_adc: Option<Vec<ProgFlagEntry>>,
    prog_flag_adc: AdcFlag,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_prog_inst: Option<String>,
    prog_inst: String,

    routing_flag: RoutingFlag,
    #[serde(skip_serializing_if = "Option::is_none")]
    routing_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_routing_inst: Option<String>,
    routing_inst: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    custom_respondent_inst: Option<String>,
    respondent_inst: String,
}

impl_entity!(QuestionBlock, QuestionId, SectionId);

impl QuestionBlock {
    /// Builds a question and synthesizes its instruction strings.
    ///
    /// A synthesis failure is logged and leaves that one field blank; the
    /// rest of the question is still built.
    pub fn new(ids: &mut IdAllocator, parent: SectionId, input: NewQuestion) -> Self {
        let mut question = Self {
            id: ids.next_question(),
            parent,
            stamps: Stamps::now(),
            qnum: input.qnum,
            title: input.title,
            base_label: input.base_label,
            base_definition: input.base_definition,
            comments: input.comments,
            question_text: input.question_text,
            question_type: input.question_type,
            custom_question_type: input.custom_question_type,
            question_type_label: String::new(),
            prog_flags_non_adc: input.prog_flags_non_adc,
            prog_flag_adc: input.prog_flag_adc,
            custom_prog_inst: input.custom_prog_inst,
            prog_inst: String::new(),
            routing_flag: input.routing_flag,
            routing_target: input.routing_target,
            custom_routing_inst: input.custom_routing_inst,
            routing_inst: String::new(),
            custom_respondent_inst: input.respondent_instruction,
            respondent_inst: String::new(),
        };
        question.resynthesize("new");
        question
    }

    /// Synthesizes every derived field from the current inputs without
    /// touching the stored values.
    pub fn derive_text(&self) -> DerivedText {
        let question_type_label = synthesis::question_type_string(
            self.question_type,
            self.custom_question_type.as_deref(),
        );
        let prog_inst = synthesis::generate_prog_inst_string(
            self.question_type,
            self.custom_question_type.as_deref(),
            self.prog_flags_non_adc.as_deref(),
            self.prog_flag_adc,
            self.custom_prog_inst.as_deref(),
        );
        let routing_inst = match &self.custom_routing_inst {
            Some(custom) => Ok(custom.clone()),
            None => synthesis::routing_instruction(self.routing_flag, self.routing_target.as_deref()),
        };
        let respondent_inst = match &self.custom_respondent_inst {
            Some(custom) => Ok(custom.clone()),
            None => synthesis::default_respondent_instruction(
                self.question_type,
                self.prog_flags_non_adc.as_deref(),
            ),
        };
        DerivedText {
            question_type_label,
            prog_inst,
            routing_inst,
            respondent_inst,
        }
    }

    fn resynthesize(&mut self, operation: &'static str) {
        let derived = self.derive_text();
        self.question_type_label = derived.question_type_label;
        let id = self.id.raw();
        for (slot, result) in [
            (&mut self.prog_inst, derived.prog_inst),
            (&mut self.routing_inst, derived.routing_inst),
            (&mut self.respondent_inst, derived.respondent_inst),
        ] {
            match result {
                Ok(text) => *slot = text,
                Err(err) => log_synthesis_failure(EntityKind::Question, id, operation, &err),
            }
        }
    }

    fn modified(&mut self, operation: &'static str) {
        self.stamps.touch();
        self.resynthesize(operation);
    }

    pub fn qnum(&self) -> &str {
        &self.qnum
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn base_label(&self) -> &str {
        &self.base_label
    }

    pub fn base_definition(&self) -> &str {
        &self.base_definition
    }

    /// Base label and definition joined for the base row.
    pub fn base_text(&self) -> String {
        format!("{} {}", self.base_label, self.base_definition)
            .trim()
            .to_string()
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn custom_question_type(&self) -> Option<&str> {
        self.custom_question_type.as_deref()
    }

    pub fn question_type_label(&self) -> &str {
        &self.question_type_label
    }

    pub fn prog_flags_non_adc(&self) -> Option<&[ProgFlagEntry]> {
        self.prog_flags_non_adc.as_deref()
    }

    pub fn prog_flag_adc(&self) -> AdcFlag {
        self.prog_flag_adc
    }

    pub fn custom_prog_inst(&self) -> Option<&str> {
        self.custom_prog_inst.as_deref()
    }

    pub fn prog_inst(&self) -> &str {
        &self.prog_inst
    }

    pub fn routing_flag(&self) -> RoutingFlag {
        self.routing_flag
    }

    pub fn routing_target(&self) -> Option<&str> {
        self.routing_target.as_deref()
    }

    pub fn custom_routing_inst(&self) -> Option<&str> {
        self.custom_routing_inst.as_deref()
    }

    pub fn routing_inst(&self) -> &str {
        &self.routing_inst
    }

    pub fn custom_respondent_inst(&self) -> Option<&str> {
        self.custom_respondent_inst.as_deref()
    }

    pub fn respondent_inst(&self) -> &str {
        &self.respondent_inst
    }

    pub fn set_qnum(&mut self, qnum: impl Into<String>) {
        self.qnum = qnum.into();
        self.stamps.touch();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.stamps.touch();
    }

    pub fn set_base(&mut self, label: impl Into<String>, definition: impl Into<String>) {
        self.base_label = label.into();
        self.base_definition = definition.into();
        self.stamps.touch();
    }

    pub fn set_comments(&mut self, comments: impl Into<String>) {
        self.comments = comments.into();
        self.stamps.touch();
    }

    pub fn set_question_text(&mut self, text: impl Into<String>) {
        self.question_text = text.into();
        self.stamps.touch();
    }

    pub fn set_question_type(&mut self, q_type: QuestionType, custom: Option<String>) {
        self.question_type = q_type;
        self.custom_question_type = custom;
        self.modified("set_question_type");
    }

    /// Replaces the Non-ADC flag list. `None` hands synthesis to the ADC flag.
    pub fn set_prog_flags_non_adc(&mut self, flags: Option<Vec<ProgFlagEntry>>) {
        self.prog_flags_non_adc = flags;
        self.modified("set_prog_flags_non_adc");
    }

    pub fn set_prog_flag_adc(&mut self, flag: AdcFlag) {
        self.prog_flag_adc = flag;
        self.modified("set_prog_flag_adc");
    }

    pub fn set_custom_prog_inst(&mut self, custom: Option<String>) {
        self.custom_prog_inst = custom;
        self.modified("set_custom_prog_inst");
    }

    pub fn set_routing(&mut self, flag: RoutingFlag, target: Option<String>) {
        self.routing_flag = flag;
        self.routing_target = target;
        self.modified("set_routing");
    }

    pub fn set_custom_routing_inst(&mut self, custom: Option<String>) {
        self.custom_routing_inst = custom;
        self.modified("set_custom_routing_inst");
    }

    pub fn set_respondent_instruction(&mut self, custom: Option<String>) {
        self.custom_respondent_inst = custom;
        self.modified("set_respondent_instruction");
    }
}

// --- Response ---

/// A candidate answer. Display code and text are derived from the entered
/// values plus the flag set, recomputed from scratch on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Response {
    #[serde(rename = "selfId")]
    id: ResponseId,
    #[serde(rename = "parentId")]
    parent: QuestionId,
    #[serde(flatten)]
    stamps: Stamps,
    code: i32,
    text: String,
    entered_code: i32,
    entered_text: String,
    flags: Vec<ResponseFlag>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            id: ResponseId::default(),
            parent: QuestionId::default(),
            stamps: Stamps::default(),
            code: ResponseCode::BLANK,
            text: String::new(),
            entered_code: ResponseCode::BLANK,
            entered_text: String::new(),
            flags: Vec::new(),
        }
    }
}

impl_entity!(Response, ResponseId, QuestionId);

impl Response {
    /// Builds a response. A sentinel code is an error; a rejected flag is
    /// logged and skipped, keeping the flags accepted around it.
    pub fn new(
        ids: &mut IdAllocator,
        parent: QuestionId,
        code: i32,
        text: impl Into<String>,
        flags: &[ResponseFlag],
    ) -> QreResult<Self> {
        Self::build(ids, parent, code, text, flags).map(|(response, _)| response)
    }

    /// Like [`Response::new`], also returning the flags' rejections in
    /// order.
    pub fn build(
        ids: &mut IdAllocator,
        parent: QuestionId,
        code: i32,
        text: impl Into<String>,
        flags: &[ResponseFlag],
    ) -> QreResult<(Self, Vec<QreError>)> {
        let code = ResponseCode::check_user_code(code)?;
        let mut response = Self {
            id: ids.next_response(),
            parent,
            stamps: Stamps::now(),
            entered_code: code,
            entered_text: text.into(),
            ..Self::default()
        };
        let rejected = response.add_flags(flags).err().unwrap_or_default();
        response.derive();
        Ok((response, rejected))
    }

    fn derive(&mut self) {
        let attrs =
            synthesis::derive_response_attributes(&self.flags, &self.entered_text, self.entered_code);
        self.code = attrs.code;
        self.text = attrs.text;
    }

    /// Display attributes a fresh derivation would produce.
    pub fn derived_attributes(&self) -> synthesis::ResponseAttributes {
        synthesis::derive_response_attributes(&self.flags, &self.entered_text, self.entered_code)
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn entered_code(&self) -> i32 {
        self.entered_code
    }

    pub fn entered_text(&self) -> &str {
        &self.entered_text
    }

    pub fn flags(&self) -> &[ResponseFlag] {
        &self.flags
    }

    /// Adds one flag. A conflict or duplicate leaves the flag set unchanged.
    pub fn add_flag(&mut self, flag: ResponseFlag) -> QreResult<()> {
        if self.flags.contains(&flag) {
            return Err(QreError::DuplicateFlag(flag));
        }
        let partition = flag.partition();
        if partition.is_exclusive() {
            if let Some(existing) = self.flags.iter().find(|f| f.partition() == partition) {
                return Err(QreError::Conflict {
                    flag,
                    existing: *existing,
                    partition,
                });
            }
        }
        self.flags.push(flag);
        self.stamps.touch();
        self.derive();
        Ok(())
    }

    /// Adds flags in order. A rejected flag is logged and skipped; the rest
    /// are still tried. Every rejection is returned.
    pub fn add_flags(&mut self, flags: &[ResponseFlag]) -> Result<(), Vec<QreError>> {
        let mut rejected = Vec::new();
        for flag in flags {
            if let Err(err) = self.add_flag(*flag) {
                warn!(
                    entity = %EntityKind::Response,
                    id = self.id.raw(),
                    operation = "add_flag",
                    error = %err,
                    "flag rejected"
                );
                rejected.push(err);
            }
        }
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(rejected)
        }
    }

    /// Returns whether the flag was present.
    pub fn remove_flag(&mut self, flag: ResponseFlag) -> bool {
        let before = self.flags.len();
        self.flags.retain(|f| *f != flag);
        let removed = self.flags.len() != before;
        if removed {
            self.stamps.touch();
            self.derive();
        }
        removed
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.entered_text = text.into();
        self.stamps.touch();
        self.derive();
    }

    pub fn set_code(&mut self, code: i32) -> QreResult<()> {
        self.entered_code = ResponseCode::check_user_code(code)?;
        self.stamps.touch();
        self.derive();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::NonAdcFlag;

    fn sample_question(ids: &mut IdAllocator, input: NewQuestion) -> QuestionBlock {
        QuestionBlock::new(ids, SectionId(1), input)
    }

    #[test]
    fn question_synthesizes_on_construction() {
        let mut ids = IdAllocator::new();
        let q = sample_question(
            &mut ids,
            NewQuestion {
                qnum: "Q1".into(),
                question_type: QuestionType::FullTextField,
                prog_flags_non_adc: Some(vec![
                    ProgFlagEntry::count(NonAdcFlag::ShowNumBoxes, 1),
                    ProgFlagEntry::plain(NonAdcFlag::NoRandomizeColumns),
                ]),
                ..NewQuestion::default()
            },
        );
        assert_eq!(q.prog_inst(), "Full OE. Do not randomize columns. Show 1 text box.");
        assert_eq!(q.question_type_label(), "Full OE.");
        assert_eq!(q.routing_inst(), "Next question");
        assert_eq!(q.respondent_inst(), "Please enter your answer below.");
        assert_eq!(q.id(), QuestionId(1));
    }

    #[test]
    fn failed_synthesis_leaves_field_blank() {
        let mut ids = IdAllocator::new();
        let q = sample_question(
            &mut ids,
            NewQuestion {
                question_type: QuestionType::SingleCode,
                prog_flag_adc: AdcFlag::Gender,
                ..NewQuestion::default()
            },
        );
        assert_eq!(q.prog_inst(), "");
        assert_eq!(q.question_type_label(), "Single code. Radio buttons.");
    }

    #[test]
    fn failed_resynthesis_keeps_prior_value() {
        let mut ids = IdAllocator::new();
        let mut q = sample_question(
            &mut ids,
            NewQuestion {
                question_type: QuestionType::Grid,
                ..NewQuestion::default()
            },
        );
        assert_eq!(q.prog_inst(), "Grid.");
        q.set_prog_flags_non_adc(Some(vec![ProgFlagEntry::range(
            NonAdcFlag::AcceptBtwnXandY,
            10,
            5,
        )]));
        assert_eq!(q.prog_inst(), "Grid.");

        q.set_routing(RoutingFlag::SkipTo, None);
        assert_eq!(q.routing_inst(), "Next question");
        q.set_routing(RoutingFlag::SkipTo, Some("Q9".into()));
        assert_eq!(q.routing_inst(), "Skip to Q9");
    }

    #[test]
    fn custom_overrides_replace_synthesis_but_keep_flags() {
        let mut ids = IdAllocator::new();
        let mut q = sample_question(&mut ids, NewQuestion::default());
        q.set_custom_routing_inst(Some("Go to screener end".into()));
        assert_eq!(q.routing_inst(), "Go to screener end");
        assert_eq!(q.routing_flag(), RoutingFlag::NextQuestion);

        q.set_question_type(QuestionType::Grid, Some("Carousel grid.".into()));
        assert_eq!(q.question_type_label(), "Carousel grid.");
        assert_eq!(q.question_type(), QuestionType::Grid);
    }

    #[test]
    fn mutators_touch_modified_only() {
        let mut ids = IdAllocator::new();
        let mut q = sample_question(&mut ids, NewQuestion::default());
        let created = q.stamps().date_created;
        q.set_title("Awareness");
        assert_eq!(q.stamps().date_created, created);
        assert!(q.stamps().date_modified >= created);
    }

    #[test]
    fn base_text_trims_missing_definition() {
        let mut ids = IdAllocator::new();
        let mut q = sample_question(&mut ids, NewQuestion::default());
        q.set_base("All respondents", "");
        assert_eq!(q.base_text(), "All respondents");
    }

    #[test]
    fn rejected_flag_is_skipped_and_later_flags_apply() {
        let mut ids = IdAllocator::new();
        let mut r = Response::new(&mut ids, QuestionId(1), ResponseCode::BLANK, "", &[]).unwrap();
        let errs = r
            .add_flags(&[
                ResponseFlag::RowResponse,
                ResponseFlag::ColumnResponse,
                ResponseFlag::AnchorTop,
            ])
            .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(
            errs[0],
            QreError::Conflict {
                flag: ResponseFlag::ColumnResponse,
                existing: ResponseFlag::RowResponse,
                ..
            }
        ));
        assert_eq!(r.flags(), &[ResponseFlag::RowResponse, ResponseFlag::AnchorTop]);
        assert_eq!(r.code(), ResponseCode::ROW_CODE);
        assert_eq!(r.text(), "[ANCHOR ON TOP]");
    }

    #[test]
    fn constructor_keeps_first_of_conflicting_flags() {
        let mut ids = IdAllocator::new();
        let (r, rejected) = Response::build(
            &mut ids,
            QuestionId(1),
            1,
            "Brand A",
            &[ResponseFlag::AnchorTop, ResponseFlag::AnchorBottom, ResponseFlag::TermSelected],
        )
        .unwrap();
        assert!(matches!(rejected[..], [QreError::Conflict { .. }]));
        assert_eq!(r.flags(), &[ResponseFlag::AnchorTop, ResponseFlag::TermSelected]);
        assert_eq!(r.text(), "Brand A [ANCHOR ON TOP] [TERM IF SELECTED]");
        assert_eq!(r.code(), 1);

        let plain = Response::new(
            &mut ids,
            QuestionId(1),
            1,
            "Brand A",
            &[ResponseFlag::AnchorTop, ResponseFlag::AnchorBottom],
        )
        .unwrap();
        assert_eq!(plain.flags(), &[ResponseFlag::AnchorTop]);
    }

    #[test]
    fn misc_flags_combine_but_never_duplicate() {
        let mut ids = IdAllocator::new();
        let mut r = Response::new(
            &mut ids,
            QuestionId(1),
            ResponseCode::BLANK,
            "",
            &[ResponseFlag::None, ResponseFlag::MutuallyExclusive, ResponseFlag::Test],
        )
        .unwrap();
        assert_eq!(r.text(), "None of the above [MUTUALLY EXCLUSIVE]");
        assert_eq!(
            r.add_flag(ResponseFlag::MutuallyExclusive),
            Err(QreError::DuplicateFlag(ResponseFlag::MutuallyExclusive))
        );
    }

    #[test]
    fn removing_a_flag_restores_entered_values() {
        let mut ids = IdAllocator::new();
        let mut r =
            Response::new(&mut ids, QuestionId(1), 3, "Brand C", &[ResponseFlag::Generic]).unwrap();
        assert_eq!(r.text(), "");
        assert!(r.remove_flag(ResponseFlag::Generic));
        assert_eq!(r.text(), "Brand C");
        assert_eq!(r.code(), 3);
        assert!(!r.remove_flag(ResponseFlag::Generic));
    }

    #[test]
    fn sentinel_codes_are_rejected() {
        let mut ids = IdAllocator::new();
        assert!(Response::new(&mut ids, QuestionId(1), ResponseCode::OTHER, "x", &[]).is_err());
        let mut r = Response::new(&mut ids, QuestionId(1), 1, "x", &[]).unwrap();
        assert!(r.set_code(ResponseCode::GENERIC_CODE).is_err());
        assert_eq!(r.code(), 1);
    }

    #[test]
    fn hydrate_skips_synthesis() {
        // Derived fields come back exactly as stored, even when stale.
        let json = r#"{
            "selfId": 4, "parentId": 2, "qnum": "Q4",
            "questionType": "Grid", "progInst": "Hand edited."
        }"#;
        let q: QuestionBlock = serde_json::from_str(json).unwrap();
        assert_eq!(q.prog_inst(), "Hand edited.");
        assert_eq!(q.id(), QuestionId(4));
        assert_eq!(q.parent_id(), SectionId(2));
        assert_eq!(q.routing_inst(), "");
    }
}
