//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use proptest::prelude::*;

use qrespec_core::{
    config::AuditConfig,
    interchange,
    language::{self, programming},
    layout::RowKind,
    surface::SurfaceOp,
    synthesis::derive_response_attributes,
    content_fingerprint, BuildPipeline, Document, Entity, EntityKind, FailureMode, Module,
    NewQuestion, NonAdcFlag, PipelineError, ProgFlagEntry, QreError, QuestionBlock, QuestionType,
    RecordingSurface, Response, ResponseCode, ResponseFlag, Section, SpecConfig,
};

fn open_end_document() -> Document {
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
            title: "Favourite brand".into(),
            question_text: "Which brand do you like most?".into(),
            question_type: QuestionType::FullTextField,
            prog_flags_non_adc: Some(vec![
                ProgFlagEntry::count(NonAdcFlag::ShowNumBoxes, 1),
                ProgFlagEntry::plain(NonAdcFlag::NoRandomizeColumns),
            ]),
            ..NewQuestion::default()
        },
    );
    let question = doc.push_child(question).unwrap();
    let response = Response::new(
        doc.ids_mut(),
        question,
        ResponseCode::BLANK,
        "",
        &[ResponseFlag::OpenEnd],
    )
    .unwrap();
    doc.push_child(response).unwrap();
    doc
}

#[test]
fn invariant_single_question_lays_out_fixed_block() {
    let doc = open_end_document();
    let mut surface = RecordingSurface::new();
    BuildPipeline::default().build(&doc, &mut surface).unwrap();

    let rows = surface.rows();
    let kinds: Vec<_> = rows.iter().map(|r| r.kind).collect();
    let mut expected = vec![RowKind::SectionHeader, RowKind::QuestionNumTitle];
    expected.extend(RowKind::INFO);
    expected.push(RowKind::Response);
    assert_eq!(kinds, expected);

    assert_eq!(rows[0].left, "SECTION A: Intro");
    assert_eq!((rows[1].left, rows[1].right), ("Q1", "Favourite brand"));
    assert_eq!(
        rows[4].right,
        "Full OE. Do not randomize columns. Show 1 text box."
    );
    assert_eq!(rows[8].kind, RowKind::RespondentInstruction);

    let response = rows.last().unwrap();
    assert_eq!(response.left, "");
    assert_eq!(response.right, "[INSERT TEXT BOX]");

    // Section header on row 1, blank row 2, question rows 3..=11
    assert_eq!(rows[1].row, 3);
    assert_eq!(response.row, 11);
    assert_eq!(surface.borders(), vec!["A3:B11"]);
}

#[test]
fn invariant_round_trip_preserves_document() {
    let doc = open_end_document();
    let json = interchange::to_json(&doc).unwrap();
    let back = interchange::from_json(&json).unwrap();
    assert_eq!(back, doc);
    assert_eq!(back.get_ids(EntityKind::Response), doc.get_ids(EntityKind::Response));
}

#[test]
fn invariant_generic_response_renders_code_label() {
    let mut doc = open_end_document();
    let question = doc.all_questions().next().unwrap().id();
    let response = Response::new(
        doc.ids_mut(),
        question,
        5,
        "Brand name",
        &[ResponseFlag::Generic],
    )
    .unwrap();
    assert_eq!(response.code(), ResponseCode::GENERIC_CODE);
    assert_eq!(response.text(), "");
    doc.push_child(response).unwrap();

    let mut surface = RecordingSurface::new();
    BuildPipeline::default().build(&doc, &mut surface).unwrap();
    let last = *surface.rows().last().unwrap();
    assert_eq!(last.left, "CODE");
    assert_eq!(last.kind, RowKind::GenericCode);
}

#[test]
fn invariant_classify_conflict_keeps_first_flag() {
    let mut doc = open_end_document();
    let question = doc.all_questions().next().unwrap().id();
    let (response, rejected) = Response::build(
        doc.ids_mut(),
        question,
        ResponseCode::BLANK,
        "",
        &[ResponseFlag::Generic, ResponseFlag::RowResponse],
    )
    .unwrap();
    assert!(matches!(
        rejected[..],
        [QreError::Conflict {
            flag: ResponseFlag::RowResponse,
            existing: ResponseFlag::Generic,
            ..
        }]
    ));
    assert_eq!(response.flags(), [ResponseFlag::Generic]);
    assert_eq!(response.code(), ResponseCode::GENERIC_CODE);
    assert_eq!(response.text(), "");
    doc.push_child(response).unwrap();

    let mut response =
        Response::new(doc.ids_mut(), question, ResponseCode::BLANK, "", &[]).unwrap();
    let rejected = response
        .add_flags(&[
            ResponseFlag::RowResponse,
            ResponseFlag::ColumnResponse,
            ResponseFlag::AnchorTop,
        ])
        .unwrap_err();
    assert_eq!(rejected.len(), 1);
    assert_eq!(
        response.flags(),
        [ResponseFlag::RowResponse, ResponseFlag::AnchorTop]
    );
    assert_eq!(response.code(), ResponseCode::ROW_CODE);
    assert_eq!(response.text(), "[ANCHOR ON TOP]");
}

#[test]
fn invariant_content_fingerprint_is_deterministic() {
    let a = open_end_document();
    let b = interchange::from_json(&interchange::to_json(&a).unwrap()).unwrap();
    assert_eq!(
        content_fingerprint(&a).unwrap(),
        content_fingerprint(&b).unwrap()
    );

    let mut c = open_end_document();
    let module = c.modules().next().unwrap().id();
    c.get_module_mut(module).unwrap().set_title("Usage");
    assert_ne!(
        content_fingerprint(&a).unwrap(),
        content_fingerprint(&c).unwrap()
    );
}

#[test]
fn invariant_reserved_codes_rejected_as_user_codes() {
    let mut doc = open_end_document();
    let question = doc.all_questions().next().unwrap().id();
    for code in [ResponseCode::ALL, ResponseCode::NONE, ResponseCode::ROW_CODE] {
        let result = Response::new(doc.ids_mut(), question, code, "x", &[]);
        assert!(matches!(result, Err(QreError::Range { .. })));
    }
}

#[test]
fn invariant_stored_text_matches_fresh_synthesis() {
    let doc = open_end_document();
    let question = doc.all_questions().next().unwrap();
    let derived = question.derive_text();
    assert_eq!(derived.prog_inst.unwrap(), question.prog_inst());
    assert_eq!(derived.routing_inst.unwrap(), question.routing_inst());
    assert_eq!(derived.respondent_inst.unwrap(), question.respondent_inst());

    for response in doc.all_responses() {
        let fresh = response.derived_attributes();
        assert_eq!(fresh.code, response.code());
        assert_eq!(fresh.text, response.text());
    }
}

#[test]
fn invariant_build_audits_before_layout() {
    let config = SpecConfig {
        audit: AuditConfig {
            failure_mode: FailureMode::Block,
            ..AuditConfig::default()
        },
        ..SpecConfig::default()
    };
    let mut doc = open_end_document();
    let question = doc.all_questions().next().unwrap().id();
    doc.get_question_mut(question)
        .unwrap()
        .set_prog_flags_non_adc(Some(vec![ProgFlagEntry::plain(NonAdcFlag::ForceNumChars)]));

    let mut surface = RecordingSurface::new();
    let err = BuildPipeline::new(config).build(&doc, &mut surface).unwrap_err();
    assert!(matches!(err, PipelineError::AuditFailed(_)));
    assert!(surface.ops().is_empty());
}

#[test]
fn invariant_removal_cascades() {
    let mut doc = open_end_document();
    let module = doc.modules().next().unwrap().id();
    doc.remove_module(module).unwrap();
    assert_eq!(doc.count(EntityKind::Section), 0);
    assert_eq!(doc.count(EntityKind::Question), 0);
    assert_eq!(doc.count(EntityKind::Response), 0);

    let mut surface = RecordingSurface::new();
    BuildPipeline::default().build(&doc, &mut surface).unwrap();
    assert_eq!(surface.ops(), [SurfaceOp::SetPageVisible { visible: true }]);
}

proptest! {
    #[test]
    fn invariant_pluralize_one_is_identity(word in "[a-z]{1,12}") {
        prop_assert_eq!(language::pluralize(&word, 1).unwrap(), word);
    }

    #[test]
    fn invariant_pluralize_rejects_non_positive(num in i32::MIN..1) {
        prop_assert!(language::pluralize("box", num).is_err());
    }

    #[test]
    fn invariant_accept_between_requires_increasing_bounds(low in -1000i32..1000, high in -1000i32..1000) {
        let result = programming::accept_btwn_x_and_y(low, high);
        prop_assert_eq!(result.is_ok(), high > low);
    }

    #[test]
    fn invariant_response_derivation_ignores_flag_order(
        (flags, shuffled) in proptest::sample::subsequence(ResponseFlag::ALL.to_vec(), 0..=6)
            .prop_flat_map(|flags| (Just(flags.clone()), Just(flags).prop_shuffle())),
        text in "[A-Za-z ]{0,16}",
    ) {
        let a = derive_response_attributes(&flags, &text, 3);
        let b = derive_response_attributes(&shuffled, &text, 3);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(derive_response_attributes(&flags, &text, 3), a);
    }
}
