use serde_json::json;

use super::common::*;
use crate::applicant::{ApplicantData, ReadOnlyApplicantProgram};
use crate::definitions::{QuestionId, Scalar};
use crate::predicate::{
    Operator, PredicateAction, PredicateDefinition, PredicateError, PredicateExpressionNode,
    PredicateValue,
};

fn answered_household() -> ApplicantData {
    ApplicantData::from_json(json!({
        "applicant": {
            "favorite_color": { "text": "blue", "updated_in_program": 99, "updated_at": 5 },
            "home": {
                "street": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "zip": "62701"
            },
            "members": [
                { "entity_name": "Ann", "age": { "number": 30 } }
            ]
        }
    }))
}

fn block_ids(blocks: Vec<&crate::applicant::Block>) -> Vec<&str> {
    blocks.into_iter().map(|block| block.id()).collect()
}

#[test]
fn fresh_applicant_sees_unconditional_blocks() {
    let view = ReadOnlyApplicantProgram::new(household_program(), ApplicantData::default())
        .expect("view renders");

    assert_eq!(block_ids(view.get_all_active_blocks()), vec!["1", "2", "3", "6"]);
    assert!(view.get_block("5").is_some(), "hidden blocks stay addressable");
    assert_eq!(
        view.get_first_incomplete_block().map(|block| block.id()),
        Some("1")
    );
    assert_eq!(view.completion_percentage(), 0);
    assert!(view.is_block_optional("6"));
    assert!(!view.is_block_optional("1"));
}

#[test]
fn answers_drive_visibility_and_repetition() {
    let view = ReadOnlyApplicantProgram::new(household_program(), answered_household())
        .expect("view renders");

    assert_eq!(
        block_ids(view.get_all_active_blocks()),
        vec!["1", "2", "3", "4-0", "5", "6"]
    );
    assert_eq!(
        view.get_block_after("3").map(|block| block.id()),
        Some("4-0")
    );
    let repeated = view.get_block("4-0").expect("repeated block");
    assert_eq!(
        repeated
            .repeated_entity()
            .map(|entity| entity.entity_name()),
        Some("Ann")
    );
    assert_eq!(
        repeated.questions()[0].path().to_string(),
        "applicant.members[0].age"
    );

    // The optional favorites screen never holds up completion.
    assert_eq!(
        view.get_first_incomplete_block().map(|block| block.id()),
        Some("5")
    );
    assert_eq!(view.completion_percentage(), 80);
}

#[test]
fn summary_marks_answers_from_other_programs() {
    let view = ReadOnlyApplicantProgram::new(household_program(), answered_household())
        .expect("view renders");
    let summary = view.get_summary_data();

    let color = summary
        .iter()
        .find(|answer| answer.question_id == COLOR)
        .expect("color answer");
    assert_eq!(color.answer_text, "blue");
    assert!(color.is_answered);
    assert!(color.is_previous_response);
    assert_eq!(color.updated_at, Some(5));

    let address = summary
        .iter()
        .find(|answer| answer.question_id == ADDRESS)
        .expect("address answer");
    assert_eq!(address.answer_text, "1 Main St\nSpringfield IL 62701");
    assert!(!address.is_previous_response);

    let pet = summary
        .iter()
        .find(|answer| answer.question_id == PET)
        .expect("pet answer");
    assert_eq!(pet.answer_text, "-");
    assert!(!pet.is_answered);
    assert_eq!(pet.block_id, "5");
}

#[test]
fn program_title_falls_back_to_default_locale() {
    let view = ReadOnlyApplicantProgram::new(household_program(), ApplicantData::default())
        .expect("view renders");
    assert_eq!(view.program_title("es-US"), "Beneficios del hogar");
    assert_eq!(view.program_title("fr-FR"), "Household Benefits");
}

#[test]
fn predicates_on_later_questions_fail_to_render() {
    let mut program = household_program();
    program.block_definitions[0].visibility_predicate = Some(PredicateDefinition::new(
        PredicateExpressionNode::leaf(
            PET,
            Scalar::Text,
            Operator::EqualTo,
            PredicateValue::String("Rex".to_string()),
        ),
        PredicateAction::HideBlock,
    ));

    match ReadOnlyApplicantProgram::new(program, ApplicantData::default()) {
        Err(PredicateError::QuestionNotInScope { question_id }) => {
            assert_eq!(question_id, QuestionId(5))
        }
        other => panic!("expected out-of-scope question, got {:?}", other.map(|_| ())),
    }
}
