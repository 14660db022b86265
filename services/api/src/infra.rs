use application_tool::applicant::ApplicantService;
use application_tool::config::VersioningConfig;
use application_tool::definitions::{
    BlockDefinition, BlockDefinitionId, LocalizedStrings, Path, ProgramDefinition, ProgramId,
    ProgramQuestionDefinition, QuestionDefinition, QuestionId, QuestionType, Scalar,
};
use application_tool::memory::{InMemoryApplicantRepository, InMemoryVersionRepository};
use application_tool::predicate::{
    Operator, PredicateAction, PredicateDefinition, PredicateExpressionNode, PredicateValue,
};
use application_tool::repository::SystemClock;
use application_tool::versions::{VersionError, VersionService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type Versions = VersionService<InMemoryVersionRepository>;
pub(crate) type Applicants =
    ApplicantService<InMemoryApplicantRepository, InMemoryVersionRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Services shared by every request handler.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) versions: Arc<Versions>,
    pub(crate) applicants: Arc<Applicants>,
}

impl Services {
    pub(crate) fn in_memory(config: VersioningConfig) -> Self {
        let versions = Arc::new(VersionService::new(
            Arc::new(InMemoryVersionRepository::new()),
            config,
        ));
        let applicants = Arc::new(ApplicantService::new(
            Arc::new(InMemoryApplicantRepository::new()),
            versions.clone(),
            Arc::new(SystemClock),
        ));
        Self {
            versions,
            applicants,
        }
    }
}

fn question(name: &str, path: &str, text: &str, question_type: QuestionType) -> QuestionDefinition {
    QuestionDefinition {
        id: QuestionId(0),
        name: name.to_string(),
        path: Path::parse(path).unwrap_or_default(),
        description: text.to_string(),
        question_text: LocalizedStrings::with_default(text),
        help_text: LocalizedStrings::empty(),
        enumerator_id: None,
        question_type,
    }
}

fn block(id: u64, name: &str, questions: Vec<QuestionDefinition>) -> BlockDefinition {
    BlockDefinition {
        id: BlockDefinitionId(id),
        name: name.to_string(),
        description: String::new(),
        program_question_definitions: questions
            .into_iter()
            .map(ProgramQuestionDefinition::new)
            .collect(),
        enumerator_id: None,
        visibility_predicate: None,
        optional_predicate: None,
    }
}

/// Creates and publishes a small household program: a favorite color screen, a household
/// member list with an age screen per member, and a pet screen shown only to applicants whose
/// favorite color is blue.
pub(crate) fn seed_sample_program(versions: &Versions) -> Result<ProgramDefinition, VersionError> {
    let color = versions.create_question(question(
        "favorite_color",
        "applicant.favorite_color",
        "What is your favorite color?",
        QuestionType::Text {
            min_length: None,
            max_length: Some(40),
        },
    ))?;
    let members = versions.create_question(question(
        "household_members",
        "applicant.household_members[]",
        "Who lives with you?",
        QuestionType::Enumerator {
            entity_type: LocalizedStrings::with_default("household member"),
        },
    ))?;
    let age = versions.create_question(QuestionDefinition {
        enumerator_id: Some(members.id),
        ..question(
            "household_member_age",
            "applicant.household_members[].age",
            "How old is this household member?",
            QuestionType::Number {
                min: Some(0),
                max: Some(130),
            },
        )
    })?;
    let pet = versions.create_question(question(
        "pet_name",
        "applicant.pet_name",
        "What is your pet's name?",
        QuestionType::Text {
            min_length: None,
            max_length: None,
        },
    ))?;

    let mut pet_block = block(4, "Pets", vec![pet]);
    pet_block.visibility_predicate = Some(PredicateDefinition::new(
        PredicateExpressionNode::leaf(
            color.id,
            Scalar::Text,
            Operator::EqualTo,
            PredicateValue::String("blue".to_string()),
        ),
        PredicateAction::ShowBlock,
    ));
    let age_block = BlockDefinition {
        enumerator_id: Some(BlockDefinitionId(2)),
        ..block(3, "Member ages", vec![age])
    };

    let program = versions.create_program(ProgramDefinition {
        id: ProgramId(0),
        admin_name: "household-support".to_string(),
        admin_description: "Sample household support program".to_string(),
        localized_name: LocalizedStrings::with_default("Household Support"),
        localized_description: LocalizedStrings::with_default("Help for households"),
        external_link: String::new(),
        block_definitions: vec![
            block(1, "Colors", vec![color]),
            block(2, "Household", vec![members]),
            age_block,
            pet_block,
        ],
    })?;
    versions.publish()?;
    Ok(program)
}
