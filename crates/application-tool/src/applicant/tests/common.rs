use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::applicant::{
    Applicant, ApplicantData, ApplicantId, ApplicantRepository, ApplicantService, StageOutcome,
};
use crate::config::VersioningConfig;
use crate::definitions::{
    BlockDefinition, BlockDefinitionId, LocalizedStrings, Path, ProgramDefinition, ProgramId,
    ProgramQuestionDefinition, QuestionDefinition, QuestionId, QuestionOption, QuestionType,
    Scalar,
};
use crate::memory::{InMemoryApplicantRepository, InMemoryVersionRepository};
use crate::predicate::{
    Operator, PredicateAction, PredicateDefinition, PredicateExpressionNode, PredicateValue,
};
use crate::repository::{Clock, RepositoryError};
use crate::versions::{VersionRepository, VersionService};

pub(super) const COLOR: QuestionId = QuestionId(1);
pub(super) const ADDRESS: QuestionId = QuestionId(2);
pub(super) const MEMBERS: QuestionId = QuestionId(3);
pub(super) const MEMBER_AGE: QuestionId = QuestionId(4);
pub(super) const PET: QuestionId = QuestionId(5);
pub(super) const FAVORITES: QuestionId = QuestionId(6);

pub(super) fn path(raw: &str) -> Path {
    Path::parse(raw).expect("valid path")
}

pub(super) fn question(
    id: QuestionId,
    name: &str,
    raw_path: &str,
    enumerator_id: Option<QuestionId>,
    question_type: QuestionType,
) -> QuestionDefinition {
    QuestionDefinition {
        id,
        name: name.to_string(),
        path: path(raw_path),
        description: format!("{name} question"),
        question_text: LocalizedStrings::with_default(format!("{name}?")),
        help_text: LocalizedStrings::empty(),
        enumerator_id,
        question_type,
    }
}

pub(super) fn color_question() -> QuestionDefinition {
    question(
        COLOR,
        "color",
        "applicant.favorite_color",
        None,
        QuestionType::Text {
            min_length: None,
            max_length: Some(20),
        },
    )
}

pub(super) fn block(
    id: u64,
    enumerator_id: Option<u64>,
    questions: Vec<QuestionDefinition>,
) -> BlockDefinition {
    BlockDefinition {
        id: BlockDefinitionId(id),
        name: format!("Screen {id}"),
        description: String::new(),
        program_question_definitions: questions
            .into_iter()
            .map(ProgramQuestionDefinition::new)
            .collect(),
        enumerator_id: enumerator_id.map(BlockDefinitionId),
        visibility_predicate: None,
        optional_predicate: None,
    }
}

/// Six screens: color, home address (no PO boxes), household members, age per member, a pet
/// screen shown only for blue, and an always-optional favorites checkbox.
pub(super) fn household_program() -> ProgramDefinition {
    let address = question(
        ADDRESS,
        "home",
        "applicant.home",
        None,
        QuestionType::Address {
            disallow_po_box: true,
        },
    );
    let members = question(
        MEMBERS,
        "members",
        "applicant.members[]",
        None,
        QuestionType::Enumerator {
            entity_type: LocalizedStrings::with_default("household member"),
        },
    );
    let age = question(
        MEMBER_AGE,
        "member_age",
        "applicant.members[].age",
        Some(MEMBERS),
        QuestionType::Number {
            min: Some(0),
            max: Some(120),
        },
    );
    let pet = question(
        PET,
        "pet",
        "applicant.pet_name",
        None,
        QuestionType::Text {
            min_length: None,
            max_length: None,
        },
    );
    let favorites = question(
        FAVORITES,
        "favorites",
        "applicant.favorites",
        None,
        QuestionType::Checkbox {
            options: vec![
                QuestionOption::new(1, "red", "Red"),
                QuestionOption::new(2, "blue", "Blue"),
                QuestionOption::new(3, "green", "Green"),
            ],
            min_choices: None,
            max_choices: Some(2),
        },
    );

    let mut pet_block = block(5, None, vec![pet]);
    pet_block.visibility_predicate = Some(PredicateDefinition::new(
        PredicateExpressionNode::leaf(
            COLOR,
            Scalar::Text,
            Operator::EqualTo,
            PredicateValue::String("blue".to_string()),
        ),
        PredicateAction::ShowBlock,
    ));
    let mut favorites_block = block(6, None, vec![favorites]);
    favorites_block.optional_predicate = Some(PredicateDefinition::new(
        PredicateExpressionNode::And {
            children: Vec::new(),
        },
        PredicateAction::ShowBlock,
    ));

    ProgramDefinition {
        id: ProgramId(7),
        admin_name: "household".to_string(),
        admin_description: "Household benefits".to_string(),
        localized_name: LocalizedStrings::with_default("Household Benefits")
            .update_translation("es-US", "Beneficios del hogar"),
        localized_description: LocalizedStrings::with_default("Support for households"),
        external_link: String::new(),
        block_definitions: vec![
            block(1, None, vec![color_question()]),
            block(2, None, vec![address]),
            block(3, None, vec![members]),
            block(4, Some(3), vec![age]),
            pet_block,
            favorites_block,
        ],
    }
}

pub(super) fn updates(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub(super) const NOW_MILLIS: i64 = 1_700_000_000_000;

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.timestamp_millis_opt(NOW_MILLIS)
                .single()
                .expect("valid timestamp"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) type TestService =
    ApplicantService<InMemoryApplicantRepository, InMemoryVersionRepository>;

/// Service with the household program stored; returns the stored program id.
pub(super) fn build_service() -> (TestService, Arc<InMemoryApplicantRepository>, ProgramId) {
    let applicants = Arc::new(InMemoryApplicantRepository::new());
    let versions = Arc::new(InMemoryVersionRepository::new());
    let program = versions
        .insert_program(household_program())
        .expect("program stored");
    let version_service = Arc::new(VersionService::new(
        versions,
        VersioningConfig {
            draft_retry_attempts: 3,
            draft_retry_backoff: Duration::ZERO,
        },
    ));
    let service = ApplicantService::new(
        applicants.clone(),
        version_service,
        Arc::new(FixedClock::default()),
    );
    (service, applicants, program.id)
}

/// Applicant store whose backing database is offline.
pub(super) struct OfflineApplicants;

impl ApplicantRepository for OfflineApplicants {
    fn insert(
        &self,
        _data: ApplicantData,
        _created_at: DateTime<Utc>,
    ) -> Result<Applicant, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn lookup(&self, _id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _applicant: &Applicant) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_offline_service() -> (
    ApplicantService<OfflineApplicants, InMemoryVersionRepository>,
    Arc<OfflineApplicants>,
    ProgramId,
) {
    let versions = Arc::new(InMemoryVersionRepository::new());
    let program = versions
        .insert_program(household_program())
        .expect("program stored");
    let applicants = Arc::new(OfflineApplicants);
    let service = ApplicantService::new(
        applicants.clone(),
        Arc::new(VersionService::new(versions, VersioningConfig::default())),
        Arc::new(FixedClock::default()),
    );
    (service, applicants, program.id)
}

pub(super) fn committed(outcome: StageOutcome) -> crate::applicant::ReadOnlyApplicantProgram {
    match outcome {
        StageOutcome::Committed(view) => view,
        StageOutcome::Preview(view) => panic!(
            "expected committed outcome, block errors: {:?}",
            view.get_all_blocks()
                .iter()
                .flat_map(|block| block.questions())
                .flat_map(|question| question.errors())
                .collect::<Vec<_>>()
        ),
    }
}
