use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::VersioningConfig;
use crate::definitions::{
    BlockDefinition, BlockDefinitionId, LocalizedStrings, Path, ProgramDefinition, ProgramId,
    ProgramQuestionDefinition, QuestionDefinition, QuestionId, QuestionType, Scalar,
};
use crate::memory::InMemoryVersionRepository;
use crate::predicate::{
    Operator, PredicateAction, PredicateDefinition, PredicateExpressionNode, PredicateValue,
};
use crate::repository::RepositoryError;
use crate::versions::{LifecycleSnapshot, VersionChange, VersionRepository, VersionService};

pub(super) fn config(attempts: u32) -> VersioningConfig {
    VersioningConfig {
        draft_retry_attempts: attempts,
        draft_retry_backoff: Duration::ZERO,
    }
}

pub(super) fn build_service() -> (
    VersionService<InMemoryVersionRepository>,
    Arc<InMemoryVersionRepository>,
) {
    let repository = Arc::new(InMemoryVersionRepository::new());
    let service = VersionService::new(repository.clone(), config(5));
    (service, repository)
}

pub(super) fn text_question(name: &str, path: &str) -> QuestionDefinition {
    QuestionDefinition {
        id: QuestionId(0),
        name: name.to_string(),
        path: Path::parse(path).expect("valid path"),
        description: format!("{name} question"),
        question_text: LocalizedStrings::with_default(format!("What is your {name}?")),
        help_text: LocalizedStrings::empty(),
        enumerator_id: None,
        question_type: QuestionType::Text {
            min_length: None,
            max_length: None,
        },
    }
}

pub(super) fn block(id: u64, questions: &[&QuestionDefinition]) -> BlockDefinition {
    BlockDefinition {
        id: BlockDefinitionId(id),
        name: format!("Screen {id}"),
        description: String::new(),
        program_question_definitions: questions
            .iter()
            .map(|question| ProgramQuestionDefinition::new((*question).clone()))
            .collect(),
        enumerator_id: None,
        visibility_predicate: None,
        optional_predicate: None,
    }
}

pub(super) fn program(admin_name: &str, blocks: Vec<BlockDefinition>) -> ProgramDefinition {
    ProgramDefinition {
        id: ProgramId(0),
        admin_name: admin_name.to_string(),
        admin_description: format!("{admin_name} benefits"),
        localized_name: LocalizedStrings::with_default(admin_name),
        localized_description: LocalizedStrings::with_default("Apply for benefits"),
        external_link: String::new(),
        block_definitions: blocks,
    }
}

pub(super) fn show_when_text(question_id: QuestionId, value: &str) -> PredicateDefinition {
    PredicateDefinition::new(
        PredicateExpressionNode::leaf(
            question_id,
            Scalar::Text,
            Operator::EqualTo,
            PredicateValue::String(value.to_string()),
        ),
        PredicateAction::ShowBlock,
    )
}

/// Publishes a program with a single question and returns both as stored.
pub(super) fn publish_simple_program(
    service: &VersionService<InMemoryVersionRepository>,
    admin_name: &str,
) -> (ProgramDefinition, QuestionDefinition) {
    let question = service
        .create_question(text_question(
            &format!("{admin_name}_name"),
            &format!("applicant.{admin_name}_name"),
        ))
        .expect("question created");
    let program = service
        .create_program(program(admin_name, vec![block(1, &[&question])]))
        .expect("program created");
    service.publish().expect("publish succeeds");
    (program, question)
}

/// Delegates to an in-memory store but reports every commit as a serialization conflict.
#[derive(Default)]
pub(super) struct ContendedRepository {
    pub(super) inner: InMemoryVersionRepository,
    pub(super) commits: AtomicU32,
}

impl ContendedRepository {
    pub(super) fn commit_attempts(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }
}

impl VersionRepository for ContendedRepository {
    fn lifecycle(&self) -> Result<LifecycleSnapshot, RepositoryError> {
        self.inner.lifecycle()
    }

    fn commit(
        &self,
        _expected_revision: u64,
        _changes: Vec<VersionChange>,
    ) -> Result<LifecycleSnapshot, RepositoryError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::SerializationConflict)
    }

    fn program(&self, id: ProgramId) -> Result<Option<ProgramDefinition>, RepositoryError> {
        self.inner.program(id)
    }

    fn insert_program(
        &self,
        program: ProgramDefinition,
    ) -> Result<ProgramDefinition, RepositoryError> {
        self.inner.insert_program(program)
    }

    fn update_program(&self, program: &ProgramDefinition) -> Result<(), RepositoryError> {
        self.inner.update_program(program)
    }

    fn question(&self, id: QuestionId) -> Result<Option<QuestionDefinition>, RepositoryError> {
        self.inner.question(id)
    }

    fn insert_question(
        &self,
        question: QuestionDefinition,
    ) -> Result<QuestionDefinition, RepositoryError> {
        self.inner.insert_question(question)
    }

    fn update_question(&self, question: &QuestionDefinition) -> Result<(), RepositoryError> {
        self.inner.update_question(question)
    }
}
