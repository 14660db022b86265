use super::domain::{LifecycleSnapshot, VersionChange};
use crate::definitions::{ProgramDefinition, ProgramId, QuestionDefinition, QuestionId};
use crate::repository::RepositoryError;

/// Persistence for versions and the definitions they group.
///
/// `commit` is the serializable boundary: it applies every change or none, fails with
/// [`RepositoryError::SerializationConflict`] when the store has moved past
/// `expected_revision`, and with [`RepositoryError::Constraint`] when the result would hold more
/// than one Draft or more than one Active version.
pub trait VersionRepository: Send + Sync {
    fn lifecycle(&self) -> Result<LifecycleSnapshot, RepositoryError>;
    fn commit(
        &self,
        expected_revision: u64,
        changes: Vec<VersionChange>,
    ) -> Result<LifecycleSnapshot, RepositoryError>;

    fn program(&self, id: ProgramId) -> Result<Option<ProgramDefinition>, RepositoryError>;
    /// Stores a new program under a freshly assigned id and returns it.
    fn insert_program(
        &self,
        program: ProgramDefinition,
    ) -> Result<ProgramDefinition, RepositoryError>;
    fn update_program(&self, program: &ProgramDefinition) -> Result<(), RepositoryError>;

    fn question(&self, id: QuestionId) -> Result<Option<QuestionDefinition>, RepositoryError>;
    /// Stores a new question under a freshly assigned id and returns it.
    fn insert_question(
        &self,
        question: QuestionDefinition,
    ) -> Result<QuestionDefinition, RepositoryError>;
    fn update_question(&self, question: &QuestionDefinition) -> Result<(), RepositoryError>;
}
