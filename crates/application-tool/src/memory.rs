//! Process-local stores backing the API service and the tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::applicant::{Applicant, ApplicantData, ApplicantId, ApplicantRepository};
use crate::definitions::{ProgramDefinition, ProgramId, QuestionDefinition, QuestionId};
use crate::repository::RepositoryError;
use crate::versions::{
    LifecycleSnapshot, LifecycleStage, Version, VersionChange, VersionId, VersionRepository,
};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct LifecycleState {
    revision: u64,
    next_version_id: u64,
    versions: Vec<Version>,
}

impl LifecycleState {
    fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            revision: self.revision,
            versions: self.versions.clone(),
        }
    }
}

#[derive(Debug)]
struct Catalog<T> {
    next_id: u64,
    entries: BTreeMap<u64, T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Catalog<T> {
    fn assign_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Version store with revision-checked commits. Starts with one empty Active version.
#[derive(Debug)]
pub struct InMemoryVersionRepository {
    lifecycle: Mutex<LifecycleState>,
    programs: Mutex<Catalog<ProgramDefinition>>,
    questions: Mutex<Catalog<QuestionDefinition>>,
}

impl Default for InMemoryVersionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self {
            lifecycle: Mutex::new(LifecycleState {
                revision: 0,
                next_version_id: 2,
                versions: vec![Version::new(VersionId(1), LifecycleStage::Active)],
            }),
            programs: Mutex::new(Catalog::default()),
            questions: Mutex::new(Catalog::default()),
        }
    }
}

fn target(versions: &mut [Version], id: VersionId) -> Result<&mut Version, RepositoryError> {
    versions
        .iter_mut()
        .find(|version| version.id == id)
        .ok_or(RepositoryError::NotFound)
}

fn apply(
    versions: &mut Vec<Version>,
    next_version_id: &mut u64,
    change: VersionChange,
) -> Result<(), RepositoryError> {
    match change {
        VersionChange::CreateDraft => {
            versions.push(Version::new(
                VersionId(*next_version_id),
                LifecycleStage::Draft,
            ));
            *next_version_id += 1;
        }
        VersionChange::SetStage { version_id, stage } => {
            target(versions, version_id)?.stage = stage;
        }
        VersionChange::AddProgram {
            version_id,
            program_id,
        } => {
            target(versions, version_id)?.programs.insert(program_id);
        }
        VersionChange::RemoveProgram {
            version_id,
            program_id,
        } => {
            target(versions, version_id)?.programs.remove(&program_id);
        }
        VersionChange::AddQuestion {
            version_id,
            question_id,
        } => {
            target(versions, version_id)?.questions.insert(question_id);
        }
        VersionChange::RemoveQuestion {
            version_id,
            question_id,
        } => {
            target(versions, version_id)?.questions.remove(&question_id);
        }
        VersionChange::TombstoneProgram {
            version_id,
            admin_name,
        } => {
            target(versions, version_id)?
                .tombstoned_programs
                .insert(admin_name);
        }
        VersionChange::TombstoneQuestion { version_id, name } => {
            target(versions, version_id)?
                .tombstoned_questions
                .insert(name);
        }
    }
    Ok(())
}

fn check_stage_uniqueness(versions: &[Version]) -> Result<(), RepositoryError> {
    for stage in [LifecycleStage::Draft, LifecycleStage::Active] {
        let count = versions
            .iter()
            .filter(|version| version.stage == stage)
            .count();
        if count > 1 {
            return Err(RepositoryError::Constraint(format!(
                "more than one {} version",
                stage.label()
            )));
        }
    }
    Ok(())
}

impl VersionRepository for InMemoryVersionRepository {
    fn lifecycle(&self) -> Result<LifecycleSnapshot, RepositoryError> {
        Ok(locked(&self.lifecycle).snapshot())
    }

    fn commit(
        &self,
        expected_revision: u64,
        changes: Vec<VersionChange>,
    ) -> Result<LifecycleSnapshot, RepositoryError> {
        let mut state = locked(&self.lifecycle);
        if state.revision != expected_revision {
            return Err(RepositoryError::SerializationConflict);
        }

        let mut versions = state.versions.clone();
        let mut next_version_id = state.next_version_id;
        for change in changes {
            apply(&mut versions, &mut next_version_id, change)?;
        }
        check_stage_uniqueness(&versions)?;

        state.versions = versions;
        state.next_version_id = next_version_id;
        state.revision += 1;
        Ok(state.snapshot())
    }

    fn program(&self, id: ProgramId) -> Result<Option<ProgramDefinition>, RepositoryError> {
        Ok(locked(&self.programs).entries.get(&id.0).cloned())
    }

    fn insert_program(
        &self,
        program: ProgramDefinition,
    ) -> Result<ProgramDefinition, RepositoryError> {
        let mut catalog = locked(&self.programs);
        let id = ProgramId(catalog.assign_id());
        let stored = ProgramDefinition { id, ..program };
        catalog.entries.insert(id.0, stored.clone());
        Ok(stored)
    }

    fn update_program(&self, program: &ProgramDefinition) -> Result<(), RepositoryError> {
        let mut catalog = locked(&self.programs);
        let entry = catalog
            .entries
            .get_mut(&program.id.0)
            .ok_or(RepositoryError::NotFound)?;
        *entry = program.clone();
        Ok(())
    }

    fn question(&self, id: QuestionId) -> Result<Option<QuestionDefinition>, RepositoryError> {
        Ok(locked(&self.questions).entries.get(&id.0).cloned())
    }

    fn insert_question(
        &self,
        question: QuestionDefinition,
    ) -> Result<QuestionDefinition, RepositoryError> {
        let mut catalog = locked(&self.questions);
        let id = QuestionId(catalog.assign_id());
        let stored = QuestionDefinition { id, ..question };
        catalog.entries.insert(id.0, stored.clone());
        Ok(stored)
    }

    fn update_question(&self, question: &QuestionDefinition) -> Result<(), RepositoryError> {
        let mut catalog = locked(&self.questions);
        let entry = catalog
            .entries
            .get_mut(&question.id.0)
            .ok_or(RepositoryError::NotFound)?;
        *entry = question.clone();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryApplicantRepository {
    applicants: Mutex<Catalog<Applicant>>,
}

impl InMemoryApplicantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplicantRepository for InMemoryApplicantRepository {
    fn insert(
        &self,
        data: ApplicantData,
        created_at: DateTime<Utc>,
    ) -> Result<Applicant, RepositoryError> {
        let mut catalog = locked(&self.applicants);
        let id = ApplicantId(catalog.assign_id());
        let applicant = Applicant {
            id,
            data,
            created_at,
        };
        catalog.entries.insert(id.0, applicant.clone());
        Ok(applicant)
    }

    fn lookup(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(locked(&self.applicants).entries.get(&id.0).cloned())
    }

    fn update(&self, applicant: &Applicant) -> Result<(), RepositoryError> {
        let mut catalog = locked(&self.applicants);
        let entry = catalog
            .entries
            .get_mut(&applicant.id.0)
            .ok_or(RepositoryError::NotFound)?;
        *entry = applicant.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_rejects_stale_revision() {
        let repository = InMemoryVersionRepository::new();
        let snapshot = repository.lifecycle().expect("lifecycle");
        repository
            .commit(snapshot.revision, vec![VersionChange::CreateDraft])
            .expect("first commit");

        let stale = repository.commit(snapshot.revision, vec![VersionChange::CreateDraft]);
        assert_eq!(stale, Err(RepositoryError::SerializationConflict));
        let versions = repository.lifecycle().expect("lifecycle").versions;
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn commit_enforces_single_draft_atomically() {
        let repository = InMemoryVersionRepository::new();
        let snapshot = repository.lifecycle().expect("lifecycle");

        let result = repository.commit(
            snapshot.revision,
            vec![VersionChange::CreateDraft, VersionChange::CreateDraft],
        );
        assert!(matches!(result, Err(RepositoryError::Constraint(_))));

        let after = repository.lifecycle().expect("lifecycle");
        assert_eq!(after.revision, snapshot.revision);
        assert!(after.draft().is_none());
    }

    #[test]
    fn inserts_assign_fresh_ids() {
        let repository = InMemoryApplicantRepository::new();
        let first = repository
            .insert(ApplicantData::default(), Utc::now())
            .expect("insert");
        let second = repository
            .insert(ApplicantData::default(), Utc::now())
            .expect("insert");
        assert_ne!(first.id, second.id);
        assert_eq!(
            repository.lookup(first.id).expect("lookup"),
            Some(first.clone())
        );
    }

    #[test]
    fn update_of_missing_applicant_is_not_found() {
        let repository = InMemoryApplicantRepository::new();
        let applicant = Applicant {
            id: ApplicantId(99),
            data: ApplicantData::default(),
            created_at: Utc::now(),
        };
        assert_eq!(
            repository.update(&applicant),
            Err(RepositoryError::NotFound)
        );
    }
}
