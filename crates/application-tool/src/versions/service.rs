use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, info, trace, warn};

use super::domain::{LifecycleSnapshot, LifecycleStage, Version, VersionChange, VersionId};
use super::repository::VersionRepository;
use crate::config::VersioningConfig;
use crate::definitions::{
    BlockDefinition, ProgramDefinition, ProgramError, ProgramId, ProgramQuestionDefinition,
    QuestionDefinition, QuestionDefinitionError, QuestionId,
};
use crate::repository::RepositoryError;

/// Draft/Active/Obsolete/Deleted lifecycle over a [`VersionRepository`], plus the authoring
/// operations that feed it.
///
/// Lifecycle-mutating operations hold one service-wide lock and commit through the
/// repository's revision check, so two services over the same store still never produce two
/// drafts or two active versions.
pub struct VersionService<R> {
    repository: Arc<R>,
    config: VersioningConfig,
    lifecycle: Mutex<()>,
}

impl<R> VersionService<R>
where
    R: VersionRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: VersioningConfig) -> Self {
        Self {
            repository,
            config,
            lifecycle: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Returns the Draft version, creating it if none exists.
    pub fn get_or_create_draft(&self) -> Result<Version, VersionError> {
        let _guard = self.lock();
        self.draft_locked()
    }

    pub fn get_active(&self) -> Result<Version, VersionError> {
        self.repository
            .lifecycle()?
            .active()
            .cloned()
            .ok_or(VersionError::NoActiveVersion)
    }

    pub fn list_all_versions(&self) -> Result<Vec<Version>, VersionError> {
        Ok(self.repository.lifecycle()?.versions)
    }

    /// Copies every Active program and question that the Draft neither overrides nor
    /// tombstones into the Draft, then retires Active and promotes Draft in one commit.
    pub fn publish(&self) -> Result<(), VersionError> {
        let _guard = self.lock();
        self.retrying("publish", || {
            let snapshot = self.repository.lifecycle()?;
            let draft = snapshot.draft().ok_or(VersionError::EmptyDraft)?;
            if draft.programs.is_empty() {
                return Err(VersionError::EmptyDraft);
            }
            let active = snapshot.active().ok_or(VersionError::NoActiveVersion)?;

            let mut changes = Vec::new();
            let draft_programs: BTreeSet<String> = self
                .load_programs(&draft.programs)?
                .into_iter()
                .map(|program| program.admin_name)
                .collect();
            for program in self.load_programs(&active.programs)? {
                if draft.programs.contains(&program.id)
                    || draft_programs.contains(&program.admin_name)
                    || draft.tombstoned_programs.contains(&program.admin_name)
                {
                    continue;
                }
                changes.push(VersionChange::AddProgram {
                    version_id: draft.id,
                    program_id: program.id,
                });
            }

            let draft_questions: BTreeSet<String> = self
                .load_questions(&draft.questions)?
                .into_iter()
                .map(|question| question.name)
                .collect();
            for question in self.load_questions(&active.questions)? {
                if draft.questions.contains(&question.id)
                    || draft_questions.contains(&question.name)
                    || draft.tombstoned_questions.contains(&question.name)
                {
                    continue;
                }
                changes.push(VersionChange::AddQuestion {
                    version_id: draft.id,
                    question_id: question.id,
                });
            }

            let carried_forward = changes.len();
            changes.push(VersionChange::SetStage {
                version_id: active.id,
                stage: LifecycleStage::Obsolete,
            });
            changes.push(VersionChange::SetStage {
                version_id: draft.id,
                stage: LifecycleStage::Active,
            });
            self.repository.commit(snapshot.revision, changes)?;

            info!(
                version_id = %draft.id,
                obsolete_version_id = %active.id,
                carried_forward,
                "published draft version"
            );
            Ok(())
        })
    }

    /// Makes an Obsolete or Deleted version Active again. The current Active version becomes
    /// Obsolete and any Draft is Deleted, all in one commit.
    pub fn set_live(&self, version_id: VersionId) -> Result<(), VersionError> {
        let _guard = self.lock();
        self.retrying("set_live", || {
            let snapshot = self.repository.lifecycle()?;
            let target = snapshot
                .version(version_id)
                .ok_or(VersionError::VersionNotFound(version_id))?;
            if !matches!(
                target.stage,
                LifecycleStage::Obsolete | LifecycleStage::Deleted
            ) {
                return Err(VersionError::InvalidLiveTarget {
                    version_id,
                    stage: target.stage,
                });
            }

            let mut changes = vec![VersionChange::SetStage {
                version_id,
                stage: LifecycleStage::Active,
            }];
            if let Some(active) = snapshot.active() {
                changes.push(VersionChange::SetStage {
                    version_id: active.id,
                    stage: LifecycleStage::Obsolete,
                });
            }
            if let Some(draft) = snapshot.draft() {
                changes.push(VersionChange::SetStage {
                    version_id: draft.id,
                    stage: LifecycleStage::Deleted,
                });
            }
            self.repository.commit(snapshot.revision, changes)?;

            info!(%version_id, "set version live");
            Ok(())
        })
    }

    /// Re-points every question reference of a Draft-only program, in block lists and in
    /// predicates, at the newest Draft-else-Active question with the same name.
    pub fn update_question_versions(
        &self,
        program_id: ProgramId,
    ) -> Result<ProgramDefinition, VersionError> {
        let snapshot = self.repository.lifecycle()?;
        self.refresh_questions(&snapshot, program_id)
    }

    /// After `old_question_id` gained a Draft revision: refreshes Draft programs that use it
    /// and forks into the Draft each Active program that uses it and has no Draft counterpart.
    pub fn update_programs_for_new_draft_question(
        &self,
        old_question_id: QuestionId,
    ) -> Result<(), VersionError> {
        let _guard = self.lock();
        self.migrate_programs_locked(old_question_id)
    }

    pub fn program_definition(&self, id: ProgramId) -> Result<ProgramDefinition, VersionError> {
        self.load_program(id)
    }

    pub fn question_definition(&self, id: QuestionId) -> Result<QuestionDefinition, VersionError> {
        self.repository
            .question(id)?
            .ok_or(VersionError::QuestionNotFound(id))
    }

    pub fn draft_programs(&self) -> Result<Vec<ProgramDefinition>, VersionError> {
        match self.repository.lifecycle()?.draft() {
            Some(draft) => self.load_programs(&draft.programs),
            None => Ok(Vec::new()),
        }
    }

    pub fn active_programs(&self) -> Result<Vec<ProgramDefinition>, VersionError> {
        let active = self.get_active()?;
        self.load_programs(&active.programs)
    }

    pub fn draft_questions(&self) -> Result<Vec<QuestionDefinition>, VersionError> {
        match self.repository.lifecycle()?.draft() {
            Some(draft) => self.load_questions(&draft.questions),
            None => Ok(Vec::new()),
        }
    }

    pub fn active_questions(&self) -> Result<Vec<QuestionDefinition>, VersionError> {
        let active = self.get_active()?;
        self.load_questions(&active.questions)
    }

    /// Adds a brand-new program to the Draft. Admin names are unique across Draft and Active.
    pub fn create_program(
        &self,
        program: ProgramDefinition,
    ) -> Result<ProgramDefinition, VersionError> {
        program.validate_block_structure()?;
        program.check_predicate_ordering()?;

        let _guard = self.lock();
        let draft = self.draft_locked()?;
        let mut existing = self.load_programs(&draft.programs)?;
        if let Some(active) = self.repository.lifecycle()?.active() {
            existing.extend(self.load_programs(&active.programs)?);
        }
        if existing
            .iter()
            .any(|candidate| candidate.admin_name == program.admin_name)
        {
            return Err(VersionError::DuplicateProgram {
                admin_name: program.admin_name,
            });
        }

        let stored = self.repository.insert_program(program)?;
        let program_id = stored.id;
        self.commit_to_draft("create_program", |draft| {
            vec![VersionChange::AddProgram {
                version_id: draft.id,
                program_id,
            }]
        })?;
        info!(%program_id, admin_name = %stored.admin_name, "created draft program");
        Ok(stored)
    }

    /// Returns the Draft counterpart of a program, forking the Active one if needed.
    pub fn create_or_update_draft(
        &self,
        program_id: ProgramId,
    ) -> Result<ProgramDefinition, VersionError> {
        let _guard = self.lock();
        let draft = self.draft_locked()?;
        if draft.programs.contains(&program_id) {
            return self.load_program(program_id);
        }

        let program = self.load_program(program_id)?;
        if let Some(existing) = self
            .load_programs(&draft.programs)?
            .into_iter()
            .find(|candidate| candidate.admin_name == program.admin_name)
        {
            return Ok(existing);
        }
        if draft.tombstoned_programs.contains(&program.admin_name) {
            return Err(VersionError::ProgramTombstoned {
                admin_name: program.admin_name,
            });
        }
        let is_active = self
            .repository
            .lifecycle()?
            .active()
            .map(|active| active.programs.contains(&program_id))
            .unwrap_or(false);
        if !is_active {
            return Err(VersionError::ProgramNotFound(program_id));
        }

        self.fork_into_draft_locked(&program)
    }

    /// Saves edits to a Draft-only program after checking block structure and predicate
    /// ordering. The admin name is kept from the stored program.
    pub fn update_draft_program(
        &self,
        program: ProgramDefinition,
    ) -> Result<ProgramDefinition, VersionError> {
        let snapshot = self.repository.lifecycle()?;
        self.ensure_draft_only(&snapshot, program.id)?;
        program.validate_block_structure()?;
        program.check_predicate_ordering()?;

        let stored = self.load_program(program.id)?;
        let program = ProgramDefinition {
            admin_name: stored.admin_name,
            ..program
        };
        self.repository.update_program(&program)?;
        debug!(program_id = %program.id, "updated draft program");
        Ok(program)
    }

    /// Removes a program from the Draft and, if it is Active, keeps publish from restoring it.
    pub fn tombstone_program(&self, admin_name: &str) -> Result<(), VersionError> {
        let _guard = self.lock();
        let draft = self.draft_locked()?;
        let in_draft: Vec<ProgramId> = self
            .load_programs(&draft.programs)?
            .into_iter()
            .filter(|program| program.admin_name == admin_name)
            .map(|program| program.id)
            .collect();
        let in_active = match self.repository.lifecycle()?.active() {
            Some(active) => self
                .load_programs(&active.programs)?
                .iter()
                .any(|program| program.admin_name == admin_name),
            None => false,
        };
        if in_draft.is_empty() && !in_active {
            return Err(VersionError::UnknownProgram {
                admin_name: admin_name.to_string(),
            });
        }

        self.commit_to_draft("tombstone_program", |draft| {
            let mut changes: Vec<VersionChange> = in_draft
                .iter()
                .map(|program_id| VersionChange::RemoveProgram {
                    version_id: draft.id,
                    program_id: *program_id,
                })
                .collect();
            if in_active {
                changes.push(VersionChange::TombstoneProgram {
                    version_id: draft.id,
                    admin_name: admin_name.to_string(),
                });
            }
            changes
        })?;
        info!(admin_name, "tombstoned program");
        Ok(())
    }

    /// Removes a question from the Draft and tombstones it against publish. Rejected while a
    /// Draft program, or an Active program publish would carry forward, still uses it.
    pub fn tombstone_question(&self, name: &str) -> Result<(), VersionError> {
        let _guard = self.lock();
        let draft = self.draft_locked()?;
        let draft_programs = self.load_programs(&draft.programs)?;
        let draft_names: BTreeSet<&str> = draft_programs
            .iter()
            .map(|program| program.admin_name.as_str())
            .collect();
        // Active programs the Draft neither overrides nor tombstones are carried into the next
        // Active version, so their questions must survive publish too.
        let carried_forward = match self.repository.lifecycle()?.active() {
            Some(active) => self
                .load_programs(&active.programs)?
                .into_iter()
                .filter(|program| {
                    !draft.programs.contains(&program.id)
                        && !draft_names.contains(program.admin_name.as_str())
                        && !draft.tombstoned_programs.contains(&program.admin_name)
                })
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };
        let still_used = draft_programs
            .iter()
            .chain(carried_forward.iter())
            .flat_map(|program| program.block_definitions.iter())
            .flat_map(BlockDefinition::questions)
            .any(|question| question.name == name);
        if still_used {
            return Err(VersionError::QuestionInUse {
                name: name.to_string(),
            });
        }

        let in_draft: Vec<QuestionId> = self
            .load_questions(&draft.questions)?
            .into_iter()
            .filter(|question| question.name == name)
            .map(|question| question.id)
            .collect();
        let in_active = match self.repository.lifecycle()?.active() {
            Some(active) => self
                .load_questions(&active.questions)?
                .iter()
                .any(|question| question.name == name),
            None => false,
        };
        if in_draft.is_empty() && !in_active {
            return Err(VersionError::UnknownQuestion {
                name: name.to_string(),
            });
        }

        self.commit_to_draft("tombstone_question", |draft| {
            let mut changes: Vec<VersionChange> = in_draft
                .iter()
                .map(|question_id| VersionChange::RemoveQuestion {
                    version_id: draft.id,
                    question_id: *question_id,
                })
                .collect();
            if in_active {
                changes.push(VersionChange::TombstoneQuestion {
                    version_id: draft.id,
                    name: name.to_string(),
                });
            }
            changes
        })?;
        info!(name, "tombstoned question");
        Ok(())
    }

    /// Adds a new question to the Draft. Names are unique across Draft and Active.
    pub fn create_question(
        &self,
        question: QuestionDefinition,
    ) -> Result<QuestionDefinition, VersionError> {
        ensure_valid(&question)?;
        if let Some(enumerator_id) = question.enumerator_id {
            self.question_definition(enumerator_id)?;
        }

        let _guard = self.lock();
        let draft = self.draft_locked()?;
        let mut existing = self.load_questions(&draft.questions)?;
        if let Some(active) = self.repository.lifecycle()?.active() {
            existing.extend(self.load_questions(&active.questions)?);
        }
        if existing
            .iter()
            .any(|candidate| candidate.name == question.name)
        {
            return Err(VersionError::DuplicateQuestion {
                name: question.name,
            });
        }

        let stored = self.repository.insert_question(question)?;
        let question_id = stored.id;
        self.commit_to_draft("create_question", |draft| {
            vec![VersionChange::AddQuestion {
                version_id: draft.id,
                question_id,
            }]
        })?;
        info!(%question_id, name = %stored.name, "created draft question");
        Ok(stored)
    }

    /// Edits a question. A Draft revision is updated in place; an Active-only question gets a
    /// new Draft revision and the programs using it are migrated.
    pub fn update_question(
        &self,
        question: QuestionDefinition,
    ) -> Result<QuestionDefinition, VersionError> {
        ensure_valid(&question)?;
        let existing = self.question_definition(question.id)?;
        if existing.name != question.name
            || existing.path != question.path
            || existing.question_type.label() != question.question_type.label()
        {
            return Err(VersionError::QuestionInvariantChanged {
                name: existing.name,
            });
        }

        let _guard = self.lock();
        let draft = self.draft_locked()?;
        if let Some(revision) = self
            .load_questions(&draft.questions)?
            .into_iter()
            .find(|candidate| candidate.name == existing.name)
        {
            let updated = QuestionDefinition {
                id: revision.id,
                ..question
            };
            self.repository.update_question(&updated)?;
            self.migrate_programs_locked(revision.id)?;
            if existing.id != revision.id {
                self.migrate_programs_locked(existing.id)?;
            }
            debug!(question_id = %updated.id, "updated draft question in place");
            return Ok(updated);
        }

        let is_active = self
            .repository
            .lifecycle()?
            .active()
            .map(|active| active.questions.contains(&existing.id))
            .unwrap_or(false);
        if !is_active {
            return Err(VersionError::QuestionNotFound(existing.id));
        }

        let revision = self.repository.insert_question(question)?;
        let revision_id = revision.id;
        self.commit_to_draft("update_question", |draft| {
            vec![VersionChange::AddQuestion {
                version_id: draft.id,
                question_id: revision_id,
            }]
        })?;
        self.migrate_programs_locked(existing.id)?;
        info!(
            old_question_id = %existing.id,
            question_id = %revision_id,
            name = %revision.name,
            "created draft revision of active question"
        );
        Ok(revision)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draft_locked(&self) -> Result<Version, VersionError> {
        self.retrying("get_or_create_draft", || {
            let snapshot = self.repository.lifecycle()?;
            if let Some(draft) = snapshot.draft() {
                return Ok(draft.clone());
            }
            let committed = self
                .repository
                .commit(snapshot.revision, vec![VersionChange::CreateDraft])?;
            let draft = committed
                .draft()
                .cloned()
                .ok_or(VersionError::Repository(RepositoryError::SerializationConflict))?;
            info!(version_id = %draft.id, "created draft version");
            Ok(draft)
        })
        .map_err(|error| match error {
            VersionError::LifecycleContention { attempts, .. } => {
                VersionError::DraftContention { attempts }
            }
            other => other,
        })
    }

    /// Runs `attempt_once` until it stops failing with a retryable repository conflict, up to
    /// the configured number of attempts, sleeping `backoff * attempt` in between.
    fn retrying<T>(
        &self,
        operation: &'static str,
        mut attempt_once: impl FnMut() -> Result<T, VersionError>,
    ) -> Result<T, VersionError> {
        let attempts = self.config.draft_retry_attempts.max(1);
        for attempt in 1..=attempts {
            match attempt_once() {
                Err(VersionError::Repository(error)) if error.is_retryable() => {
                    warn!(operation, attempt, attempts, %error, "lifecycle commit conflicted");
                    if attempt < attempts {
                        thread::sleep(self.config.draft_retry_backoff * attempt);
                    }
                }
                outcome => return outcome,
            }
        }
        Err(VersionError::LifecycleContention {
            operation,
            attempts,
        })
    }

    // Commits `build(draft)` against the current Draft, recreating the Draft if another
    // writer published it away in the meantime.
    fn commit_to_draft(
        &self,
        operation: &'static str,
        build: impl Fn(&Version) -> Vec<VersionChange>,
    ) -> Result<LifecycleSnapshot, VersionError> {
        self.retrying(operation, || {
            let snapshot = self.repository.lifecycle()?;
            let Some(draft) = snapshot.draft() else {
                self.draft_locked()?;
                return Err(VersionError::Repository(
                    RepositoryError::SerializationConflict,
                ));
            };
            Ok(self.repository.commit(snapshot.revision, build(draft))?)
        })
    }

    fn fork_into_draft_locked(
        &self,
        program: &ProgramDefinition,
    ) -> Result<ProgramDefinition, VersionError> {
        let fork = self.repository.insert_program(program.clone())?;
        let fork_id = fork.id;
        let snapshot = self.commit_to_draft("fork_program", |draft| {
            vec![VersionChange::AddProgram {
                version_id: draft.id,
                program_id: fork_id,
            }]
        })?;
        info!(
            source_program_id = %program.id,
            program_id = %fork_id,
            admin_name = %program.admin_name,
            "forked active program into draft"
        );
        self.refresh_questions(&snapshot, fork_id)
    }

    fn migrate_programs_locked(&self, old_question_id: QuestionId) -> Result<(), VersionError> {
        let draft = self.draft_locked()?;
        let snapshot = self.repository.lifecycle()?;
        let active = snapshot.active();
        let is_active = |program_id: &ProgramId| {
            active
                .map(|version| version.programs.contains(program_id))
                .unwrap_or(false)
        };

        let draft_programs = self.load_programs(&draft.programs)?;
        for program in &draft_programs {
            if is_active(&program.id)
                || !program.referenced_question_ids().contains(&old_question_id)
            {
                continue;
            }
            self.refresh_questions(&snapshot, program.id)?;
        }

        let Some(active) = active else {
            return Ok(());
        };
        let draft_names: BTreeSet<&str> = draft_programs
            .iter()
            .map(|program| program.admin_name.as_str())
            .collect();
        for program in self.load_programs(&active.programs)? {
            if draft.programs.contains(&program.id)
                || draft_names.contains(program.admin_name.as_str())
                || draft.tombstoned_programs.contains(&program.admin_name)
                || !program.referenced_question_ids().contains(&old_question_id)
            {
                continue;
            }
            self.fork_into_draft_locked(&program)?;
        }
        Ok(())
    }

    fn refresh_questions(
        &self,
        snapshot: &LifecycleSnapshot,
        program_id: ProgramId,
    ) -> Result<ProgramDefinition, VersionError> {
        self.ensure_draft_only(snapshot, program_id)?;
        let program = self.load_program(program_id)?;
        let latest = self.latest_questions_by_name(snapshot)?;

        let mut mapping = BTreeMap::new();
        for question_id in program.referenced_question_ids() {
            let cached = program
                .block_definitions
                .iter()
                .flat_map(BlockDefinition::questions)
                .find(|question| question.id == question_id)
                .map(|question| question.name.clone());
            let name = match cached {
                Some(name) => name,
                None => match self.repository.question(question_id)? {
                    Some(question) => question.name,
                    None => continue,
                },
            };
            if let Some(newest) = latest.get(&name) {
                if newest.id != question_id {
                    trace!(
                        %program_id,
                        from = %question_id,
                        to = %newest.id,
                        "migrating question reference"
                    );
                    mapping.insert(question_id, newest.id);
                }
            }
        }

        let block_definitions = program
            .block_definitions
            .iter()
            .map(|block| BlockDefinition {
                program_question_definitions: block
                    .program_question_definitions
                    .iter()
                    .map(|pqd| {
                        ProgramQuestionDefinition::new(
                            latest
                                .get(&pqd.question.name)
                                .cloned()
                                .unwrap_or_else(|| pqd.question.clone()),
                        )
                    })
                    .collect(),
                visibility_predicate: block
                    .visibility_predicate
                    .as_ref()
                    .map(|predicate| predicate.rewrite(&mapping)),
                optional_predicate: block
                    .optional_predicate
                    .as_ref()
                    .map(|predicate| predicate.rewrite(&mapping)),
                ..block.clone()
            })
            .collect();
        let updated = ProgramDefinition {
            block_definitions,
            ..program
        };
        self.repository.update_program(&updated)?;
        debug!(%program_id, migrated = mapping.len(), "refreshed question versions");
        Ok(updated)
    }

    fn ensure_draft_only(
        &self,
        snapshot: &LifecycleSnapshot,
        program_id: ProgramId,
    ) -> Result<(), VersionError> {
        let in_draft = snapshot
            .draft()
            .map(|draft| draft.programs.contains(&program_id))
            .unwrap_or(false);
        let in_active = snapshot
            .active()
            .map(|active| active.programs.contains(&program_id))
            .unwrap_or(false);
        if !in_draft || in_active {
            return Err(VersionError::ProgramNotDraft(program_id));
        }
        Ok(())
    }

    // Draft revisions shadow Active ones with the same name.
    fn latest_questions_by_name(
        &self,
        snapshot: &LifecycleSnapshot,
    ) -> Result<BTreeMap<String, QuestionDefinition>, VersionError> {
        let mut latest = BTreeMap::new();
        for version in [snapshot.active(), snapshot.draft()].into_iter().flatten() {
            for question in self.load_questions(&version.questions)? {
                latest.insert(question.name.clone(), question);
            }
        }
        Ok(latest)
    }

    fn load_program(&self, id: ProgramId) -> Result<ProgramDefinition, VersionError> {
        self.repository
            .program(id)?
            .ok_or(VersionError::ProgramNotFound(id))
    }

    fn load_programs(
        &self,
        ids: &BTreeSet<ProgramId>,
    ) -> Result<Vec<ProgramDefinition>, VersionError> {
        ids.iter().map(|id| self.load_program(*id)).collect()
    }

    fn load_questions(
        &self,
        ids: &BTreeSet<QuestionId>,
    ) -> Result<Vec<QuestionDefinition>, VersionError> {
        ids.iter()
            .map(|id| self.question_definition(*id))
            .collect()
    }
}

fn ensure_valid(question: &QuestionDefinition) -> Result<(), VersionError> {
    let errors = question.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(VersionError::InvalidQuestion {
            name: question.name.clone(),
            errors,
        })
    }
}

fn join_errors(errors: &[QuestionDefinitionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error raised by the version store.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("there is no draft version with at least one program to publish")]
    EmptyDraft,
    #[error("no active version exists; applicants cannot be served without one")]
    NoActiveVersion,
    #[error("could not create a draft version after {attempts} conflicting attempts")]
    DraftContention { attempts: u32 },
    #[error("{operation} did not commit after {attempts} conflicting attempts")]
    LifecycleContention {
        operation: &'static str,
        attempts: u32,
    },
    #[error("version {0} not found")]
    VersionNotFound(VersionId),
    #[error("version {version_id} is {stage:?} and cannot be set live")]
    InvalidLiveTarget {
        version_id: VersionId,
        stage: LifecycleStage,
    },
    #[error("program {0} is not an unpublished draft")]
    ProgramNotDraft(ProgramId),
    #[error("program {0} not found")]
    ProgramNotFound(ProgramId),
    #[error("no draft or active program is named '{admin_name}'")]
    UnknownProgram { admin_name: String },
    #[error("a program named '{admin_name}' already exists")]
    DuplicateProgram { admin_name: String },
    #[error("program '{admin_name}' was removed in the current draft")]
    ProgramTombstoned { admin_name: String },
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("no draft or active question is named '{name}'")]
    UnknownQuestion { name: String },
    #[error("a question named '{name}' already exists")]
    DuplicateQuestion { name: String },
    #[error("question '{name}' is still used by a draft or carried-forward active program")]
    QuestionInUse { name: String },
    #[error("question '{name}' must keep its name, path and type across revisions")]
    QuestionInvariantChanged { name: String },
    #[error("invalid question '{name}': {}", join_errors(.errors))]
    InvalidQuestion {
        name: String,
        errors: Vec<QuestionDefinitionError>,
    },
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl VersionError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VersionError::VersionNotFound(_)
                | VersionError::ProgramNotFound(_)
                | VersionError::UnknownProgram { .. }
                | VersionError::QuestionNotFound(_)
                | VersionError::UnknownQuestion { .. }
                | VersionError::Repository(RepositoryError::NotFound)
        )
    }
}
