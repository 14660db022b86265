use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::data::ApplicantData;
use super::repository::{Applicant, ApplicantId, ApplicantRepository};
use super::stager::{self, StagingError, UpdateMetadata};
use super::view::ReadOnlyApplicantProgram;
use crate::definitions::{ProgramDefinition, ProgramId};
use crate::repository::{Clock, RepositoryError};
use crate::versions::{VersionRepository, VersionService};

/// Result of a staged block submission.
#[derive(Debug)]
pub enum StageOutcome {
    /// The block validated and the new answers were saved.
    Committed(ReadOnlyApplicantProgram),
    /// The block has validation errors; the view shows them but nothing was saved.
    Preview(ReadOnlyApplicantProgram),
}

impl StageOutcome {
    pub fn view(&self) -> &ReadOnlyApplicantProgram {
        match self {
            StageOutcome::Committed(view) | StageOutcome::Preview(view) => view,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, StageOutcome::Committed(_))
    }
}

/// Applicant-facing operations: reading a program against stored answers and staging new
/// answers one block at a time.
pub struct ApplicantService<A, V> {
    applicants: Arc<A>,
    versions: Arc<VersionService<V>>,
    clock: Arc<dyn Clock>,
}

impl<A, V> ApplicantService<A, V>
where
    A: ApplicantRepository + 'static,
    V: VersionRepository + 'static,
{
    pub fn new(
        applicants: Arc<A>,
        versions: Arc<VersionService<V>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            applicants,
            versions,
            clock,
        }
    }

    pub fn create_applicant(&self) -> Result<Applicant, RepositoryError> {
        let applicant = self
            .applicants
            .insert(ApplicantData::default(), self.clock.now())?;
        info!(applicant_id = %applicant.id, "created applicant");
        Ok(applicant)
    }

    pub fn read_only_applicant_program(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
    ) -> Result<ReadOnlyApplicantProgram, StagingError> {
        let applicant = self.load_applicant(applicant_id)?;
        let program = self.load_program(program_id, "")?;
        Ok(ReadOnlyApplicantProgram::new(program, applicant.data)?)
    }

    /// Validates and applies form input for one block. Input that parses but fails question
    /// validation comes back as [`StageOutcome::Preview`] and is not persisted.
    pub fn stage_and_update_if_valid(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
        block_id: &str,
        updates: &BTreeMap<String, String>,
    ) -> Result<StageOutcome, StagingError> {
        let updates = stager::parse_updates(updates)?;
        let mut applicant = self.load_applicant(applicant_id)?;
        let program = self.load_program(program_id, block_id)?;

        let view = ReadOnlyApplicantProgram::new(program.clone(), applicant.data.clone())?;
        let block = view
            .get_block(block_id)
            .ok_or_else(|| StagingError::ProgramOrBlockNotFound {
                program_id,
                block_id: block_id.to_string(),
            })?;
        let metadata = UpdateMetadata {
            program_id,
            updated_at_millis: self.clock.now().timestamp_millis(),
        };
        let staged = stager::stage(block, view.data(), &updates, metadata)?;

        let view = ReadOnlyApplicantProgram::new(program, staged)?;
        let has_errors = view
            .get_block(block_id)
            .map(|block| block.has_errors())
            .unwrap_or(false);
        if has_errors {
            debug!(%applicant_id, %program_id, block_id, "staged block has errors; not saved");
            return Ok(StageOutcome::Preview(view));
        }

        applicant.data = view.data().clone();
        self.applicants.update(&applicant)?;
        info!(
            %applicant_id,
            %program_id,
            block_id,
            updates = updates.len(),
            "saved block answers"
        );
        Ok(StageOutcome::Committed(view))
    }

    fn load_applicant(&self, applicant_id: ApplicantId) -> Result<Applicant, StagingError> {
        self.applicants
            .lookup(applicant_id)?
            .ok_or(StagingError::ApplicantNotFound(applicant_id))
    }

    fn load_program(
        &self,
        program_id: ProgramId,
        block_id: &str,
    ) -> Result<ProgramDefinition, StagingError> {
        self.versions
            .program_definition(program_id)
            .map_err(|error| {
                if error.is_not_found() {
                    StagingError::ProgramOrBlockNotFound {
                        program_id,
                        block_id: block_id.to_string(),
                    }
                } else {
                    StagingError::Version(error)
                }
            })
    }
}
