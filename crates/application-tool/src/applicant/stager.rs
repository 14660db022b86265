use std::collections::{BTreeMap, BTreeSet};

use super::block::Block;
use super::data::{ApplicantData, ApplicantDataError};
use super::repository::ApplicantId;
use crate::definitions::{Path, PathError, ProgramId, Scalar, ScalarType};
use crate::predicate::PredicateError;
use crate::repository::RepositoryError;
use crate::versions::VersionError;

/// Pseudo-scalar whose value names an entity index to delete from an enumerator.
pub const DELETE_ENTITY_KEY: &str = "delete_entity";

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("applicant {0} not found")]
    ApplicantNotFound(ApplicantId),
    #[error("program {program_id} has no block '{block_id}'")]
    ProgramOrBlockNotFound {
        program_id: ProgramId,
        block_id: String,
    },
    #[error("path '{path}' is not part of block '{block_id}'")]
    PathNotInBlock { block_id: String, path: String },
    #[error("path '{path}' holds a {scalar_type:?} scalar, which cannot be written from form input")]
    UnsupportedScalarType {
        path: String,
        scalar_type: ScalarType,
    },
    #[error("path '{path}' collides with a reserved metadata key")]
    ReservedKeyConflict { path: String },
    #[error(transparent)]
    MalformedPath(#[from] PathError),
    #[error("invalid enumerator update: {reason}")]
    InvalidEnumeratorUpdate { reason: String },
    #[error("path '{path}' indexes past the {submitted} element(s) submitted for its list")]
    ElementIndexOutOfRange { path: String, submitted: usize },
    #[error("value '{value}' at '{path}' is not a whole number")]
    InvalidScalarValue { path: String, value: String },
    #[error(transparent)]
    Predicate(#[from] PredicateError),
    #[error(transparent)]
    Data(#[from] ApplicantDataError),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl StagingError {
    /// Missing resources, as opposed to bad input.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StagingError::ApplicantNotFound(_)
                | StagingError::ProgramOrBlockNotFound { .. }
                | StagingError::Repository(RepositoryError::NotFound)
        ) || matches!(self, StagingError::Version(error) if error.is_not_found())
    }
}

/// Stamp applied beside every question the batch touches.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UpdateMetadata {
    pub program_id: ProgramId,
    pub updated_at_millis: i64,
}

/// Parses raw form input and rejects metadata keys before anything else looks at it.
pub(crate) fn parse_updates(
    raw: &BTreeMap<String, String>,
) -> Result<Vec<(Path, String)>, StagingError> {
    let updates = raw
        .iter()
        .map(|(key, value)| -> Result<_, StagingError> {
            Ok((Path::parse(key)?, value.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some((path, _)) = updates.iter().find(|(path, _)| {
        path.without_array_reference()
            .key_name()
            .map(Scalar::is_reserved_key)
            .unwrap_or(false)
    }) {
        return Err(StagingError::ReservedKeyConflict {
            path: path.to_string(),
        });
    }

    Ok(updates)
}

/// Applies `updates` for `block` to a copy of `data`. Every update is validated before the
/// copy is touched, so an error leaves nothing half-applied.
pub(crate) fn stage(
    block: &Block,
    data: &ApplicantData,
    updates: &[(Path, String)],
    metadata: UpdateMetadata,
) -> Result<ApplicantData, StagingError> {
    if block.is_enumerator() {
        stage_enumerator(block, data, updates, metadata)
    } else {
        stage_scalars(block, data, updates, metadata)
    }
}

fn stage_enumerator(
    block: &Block,
    data: &ApplicantData,
    updates: &[(Path, String)],
    metadata: UpdateMetadata,
) -> Result<ApplicantData, StagingError> {
    let entities_path = block
        .enumerator_question()
        .map(|question| question.path().without_array_reference())
        .ok_or_else(|| StagingError::ProgramOrBlockNotFound {
            program_id: metadata.program_id,
            block_id: block.id().to_string(),
        })?;
    let delete_path = Path::empty().join(DELETE_ENTITY_KEY);

    let mut renames: BTreeMap<usize, &str> = BTreeMap::new();
    let mut raw_deletes: Vec<&str> = Vec::new();
    for (path, value) in updates {
        if path.without_array_reference() == delete_path {
            raw_deletes.push(value.as_str());
            continue;
        }
        match path.array_index() {
            Some(index) if path.without_array_reference() == entities_path => {
                if renames.insert(index, value.as_str()).is_some() {
                    return Err(StagingError::InvalidEnumeratorUpdate {
                        reason: format!("entity index {index} submitted more than once"),
                    });
                }
            }
            _ => {
                return Err(StagingError::PathNotInBlock {
                    block_id: block.id().to_string(),
                    path: path.to_string(),
                })
            }
        }
    }

    // BTreeMap keys are sorted, so a contiguous 0..n range ends at n - 1.
    if let Some((&last, _)) = renames.iter().next_back() {
        if last + 1 != renames.len() {
            return Err(StagingError::InvalidEnumeratorUpdate {
                reason: format!(
                    "entity indices must cover 0..{} without gaps",
                    renames.len()
                ),
            });
        }
    }

    let entity_count = renames.len().max(data.entity_count(&entities_path));
    let mut deletes = BTreeSet::new();
    for raw in raw_deletes {
        let index = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|index| *index < entity_count)
            .ok_or_else(|| StagingError::InvalidEnumeratorUpdate {
                reason: format!("'{raw}' is not the index of an existing entity"),
            })?;
        deletes.insert(index);
    }

    let mut staged = data.clone();
    staged.ensure_array(&entities_path)?;
    // Renames never move entities, so delete indices stay valid after they are applied.
    for (index, name) in renames {
        let entity_path = entities_path.at_index(index);
        staged.put_string(&entity_path.join(Scalar::EntityName.key()), name)?;
        staged.put_metadata(
            &entity_path,
            metadata.program_id.0 as i64,
            metadata.updated_at_millis,
        )?;
    }
    let deletes: Vec<usize> = deletes.into_iter().collect();
    staged.delete_entities(&entities_path, &deletes)?;

    Ok(staged)
}

enum TypedWrite {
    String(String),
    Long(i64),
    Clear,
    Skip,
}

fn stage_scalars(
    block: &Block,
    data: &ApplicantData,
    updates: &[(Path, String)],
    metadata: UpdateMetadata,
) -> Result<ApplicantData, StagingError> {
    // A submission replaces the whole list, so element indices must stay within the batch.
    let mut submitted: BTreeMap<Path, usize> = BTreeMap::new();
    for (path, _) in updates.iter().filter(|(path, _)| path.is_array_element()) {
        *submitted.entry(path.without_array_reference()).or_default() += 1;
    }

    let mut writes = Vec::with_capacity(updates.len());
    for (path, value) in updates {
        let target = block
            .scalar_target(path)
            .ok_or_else(|| StagingError::PathNotInBlock {
                block_id: block.id().to_string(),
                path: path.to_string(),
            })?;
        if let Some(index) = path.array_index() {
            let elements = submitted
                .get(&path.without_array_reference())
                .copied()
                .unwrap_or(0);
            if index >= elements {
                return Err(StagingError::ElementIndexOutOfRange {
                    path: path.to_string(),
                    submitted: elements,
                });
            }
        }
        let write = match target.scalar_type {
            ScalarType::String if path.is_array_element() && value.trim().is_empty() => {
                TypedWrite::Skip
            }
            ScalarType::String => TypedWrite::String(value.clone()),
            ScalarType::Long if value.trim().is_empty() => TypedWrite::Clear,
            ScalarType::Long => value
                .trim()
                .parse::<i64>()
                .map(TypedWrite::Long)
                .map_err(|_| StagingError::InvalidScalarValue {
                    path: path.to_string(),
                    value: value.clone(),
                })?,
            scalar_type @ (ScalarType::Date | ScalarType::ListOfStrings) => {
                return Err(StagingError::UnsupportedScalarType {
                    path: path.to_string(),
                    scalar_type,
                })
            }
        };
        writes.push((path, target.question_path, write));
    }

    let mut staged = data.clone();
    let mut cleared_arrays = BTreeSet::new();
    let mut touched_questions = BTreeSet::new();
    for (path, question_path, write) in writes {
        if path.is_array_element() {
            let array_path = path.without_array_reference();
            if !cleared_arrays.contains(&array_path) {
                staged.clear_array(&array_path)?;
                cleared_arrays.insert(array_path);
            }
        }
        match write {
            TypedWrite::String(value) => staged.put_string(path, &value)?,
            TypedWrite::Long(value) => staged.put_long(path, value)?,
            TypedWrite::Clear => staged.put_null(path)?,
            TypedWrite::Skip => {}
        }
        touched_questions.insert(question_path);
    }

    for question_path in touched_questions {
        staged.put_metadata(
            &question_path,
            metadata.program_id.0 as i64,
            metadata.updated_at_millis,
        )?;
    }

    Ok(staged)
}
