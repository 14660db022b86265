//! Applicant answers: the per-applicant data tree, the read-only view of a program against
//! it, and staging of form input into it.

pub mod block;
pub mod data;
pub mod question;
pub mod repository;
pub mod service;
pub mod stager;
pub mod view;

#[cfg(test)]
mod tests;

pub use block::{Block, RepeatedEntity, ScalarTarget};
pub use data::{ApplicantData, ApplicantDataError, ScalarValue};
pub use question::{ApplicantQuestion, ValidationError};
pub use repository::{Applicant, ApplicantId, ApplicantRepository};
pub use service::{ApplicantService, StageOutcome};
pub use stager::{StagingError, DELETE_ENTITY_KEY};
pub use view::{AnswerData, ReadOnlyApplicantProgram};
