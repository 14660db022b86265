use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::data::ApplicantData;
use crate::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u64);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository record for one applicant and their answers across every program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub data: ApplicantData,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction for applicants. `insert` assigns the id.
pub trait ApplicantRepository: Send + Sync {
    fn insert(
        &self,
        data: ApplicantData,
        created_at: DateTime<Utc>,
    ) -> Result<Applicant, RepositoryError>;
    fn lookup(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn update(&self, applicant: &Applicant) -> Result<(), RepositoryError>;
}
