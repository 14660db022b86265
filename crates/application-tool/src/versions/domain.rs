use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::definitions::{ProgramId, QuestionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub u64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Draft → Active → Obsolete on publish; Draft → Deleted when another version is set live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStage {
    Draft,
    Active,
    Obsolete,
    Deleted,
}

impl LifecycleStage {
    pub fn label(self) -> &'static str {
        match self {
            LifecycleStage::Draft => "draft",
            LifecycleStage::Active => "active",
            LifecycleStage::Obsolete => "obsolete",
            LifecycleStage::Deleted => "deleted",
        }
    }
}

/// Lifecycle-tagged grouping of program and question snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub stage: LifecycleStage,
    pub programs: BTreeSet<ProgramId>,
    pub questions: BTreeSet<QuestionId>,
    /// Program admin names removed in this draft; publish must not copy them forward.
    pub tombstoned_programs: BTreeSet<String>,
    /// Question names removed in this draft.
    pub tombstoned_questions: BTreeSet<String>,
}

impl Version {
    pub fn new(id: VersionId, stage: LifecycleStage) -> Self {
        Self {
            id,
            stage,
            programs: BTreeSet::new(),
            questions: BTreeSet::new(),
            tombstoned_programs: BTreeSet::new(),
            tombstoned_questions: BTreeSet::new(),
        }
    }
}

/// Every version plus the revision it was read at. Commits name the revision they expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleSnapshot {
    pub revision: u64,
    pub versions: Vec<Version>,
}

impl LifecycleSnapshot {
    pub fn draft(&self) -> Option<&Version> {
        self.with_stage(LifecycleStage::Draft)
    }

    pub fn active(&self) -> Option<&Version> {
        self.with_stage(LifecycleStage::Active)
    }

    pub fn version(&self, id: VersionId) -> Option<&Version> {
        self.versions.iter().find(|version| version.id == id)
    }

    fn with_stage(&self, stage: LifecycleStage) -> Option<&Version> {
        self.versions.iter().find(|version| version.stage == stage)
    }
}

/// One step of an atomic lifecycle commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChange {
    /// Creates an empty Draft; the store assigns its id.
    CreateDraft,
    SetStage {
        version_id: VersionId,
        stage: LifecycleStage,
    },
    AddProgram {
        version_id: VersionId,
        program_id: ProgramId,
    },
    RemoveProgram {
        version_id: VersionId,
        program_id: ProgramId,
    },
    AddQuestion {
        version_id: VersionId,
        question_id: QuestionId,
    },
    RemoveQuestion {
        version_id: VersionId,
        question_id: QuestionId,
    },
    TombstoneProgram {
        version_id: VersionId,
        admin_name: String,
    },
    TombstoneQuestion {
        version_id: VersionId,
        name: String,
    },
}
