//! Program authoring with versioned snapshots, block visibility predicates, and staging of
//! applicant answers into a per-applicant data tree.

pub mod applicant;
pub mod config;
pub mod definitions;
pub mod memory;
pub mod predicate;
pub mod repository;
pub mod telemetry;
pub mod versions;
