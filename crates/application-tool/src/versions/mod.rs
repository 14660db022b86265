//! Versioned snapshots of programs and questions and the lifecycle that moves them through
//! Draft, Active, Obsolete, and Deleted.

pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{LifecycleSnapshot, LifecycleStage, Version, VersionChange, VersionId};
pub use repository::VersionRepository;
pub use service::{VersionError, VersionService};
