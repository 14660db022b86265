//! Immutable authoring model: paths, localized text, questions, blocks, and programs.

pub mod localized;
pub mod path;
pub mod program;
pub mod question;

pub use localized::{LocalizedStrings, DEFAULT_LOCALE};
pub use path::{ArrayRef, Path, PathError, Segment};
pub use program::{
    BlockDefinition, BlockDefinitionId, Direction, ProgramDefinition, ProgramError, ProgramId,
    ProgramQuestionDefinition,
};
pub use question::{
    QuestionDefinition, QuestionDefinitionError, QuestionId, QuestionOption, QuestionType, Scalar,
    ScalarType, METADATA_SCALARS,
};
