use std::fmt;

use serde::{Deserialize, Serialize};

use super::localized::LocalizedStrings;
use super::path::Path;

/// Per-snapshot surrogate id. A question keeps its `name` across versions; the id changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage kind of a scalar in the applicant data tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalarType {
    String,
    Long,
    Date,
    ListOfStrings,
}

impl ScalarType {
    /// Type of a single element addressed with `[i]` inside a list scalar.
    pub fn element_type(self) -> Option<ScalarType> {
        match self {
            ScalarType::ListOfStrings => Some(ScalarType::String),
            ScalarType::String | ScalarType::Long | ScalarType::Date => None,
        }
    }
}

/// Named leaf under a question's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Street,
    Line2,
    City,
    State,
    Zip,
    Selection,
    Date,
    Email,
    EntityName,
    FileKey,
    FirstName,
    MiddleName,
    LastName,
    Number,
    Text,
    UpdatedInProgram,
    UpdatedAt,
}

/// Metadata scalars stamped next to every answered question.
pub const METADATA_SCALARS: [(Scalar, ScalarType); 2] = [
    (Scalar::UpdatedInProgram, ScalarType::Long),
    (Scalar::UpdatedAt, ScalarType::Long),
];

impl Scalar {
    pub fn key(self) -> &'static str {
        match self {
            Scalar::Street => "street",
            Scalar::Line2 => "line2",
            Scalar::City => "city",
            Scalar::State => "state",
            Scalar::Zip => "zip",
            Scalar::Selection => "selection",
            Scalar::Date => "date",
            Scalar::Email => "email",
            Scalar::EntityName => "entity_name",
            Scalar::FileKey => "file_key",
            Scalar::FirstName => "first_name",
            Scalar::MiddleName => "middle_name",
            Scalar::LastName => "last_name",
            Scalar::Number => "number",
            Scalar::Text => "text",
            Scalar::UpdatedInProgram => "updated_in_program",
            Scalar::UpdatedAt => "updated_at",
        }
    }

    pub fn is_metadata(self) -> bool {
        matches!(self, Scalar::UpdatedInProgram | Scalar::UpdatedAt)
    }

    /// True when `key` names a metadata scalar and so may not be written by applicants.
    pub fn is_reserved_key(key: &str) -> bool {
        METADATA_SCALARS
            .iter()
            .any(|(scalar, _)| scalar.key() == key)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One selectable answer of a multi-option question. Answers store the `admin_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: u64,
    pub admin_name: String,
    pub text: LocalizedStrings,
}

impl QuestionOption {
    pub fn new(id: u64, admin_name: &str, text: &str) -> Self {
        Self {
            id,
            admin_name: admin_name.to_string(),
            text: LocalizedStrings::with_default(text),
        }
    }
}

/// Question kind plus the validation settings that only make sense for that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionType {
    Address {
        #[serde(default)]
        disallow_po_box: bool,
    },
    Checkbox {
        options: Vec<QuestionOption>,
        #[serde(default)]
        min_choices: Option<usize>,
        #[serde(default)]
        max_choices: Option<usize>,
    },
    Date,
    Dropdown {
        options: Vec<QuestionOption>,
    },
    Email,
    Enumerator {
        entity_type: LocalizedStrings,
    },
    FileUpload,
    Name,
    Number {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    RadioButton {
        options: Vec<QuestionOption>,
    },
    Text {
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
    },
}

impl QuestionType {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::Address { .. } => "address",
            QuestionType::Checkbox { .. } => "checkbox",
            QuestionType::Date => "date",
            QuestionType::Dropdown { .. } => "dropdown",
            QuestionType::Email => "email",
            QuestionType::Enumerator { .. } => "enumerator",
            QuestionType::FileUpload => "file_upload",
            QuestionType::Name => "name",
            QuestionType::Number { .. } => "number",
            QuestionType::RadioButton { .. } => "radio_button",
            QuestionType::Text { .. } => "text",
        }
    }

    /// Answer scalars for this kind, excluding metadata.
    pub fn scalars(&self) -> Vec<(Scalar, ScalarType)> {
        match self {
            QuestionType::Address { .. } => vec![
                (Scalar::Street, ScalarType::String),
                (Scalar::Line2, ScalarType::String),
                (Scalar::City, ScalarType::String),
                (Scalar::State, ScalarType::String),
                (Scalar::Zip, ScalarType::String),
            ],
            QuestionType::Checkbox { .. } => vec![(Scalar::Selection, ScalarType::ListOfStrings)],
            QuestionType::Date => vec![(Scalar::Date, ScalarType::Date)],
            QuestionType::Dropdown { .. } | QuestionType::RadioButton { .. } => {
                vec![(Scalar::Selection, ScalarType::String)]
            }
            QuestionType::Email => vec![(Scalar::Email, ScalarType::String)],
            QuestionType::Enumerator { .. } => vec![(Scalar::EntityName, ScalarType::String)],
            QuestionType::FileUpload => vec![(Scalar::FileKey, ScalarType::String)],
            QuestionType::Name => vec![
                (Scalar::FirstName, ScalarType::String),
                (Scalar::MiddleName, ScalarType::String),
                (Scalar::LastName, ScalarType::String),
            ],
            QuestionType::Number { .. } => vec![(Scalar::Number, ScalarType::Long)],
            QuestionType::Text { .. } => vec![(Scalar::Text, ScalarType::String)],
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match self {
            QuestionType::Checkbox { options, .. }
            | QuestionType::Dropdown { options }
            | QuestionType::RadioButton { options } => options,
            _ => &[],
        }
    }

    pub fn is_multi_option(&self) -> bool {
        matches!(
            self,
            QuestionType::Checkbox { .. }
                | QuestionType::Dropdown { .. }
                | QuestionType::RadioButton { .. }
        )
    }
}

/// Authoring-time problems with a question definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionDefinitionError {
    #[error("blank name")]
    BlankName,
    #[error("blank description")]
    BlankDescription,
    #[error("invalid path pattern")]
    InvalidPathPattern,
    #[error("no question text")]
    NoQuestionText,
    #[error("multi-option question has no options")]
    NoOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: QuestionId,
    pub name: String,
    pub path: Path,
    pub description: String,
    pub question_text: LocalizedStrings,
    #[serde(default)]
    pub help_text: LocalizedStrings,
    /// Enumerator question this question repeats under.
    #[serde(default)]
    pub enumerator_id: Option<QuestionId>,
    pub question_type: QuestionType,
}

impl QuestionDefinition {
    pub fn is_enumerator(&self) -> bool {
        matches!(self.question_type, QuestionType::Enumerator { .. })
    }

    pub fn is_repeated(&self) -> bool {
        self.enumerator_id.is_some()
    }

    pub fn scalars(&self) -> Vec<(Scalar, ScalarType)> {
        self.question_type.scalars()
    }

    pub fn scalar_type(&self, scalar: Scalar) -> Option<ScalarType> {
        if let Some((_, scalar_type)) = METADATA_SCALARS.iter().find(|(s, _)| *s == scalar) {
            return Some(*scalar_type);
        }
        self.scalars()
            .into_iter()
            .find(|(s, _)| *s == scalar)
            .map(|(_, scalar_type)| scalar_type)
    }

    /// Collects every authoring problem rather than stopping at the first.
    pub fn validate(&self) -> Vec<QuestionDefinitionError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(QuestionDefinitionError::BlankName);
        }
        if self.description.trim().is_empty() {
            errors.push(QuestionDefinitionError::BlankDescription);
        }
        if !self.has_valid_path_shape() {
            errors.push(QuestionDefinitionError::InvalidPathPattern);
        }
        if self.question_text.is_empty() {
            errors.push(QuestionDefinitionError::NoQuestionText);
        }
        if self.question_type.is_multi_option() && self.question_type.options().is_empty() {
            errors.push(QuestionDefinitionError::NoOptions);
        }
        errors
    }

    // Enumerator paths end in `[]`; repeated questions live under at least one `[]`.
    fn has_valid_path_shape(&self) -> bool {
        if self.path.is_empty() {
            return false;
        }
        if self.is_enumerator() && !self.path.is_array_element() {
            return false;
        }
        let placeholders = self
            .path
            .segments()
            .iter()
            .filter(|segment| segment.index().is_some())
            .count();
        let own_placeholder = usize::from(self.is_enumerator());
        match self.enumerator_id {
            Some(_) => placeholders > own_placeholder,
            None => placeholders == own_placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_question(path: &str) -> QuestionDefinition {
        QuestionDefinition {
            id: QuestionId(1),
            name: "favorite color".to_string(),
            path: Path::parse(path).expect("valid path"),
            description: "The applicant's favorite color".to_string(),
            question_text: LocalizedStrings::with_default("What is your favorite color?"),
            help_text: LocalizedStrings::empty(),
            enumerator_id: None,
            question_type: QuestionType::Text {
                min_length: None,
                max_length: None,
            },
        }
    }

    #[test]
    fn valid_definition_has_no_errors() {
        assert!(text_question("applicant.favorite_color").validate().is_empty());
    }

    #[test]
    fn reports_every_problem() {
        let mut question = text_question("");
        question.name = " ".to_string();
        question.description = String::new();
        question.question_text = LocalizedStrings::empty();

        assert_eq!(
            question.validate(),
            vec![
                QuestionDefinitionError::BlankName,
                QuestionDefinitionError::BlankDescription,
                QuestionDefinitionError::InvalidPathPattern,
                QuestionDefinitionError::NoQuestionText,
            ]
        );
    }

    #[test]
    fn repeated_questions_need_an_enumerator_level() {
        let mut question = text_question("applicant.members[].job");
        assert_eq!(
            question.validate(),
            vec![QuestionDefinitionError::InvalidPathPattern]
        );
        question.enumerator_id = Some(QuestionId(7));
        assert!(question.validate().is_empty());
    }

    #[test]
    fn enumerator_paths_end_in_an_array() {
        let mut question = text_question("applicant.members");
        question.question_type = QuestionType::Enumerator {
            entity_type: LocalizedStrings::with_default("member"),
        };
        assert_eq!(
            question.validate(),
            vec![QuestionDefinitionError::InvalidPathPattern]
        );
        question.path = Path::parse("applicant.members[]").expect("valid path");
        assert!(question.validate().is_empty());
    }

    #[test]
    fn selection_type_depends_on_question_kind() {
        let checkbox = QuestionType::Checkbox {
            options: vec![QuestionOption::new(1, "red", "Red")],
            min_choices: None,
            max_choices: None,
        };
        let dropdown = QuestionType::Dropdown {
            options: vec![QuestionOption::new(1, "red", "Red")],
        };
        assert_eq!(
            checkbox.scalars(),
            vec![(Scalar::Selection, ScalarType::ListOfStrings)]
        );
        assert_eq!(dropdown.scalars(), vec![(Scalar::Selection, ScalarType::String)]);
        assert_eq!(ScalarType::ListOfStrings.element_type(), Some(ScalarType::String));
    }

    #[test]
    fn metadata_keys_are_reserved() {
        assert!(Scalar::is_reserved_key("updated_at"));
        assert!(Scalar::is_reserved_key("updated_in_program"));
        assert!(!Scalar::is_reserved_key("name"));
        assert_eq!(
            text_question("applicant.color").scalar_type(Scalar::UpdatedAt),
            Some(ScalarType::Long)
        );
    }
}
