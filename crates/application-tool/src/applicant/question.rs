use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use super::data::ApplicantData;
use crate::definitions::{
    Path, ProgramId, QuestionDefinition, QuestionType, Scalar, ScalarType, DEFAULT_LOCALE,
};

static ZIP_PATTERN: OnceLock<Regex> = OnceLock::new();
static PO_BOX_PATTERN: OnceLock<Regex> = OnceLock::new();

fn zip_pattern() -> &'static Regex {
    ZIP_PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{5}(?:-[0-9]{4})?$").expect("ZIP pattern compiles")
    })
}

fn po_box_pattern() -> &'static Regex {
    PO_BOX_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(.*(P(OST|.)?\s*((O(FF(ICE)?)?)?.?\s*(B(IN|OX|.?)))+)).*")
            .expect("PO box pattern compiles")
    })
}

fn is_valid_zip(zip: &str) -> bool {
    zip_pattern().is_match(zip)
}

fn looks_like_po_box(line: &str) -> bool {
    po_box_pattern().is_match(line)
}

/// Type-specific problem with an applicant's answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter valid street name and number.")]
    StreetRequired,
    #[error("Please enter city.")]
    CityRequired,
    #[error("Please enter state.")]
    StateRequired,
    #[error("Please enter valid ZIP code.")]
    ZipRequired,
    #[error("Please enter valid 5-digit ZIP code.")]
    InvalidZip,
    #[error("Please enter a valid address. We do not accept PO Boxes.")]
    PoBoxNotAllowed,
    #[error("Please enter your first name.")]
    FirstNameRequired,
    #[error("Please enter your last name.")]
    LastNameRequired,
    #[error("Please select at least {min} options.")]
    TooFewChoices { min: usize },
    #[error("Please select fewer than {max} options.")]
    TooManyChoices { max: usize },
    #[error("'{value}' is not one of the available options.")]
    UnknownOption { value: String },
    #[error("Must be at least {min}.")]
    NumberTooSmall { min: i64 },
    #[error("Must be at most {max}.")]
    NumberTooLarge { max: i64 },
    #[error("Must contain at least {min} characters.")]
    TextTooShort { min: usize },
    #[error("Must contain at most {max} characters.")]
    TextTooLong { max: usize },
    #[error("Please enter a value for each line.")]
    BlankEntityName,
    #[error("Please enter a unique value for each line.")]
    DuplicateEntityName,
}

/// A question bound to one applicant's answers at a concrete (contextualized) path.
#[derive(Debug, Clone)]
pub struct ApplicantQuestion {
    definition: QuestionDefinition,
    path: Path,
    answered: bool,
    answer_text: String,
    errors: Vec<ValidationError>,
    updated_at: Option<i64>,
    updated_in_program: Option<ProgramId>,
}

impl ApplicantQuestion {
    pub fn new(definition: QuestionDefinition, path: Path, data: &ApplicantData) -> Self {
        let answers = Answers {
            definition: &definition,
            path: &path,
            data,
        };
        let answered = answers.is_answered();
        let answer_text = if answered {
            answers.answer_text()
        } else {
            "-".to_string()
        };
        let errors = if answered {
            answers.errors()
        } else {
            Vec::new()
        };
        let metadata_path = answers.metadata_path();
        let updated_at = data.read_long(&metadata_path.join(Scalar::UpdatedAt.key()));
        let updated_in_program = data
            .read_long(&metadata_path.join(Scalar::UpdatedInProgram.key()))
            .and_then(|id| u64::try_from(id).ok())
            .map(ProgramId);

        Self {
            definition,
            path,
            answered,
            answer_text,
            errors,
            updated_at,
            updated_in_program,
        }
    }

    pub fn definition(&self) -> &QuestionDefinition {
        &self.definition
    }

    /// Contextualized path of the question itself; scalars live beneath it.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn updated_at(&self) -> Option<i64> {
        self.updated_at
    }

    pub fn updated_in_program(&self) -> Option<ProgramId> {
        self.updated_in_program
    }

    /// Writable scalar paths and their storage types. Enumerator questions expose none; their
    /// entities are written through the enumerator branch of staging.
    pub fn scalar_paths(&self) -> Vec<(Path, ScalarType)> {
        if self.definition.is_enumerator() {
            return Vec::new();
        }
        self.definition
            .scalars()
            .into_iter()
            .map(|(scalar, scalar_type)| (self.path.join(scalar.key()), scalar_type))
            .collect()
    }
}

struct Answers<'a> {
    definition: &'a QuestionDefinition,
    path: &'a Path,
    data: &'a ApplicantData,
}

impl Answers<'_> {
    fn string(&self, scalar: Scalar) -> Option<String> {
        self.data
            .read_string(&self.path.join(scalar.key()))
            .filter(|value| !value.trim().is_empty())
    }

    fn selections(&self) -> Vec<String> {
        self.data
            .read_string_list(&self.path.join(Scalar::Selection.key()))
            .unwrap_or_default()
    }

    // Entity questions keep metadata inside each entity rather than beside the array.
    fn metadata_path(&self) -> Path {
        if self.definition.is_enumerator() {
            self.path.without_array_reference()
        } else {
            self.path.clone()
        }
    }

    fn is_answered(&self) -> bool {
        if self.definition.is_enumerator() {
            return self.data.has_path(&self.path.without_array_reference());
        }
        self.definition
            .scalars()
            .into_iter()
            .any(|(scalar, scalar_type)| match scalar_type {
                ScalarType::ListOfStrings => !self.selections().is_empty(),
                ScalarType::Long => self.data.read_long(&self.path.join(scalar.key())).is_some(),
                ScalarType::String | ScalarType::Date => self.string(scalar).is_some(),
            })
    }

    fn option_text(&self, admin_name: &str) -> String {
        self.definition
            .question_type
            .options()
            .iter()
            .find(|option| option.admin_name == admin_name)
            .and_then(|option| option.text.get_or_default(DEFAULT_LOCALE))
            .unwrap_or(admin_name)
            .to_string()
    }

    fn answer_text(&self) -> String {
        match &self.definition.question_type {
            QuestionType::Address { .. } => {
                let locality = [
                    self.string(Scalar::City),
                    self.string(Scalar::State),
                    self.string(Scalar::Zip),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
                [self.string(Scalar::Street), self.string(Scalar::Line2)]
                    .into_iter()
                    .flatten()
                    .chain((!locality.is_empty()).then_some(locality))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            QuestionType::Checkbox { .. } => self
                .selections()
                .iter()
                .map(|selection| self.option_text(selection))
                .collect::<Vec<_>>()
                .join(", "),
            QuestionType::Dropdown { .. } | QuestionType::RadioButton { .. } => self
                .string(Scalar::Selection)
                .map(|selection| self.option_text(&selection))
                .unwrap_or_default(),
            QuestionType::Enumerator { .. } => self.data.entity_names(self.path).join(", "),
            QuestionType::Name => [
                self.string(Scalar::FirstName),
                self.string(Scalar::MiddleName),
                self.string(Scalar::LastName),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
            QuestionType::Number { .. } => self
                .data
                .read_long(&self.path.join(Scalar::Number.key()))
                .map(|number| number.to_string())
                .unwrap_or_default(),
            QuestionType::Date => self.string(Scalar::Date).unwrap_or_default(),
            QuestionType::Email => self.string(Scalar::Email).unwrap_or_default(),
            QuestionType::FileUpload => self.string(Scalar::FileKey).unwrap_or_default(),
            QuestionType::Text { .. } => self.string(Scalar::Text).unwrap_or_default(),
        }
    }

    fn errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        match &self.definition.question_type {
            QuestionType::Address { disallow_po_box } => {
                let street = self.string(Scalar::Street);
                if street.is_none() {
                    errors.push(ValidationError::StreetRequired);
                }
                if self.string(Scalar::City).is_none() {
                    errors.push(ValidationError::CityRequired);
                }
                if self.string(Scalar::State).is_none() {
                    errors.push(ValidationError::StateRequired);
                }
                match self.string(Scalar::Zip) {
                    None => errors.push(ValidationError::ZipRequired),
                    Some(zip) if !is_valid_zip(zip.trim()) => {
                        errors.push(ValidationError::InvalidZip)
                    }
                    Some(_) => {}
                }
                if *disallow_po_box {
                    let lines = [street, self.string(Scalar::Line2)];
                    if lines.iter().flatten().any(|line| looks_like_po_box(line)) {
                        errors.push(ValidationError::PoBoxNotAllowed);
                    }
                }
            }
            QuestionType::Checkbox {
                min_choices,
                max_choices,
                ..
            } => {
                let selections = self.selections();
                if let Some(min) = min_choices.filter(|min| selections.len() < *min) {
                    errors.push(ValidationError::TooFewChoices { min });
                }
                if let Some(max) = max_choices.filter(|max| selections.len() > *max) {
                    errors.push(ValidationError::TooManyChoices { max });
                }
                errors.extend(self.unknown_options(selections));
            }
            QuestionType::Dropdown { .. } | QuestionType::RadioButton { .. } => {
                errors.extend(self.unknown_options(self.string(Scalar::Selection)));
            }
            QuestionType::Enumerator { .. } => {
                let names = self.data.entity_names(self.path);
                if names.iter().any(|name| name.trim().is_empty()) {
                    errors.push(ValidationError::BlankEntityName);
                }
                let unique: BTreeSet<&str> = names.iter().map(|name| name.trim()).collect();
                if unique.len() != names.len() {
                    errors.push(ValidationError::DuplicateEntityName);
                }
            }
            QuestionType::Name => {
                if self.string(Scalar::FirstName).is_none() {
                    errors.push(ValidationError::FirstNameRequired);
                }
                if self.string(Scalar::LastName).is_none() {
                    errors.push(ValidationError::LastNameRequired);
                }
            }
            QuestionType::Number { min, max } => {
                if let Some(number) = self.data.read_long(&self.path.join(Scalar::Number.key())) {
                    if let Some(min) = min.filter(|min| number < *min) {
                        errors.push(ValidationError::NumberTooSmall { min });
                    }
                    if let Some(max) = max.filter(|max| number > *max) {
                        errors.push(ValidationError::NumberTooLarge { max });
                    }
                }
            }
            QuestionType::Text {
                min_length,
                max_length,
            } => {
                let length = self
                    .string(Scalar::Text)
                    .map(|text| text.chars().count())
                    .unwrap_or(0);
                if let Some(min) = min_length.filter(|min| length < *min) {
                    errors.push(ValidationError::TextTooShort { min });
                }
                if let Some(max) = max_length.filter(|max| length > *max) {
                    errors.push(ValidationError::TextTooLong { max });
                }
            }
            QuestionType::Date | QuestionType::Email | QuestionType::FileUpload => {}
        }
        errors
    }

    fn unknown_options(
        &self,
        selections: impl IntoIterator<Item = String>,
    ) -> Vec<ValidationError> {
        let options = self.definition.question_type.options();
        selections
            .into_iter()
            .filter(|selection| !options.iter().any(|option| &option.admin_name == selection))
            .map(|value| ValidationError::UnknownOption { value })
            .collect()
    }
}
