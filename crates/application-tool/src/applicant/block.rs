use super::data::ApplicantData;
use super::question::ApplicantQuestion;
use crate::definitions::{BlockDefinition, Path, QuestionDefinition, ScalarType};

/// One repeated entity a block is rendered for, linked to the entity it is nested in.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedEntity {
    enumerator_question: QuestionDefinition,
    index: usize,
    entity_name: String,
    parent: Option<Box<RepeatedEntity>>,
}

impl RepeatedEntity {
    pub(crate) fn new(
        enumerator_question: QuestionDefinition,
        index: usize,
        entity_name: String,
        parent: Option<RepeatedEntity>,
    ) -> Self {
        Self {
            enumerator_question,
            index,
            entity_name,
            parent: parent.map(Box::new),
        }
    }

    pub fn enumerator_question(&self) -> &QuestionDefinition {
        &self.enumerator_question
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn parent(&self) -> Option<&RepeatedEntity> {
        self.parent.as_deref()
    }

    /// Entity indices from the outermost enumerator down to this entity.
    pub fn indices(&self) -> Vec<usize> {
        let mut indices = self
            .parent
            .as_ref()
            .map(|parent| parent.indices())
            .unwrap_or_default();
        indices.push(self.index);
        indices
    }
}

/// Where a writable scalar lives and which question it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarTarget {
    pub question_path: Path,
    pub scalar_type: ScalarType,
}

/// A block definition rendered for one applicant, possibly for one repeated entity.
#[derive(Debug, Clone)]
pub struct Block {
    id: String,
    definition: BlockDefinition,
    repeated_entity: Option<RepeatedEntity>,
    questions: Vec<ApplicantQuestion>,
}

impl Block {
    pub(crate) fn new(
        definition: BlockDefinition,
        repeated_entity: Option<RepeatedEntity>,
        data: &ApplicantData,
    ) -> Self {
        let indices = repeated_entity
            .as_ref()
            .map(RepeatedEntity::indices)
            .unwrap_or_default();
        let id = std::iter::once(definition.id.to_string())
            .chain(indices.iter().map(usize::to_string))
            .collect::<Vec<_>>()
            .join("-");
        let questions = definition
            .questions()
            .map(|question| {
                let path = question.path.contextualize(&indices);
                ApplicantQuestion::new(question.clone(), path, data)
            })
            .collect();

        Self {
            id,
            definition,
            repeated_entity,
            questions,
        }
    }

    /// `"<definition id>"`, or `"<definition id>-<i0>-<i1>…"` for repeated blocks.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &BlockDefinition {
        &self.definition
    }

    pub fn repeated_entity(&self) -> Option<&RepeatedEntity> {
        self.repeated_entity.as_ref()
    }

    pub fn entity_indices(&self) -> Vec<usize> {
        self.repeated_entity
            .as_ref()
            .map(RepeatedEntity::indices)
            .unwrap_or_default()
    }

    pub fn questions(&self) -> &[ApplicantQuestion] {
        &self.questions
    }

    pub fn is_enumerator(&self) -> bool {
        self.definition.is_enumerator()
    }

    pub fn enumerator_question(&self) -> Option<&ApplicantQuestion> {
        if self.is_enumerator() {
            self.questions.first()
        } else {
            None
        }
    }

    pub fn has_errors(&self) -> bool {
        self.questions.iter().any(ApplicantQuestion::has_errors)
    }

    pub fn is_answered(&self) -> bool {
        self.questions.iter().all(ApplicantQuestion::is_answered)
    }

    pub fn is_complete(&self) -> bool {
        self.is_answered() && !self.has_errors()
    }

    /// Resolves an update path to the scalar it writes. Element paths (`selection[2]`)
    /// resolve to the element type of the list they index.
    pub fn scalar_target(&self, path: &Path) -> Option<ScalarTarget> {
        let (lookup, element) = if path.is_array_element() {
            (path.without_array_reference(), true)
        } else {
            (path.clone(), false)
        };

        self.questions.iter().find_map(|question| {
            question
                .scalar_paths()
                .into_iter()
                .find(|(scalar_path, _)| *scalar_path == lookup)
                .and_then(|(_, scalar_type)| {
                    let scalar_type = if element {
                        scalar_type.element_type()?
                    } else {
                        scalar_type
                    };
                    Some(ScalarTarget {
                        question_path: question.path().clone(),
                        scalar_type,
                    })
                })
        })
    }
}
