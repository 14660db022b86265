use std::collections::BTreeMap;

use serde::Serialize;

use super::block::{Block, RepeatedEntity};
use super::data::ApplicantData;
use crate::definitions::{
    BlockDefinition, BlockDefinitionId, ProgramDefinition, ProgramId, QuestionId,
};
use crate::predicate::{PredicateDefinition, PredicateError, PredicateEvaluator, ScopedQuestion};

/// Summary row for one answered or unanswered question of an active block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerData {
    pub program_id: ProgramId,
    pub block_id: String,
    pub question_id: QuestionId,
    pub question_index: usize,
    pub question_text: String,
    pub answer_text: String,
    pub is_answered: bool,
    pub has_errors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_in_program: Option<ProgramId>,
    /// Answered while applying to a different program.
    pub is_previous_response: bool,
}

#[derive(Debug, Clone)]
struct RenderedBlock {
    block: Block,
    visible: bool,
    optional: bool,
}

/// One applicant's progress through one program: every rendered block, which of them are
/// currently shown, and what each question's answer looks like.
///
/// Built eagerly, so predicate errors surface at construction rather than on first read.
#[derive(Debug, Clone)]
pub struct ReadOnlyApplicantProgram {
    program: ProgramDefinition,
    data: ApplicantData,
    blocks: Vec<RenderedBlock>,
}

impl ReadOnlyApplicantProgram {
    pub fn new(program: ProgramDefinition, data: ApplicantData) -> Result<Self, PredicateError> {
        let mut rendered = Vec::new();
        for definition in program
            .block_definitions
            .iter()
            .filter(|definition| !definition.is_repeated())
        {
            render(&program, &data, definition, None, &mut rendered);
        }

        let blocks = rendered
            .into_iter()
            .map(|block| evaluate_block(&program, &data, block))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            program,
            data,
            blocks,
        })
    }

    pub fn program(&self) -> &ProgramDefinition {
        &self.program
    }

    pub fn data(&self) -> &ApplicantData {
        &self.data
    }

    pub fn into_data(self) -> ApplicantData {
        self.data
    }

    pub fn program_title(&self, locale: &str) -> &str {
        self.program
            .localized_name
            .get_or_default(locale)
            .unwrap_or(&self.program.admin_name)
    }

    /// Looks a block up among all rendered blocks, shown or hidden.
    pub fn get_block(&self, block_id: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .map(|rendered| &rendered.block)
            .find(|block| block.id() == block_id)
    }

    pub fn get_all_blocks(&self) -> Vec<&Block> {
        self.blocks.iter().map(|rendered| &rendered.block).collect()
    }

    /// Blocks whose visibility predicate currently shows them, in display order.
    pub fn get_all_active_blocks(&self) -> Vec<&Block> {
        self.blocks
            .iter()
            .filter(|rendered| rendered.visible)
            .map(|rendered| &rendered.block)
            .collect()
    }

    pub fn is_block_optional(&self, block_id: &str) -> bool {
        self.blocks
            .iter()
            .any(|rendered| rendered.block.id() == block_id && rendered.optional)
    }

    /// First shown block that still needs answers. Optional blocks never count.
    pub fn get_first_incomplete_block(&self) -> Option<&Block> {
        self.blocks
            .iter()
            .filter(|rendered| rendered.visible && !rendered.optional)
            .map(|rendered| &rendered.block)
            .find(|block| !block.is_complete())
    }

    pub fn get_block_after(&self, block_id: &str) -> Option<&Block> {
        let active = self.get_all_active_blocks();
        let position = active.iter().position(|block| block.id() == block_id)?;
        active.get(position + 1).copied()
    }

    pub fn get_summary_data(&self) -> Vec<AnswerData> {
        self.get_all_active_blocks()
            .into_iter()
            .flat_map(|block| {
                block
                    .questions()
                    .iter()
                    .enumerate()
                    .map(move |(question_index, question)| AnswerData {
                        program_id: self.program.id,
                        block_id: block.id().to_string(),
                        question_id: question.definition().id,
                        question_index,
                        question_text: question
                            .definition()
                            .question_text
                            .default_text()
                            .to_string(),
                        answer_text: question.answer_text().to_string(),
                        is_answered: question.is_answered(),
                        has_errors: question.has_errors(),
                        updated_at: question.updated_at(),
                        updated_in_program: question.updated_in_program(),
                        is_previous_response: question
                            .updated_in_program()
                            .map(|program_id| program_id != self.program.id)
                            .unwrap_or(false),
                    })
            })
            .collect()
    }

    /// Share of required, shown blocks that are complete, 0–100.
    pub fn completion_percentage(&self) -> u8 {
        let required: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|rendered| rendered.visible && !rendered.optional)
            .map(|rendered| &rendered.block)
            .collect();
        if required.is_empty() {
            return 100;
        }
        let complete = required.iter().filter(|block| block.is_complete()).count();
        ((complete * 100) / required.len()) as u8
    }
}

// Depth-first so repeated blocks follow the enumerator block they expand.
fn render(
    program: &ProgramDefinition,
    data: &ApplicantData,
    definition: &BlockDefinition,
    entity: Option<RepeatedEntity>,
    out: &mut Vec<Block>,
) {
    let block = Block::new(definition.clone(), entity.clone(), data);
    let enumerator = block
        .enumerator_question()
        .map(|question| (question.definition().clone(), question.path().clone()));
    out.push(block);

    let Some((enumerator_question, enumerator_path)) = enumerator else {
        return;
    };
    let children: Vec<&BlockDefinition> = program
        .block_definitions
        .iter()
        .filter(|candidate| candidate.enumerator_id == Some(definition.id))
        .collect();
    if children.is_empty() {
        return;
    }

    for (index, entity_name) in data.entity_names(&enumerator_path).into_iter().enumerate() {
        let repeated = RepeatedEntity::new(
            enumerator_question.clone(),
            index,
            entity_name,
            entity.clone(),
        );
        for child in &children {
            render(program, data, child, Some(repeated.clone()), out);
        }
    }
}

fn evaluate_block(
    program: &ProgramDefinition,
    data: &ApplicantData,
    block: Block,
) -> Result<RenderedBlock, PredicateError> {
    let definition = block.definition();
    if definition.visibility_predicate.is_none() && definition.optional_predicate.is_none() {
        return Ok(RenderedBlock {
            block,
            visible: true,
            optional: false,
        });
    }

    let scope = predicate_scope(program, definition.id, &block.entity_indices());
    let evaluator = PredicateEvaluator::new(data, &scope);
    let check = |predicate: &Option<PredicateDefinition>| -> Result<Option<bool>, PredicateError> {
        predicate
            .as_ref()
            .map(|predicate| {
                evaluator
                    .evaluate(&predicate.root_node)
                    .map(|condition| predicate.is_block_visible(condition))
            })
            .transpose()
    };

    let visible = check(&definition.visibility_predicate)?.unwrap_or(true);
    let optional = check(&definition.optional_predicate)?.unwrap_or(false);
    Ok(RenderedBlock {
        block,
        visible,
        optional,
    })
}

fn predicate_scope(
    program: &ProgramDefinition,
    block_id: BlockDefinitionId,
    indices: &[usize],
) -> BTreeMap<QuestionId, ScopedQuestion> {
    program
        .available_predicate_questions(block_id)
        .unwrap_or_default()
        .into_iter()
        .map(|question| {
            (
                question.id,
                ScopedQuestion {
                    definition: question.clone(),
                    path: question.path.contextualize(indices),
                },
            )
        })
        .collect()
}
