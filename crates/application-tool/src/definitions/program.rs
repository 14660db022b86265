use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::localized::LocalizedStrings;
use super::question::{QuestionDefinition, QuestionId};
use crate::predicate::PredicateDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub u64);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block id, unique within its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockDefinitionId(pub u64);

impl fmt::Display for BlockDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A question as placed in a block, carrying the cached definition it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramQuestionDefinition {
    pub question: QuestionDefinition,
}

impl ProgramQuestionDefinition {
    pub fn new(question: QuestionDefinition) -> Self {
        Self { question }
    }

    pub fn id(&self) -> QuestionId {
        self.question.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: BlockDefinitionId,
    pub name: String,
    pub description: String,
    pub program_question_definitions: Vec<ProgramQuestionDefinition>,
    /// Enumerator block this block repeats under.
    #[serde(default)]
    pub enumerator_id: Option<BlockDefinitionId>,
    #[serde(default)]
    pub visibility_predicate: Option<PredicateDefinition>,
    #[serde(default)]
    pub optional_predicate: Option<PredicateDefinition>,
}

impl BlockDefinition {
    pub fn is_repeated(&self) -> bool {
        self.enumerator_id.is_some()
    }

    /// An enumerator block holds exactly one question, and it is an enumerator question.
    pub fn is_enumerator(&self) -> bool {
        self.enumerator_question().is_some()
    }

    pub fn enumerator_question(&self) -> Option<&QuestionDefinition> {
        match self.program_question_definitions.as_slice() {
            [only] if only.question.is_enumerator() => Some(&only.question),
            _ => None,
        }
    }

    pub fn questions(&self) -> impl Iterator<Item = &QuestionDefinition> {
        self.program_question_definitions
            .iter()
            .map(|pqd| &pqd.question)
    }

    pub fn has_question(&self, question_id: QuestionId) -> bool {
        self.questions().any(|question| question.id == question_id)
    }

    pub fn predicate_question_ids(&self) -> BTreeSet<QuestionId> {
        self.visibility_predicate
            .iter()
            .chain(self.optional_predicate.iter())
            .flat_map(PredicateDefinition::question_ids)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("block {block_id} not found in program {program_id}")]
    BlockNotFound {
        program_id: ProgramId,
        block_id: BlockDefinitionId,
    },
    #[error("This move is not possible - it would move a block condition before the question it depends on")]
    IllegalBlockMove,
    #[error("block {block_id} has a condition on question {question_id}, which is not answered in an earlier block")]
    InvalidPredicateOrdering {
        block_id: BlockDefinitionId,
        question_id: QuestionId,
    },
    #[error("block {block_id} does not repeat under an earlier enumerator block")]
    BrokenEnumeratorChain { block_id: BlockDefinitionId },
    #[error("question {question_id} in block {block_id} does not repeat under the block's enumerator")]
    RepeatedQuestionMismatch {
        block_id: BlockDefinitionId,
        question_id: QuestionId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDefinition {
    pub id: ProgramId,
    pub admin_name: String,
    pub admin_description: String,
    pub localized_name: LocalizedStrings,
    pub localized_description: LocalizedStrings,
    #[serde(default)]
    pub external_link: String,
    pub block_definitions: Vec<BlockDefinition>,
}

impl ProgramDefinition {
    pub fn block_definition(
        &self,
        block_id: BlockDefinitionId,
    ) -> Result<&BlockDefinition, ProgramError> {
        self.block_definitions
            .iter()
            .find(|block| block.id == block_id)
            .ok_or(ProgramError::BlockNotFound {
                program_id: self.id,
                block_id,
            })
    }

    pub fn block_definition_by_index(&self, index: usize) -> Option<&BlockDefinition> {
        self.block_definitions.get(index)
    }

    pub fn has_question(&self, question_id: QuestionId) -> bool {
        self.block_definitions
            .iter()
            .any(|block| block.has_question(question_id))
    }

    /// Question ids placed in blocks plus those referenced by block predicates.
    pub fn referenced_question_ids(&self) -> BTreeSet<QuestionId> {
        self.block_definitions
            .iter()
            .flat_map(|block| {
                block
                    .questions()
                    .map(|question| question.id)
                    .chain(block.predicate_question_ids())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn next_block_id(&self) -> BlockDefinitionId {
        let max = self
            .block_definitions
            .iter()
            .map(|block| block.id.0)
            .max()
            .unwrap_or(0);
        BlockDefinitionId(max + 1)
    }

    /// Enumerator block ids this block repeats under, nearest first.
    pub fn enumerator_ancestry(
        &self,
        block_id: BlockDefinitionId,
    ) -> Result<Vec<BlockDefinitionId>, ProgramError> {
        let mut ancestry = Vec::new();
        let mut current = self.block_definition(block_id)?;
        while let Some(parent_id) = current.enumerator_id {
            if ancestry.contains(&parent_id) || parent_id == block_id {
                return Err(ProgramError::BrokenEnumeratorChain { block_id });
            }
            let parent = self
                .block_definition(parent_id)
                .map_err(|_| ProgramError::BrokenEnumeratorChain { block_id })?;
            if !parent.is_enumerator() {
                return Err(ProgramError::BrokenEnumeratorChain { block_id });
            }
            ancestry.push(parent_id);
            current = parent;
        }
        Ok(ancestry)
    }

    /// Questions a predicate on `block_id` may reference: those in earlier blocks that are
    /// either not repeated or repeat under one of this block's enumerator ancestors.
    /// Enumerator questions are never predicate targets.
    pub fn available_predicate_questions(
        &self,
        block_id: BlockDefinitionId,
    ) -> Result<Vec<&QuestionDefinition>, ProgramError> {
        let ancestry = self.enumerator_ancestry(block_id)?;
        let mut available = Vec::new();
        for block in &self.block_definitions {
            if block.id == block_id {
                break;
            }
            if block.is_enumerator() {
                continue;
            }
            let in_scope = match block.enumerator_id {
                None => true,
                Some(enumerator_id) => ancestry.contains(&enumerator_id),
            };
            if in_scope {
                available.extend(block.questions());
            }
        }
        Ok(available)
    }

    pub fn has_valid_predicate_ordering(&self) -> bool {
        self.check_predicate_ordering().is_ok()
    }

    pub fn check_predicate_ordering(&self) -> Result<(), ProgramError> {
        for block in &self.block_definitions {
            let referenced = block.predicate_question_ids();
            if referenced.is_empty() {
                continue;
            }
            let available: BTreeSet<QuestionId> = self
                .available_predicate_questions(block.id)?
                .into_iter()
                .map(|question| question.id)
                .collect();
            if let Some(question_id) = referenced.difference(&available).next() {
                return Err(ProgramError::InvalidPredicateOrdering {
                    block_id: block.id,
                    question_id: *question_id,
                });
            }
        }
        Ok(())
    }

    /// Repeated blocks must sit under an earlier enumerator block, and their questions must
    /// repeat under that block's enumerator question.
    pub fn validate_block_structure(&self) -> Result<(), ProgramError> {
        for (position, block) in self.block_definitions.iter().enumerate() {
            let Some(enumerator_id) = block.enumerator_id else {
                continue;
            };
            self.enumerator_ancestry(block.id)?;
            let enumerator_position = self
                .block_definitions
                .iter()
                .position(|candidate| candidate.id == enumerator_id);
            let enumerator_question_id = match enumerator_position {
                Some(index) if index < position => self.block_definitions[index]
                    .enumerator_question()
                    .map(|question| question.id),
                _ => None,
            }
            .ok_or(ProgramError::BrokenEnumeratorChain { block_id: block.id })?;

            if let Some(question) = block
                .questions()
                .find(|question| question.enumerator_id != Some(enumerator_question_id))
            {
                return Err(ProgramError::RepeatedQuestionMismatch {
                    block_id: block.id,
                    question_id: question.id,
                });
            }
        }
        Ok(())
    }

    /// Replaces a block's visibility predicate, rejecting conditions on later questions.
    pub fn set_block_predicate(
        &self,
        block_id: BlockDefinitionId,
        predicate: Option<PredicateDefinition>,
    ) -> Result<ProgramDefinition, ProgramError> {
        self.replace_block(block_id, |block| block.visibility_predicate = predicate)
    }

    pub fn set_block_optional_predicate(
        &self,
        block_id: BlockDefinitionId,
        predicate: Option<PredicateDefinition>,
    ) -> Result<ProgramDefinition, ProgramError> {
        self.replace_block(block_id, |block| block.optional_predicate = predicate)
    }

    fn replace_block(
        &self,
        block_id: BlockDefinitionId,
        edit: impl FnOnce(&mut BlockDefinition),
    ) -> Result<ProgramDefinition, ProgramError> {
        self.block_definition(block_id)?;
        let mut updated = self.clone();
        if let Some(block) = updated
            .block_definitions
            .iter_mut()
            .find(|block| block.id == block_id)
        {
            edit(block);
        }
        updated.check_predicate_ordering()?;
        Ok(updated)
    }

    /// Moves a block, together with every block repeating under it, past its neighbouring
    /// sibling. Moving past either end is a no-op.
    pub fn move_block(
        &self,
        block_id: BlockDefinitionId,
        direction: Direction,
    ) -> Result<ProgramDefinition, ProgramError> {
        let ordered = self.order_block_definitions();
        let block = ordered.block_definition(block_id)?;

        let siblings: Vec<BlockDefinitionId> = ordered
            .block_definitions
            .iter()
            .filter(|candidate| candidate.enumerator_id == block.enumerator_id)
            .map(|candidate| candidate.id)
            .collect();
        let Some(position) = siblings.iter().position(|id| *id == block_id) else {
            return Ok(ordered);
        };
        let neighbour = match direction {
            Direction::Up => position.checked_sub(1).map(|index| siblings[index]),
            Direction::Down => siblings.get(position + 1).copied(),
        };
        let Some(neighbour) = neighbour else {
            return Ok(ordered);
        };

        let moving = ordered.group_range(block_id);
        let other = ordered.group_range(neighbour);
        let (first, second) = match direction {
            Direction::Up => (other, moving),
            Direction::Down => (moving, other),
        };

        let blocks = &ordered.block_definitions;
        let mut reordered = Vec::with_capacity(blocks.len());
        reordered.extend_from_slice(&blocks[..first.start]);
        reordered.extend_from_slice(&blocks[second.clone()]);
        reordered.extend_from_slice(&blocks[first.clone()]);
        reordered.extend_from_slice(&blocks[second.end..]);

        let moved = ProgramDefinition {
            block_definitions: reordered,
            ..ordered.clone()
        };
        if !moved.has_valid_predicate_ordering() {
            return Err(ProgramError::IllegalBlockMove);
        }
        Ok(moved)
    }

    /// Inserts a block at the end of the program, or, for a repeated block, right after the
    /// last block repeating under its enumerator.
    pub fn insert_block_in_the_right_place(
        &self,
        block: BlockDefinition,
    ) -> Result<ProgramDefinition, ProgramError> {
        let mut updated = self.order_block_definitions();
        let insert_at = match block.enumerator_id {
            None => updated.block_definitions.len(),
            Some(enumerator_id) => {
                updated.block_definition(enumerator_id)?;
                updated.group_range(enumerator_id).end
            }
        };
        updated.block_definitions.insert(insert_at, block);
        Ok(updated)
    }

    /// True when every repeated block directly follows its enumerator's group.
    pub fn has_ordered_block_definitions(&self) -> bool {
        self.order_block_definitions().block_definitions == self.block_definitions
    }

    /// Top-level blocks in their current order, each followed depth-first by the blocks
    /// repeating under it. Blocks whose enumerator is missing are kept at the end.
    pub fn order_block_definitions(&self) -> ProgramDefinition {
        let mut children: BTreeMap<BlockDefinitionId, Vec<&BlockDefinition>> = BTreeMap::new();
        let known: BTreeSet<BlockDefinitionId> =
            self.block_definitions.iter().map(|block| block.id).collect();
        let mut roots = Vec::new();
        let mut orphans = Vec::new();
        for block in &self.block_definitions {
            match block.enumerator_id {
                None => roots.push(block),
                Some(parent) if known.contains(&parent) => {
                    children.entry(parent).or_default().push(block)
                }
                Some(_) => orphans.push(block),
            }
        }

        fn visit(
            block: &BlockDefinition,
            children: &BTreeMap<BlockDefinitionId, Vec<&BlockDefinition>>,
            out: &mut Vec<BlockDefinition>,
        ) {
            if out.iter().any(|existing| existing.id == block.id) {
                return;
            }
            out.push(block.clone());
            for child in children.get(&block.id).into_iter().flatten() {
                visit(child, children, out);
            }
        }

        let mut ordered = Vec::with_capacity(self.block_definitions.len());
        for root in roots {
            visit(root, &children, &mut ordered);
        }
        for orphan in orphans {
            visit(orphan, &children, &mut ordered);
        }

        ProgramDefinition {
            block_definitions: ordered,
            ..self.clone()
        }
    }

    /// Locales every user-visible string of the program is translated into.
    pub fn supported_locales(&self) -> BTreeSet<String> {
        let mut supported: BTreeSet<String> =
            self.localized_name.locales().map(str::to_string).collect();
        for question in self.block_definitions.iter().flat_map(BlockDefinition::questions) {
            let locales: BTreeSet<String> =
                question.question_text.locales().map(str::to_string).collect();
            supported = supported.intersection(&locales).cloned().collect();
        }
        supported
    }

    // Index range of a block plus the contiguous run of its descendants, assuming ordered blocks.
    fn group_range(&self, block_id: BlockDefinitionId) -> std::ops::Range<usize> {
        let start = self
            .block_definitions
            .iter()
            .position(|block| block.id == block_id)
            .unwrap_or(self.block_definitions.len());
        let mut end = start + 1;
        while end < self.block_definitions.len()
            && self.descends_from(&self.block_definitions[end], block_id)
        {
            end += 1;
        }
        end = end.min(self.block_definitions.len());
        start..end
    }

    fn descends_from(&self, block: &BlockDefinition, ancestor: BlockDefinitionId) -> bool {
        let mut seen = BTreeSet::new();
        let mut parent = block.enumerator_id;
        while let Some(id) = parent {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            parent = self
                .block_definitions
                .iter()
                .find(|candidate| candidate.id == id)
                .and_then(|candidate| candidate.enumerator_id);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{Path, QuestionType, Scalar};
    use crate::predicate::{
        Operator, PredicateAction, PredicateExpressionNode, PredicateValue,
    };

    fn question(
        id: u64,
        path: &str,
        enumerator_id: Option<u64>,
        question_type: QuestionType,
    ) -> QuestionDefinition {
        QuestionDefinition {
            id: QuestionId(id),
            name: format!("q{id}"),
            path: Path::parse(path).expect("valid path"),
            description: "test".to_string(),
            question_text: LocalizedStrings::with_default("?"),
            help_text: LocalizedStrings::empty(),
            enumerator_id: enumerator_id.map(QuestionId),
            question_type,
        }
    }

    fn text(id: u64, path: &str, enumerator_id: Option<u64>) -> QuestionDefinition {
        question(
            id,
            path,
            enumerator_id,
            QuestionType::Text {
                min_length: None,
                max_length: None,
            },
        )
    }

    fn enumerator(id: u64, path: &str, enumerator_id: Option<u64>) -> QuestionDefinition {
        question(
            id,
            path,
            enumerator_id,
            QuestionType::Enumerator {
                entity_type: LocalizedStrings::with_default("member"),
            },
        )
    }

    fn block(
        id: u64,
        enumerator_id: Option<u64>,
        questions: Vec<QuestionDefinition>,
    ) -> BlockDefinition {
        BlockDefinition {
            id: BlockDefinitionId(id),
            name: format!("block {id}"),
            description: String::new(),
            program_question_definitions: questions
                .into_iter()
                .map(ProgramQuestionDefinition::new)
                .collect(),
            enumerator_id: enumerator_id.map(BlockDefinitionId),
            visibility_predicate: None,
            optional_predicate: None,
        }
    }

    fn show_if(question_id: u64) -> PredicateDefinition {
        PredicateDefinition::new(
            PredicateExpressionNode::leaf(
                QuestionId(question_id),
                Scalar::Text,
                Operator::EqualTo,
                PredicateValue::String("yes".to_string()),
            ),
            PredicateAction::ShowBlock,
        )
    }

    fn program(blocks: Vec<BlockDefinition>) -> ProgramDefinition {
        ProgramDefinition {
            id: ProgramId(1),
            admin_name: "benefits".to_string(),
            admin_description: String::new(),
            localized_name: LocalizedStrings::with_default("Benefits"),
            localized_description: LocalizedStrings::with_default("Benefits program"),
            external_link: String::new(),
            block_definitions: blocks,
        }
    }

    // 1: top-level text, 2: household enumerator, 3: repeated under 2, 4: jobs enumerator
    // under 2, 5: repeated under 4, 6: top-level text.
    fn nested_program() -> ProgramDefinition {
        program(vec![
            block(1, None, vec![text(1, "applicant.color", None)]),
            block(2, None, vec![enumerator(2, "applicant.members[]", None)]),
            block(3, Some(2), vec![text(3, "applicant.members[].nickname", Some(2))]),
            block(4, Some(2), vec![enumerator(4, "applicant.members[].jobs[]", Some(2))]),
            block(5, Some(4), vec![text(5, "applicant.members[].jobs[].income", Some(4))]),
            block(6, None, vec![text(6, "applicant.notes", None)]),
        ])
    }

    fn ids(program: &ProgramDefinition) -> Vec<u64> {
        program.block_definitions.iter().map(|block| block.id.0).collect()
    }

    #[test]
    fn structural_queries() {
        let program = nested_program();
        assert!(program.has_question(QuestionId(5)));
        assert!(!program.has_question(QuestionId(42)));
        assert_eq!(
            program.block_definition_by_index(1).map(|block| block.id),
            Some(BlockDefinitionId(2))
        );
        assert!(matches!(
            program.block_definition(BlockDefinitionId(9)),
            Err(ProgramError::BlockNotFound { .. })
        ));
        assert!(program.block_definitions[1].is_enumerator());
        assert!(!program.block_definitions[2].is_enumerator());
        assert_eq!(program.next_block_id(), BlockDefinitionId(7));
        assert!(program.validate_block_structure().is_ok());
    }

    #[test]
    fn enumerator_ancestry_is_nearest_first() {
        let program = nested_program();
        assert_eq!(
            program.enumerator_ancestry(BlockDefinitionId(5)),
            Ok(vec![BlockDefinitionId(4), BlockDefinitionId(2)])
        );
        assert_eq!(program.enumerator_ancestry(BlockDefinitionId(1)), Ok(vec![]));
    }

    #[test]
    fn available_predicate_questions_follow_repeated_scope() {
        let program = nested_program();
        let available = |block: u64| -> Vec<u64> {
            program
                .available_predicate_questions(BlockDefinitionId(block))
                .expect("block exists")
                .into_iter()
                .map(|question| question.id.0)
                .collect()
        };

        assert_eq!(available(1), Vec::<u64>::new());
        assert_eq!(available(3), vec![1]);
        assert_eq!(available(5), vec![1, 3]);
        // Block 6 is top level, so questions repeated under block 2 are out of scope.
        assert_eq!(available(6), vec![1]);
    }

    #[test]
    fn predicate_on_own_or_later_block_is_invalid() {
        let program = nested_program();
        assert!(program.has_valid_predicate_ordering());

        assert!(program
            .set_block_predicate(BlockDefinitionId(6), Some(show_if(1)))
            .is_ok());
        assert_eq!(
            program.set_block_predicate(BlockDefinitionId(1), Some(show_if(1))),
            Err(ProgramError::InvalidPredicateOrdering {
                block_id: BlockDefinitionId(1),
                question_id: QuestionId(1),
            })
        );
        assert!(program
            .set_block_optional_predicate(BlockDefinitionId(3), Some(show_if(6)))
            .is_err());
    }

    #[test]
    fn moving_a_block_carries_its_repeated_children() {
        let program = nested_program();

        let moved = program
            .move_block(BlockDefinitionId(6), Direction::Up)
            .expect("legal move");
        assert_eq!(ids(&moved), vec![1, 6, 2, 3, 4, 5]);

        let moved = program
            .move_block(BlockDefinitionId(2), Direction::Up)
            .expect("legal move");
        assert_eq!(ids(&moved), vec![2, 3, 4, 5, 1, 6]);

        let moved = program
            .move_block(BlockDefinitionId(3), Direction::Down)
            .expect("legal move");
        assert_eq!(ids(&moved), vec![1, 2, 4, 5, 3, 6]);
        assert!(moved.has_ordered_block_definitions());
    }

    #[test]
    fn moving_past_the_edge_is_a_no_op() {
        let program = nested_program();
        let moved = program
            .move_block(BlockDefinitionId(1), Direction::Up)
            .expect("no-op");
        assert_eq!(ids(&moved), ids(&program));
        let moved = program
            .move_block(BlockDefinitionId(5), Direction::Down)
            .expect("no-op");
        assert_eq!(ids(&moved), ids(&program));
    }

    #[test]
    fn moving_a_condition_above_its_question_is_rejected() {
        let program = nested_program()
            .set_block_predicate(BlockDefinitionId(2), Some(show_if(1)))
            .expect("valid predicate");

        let error = program
            .move_block(BlockDefinitionId(2), Direction::Up)
            .expect_err("illegal move");
        assert_eq!(error, ProgramError::IllegalBlockMove);
        assert_eq!(
            error.to_string(),
            "This move is not possible - it would move a block condition before the question it depends on"
        );
    }

    #[test]
    fn repeated_blocks_are_inserted_after_their_enumerator_group() {
        let program = nested_program();
        let inserted = program
            .insert_block_in_the_right_place(block(
                7,
                Some(2),
                vec![text(7, "applicant.members[].age", Some(2))],
            ))
            .expect("enumerator exists");
        assert_eq!(ids(&inserted), vec![1, 2, 3, 4, 5, 7, 6]);

        let appended = program
            .insert_block_in_the_right_place(block(8, None, vec![text(8, "applicant.x", None)]))
            .expect("top-level insert");
        assert_eq!(ids(&appended), vec![1, 2, 3, 4, 5, 6, 8]);

        assert!(matches!(
            program.insert_block_in_the_right_place(block(9, Some(42), vec![])),
            Err(ProgramError::BlockNotFound { .. })
        ));
    }

    #[test]
    fn ordering_groups_repeated_blocks_under_their_enumerator() {
        let mut program = nested_program();
        let moved = program.block_definitions.remove(2);
        program.block_definitions.push(moved);
        assert!(!program.has_ordered_block_definitions());

        let ordered = program.order_block_definitions();
        assert_eq!(ids(&ordered), vec![1, 2, 4, 5, 3, 6]);
        assert!(ordered.has_ordered_block_definitions());
    }

    #[test]
    fn broken_enumerator_chains_are_reported() {
        let program = program(vec![
            block(1, None, vec![text(1, "applicant.color", None)]),
            block(2, Some(1), vec![text(2, "applicant.members[].x", Some(1))]),
        ]);
        assert_eq!(
            program.validate_block_structure(),
            Err(ProgramError::BrokenEnumeratorChain {
                block_id: BlockDefinitionId(2)
            })
        );

        let mismatch = program_with_mismatched_question();
        assert!(matches!(
            mismatch.validate_block_structure(),
            Err(ProgramError::RepeatedQuestionMismatch { .. })
        ));
    }

    fn program_with_mismatched_question() -> ProgramDefinition {
        program(vec![
            block(1, None, vec![enumerator(1, "applicant.members[]", None)]),
            block(2, Some(1), vec![text(2, "applicant.color", None)]),
        ])
    }
}
