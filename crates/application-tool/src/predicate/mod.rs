//! Block visibility predicates: the expression tree, its evaluator, and the pure rewrites the
//! version store relies on when question ids migrate between snapshots.

mod evaluator;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::definitions::{QuestionId, Scalar, ScalarType};

pub use evaluator::{PredicateEvaluator, ScopedQuestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateAction {
    ShowBlock,
    HideBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateDefinition {
    pub root_node: PredicateExpressionNode,
    pub action: PredicateAction,
}

impl PredicateDefinition {
    pub fn new(root_node: PredicateExpressionNode, action: PredicateAction) -> Self {
        Self { root_node, action }
    }

    pub fn question_ids(&self) -> BTreeSet<QuestionId> {
        collect_question_ids(&self.root_node)
    }

    pub fn rewrite(&self, mapping: &BTreeMap<QuestionId, QuestionId>) -> Self {
        Self {
            root_node: rewrite_leaves(&self.root_node, mapping),
            action: self.action,
        }
    }

    /// Maps the evaluated condition to block visibility according to the action.
    pub fn is_block_visible(&self, condition: bool) -> bool {
        match self.action {
            PredicateAction::ShowBlock => condition,
            PredicateAction::HideBlock => !condition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum PredicateExpressionNode {
    And { children: Vec<PredicateExpressionNode> },
    Or { children: Vec<PredicateExpressionNode> },
    Leaf(LeafOperation),
}

impl PredicateExpressionNode {
    pub fn leaf(
        question_id: QuestionId,
        scalar: Scalar,
        operator: Operator,
        value: PredicateValue,
    ) -> Self {
        Self::Leaf(LeafOperation {
            question_id,
            scalar,
            operator,
            value,
        })
    }
}

/// Compares one scalar of one question against a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafOperation {
    pub question_id: QuestionId,
    pub scalar: Scalar,
    pub operator: Operator,
    pub value: PredicateValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    In,
    NotIn,
    AnyOf,
    NoneOf,
    SubsetOf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PredicateValue {
    String(String),
    Long(i64),
    ListOfStrings(Vec<String>),
    ListOfLongs(Vec<i64>),
}

impl PredicateValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PredicateValue::String(_) => "string",
            PredicateValue::Long(_) => "long",
            PredicateValue::ListOfStrings(_) => "list_of_strings",
            PredicateValue::ListOfLongs(_) => "list_of_longs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    #[error("question {question_id} is not answerable before this block")]
    QuestionNotInScope { question_id: QuestionId },
    #[error("question {question_id} has no scalar '{scalar}'")]
    UnknownScalar {
        question_id: QuestionId,
        scalar: Scalar,
    },
    #[error("operator {operator:?} cannot be applied to {scalar_type:?} scalars")]
    IncompatibleOperator {
        operator: Operator,
        scalar_type: ScalarType,
    },
    #[error("operator {operator:?} on {scalar_type:?} scalars cannot compare against a {value_kind} value")]
    IncompatibleValue {
        operator: Operator,
        scalar_type: ScalarType,
        value_kind: &'static str,
    },
}

/// Every question id referenced by a leaf anywhere under `node`.
pub fn collect_question_ids(node: &PredicateExpressionNode) -> BTreeSet<QuestionId> {
    let mut ids = BTreeSet::new();
    collect_into(node, &mut ids);
    ids
}

fn collect_into(node: &PredicateExpressionNode, ids: &mut BTreeSet<QuestionId>) {
    match node {
        PredicateExpressionNode::And { children } | PredicateExpressionNode::Or { children } => {
            for child in children {
                collect_into(child, ids);
            }
        }
        PredicateExpressionNode::Leaf(leaf) => {
            ids.insert(leaf.question_id);
        }
    }
}

/// Rebuilds `node` with leaf question ids replaced per `mapping`. Unmapped ids are kept.
pub fn rewrite_leaves(
    node: &PredicateExpressionNode,
    mapping: &BTreeMap<QuestionId, QuestionId>,
) -> PredicateExpressionNode {
    match node {
        PredicateExpressionNode::And { children } => PredicateExpressionNode::And {
            children: children
                .iter()
                .map(|child| rewrite_leaves(child, mapping))
                .collect(),
        },
        PredicateExpressionNode::Or { children } => PredicateExpressionNode::Or {
            children: children
                .iter()
                .map(|child| rewrite_leaves(child, mapping))
                .collect(),
        },
        PredicateExpressionNode::Leaf(leaf) => PredicateExpressionNode::Leaf(LeafOperation {
            question_id: mapping
                .get(&leaf.question_id)
                .copied()
                .unwrap_or(leaf.question_id),
            ..leaf.clone()
        }),
    }
}
