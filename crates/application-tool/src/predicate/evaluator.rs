use std::collections::{BTreeMap, BTreeSet};

use crate::applicant::data::{ApplicantData, ScalarValue};
use crate::definitions::{Path, QuestionDefinition, QuestionId, ScalarType};

use super::{LeafOperation, Operator, PredicateError, PredicateExpressionNode, PredicateValue};

/// A question a predicate may reference, with its path bound to the evaluating block's entity.
#[derive(Debug, Clone)]
pub struct ScopedQuestion {
    pub definition: QuestionDefinition,
    pub path: Path,
}

/// Evaluates predicate trees against one applicant's answers.
pub struct PredicateEvaluator<'a> {
    data: &'a ApplicantData,
    scope: &'a BTreeMap<QuestionId, ScopedQuestion>,
}

impl<'a> PredicateEvaluator<'a> {
    pub fn new(data: &'a ApplicantData, scope: &'a BTreeMap<QuestionId, ScopedQuestion>) -> Self {
        Self { data, scope }
    }

    pub fn evaluate(&self, node: &PredicateExpressionNode) -> Result<bool, PredicateError> {
        match node {
            PredicateExpressionNode::And { children } => {
                for child in children {
                    if !self.evaluate(child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            PredicateExpressionNode::Or { children } => {
                for child in children {
                    if self.evaluate(child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            PredicateExpressionNode::Leaf(leaf) => self.evaluate_leaf(leaf),
        }
    }

    fn evaluate_leaf(&self, leaf: &LeafOperation) -> Result<bool, PredicateError> {
        let scoped = self
            .scope
            .get(&leaf.question_id)
            .ok_or(PredicateError::QuestionNotInScope {
                question_id: leaf.question_id,
            })?;
        let scalar_type = scoped.definition.scalar_type(leaf.scalar).ok_or(
            PredicateError::UnknownScalar {
                question_id: leaf.question_id,
                scalar: leaf.scalar,
            },
        )?;
        check_compatibility(leaf, scalar_type)?;

        let path = scoped.path.join(leaf.scalar.key());
        let answer = match self.data.read_scalar(&path, scalar_type) {
            Some(answer) => answer,
            None => return Ok(false),
        };

        Ok(apply(leaf.operator, &answer, &leaf.value))
    }
}

fn check_compatibility(
    leaf: &LeafOperation,
    scalar_type: ScalarType,
) -> Result<(), PredicateError> {
    use Operator::*;

    let operator = leaf.operator;
    let operator_fits = match operator {
        EqualTo | NotEqualTo | In | NotIn => {
            matches!(scalar_type, ScalarType::String | ScalarType::Long)
        }
        GreaterThan | GreaterThanOrEqualTo | LessThan | LessThanOrEqualTo => {
            scalar_type == ScalarType::Long
        }
        AnyOf | NoneOf | SubsetOf => scalar_type == ScalarType::ListOfStrings,
    };
    if !operator_fits {
        return Err(PredicateError::IncompatibleOperator {
            operator,
            scalar_type,
        });
    }

    let value_fits = match (operator, scalar_type, &leaf.value) {
        (EqualTo | NotEqualTo, ScalarType::String, PredicateValue::String(_)) => true,
        (EqualTo | NotEqualTo, ScalarType::Long, PredicateValue::Long(_)) => true,
        (
            GreaterThan | GreaterThanOrEqualTo | LessThan | LessThanOrEqualTo,
            _,
            PredicateValue::Long(_),
        ) => true,
        (In | NotIn, ScalarType::String, PredicateValue::ListOfStrings(_)) => true,
        (In | NotIn, ScalarType::Long, PredicateValue::ListOfLongs(_)) => true,
        (AnyOf | NoneOf | SubsetOf, _, PredicateValue::ListOfStrings(_)) => true,
        _ => false,
    };
    if !value_fits {
        return Err(PredicateError::IncompatibleValue {
            operator,
            scalar_type,
            value_kind: leaf.value.kind(),
        });
    }

    Ok(())
}

// Kinds were checked up front; any other pairing is unreachable and reads as false.
fn apply(operator: Operator, answer: &ScalarValue, value: &PredicateValue) -> bool {
    use Operator::*;

    match (operator, answer, value) {
        (EqualTo, ScalarValue::String(a), PredicateValue::String(v)) => a == v,
        (EqualTo, ScalarValue::Long(a), PredicateValue::Long(v)) => a == v,
        (NotEqualTo, ScalarValue::String(a), PredicateValue::String(v)) => a != v,
        (NotEqualTo, ScalarValue::Long(a), PredicateValue::Long(v)) => a != v,
        (GreaterThan, ScalarValue::Long(a), PredicateValue::Long(v)) => a > v,
        (GreaterThanOrEqualTo, ScalarValue::Long(a), PredicateValue::Long(v)) => a >= v,
        (LessThan, ScalarValue::Long(a), PredicateValue::Long(v)) => a < v,
        (LessThanOrEqualTo, ScalarValue::Long(a), PredicateValue::Long(v)) => a <= v,
        (In, ScalarValue::String(a), PredicateValue::ListOfStrings(v)) => v.contains(a),
        (In, ScalarValue::Long(a), PredicateValue::ListOfLongs(v)) => v.contains(a),
        (NotIn, ScalarValue::String(a), PredicateValue::ListOfStrings(v)) => !v.contains(a),
        (NotIn, ScalarValue::Long(a), PredicateValue::ListOfLongs(v)) => !v.contains(a),
        (AnyOf, ScalarValue::ListOfStrings(a), PredicateValue::ListOfStrings(v)) => {
            a.iter().any(|selected| v.contains(selected))
        }
        (NoneOf, ScalarValue::ListOfStrings(a), PredicateValue::ListOfStrings(v)) => {
            !a.iter().any(|selected| v.contains(selected))
        }
        (SubsetOf, ScalarValue::ListOfStrings(a), PredicateValue::ListOfStrings(v)) => {
            let allowed: BTreeSet<&String> = v.iter().collect();
            a.iter().all(|selected| allowed.contains(selected))
        }
        _ => false,
    }
}
