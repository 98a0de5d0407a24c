//! Pre-flight checks for input examples.
//!
//! Finds every slot that would be reported as an error at evaluation time,
//! plus pairs of instructions that should not be combined in one prompt.

use std::fmt;

use super::InputExample;
use crate::evaluator::Evaluator;
use crate::instructions::InstructionError;
use crate::registry::InstructionRegistry;
use crate::types::InstructionId;

/// What is wrong with an example.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    /// The slot cannot be evaluated
    Instruction {
        slot: usize,
        error: InstructionError,
    },

    /// Two instructions of the example conflict
    Conflict {
        first: InstructionId,
        second: InstructionId,
    },
}

/// One problem found in an input example.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub key: i64,
    pub kind: IssueKind,
}

impl ValidationIssue {
    /// Instruction errors make a slot unscorable; conflicts are warnings.
    pub fn is_error(&self) -> bool {
        matches!(self.kind, IssueKind::Instruction { .. })
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Instruction { slot, error } => {
                write!(f, "key {}: instruction {}: {}", self.key, slot, error)
            }
            IssueKind::Conflict { first, second } => write!(
                f,
                "key {}: warning: {} conflicts with {}",
                self.key, first, second
            ),
        }
    }
}

/// Bind every instruction of every example and look for conflicts.
///
/// Binding goes through the evaluator, so a `repeat_prompt` slot without
/// `prompt_to_repeat` is accepted exactly as it would be at evaluation time.
pub fn validate_examples(
    registry: &InstructionRegistry,
    examples: &[InputExample],
) -> Vec<ValidationIssue> {
    let evaluator = Evaluator::new(registry);
    let mut issues = Vec::new();

    for input in examples {
        let example = input.to_example("");
        for (slot, bound) in evaluator.bind_all(&example).into_iter().enumerate() {
            if let Err(error) = bound {
                issues.push(ValidationIssue {
                    key: input.key,
                    kind: IssueKind::Instruction { slot, error },
                });
            }
        }

        for (a, b) in registry.find_conflicts(&input.instruction_id_list) {
            issues.push(ValidationIssue {
                key: input.key,
                kind: IssueKind::Conflict {
                    first: input.instruction_id_list[a].clone(),
                    second: input.instruction_id_list[b].clone(),
                },
            });
        }
    }
    issues
}
