//! Instruction evaluator.
//!
//! Binds each instruction of an example against the registry, runs its
//! checker under a strictness mode and returns one outcome per slot.
//!
//! ## Loose mode
//!
//! The checker is tried against a fixed, ordered list of response
//! transforms ([`LOOSE_TRANSFORMS`]); the first success wins. The identity
//! transform comes first, so loose mode never rejects what strict mode
//! accepts.

use std::borrow::Cow;
use tracing::{debug, warn};

use crate::instructions::{BoundInstruction, InstructionError, PROMPT_TO_REPEAT};
use crate::registry::InstructionRegistry;
use crate::types::{
    EvaluationExample, EvaluationResult, InstructionOutcome, InstructionSpec, InstructionStatus,
    Mode, Params,
};

// =========================================================================
// LOOSE-MODE TRANSFORMS
// =========================================================================

/// A pure response rewrite tried in loose mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTransform {
    Identity,
    StripAsterisks,
    DropFirstLine,
    DropLastLine,
    DropFirstAndLastLine,
    StripAsterisksDropFirstLine,
    StripAsterisksDropLastLine,
    StripAsterisksDropFirstAndLastLine,
    StripWrappingQuotes,
}

/// Transforms tried in loose mode, in order.
pub const LOOSE_TRANSFORMS: [ResponseTransform; 9] = [
    ResponseTransform::Identity,
    ResponseTransform::StripAsterisks,
    ResponseTransform::DropFirstLine,
    ResponseTransform::DropLastLine,
    ResponseTransform::DropFirstAndLastLine,
    ResponseTransform::StripAsterisksDropFirstLine,
    ResponseTransform::StripAsterisksDropLastLine,
    ResponseTransform::StripAsterisksDropFirstAndLastLine,
    ResponseTransform::StripWrappingQuotes,
];

fn drop_first_line(text: &str) -> &str {
    text.split_once('\n').map_or("", |(_, rest)| rest).trim()
}

fn drop_last_line(text: &str) -> &str {
    text.rsplit_once('\n').map_or("", |(head, _)| head).trim()
}

fn drop_first_and_last_line(text: &str) -> &str {
    drop_last_line(drop_first_line(text))
}

impl ResponseTransform {
    /// Whether the transform removes a leading or trailing line.
    pub fn drops_lines(&self) -> bool {
        !matches!(
            self,
            ResponseTransform::Identity
                | ResponseTransform::StripAsterisks
                | ResponseTransform::StripWrappingQuotes
        )
    }

    /// Apply the transform.
    pub fn apply<'a>(&self, response: &'a str) -> Cow<'a, str> {
        match self {
            ResponseTransform::Identity => Cow::Borrowed(response),
            ResponseTransform::StripAsterisks => Cow::Owned(response.replace('*', "")),
            ResponseTransform::DropFirstLine => Cow::Borrowed(drop_first_line(response)),
            ResponseTransform::DropLastLine => Cow::Borrowed(drop_last_line(response)),
            ResponseTransform::DropFirstAndLastLine => {
                Cow::Borrowed(drop_first_and_last_line(response))
            }
            ResponseTransform::StripAsterisksDropFirstLine => {
                Cow::Owned(drop_first_line(&response.replace('*', "")).to_string())
            }
            ResponseTransform::StripAsterisksDropLastLine => {
                Cow::Owned(drop_last_line(&response.replace('*', "")).to_string())
            }
            ResponseTransform::StripAsterisksDropFirstAndLastLine => {
                Cow::Owned(drop_first_and_last_line(&response.replace('*', "")).to_string())
            }
            ResponseTransform::StripWrappingQuotes => {
                let trimmed = response.trim();
                let unquoted = trimmed
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(trimmed);
                Cow::Borrowed(unquoted)
            }
        }
    }
}

// =========================================================================
// EVALUATOR
// =========================================================================

/// Per-mode results for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeResults {
    pub strict: EvaluationResult,
    pub loose: EvaluationResult,
}

/// Evaluates examples against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r InstructionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r InstructionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r InstructionRegistry {
        self.registry
    }

    /// Bind one instruction of `example`.
    ///
    /// A kind that repeats the prompt receives the example's prompt text
    /// when the parameter is not supplied.
    fn bind(
        &self,
        example: &EvaluationExample,
        spec: &InstructionSpec,
    ) -> Result<BoundInstruction, InstructionError> {
        let kind = self.registry.resolve(&spec.id)?;
        if kind.accepts(PROMPT_TO_REPEAT) && !spec.params.contains(PROMPT_TO_REPEAT) {
            let params = spec
                .params
                .clone()
                .with(PROMPT_TO_REPEAT, example.prompt.as_str());
            return kind.bind(&params);
        }
        kind.bind(&spec.params)
    }

    /// Bind every instruction of `example`, one result per slot.
    pub fn bind_all(
        &self,
        example: &EvaluationExample,
    ) -> Vec<Result<BoundInstruction, InstructionError>> {
        example
            .instructions
            .iter()
            .map(|spec| self.bind(example, spec))
            .collect()
    }

    /// Evaluate `example` under `mode`.
    pub fn evaluate(&self, example: &EvaluationExample, mode: Mode) -> EvaluationResult {
        let bound = self.bind_all(example);
        self.evaluate_bound(example, &bound, mode)
    }

    /// Evaluate `example` under each of `modes`, binding once.
    pub fn evaluate_modes(&self, example: &EvaluationExample, modes: &[Mode]) -> Vec<EvaluationResult> {
        let bound = self.bind_all(example);
        modes
            .iter()
            .map(|&mode| self.evaluate_bound(example, &bound, mode))
            .collect()
    }

    /// Evaluate `example` under strict and loose mode.
    pub fn evaluate_all_modes(&self, example: &EvaluationExample) -> ModeResults {
        let bound = self.bind_all(example);
        ModeResults {
            strict: self.evaluate_bound(example, &bound, Mode::Strict),
            loose: self.evaluate_bound(example, &bound, Mode::Loose),
        }
    }

    fn evaluate_bound(
        &self,
        example: &EvaluationExample,
        bound: &[Result<BoundInstruction, InstructionError>],
        mode: Mode,
    ) -> EvaluationResult {
        let outcomes: Vec<InstructionOutcome> = example
            .instructions
            .iter()
            .zip(bound)
            .map(|(spec, instruction)| {
                let status = match instruction {
                    Ok(instruction) => {
                        InstructionStatus::from_bool(check(instruction, &example.response, mode))
                    }
                    Err(error) => {
                        warn!(
                            key = example.key,
                            instruction = %spec.id,
                            error = %error,
                            "instruction could not be evaluated"
                        );
                        InstructionStatus::Error {
                            error: error.clone(),
                        }
                    }
                };
                debug!(
                    key = example.key,
                    instruction = %spec.id,
                    mode = %mode,
                    status = ?status,
                    "checked instruction"
                );
                InstructionOutcome {
                    instruction_id: spec.id.clone(),
                    status,
                }
            })
            .collect();

        EvaluationResult {
            key: example.key,
            prompt: example.prompt.clone(),
            response: example.response.clone(),
            mode,
            outcomes,
        }
    }
}

/// Run `instruction` against `response` under `mode`.
///
/// A derived loose candidate that is blank is skipped, so removing the whole
/// text can never satisfy a "must not contain" constraint on its own.
/// Line-dropping transforms are skipped for instructions that opt out of them.
pub fn check(instruction: &BoundInstruction, response: &str, mode: Mode) -> bool {
    match mode {
        Mode::Strict => instruction.check(response),
        Mode::Loose => LOOSE_TRANSFORMS.iter().any(|transform| {
            if transform.drops_lines() && !instruction.allows_line_removal() {
                return false;
            }
            let candidate = transform.apply(response);
            if *transform != ResponseTransform::Identity && candidate.trim().is_empty() {
                return false;
            }
            instruction.check(&candidate)
        }),
    }
}

/// Pair each instruction id with its kwargs, padding a short kwargs list
/// with empty parameter maps.
pub fn pair_instructions(ids: &[String], kwargs: &[Params]) -> Vec<InstructionSpec> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| InstructionSpec::new(id.clone(), kwargs.get(i).cloned().unwrap_or_default()))
        .collect()
}
