//! Dataset records exchanged with the outside world.
//!
//! Inputs and responses arrive as JSON lines; results leave as JSON lines,
//! one file per evaluation mode.

mod reader;
mod schema;
mod validation;

pub use reader::{
    parse_input_examples, parse_responses, read_input_examples, read_responses, to_jsonl,
    write_results,
};
pub use schema::{validate_input_example, SchemaError};
pub use validation::{validate_examples, IssueKind, ValidationIssue};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::evaluator::pair_instructions;
use crate::registry::InstructionRegistry;
use crate::types::{EvaluationExample, EvaluationResult, InstructionId, Params};

/// Errors reading or writing dataset files. Line numbers are 1-based.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: invalid JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: schema validation failed: {}", errors.join("; "))]
    Schema { line: usize, errors: Vec<String> },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One input prompt with its instruction ids and per-instruction kwargs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputExample {
    #[serde(default)]
    pub key: i64,

    pub prompt: String,

    pub instruction_id_list: Vec<InstructionId>,

    /// Aligned with `instruction_id_list`; a short list is padded with `{}`
    #[serde(default)]
    pub kwargs: Vec<Params>,
}

impl InputExample {
    /// Build the evaluation example for `response`.
    pub fn to_example(&self, response: impl Into<String>) -> EvaluationExample {
        EvaluationExample {
            key: self.key,
            prompt: self.prompt.clone(),
            instructions: pair_instructions(&self.instruction_id_list, &self.kwargs),
            response: response.into(),
        }
    }

    /// A random example with up to `count` mutually compatible instructions.
    pub fn sampled(
        registry: &InstructionRegistry,
        key: i64,
        prompt: impl Into<String>,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Self {
        let (instruction_id_list, kwargs) = registry
            .sample_instructions(count, rng)
            .into_iter()
            .map(|spec| (spec.id, spec.params))
            .unzip();
        InputExample {
            key,
            prompt: prompt.into(),
            instruction_id_list,
            kwargs,
        }
    }
}

/// One model response, joined to its input by prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub prompt: String,
    pub response: String,
}

/// One result line, per example per mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub key: i64,
    pub prompt: String,
    pub response: String,
    pub instruction_id_list: Vec<InstructionId>,
    pub follow_all_instructions: bool,

    /// Error slots are `false`; see `errors`
    pub follow_instruction_list: Vec<bool>,

    /// Slot index -> error message for instructions that could not be evaluated
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<usize, String>,
}

impl From<&EvaluationResult> for OutputRecord {
    fn from(result: &EvaluationResult) -> Self {
        OutputRecord {
            key: result.key,
            prompt: result.prompt.clone(),
            response: result.response.clone(),
            instruction_id_list: result.instruction_id_list(),
            follow_all_instructions: result.follow_all_instructions(),
            follow_instruction_list: result.follow_instruction_list(),
            errors: result.errors(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstructionOutcome, InstructionStatus, Mode};

    #[test]
    fn test_input_example_pads_kwargs() {
        let input: InputExample = serde_json::from_str(
            r#"{"key": 3, "prompt": "p", "instruction_id_list": ["a:b", "c:d"], "kwargs": [{"n": 1}]}"#,
        )
        .unwrap();
        let example = input.to_example("r");
        assert_eq!(example.key, 3);
        assert_eq!(example.instructions.len(), 2);
        assert!(example.instructions[1].params.is_empty());
        assert_eq!(example.response, "r");
    }

    #[test]
    fn test_output_record_from_result() {
        let result = EvaluationResult {
            key: 9,
            prompt: "p".into(),
            response: "r".into(),
            mode: Mode::Loose,
            outcomes: vec![
                InstructionOutcome {
                    instruction_id: "punctuation:no_comma".into(),
                    status: InstructionStatus::Followed,
                },
                InstructionOutcome {
                    instruction_id: "x:y".into(),
                    status: InstructionStatus::NotFollowed,
                },
            ],
        };

        let record = OutputRecord::from(&result);
        assert!(!record.follow_all_instructions);
        assert_eq!(record.follow_instruction_list, vec![true, false]);

        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains("errors"));
    }

    #[test]
    fn test_sampled_example_is_valid() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let registry = InstructionRegistry::builtin();
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let input = InputExample::sampled(&registry, seed as i64, "Write a story.", 3, &mut rng);

            assert_eq!(input.instruction_id_list.len(), 3);
            assert_eq!(input.kwargs.len(), 3);
            assert!(validate_examples(&registry, &[input.clone()]).is_empty());

            let line = serde_json::to_value(&input).unwrap();
            assert!(validate_input_example(&line).is_ok());
        }
    }
}
