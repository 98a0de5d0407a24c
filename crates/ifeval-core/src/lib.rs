//! # ifeval-core
//!
//! Deterministic instruction-following verification engine.
//!
//! Given a prompt's machine-checkable instructions (e.g. "answer with at
//! least 300 words", "no commas", "wrap the answer in JSON") and a model
//! response, this crate decides for each instruction whether the response
//! follows it.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **Total**: Checkers return a definite boolean; a panicking checker is
//!    caught and reported as "not followed"
//! 3. **Isolated**: An unknown id or bad parameter marks only its own slot
//!    as an error; the rest of the example is still evaluated
//! 4. **Parallel-safe**: The registry is immutable and shared by reference
//!
//! ## Example
//!
//! ```rust,ignore
//! use ifeval_core::{EvaluationExample, Evaluator, InstructionRegistry, Mode, Params};
//!
//! let registry = InstructionRegistry::builtin();
//! let example = EvaluationExample::new(1, "Write a haiku.", "leaves fall softly")
//!     .with_instruction("change_case:english_lowercase", Params::new());
//!
//! let result = Evaluator::new(&registry).evaluate(&example, Mode::Strict);
//! assert!(result.follow_all_instructions());
//! ```

pub mod config;
pub mod dataset;
pub mod evaluator;
pub mod instructions;
pub mod langid;
pub mod metrics;
pub mod registry;
pub mod report;
pub mod types;

// Re-export main types at crate root
pub use config::{ConfigError, EvalConfig};
pub use dataset::{DatasetError, InputExample, OutputRecord, ResponseRecord};
pub use evaluator::{Evaluator, ModeResults, ResponseTransform, LOOSE_TRANSFORMS};
pub use instructions::{
    BoundInstruction, Instruction, InstructionError, InstructionKind, ParamSpec, ParamType,
    Relation,
};
pub use registry::{InstructionRegistry, KindSummary, RegistryError};
pub use report::{Report, Tally};
pub use types::{
    EvaluationExample, EvaluationResult, InstructionId, InstructionOutcome, InstructionSpec,
    InstructionStatus, Mode, ParamValue, Params,
};

/// Evaluate one example under `mode` against `registry`.
///
/// Shorthand for `Evaluator::new(registry).evaluate(example, mode)`.
pub fn evaluate(
    registry: &InstructionRegistry,
    example: &EvaluationExample,
    mode: Mode,
) -> EvaluationResult {
    Evaluator::new(registry).evaluate(example, mode)
}
