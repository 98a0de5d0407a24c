//! # ifeval-runtime
//!
//! Parallel batch evaluation for ifeval.
//!
//! The core crate evaluates one example at a time and never blocks on I/O.
//! This crate fans a batch of examples out over tokio's blocking pool with
//! bounded concurrency and fans the results back in, in input order.
//!
//! ## Important
//!
//! Every verdict is still produced by `ifeval-core`. The runtime adds
//! scheduling only: where responses come from ([`ResponseSource`]), how
//! many examples are in flight ([`BatchConfig`]) and when to stop
//! submitting new ones ([`CancelFlag`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ifeval_core::InstructionRegistry;
//! use ifeval_runtime::{BatchConfig, BatchEvaluator, CancelFlag, InMemoryResponses};
//!
//! let evaluator = BatchEvaluator::new(Arc::new(InstructionRegistry::builtin()), BatchConfig::default());
//! let source = InMemoryResponses::new(responses);
//!
//! let outcome = evaluator.run(&examples, &source, &CancelFlag::new()).await;
//! let strict = outcome.results_for(Mode::Strict);
//! ```

use thiserror::Error;

pub mod batch;
pub mod source;

pub use batch::{BatchConfig, BatchEvaluator, BatchOutcome, CancelFlag, ExampleEvaluation};
pub use source::{InMemoryResponses, ResponseSource};

/// Errors from the runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("Response source failed: {0}")]
    Response(String),
}
