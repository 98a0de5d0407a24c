//! Batch evaluation with bounded concurrency.
//!
//! # Execution Flow
//! 1. Examples are submitted in input order while the [`CancelFlag`] is down
//! 2. Each example fetches its response, then runs every configured mode on
//!    a blocking worker
//! 3. At most `concurrency` examples are in flight
//! 4. Results are yielded in input order regardless of completion order
//!
//! Raising the flag stops submission only. Examples already in flight run to
//! completion and are reported.

use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use ifeval_core::{EvalConfig, EvaluationResult, Evaluator, InputExample, InstructionRegistry, Mode};

use crate::source::ResponseSource;
use crate::RuntimeError;

/// Scheduling settings for a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Examples in flight at once
    pub concurrency: usize,

    /// Modes evaluated per example, in result order
    pub modes: Vec<Mode>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&EvalConfig::default())
    }
}

impl From<&EvalConfig> for BatchConfig {
    fn from(config: &EvalConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            modes: config.modes.clone(),
        }
    }
}

/// Shared stop signal for a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Results for one input example.
#[derive(Debug, Clone)]
pub struct ExampleEvaluation {
    /// Position in the input batch
    pub index: usize,

    pub key: i64,

    /// One result per configured mode. When `error` is set every slot of
    /// every result is marked as not evaluated.
    pub results: Vec<EvaluationResult>,

    /// Why the example could not be evaluated
    pub error: Option<RuntimeError>,
}

/// Everything a batch run produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// In input order
    pub evaluations: Vec<ExampleEvaluation>,

    /// True when cancellation left some examples unsubmitted
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Results for `mode`, in input order. Failed examples are included as
    /// unscorable results.
    pub fn results_for(&self, mode: Mode) -> Vec<EvaluationResult> {
        self.evaluations
            .iter()
            .filter_map(|evaluation| evaluation.results.iter().find(|r| r.mode == mode))
            .cloned()
            .collect()
    }

    /// Examples that could not be evaluated.
    pub fn failures(&self) -> impl Iterator<Item = &ExampleEvaluation> {
        self.evaluations.iter().filter(|e| e.error.is_some())
    }
}

/// Runs batches of examples against a shared registry.
pub struct BatchEvaluator {
    registry: Arc<InstructionRegistry>,
    config: BatchConfig,
}

impl BatchEvaluator {
    pub fn new(registry: Arc<InstructionRegistry>, config: BatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Evaluate `examples`, pulling responses from `source`.
    pub async fn run<S>(
        &self,
        examples: &[InputExample],
        source: &S,
        cancel: &CancelFlag,
    ) -> BatchOutcome
    where
        S: ResponseSource + ?Sized,
    {
        let total = examples.len();
        let concurrency = self.config.concurrency.max(1);
        info!(total, concurrency, modes = ?self.config.modes, "starting batch evaluation");

        let evaluations: Vec<ExampleEvaluation> = stream::iter(examples.iter().enumerate())
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|(index, input)| self.evaluate_one(index, input, source))
            .buffered(concurrency)
            .collect()
            .await;

        let cancelled = evaluations.len() < total;
        let failed = evaluations.iter().filter(|e| e.error.is_some()).count();
        if cancelled {
            warn!(
                completed = evaluations.len(),
                total, "batch cancelled; remaining examples were not submitted"
            );
        }
        info!(completed = evaluations.len(), failed, "batch evaluation finished");

        BatchOutcome {
            evaluations,
            cancelled,
        }
    }

    async fn evaluate_one<S>(
        &self,
        index: usize,
        input: &InputExample,
        source: &S,
    ) -> ExampleEvaluation
    where
        S: ResponseSource + ?Sized,
    {
        let key = input.key;
        let evaluated = match source.response_for(input).await {
            Ok(response) => {
                let response = response.unwrap_or_else(|| {
                    warn!(key, "no response for prompt; evaluating an empty response");
                    String::new()
                });
                let example = input.to_example(response);
                let registry = Arc::clone(&self.registry);
                let modes = self.config.modes.clone();

                tokio::task::spawn_blocking(move || {
                    Evaluator::new(&registry).evaluate_modes(&example, &modes)
                })
                .await
                .map_err(|e| RuntimeError::Join(e.to_string()))
            }
            Err(e) => Err(e),
        };

        match evaluated {
            Ok(results) => {
                debug!(
                    key,
                    index,
                    followed = ?results.iter().map(|r| r.follow_all_instructions()).collect::<Vec<_>>(),
                    "example evaluated"
                );
                ExampleEvaluation {
                    index,
                    key,
                    results,
                    error: None,
                }
            }
            Err(error) => {
                warn!(key, index, error = %error, "example could not be evaluated");
                let example = input.to_example(String::new());
                let reason = error.to_string();
                let results = self
                    .config
                    .modes
                    .iter()
                    .map(|&mode| EvaluationResult::not_evaluated(&example, mode, &reason))
                    .collect();
                ExampleEvaluation {
                    index,
                    key,
                    results,
                    error: Some(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryResponses;
    use async_trait::async_trait;
    use ifeval_core::{Params, Report};

    fn input(key: i64, prompt: &str, ids: &[&str]) -> InputExample {
        InputExample {
            key,
            prompt: prompt.to_string(),
            instruction_id_list: ids.iter().map(|id| id.to_string()).collect(),
            kwargs: vec![Params::new(); ids.len()],
        }
    }

    fn evaluator(concurrency: usize) -> BatchEvaluator {
        BatchEvaluator::new(
            Arc::new(InstructionRegistry::builtin()),
            BatchConfig {
                concurrency,
                modes: vec![Mode::Strict, Mode::Loose],
            },
        )
    }

    /// Raises the flag while serving the first request.
    struct CancellingSource {
        cancel: CancelFlag,
    }

    #[async_trait]
    impl ResponseSource for CancellingSource {
        async fn response_for(&self, _input: &InputExample) -> Result<Option<String>, RuntimeError> {
            self.cancel.cancel();
            Ok(Some("no commas here".to_string()))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ResponseSource for FailingSource {
        async fn response_for(&self, input: &InputExample) -> Result<Option<String>, RuntimeError> {
            if input.key == 2 {
                Err(RuntimeError::Response("backend unavailable".to_string()))
            } else {
                Ok(Some("fine".to_string()))
            }
        }
    }

    #[test]
    fn test_config_from_eval_config() {
        let config = BatchConfig::from(&EvalConfig {
            concurrency: 9,
            ..EvalConfig::default()
        });
        assert_eq!(config.concurrency, 9);
        assert_eq!(config.modes, vec![Mode::Strict, Mode::Loose]);
    }

    #[tokio::test]
    async fn test_preserves_input_order() {
        let examples: Vec<InputExample> = (0..12)
            .map(|i| input(i, &format!("prompt {i}"), &["punctuation:no_comma"]))
            .collect();
        let mut source = InMemoryResponses::default();
        for i in 0..12 {
            let response = if i % 2 == 0 { "plain text" } else { "a, b" };
            source.insert(format!("prompt {i}"), response);
        }

        let outcome = evaluator(4).run(&examples, &source, &CancelFlag::new()).await;

        assert!(!outcome.cancelled);
        let indices: Vec<usize> = outcome.evaluations.iter().map(|e| e.index).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());

        let strict = outcome.results_for(Mode::Strict);
        assert_eq!(strict.len(), 12);
        for (i, result) in strict.iter().enumerate() {
            assert_eq!(result.key, i as i64);
            assert_eq!(result.follow_all_instructions(), i % 2 == 0);
        }
        assert_eq!(outcome.results_for(Mode::Loose).len(), 12);
    }

    #[tokio::test]
    async fn test_missing_response_evaluates_empty() {
        let examples = vec![input(1, "unanswered", &["punctuation:no_comma"])];
        let outcome = evaluator(2)
            .run(&examples, &InMemoryResponses::default(), &CancelFlag::new())
            .await;

        let strict = outcome.results_for(Mode::Strict);
        assert_eq!(strict[0].response, "");
        assert!(strict[0].follow_all_instructions());
    }

    #[tokio::test]
    async fn test_source_failure_is_isolated() {
        let examples = vec![
            input(1, "a", &["punctuation:no_comma"]),
            input(2, "b", &["punctuation:no_comma"]),
            input(3, "c", &["punctuation:no_comma"]),
        ];
        let outcome = evaluator(3).run(&examples, &FailingSource, &CancelFlag::new()).await;

        assert_eq!(outcome.evaluations.len(), 3);
        let failures: Vec<i64> = outcome.failures().map(|e| e.key).collect();
        assert_eq!(failures, vec![2]);
        assert!(matches!(
            outcome.evaluations[1].error,
            Some(RuntimeError::Response(_))
        ));

        let strict = outcome.results_for(Mode::Strict);
        assert_eq!(strict.len(), 3);
        assert_eq!(strict[1].key, 2);
        assert!(!strict[1].is_scorable());
        assert!(strict[0].is_scorable() && strict[2].is_scorable());

        let report = Report::from_results(&strict);
        assert_eq!(report.unscorable_prompts, 1);
        assert_eq!(report.prompt_level.total, 2);
        assert_eq!(report.errored_instructions, 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let examples = vec![input(1, "a", &[]), input(2, "b", &[])];
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = evaluator(2)
            .run(&examples, &InMemoryResponses::default(), &cancel)
            .await;

        assert!(outcome.cancelled);
        assert!(outcome.evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_submission_but_finishes_in_flight() {
        let examples: Vec<InputExample> = (0..5)
            .map(|i| input(i, &format!("p{i}"), &["punctuation:no_comma"]))
            .collect();
        let cancel = CancelFlag::new();
        let source = CancellingSource {
            cancel: cancel.clone(),
        };

        let outcome = evaluator(1).run(&examples, &source, &cancel).await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.evaluations.len(), 1);
        assert!(outcome.evaluations[0].error.is_none());
    }
}
