//! Accuracy report over evaluation results.
//!
//! Prompt-level accuracy counts examples whose every instruction was
//! followed; instruction-level accuracy counts individual slots. Examples
//! with an error slot are unscorable and are left out of the prompt-level
//! figure, error slots are left out of every instruction-level figure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{category_of, EvaluationResult, InstructionStatus, Mode};

/// Followed / evaluated counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub followed: usize,
    pub total: usize,
}

impl Tally {
    pub fn record(&mut self, followed: bool) {
        self.total += 1;
        if followed {
            self.followed += 1;
        }
    }

    /// Fraction followed; `0.0` when nothing was evaluated.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.followed as f64 / self.total as f64
        }
    }
}

/// Aggregated accuracy for one mode.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub mode: Option<Mode>,
    pub generated_at: DateTime<Utc>,
    pub prompt_level: Tally,
    pub instruction_level: Tally,

    /// Accuracy per category (id prefix before `:`)
    pub by_category: BTreeMap<String, Tally>,

    /// Accuracy per instruction id
    pub by_instruction: BTreeMap<String, Tally>,

    /// Examples with at least one slot that could not be evaluated
    pub unscorable_prompts: usize,

    /// Slots that could not be evaluated
    pub errored_instructions: usize,
}

impl Report {
    pub fn from_results(results: &[EvaluationResult]) -> Self {
        let mut report = Report {
            mode: results.first().map(|r| r.mode),
            generated_at: Utc::now(),
            prompt_level: Tally::default(),
            instruction_level: Tally::default(),
            by_category: BTreeMap::new(),
            by_instruction: BTreeMap::new(),
            unscorable_prompts: 0,
            errored_instructions: 0,
        };

        for result in results {
            if result.is_scorable() {
                report.prompt_level.record(result.follow_all_instructions());
            } else {
                report.unscorable_prompts += 1;
            }

            for outcome in &result.outcomes {
                let followed = match outcome.status {
                    InstructionStatus::Followed => true,
                    InstructionStatus::NotFollowed => false,
                    InstructionStatus::Error { .. } => {
                        report.errored_instructions += 1;
                        continue;
                    }
                };
                let id = outcome.instruction_id.as_str();
                report.instruction_level.record(followed);
                report
                    .by_category
                    .entry(category_of(id).to_string())
                    .or_default()
                    .record(followed);
                report
                    .by_instruction
                    .entry(id.to_string())
                    .or_default()
                    .record(followed);
            }
        }

        report
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(mode) = self.mode {
            writeln!(f, "================================================================")?;
            writeln!(f, "{} accuracy scores:", mode)?;
        }
        writeln!(f, "prompt-level: {:.4}", self.prompt_level.accuracy())?;
        writeln!(f, "instruction-level: {:.4}", self.instruction_level.accuracy())?;
        if self.unscorable_prompts > 0 {
            writeln!(
                f,
                "unscorable prompts: {} ({} instruction errors)",
                self.unscorable_prompts, self.errored_instructions
            )?;
        }
        writeln!(f)?;
        for (category, tally) in &self.by_category {
            writeln!(f, "{} {:.4}", category, tally.accuracy())?;
        }
        writeln!(f)?;
        for (id, tally) in &self.by_instruction {
            writeln!(f, "{} {:.4}", id, tally.accuracy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::InstructionError;
    use crate::types::InstructionOutcome;

    fn outcome(id: &str, status: InstructionStatus) -> InstructionOutcome {
        InstructionOutcome {
            instruction_id: id.to_string(),
            status,
        }
    }

    fn result(outcomes: Vec<InstructionOutcome>) -> EvaluationResult {
        EvaluationResult {
            key: 0,
            prompt: String::new(),
            response: String::new(),
            mode: Mode::Strict,
            outcomes,
        }
    }

    #[test]
    fn test_report_accuracy() {
        let results = vec![
            result(vec![
                outcome("keywords:existence", InstructionStatus::Followed),
                outcome("punctuation:no_comma", InstructionStatus::Followed),
            ]),
            result(vec![
                outcome("keywords:existence", InstructionStatus::NotFollowed),
                outcome("keywords:frequency", InstructionStatus::Followed),
            ]),
            result(vec![
                outcome("punctuation:no_comma", InstructionStatus::Followed),
                outcome(
                    "made_up:kind",
                    InstructionStatus::Error {
                        error: InstructionError::UnknownInstructionId("made_up:kind".into()),
                    },
                ),
            ]),
        ];

        let report = Report::from_results(&results);
        assert_eq!(report.mode, Some(Mode::Strict));
        assert_eq!(report.prompt_level, Tally { followed: 1, total: 2 });
        assert_eq!(report.instruction_level, Tally { followed: 4, total: 5 });
        assert_eq!(report.unscorable_prompts, 1);
        assert_eq!(report.errored_instructions, 1);
        assert_eq!(report.by_category["keywords"], Tally { followed: 2, total: 3 });
        assert_eq!(report.by_instruction["punctuation:no_comma"].accuracy(), 1.0);
        assert!(!report.by_instruction.contains_key("made_up:kind"));
    }

    #[test]
    fn test_report_display() {
        let results = vec![result(vec![outcome(
            "punctuation:no_comma",
            InstructionStatus::Followed,
        )])];
        let text = Report::from_results(&results).to_string();
        assert!(text.contains("strict accuracy scores:"));
        assert!(text.contains("prompt-level: 1.0000"));
        assert!(text.contains("punctuation 1.0000"));
        assert!(text.contains("punctuation:no_comma 1.0000"));
    }

    #[test]
    fn test_empty_report() {
        let report = Report::from_results(&[]);
        assert_eq!(report.mode, None);
        assert_eq!(report.prompt_level.accuracy(), 0.0);
    }
}
