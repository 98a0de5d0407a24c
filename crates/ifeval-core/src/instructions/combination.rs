//! `combination:` instructions.

use rand::RngCore;

use super::{
    sample_choice, Args, Conflicts, Instruction, InstructionError, InstructionKind, ParamSpec,
    ParamType,
};
use crate::types::Params;

/// Separator between the two answers of `combination:two_responses`.
pub const RESPONSE_SEPARATOR: &str = "******";

/// Parameter that receives the example's prompt when not supplied.
pub const PROMPT_TO_REPEAT: &str = "prompt_to_repeat";

const SAMPLE_PROMPTS: &[&str] = &[
    "Write a short story about a lighthouse keeper.",
    "Explain how a bridge carries its load.",
    "Describe a winter morning in the mountains.",
    "List the benefits of reading every day.",
];

const REPEAT_PARAMS: &[ParamSpec] = &[ParamSpec::required(PROMPT_TO_REPEAT, ParamType::Text)];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "combination:two_responses",
            &[],
            Conflicts::AllExcept(&[
                "keywords:existence",
                "keywords:forbidden_words",
                "language:response_language",
                "change_case:english_capital",
                "change_case:english_lowercase",
                "punctuation:no_comma",
            ]),
            TwoResponses::build,
            TwoResponses::sample,
        ),
        InstructionKind::new(
            "combination:repeat_prompt",
            REPEAT_PARAMS,
            Conflicts::AllExcept(&["keywords:existence", "keywords:forbidden_words"]),
            RepeatPrompt::build,
            RepeatPrompt::sample,
        ),
    ]
}

/// Two different answers separated by six asterisks.
pub struct TwoResponses;

impl TwoResponses {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }

    fn sample(_rng: &mut dyn RngCore) -> Params {
        Params::new()
    }
}

impl Instruction for TwoResponses {
    fn describe(&self) -> String {
        format!(
            "Give two different responses. Responses and only responses should be separated \
             by 6 asterisk symbols: {}.",
            RESPONSE_SEPARATOR
        )
    }

    fn check(&self, response: &str) -> bool {
        let parts: Vec<&str> = response.split(RESPONSE_SEPARATOR).collect();
        let last = parts.len() - 1;
        let mut answers = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let part = part.trim();
            if part.is_empty() {
                if index != 0 && index != last {
                    return false;
                }
            } else {
                answers.push(part);
            }
        }

        answers.len() == 2 && answers[0] != answers[1]
    }
}

/// The response opens by repeating the prompt verbatim.
pub struct RepeatPrompt {
    prompt: String,
}

impl RepeatPrompt {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            prompt: args.text(PROMPT_TO_REPEAT)?.to_string(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with(PROMPT_TO_REPEAT, sample_choice(rng, SAMPLE_PROMPTS))
    }
}

impl Instruction for RepeatPrompt {
    fn describe(&self) -> String {
        format!(
            "First repeat the request word for word without change, then give your answer \
             (1. do not say any words or characters before repeating the request; 2. the \
             request you need to repeat does not include this sentence) {}",
            self.prompt
        )
    }

    fn check(&self, response: &str) -> bool {
        response
            .trim()
            .to_lowercase()
            .starts_with(&self.prompt.trim().to_lowercase())
    }
}
