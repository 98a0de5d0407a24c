//! `startend:` instructions: how a response opens and closes.

use rand::RngCore;

use super::{
    sample_choice, sample_keywords, Args, Conflicts, Instruction, InstructionError,
    InstructionKind, ParamSpec, ParamType,
};
use crate::metrics;
use crate::types::Params;

const STARTER_OPTIONS: &[&str] = &[
    "I would say",
    "My answer is",
    "I believe",
    "In my opinion",
    "I think",
    "I reckon",
    "I feel",
    "From my perspective",
    "As I see it",
    "According to me",
    "As far as I'm concerned",
    "To my understanding",
    "In my view",
    "My take on it is",
    "As per my perception",
];

const ENDING_OPTIONS: &[&str] = &[
    "Any other questions?",
    "Is there anything else I can help with?",
];

const END_PARAMS: &[ParamSpec] = &[ParamSpec::required("end_phrase", ParamType::Text)];
const START_PARAMS: &[ParamSpec] = &[ParamSpec::required("starter", ParamType::Text)];
const FIRST_WORD_PARAMS: &[ParamSpec] = &[ParamSpec::required("first_word", ParamType::Text)];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "startend:end_checker",
            END_PARAMS,
            Conflicts::With(&["startend:forbidden_end"]),
            EndPhrase::build_required,
            EndPhrase::sample,
        ),
        InstructionKind::new(
            "startend:forbidden_end",
            END_PARAMS,
            Conflicts::With(&[]),
            EndPhrase::build_forbidden,
            EndPhrase::sample,
        ),
        InstructionKind::new(
            "startend:constrained_start",
            START_PARAMS,
            Conflicts::With(&["startend:first_word", "combination:repeat_prompt"]),
            ConstrainedStart::build,
            ConstrainedStart::sample,
        ),
        InstructionKind::new(
            "startend:first_word",
            FIRST_WORD_PARAMS,
            Conflicts::With(&["combination:repeat_prompt"]),
            FirstWord::build,
            FirstWord::sample,
        ),
        InstructionKind::new(
            "startend:quotation",
            &[],
            Conflicts::With(&["detectable_format:title"]),
            Quotation::build,
            Quotation::sample,
        ),
    ]
}

/// The response must (or must not) end with a phrase.
pub struct EndPhrase {
    phrase: String,
    forbidden: bool,
}

impl EndPhrase {
    fn build(args: &Args<'_>, forbidden: bool) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            phrase: args.text("end_phrase")?.to_string(),
            forbidden,
        }))
    }

    fn build_required(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Self::build(args, false)
    }

    fn build_forbidden(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Self::build(args, true)
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("end_phrase", sample_choice(rng, ENDING_OPTIONS))
    }

    fn ends_with_phrase(&self, response: &str) -> bool {
        response
            .trim()
            .trim_matches('"')
            .to_lowercase()
            .ends_with(&self.phrase.trim().to_lowercase())
    }
}

impl Instruction for EndPhrase {
    fn describe(&self) -> String {
        if self.forbidden {
            format!("Do not end your response with the phrase {}.", self.phrase)
        } else {
            format!(
                "Finish your response with this exact phrase {}. No other words should follow \
                 this phrase.",
                self.phrase
            )
        }
    }

    fn check(&self, response: &str) -> bool {
        self.ends_with_phrase(response) != self.forbidden
    }

    fn allows_line_removal(&self) -> bool {
        !self.forbidden
    }
}

/// The response starts with a given phrase.
pub struct ConstrainedStart {
    starter: String,
}

impl ConstrainedStart {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            starter: args.text("starter")?.to_lowercase(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("starter", sample_choice(rng, STARTER_OPTIONS))
    }
}

impl Instruction for ConstrainedStart {
    fn describe(&self) -> String {
        format!(
            "During the conversation, when it is your turn, please always start with {}",
            self.starter
        )
    }

    fn check(&self, response: &str) -> bool {
        response.trim_start().to_lowercase().starts_with(&self.starter)
    }
}

/// The first word of the response.
pub struct FirstWord {
    word: String,
}

impl FirstWord {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            word: args.text("first_word")?.to_lowercase(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("first_word", sample_keywords(rng, 1).remove(0))
    }
}

impl Instruction for FirstWord {
    fn describe(&self) -> String {
        format!("The very first word of your response should be {}.", self.word)
    }

    fn check(&self, response: &str) -> bool {
        metrics::words(response)
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .map_or(false, |w| w == self.word)
    }
}

/// The whole response wrapped in double quotes.
pub struct Quotation;

impl Quotation {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }

    fn sample(_rng: &mut dyn RngCore) -> Params {
        Params::new()
    }
}

impl Instruction for Quotation {
    fn describe(&self) -> String {
        "Wrap your entire response with double quotation marks.".to_string()
    }

    fn check(&self, response: &str) -> bool {
        let response = response.trim();
        response.chars().count() > 1 && response.starts_with('"') && response.ends_with('"')
    }
}
