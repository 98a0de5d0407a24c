//! `keywords:` instructions: required, counted and forbidden words.

use rand::{Rng, RngCore};

use super::{
    relation_param, render_list, sample_count, sample_keywords, sample_relation, Args, Conflicts,
    Instruction, InstructionError, InstructionKind, ParamDefault, ParamSpec, ParamType, Relation,
};
use crate::metrics;
use crate::types::Params;

const NUM_KEYWORDS: usize = 2;
const MAX_KEYWORD_FREQUENCY: usize = 3;
const MAX_LETTER_FREQUENCY: usize = 10;

const EXISTENCE_PARAMS: &[ParamSpec] = &[ParamSpec::required("keywords", ParamType::Keywords)];

const FREQUENCY_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("keyword", ParamType::Text),
    ParamSpec::required("frequency", ParamType::Count),
    relation_param("relation"),
];

const FORBIDDEN_PARAMS: &[ParamSpec] =
    &[ParamSpec::required("forbidden_words", ParamType::Keywords)];

const LETTER_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("letter", ParamType::Letter),
    ParamSpec::required("let_frequency", ParamType::Count),
    relation_param("let_relation"),
    ParamSpec::optional("case_sensitive", ParamType::Flag, ParamDefault::Bool(false)),
];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "keywords:existence",
            EXISTENCE_PARAMS,
            Conflicts::With(&[]),
            KeywordExistence::build,
            KeywordExistence::sample,
        ),
        InstructionKind::new(
            "keywords:frequency",
            FREQUENCY_PARAMS,
            Conflicts::With(&[]),
            KeywordFrequency::build,
            KeywordFrequency::sample,
        ),
        InstructionKind::new(
            "keywords:forbidden_words",
            FORBIDDEN_PARAMS,
            Conflicts::With(&[]),
            ForbiddenWords::build,
            ForbiddenWords::sample,
        ),
        InstructionKind::new(
            "keywords:letter_frequency",
            LETTER_PARAMS,
            Conflicts::With(&[]),
            LetterFrequency::build,
            LetterFrequency::sample,
        ),
    ]
}

/// Every keyword must appear at least once.
pub struct KeywordExistence {
    keywords: Vec<String>,
}

impl KeywordExistence {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            keywords: args.list("keywords")?.to_vec(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("keywords", sample_keywords(rng, NUM_KEYWORDS))
    }
}

impl Instruction for KeywordExistence {
    fn describe(&self) -> String {
        format!(
            "Include keywords {} in the response.",
            render_list(&self.keywords)
        )
    }

    fn check(&self, response: &str) -> bool {
        self.keywords
            .iter()
            .all(|keyword| metrics::keyword_frequency(response, keyword) > 0)
    }
}

/// A keyword must appear a number of times.
pub struct KeywordFrequency {
    keyword: String,
    frequency: usize,
    relation: Relation,
}

impl KeywordFrequency {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            keyword: args.text("keyword")?.to_string(),
            frequency: args.count("frequency")?,
            relation: args.relation("relation")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        let keyword = sample_keywords(rng, 1).remove(0);
        Params::new()
            .with("keyword", keyword)
            .with("frequency", sample_count(rng, 1, MAX_KEYWORD_FREQUENCY))
            .with("relation", sample_relation(rng))
    }
}

impl Instruction for KeywordFrequency {
    fn describe(&self) -> String {
        format!(
            "In your response, the word \"{}\" should appear {} {} times.",
            self.keyword, self.relation, self.frequency
        )
    }

    fn check(&self, response: &str) -> bool {
        self.relation
            .holds(metrics::keyword_frequency(response, &self.keyword), self.frequency)
    }
}

/// None of the listed words may appear.
pub struct ForbiddenWords {
    forbidden: Vec<String>,
}

impl ForbiddenWords {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            forbidden: args.list("forbidden_words")?.to_vec(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("forbidden_words", sample_keywords(rng, NUM_KEYWORDS))
    }
}

impl Instruction for ForbiddenWords {
    fn describe(&self) -> String {
        format!(
            "Do not include keywords {} in the response.",
            render_list(&self.forbidden)
        )
    }

    fn check(&self, response: &str) -> bool {
        self.forbidden
            .iter()
            .all(|word| metrics::keyword_frequency(response, word) == 0)
    }
}

/// A letter must appear a number of times.
pub struct LetterFrequency {
    letter: char,
    frequency: usize,
    relation: Relation,
    case_sensitive: bool,
}

impl LetterFrequency {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        let letter = args
            .text("letter")?
            .chars()
            .next()
            .ok_or_else(|| args.reject("letter", "expected a single ASCII letter"))?;
        Ok(Box::new(Self {
            letter,
            frequency: args.count("let_frequency")?,
            relation: args.relation("let_relation")?,
            case_sensitive: args.flag("case_sensitive")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        let letter = char::from(rng.gen_range(b'a'..=b'z'));
        Params::new()
            .with("letter", letter.to_string())
            .with("let_frequency", sample_count(rng, 1, MAX_LETTER_FREQUENCY))
            .with("let_relation", sample_relation(rng))
    }
}

impl Instruction for LetterFrequency {
    fn describe(&self) -> String {
        format!(
            "In your response, the letter {} should appear {} {} times.",
            self.letter, self.relation, self.frequency
        )
    }

    fn check(&self, response: &str) -> bool {
        let count = metrics::letter_frequency(response, self.letter, self.case_sensitive);
        self.relation.holds(count, self.frequency)
    }
}
