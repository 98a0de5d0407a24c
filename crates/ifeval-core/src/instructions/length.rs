//! `length_constraints:` instructions.

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;

use super::{
    relation_param, sample_count, sample_keywords, sample_relation, Args, Conflicts, Instruction,
    InstructionError, InstructionKind, ParamSpec, ParamType, Relation,
};
use crate::metrics;
use crate::types::Params;

lazy_static! {
    /// Markdown divider between paragraphs.
    static ref PARAGRAPH_DIVIDER: Regex = Regex::new(r"\s?\*\*\*\s?").unwrap();
}

const MAX_SENTENCES: usize = 20;
const MAX_PARAGRAPHS: usize = 5;
const MIN_WORDS: usize = 100;
const MAX_WORDS: usize = 500;

const SENTENCES_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("num_sentences", ParamType::Count),
    relation_param("relation"),
];

const WORDS_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("num_words", ParamType::Count),
    relation_param("relation"),
];

const DIVIDED_PARAGRAPHS_PARAMS: &[ParamSpec] =
    &[ParamSpec::required("num_paragraphs", ParamType::Positive)];

const PARAGRAPH_COUNT_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("num_paragraphs", ParamType::Count),
    relation_param("relation"),
];

const FIRST_WORD_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("num_paragraphs", ParamType::Positive),
    ParamSpec::required("nth_paragraph", ParamType::Positive),
    ParamSpec::required("first_word", ParamType::Text),
];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "length_constraints:number_sentences",
            SENTENCES_PARAMS,
            Conflicts::With(&[]),
            SentenceCount::build,
            SentenceCount::sample,
        ),
        InstructionKind::new(
            "length_constraints:number_words",
            WORDS_PARAMS,
            Conflicts::With(&[]),
            WordCount::build,
            WordCount::sample,
        ),
        InstructionKind::new(
            "length_constraints:number_paragraphs",
            DIVIDED_PARAGRAPHS_PARAMS,
            Conflicts::With(&[
                "length_constraints:nth_paragraph_first_word",
                "length_constraints:paragraph_count",
            ]),
            DividedParagraphs::build,
            DividedParagraphs::sample,
        ),
        InstructionKind::new(
            "length_constraints:paragraph_count",
            PARAGRAPH_COUNT_PARAMS,
            Conflicts::With(&["length_constraints:nth_paragraph_first_word"]),
            ParagraphCount::build,
            ParagraphCount::sample,
        ),
        InstructionKind::new(
            "length_constraints:nth_paragraph_first_word",
            FIRST_WORD_PARAMS,
            Conflicts::With(&["length_constraints:number_paragraphs"]),
            ParagraphFirstWord::build,
            ParagraphFirstWord::sample,
        ),
    ]
}

/// Sentence count compared against a threshold.
pub struct SentenceCount {
    threshold: usize,
    relation: Relation,
}

impl SentenceCount {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            threshold: args.count("num_sentences")?,
            relation: args.relation("relation")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new()
            .with("num_sentences", sample_count(rng, 1, MAX_SENTENCES))
            .with("relation", sample_relation(rng))
    }
}

impl Instruction for SentenceCount {
    fn describe(&self) -> String {
        format!(
            "Your response should contain {} {} sentences.",
            self.relation, self.threshold
        )
    }

    fn check(&self, response: &str) -> bool {
        self.relation
            .holds(metrics::count_sentences(response), self.threshold)
    }
}

/// Word count compared against a threshold.
pub struct WordCount {
    threshold: usize,
    relation: Relation,
}

impl WordCount {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            threshold: args.count("num_words")?,
            relation: args.relation("relation")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new()
            .with("num_words", sample_count(rng, MIN_WORDS, MAX_WORDS))
            .with("relation", sample_relation(rng))
    }
}

impl Instruction for WordCount {
    fn describe(&self) -> String {
        format!("Answer with {} {} words.", self.relation, self.threshold)
    }

    fn check(&self, response: &str) -> bool {
        self.relation
            .holds(metrics::count_words(response), self.threshold)
    }
}

/// Exactly N paragraphs separated by the `***` divider.
pub struct DividedParagraphs {
    expected: usize,
}

impl DividedParagraphs {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            expected: args.count("num_paragraphs")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("num_paragraphs", sample_count(rng, 1, MAX_PARAGRAPHS))
    }
}

impl Instruction for DividedParagraphs {
    fn describe(&self) -> String {
        format!(
            "There should be {} paragraphs. Paragraphs are separated with the markdown divider: ***",
            self.expected
        )
    }

    fn check(&self, response: &str) -> bool {
        let parts: Vec<&str> = PARAGRAPH_DIVIDER.split(response).collect();
        let last = parts.len() - 1;
        let mut count = parts.len();

        for (index, part) in parts.iter().enumerate() {
            if part.trim().is_empty() {
                if index == 0 || index == last {
                    count -= 1;
                } else {
                    return false;
                }
            }
        }

        count == self.expected
    }
}

/// Blank-line separated paragraph count compared against a threshold.
pub struct ParagraphCount {
    threshold: usize,
    relation: Relation,
}

impl ParagraphCount {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            threshold: args.count("num_paragraphs")?,
            relation: args.relation("relation")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new()
            .with("num_paragraphs", sample_count(rng, 1, MAX_PARAGRAPHS))
            .with("relation", sample_relation(rng))
    }
}

impl Instruction for ParagraphCount {
    fn describe(&self) -> String {
        format!(
            "Your response should contain {} {} paragraphs. Separate paragraphs with a blank line.",
            self.relation, self.threshold
        )
    }

    fn check(&self, response: &str) -> bool {
        self.relation
            .holds(metrics::count_paragraphs(response), self.threshold)
    }
}

/// Exactly N blank-line paragraphs, the nth starting with a given word.
pub struct ParagraphFirstWord {
    num_paragraphs: usize,
    nth: usize,
    first_word: String,
}

impl ParagraphFirstWord {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        let num_paragraphs = args.count("num_paragraphs")?;
        let nth = args.count("nth_paragraph")?;
        if nth > num_paragraphs {
            return Err(args.reject(
                "nth_paragraph",
                format!("paragraph {} does not exist among {}", nth, num_paragraphs),
            ));
        }
        Ok(Box::new(Self {
            num_paragraphs,
            nth,
            first_word: args.text("first_word")?.to_lowercase(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        let num_paragraphs = sample_count(rng, 1, MAX_PARAGRAPHS);
        let nth = sample_count(rng, 1, num_paragraphs);
        Params::new()
            .with("num_paragraphs", num_paragraphs)
            .with("nth_paragraph", nth)
            .with("first_word", sample_keywords(rng, 1).remove(0))
    }
}

/// First word of a paragraph: leading quotes dropped, cut at the first
/// punctuation mark, lowercased.
fn leading_word(paragraph: &str) -> String {
    let token = paragraph
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches(['\'', '"']);
    token
        .chars()
        .take_while(|c| !matches!(c, '.' | ',' | '?' | '!' | '\'' | '"' | ':' | ';'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Instruction for ParagraphFirstWord {
    fn describe(&self) -> String {
        format!(
            "There should be {} paragraphs. Paragraphs and only paragraphs are separated \
             with each other by two new lines. Paragraph {} must start with word {}.",
            self.num_paragraphs, self.nth, self.first_word
        )
    }

    fn check(&self, response: &str) -> bool {
        let paragraphs = metrics::split_paragraphs(response);
        if paragraphs.len() != self.num_paragraphs {
            return false;
        }
        paragraphs
            .get(self.nth - 1)
            .map_or(false, |p| leading_word(p) == self.first_word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::BoundInstruction;

    fn bind(id: &str, params: Params) -> BoundInstruction {
        kinds()
            .into_iter()
            .find(|k| k.id() == id)
            .unwrap()
            .bind(&params)
            .unwrap()
    }

    #[test]
    fn test_number_words_boundary() {
        let at_least = bind(
            "length_constraints:number_words",
            Params::new().with("num_words", 5),
        );
        assert!(at_least.check("one two three four five"));
        assert!(!at_least.check("one two three four"));

        let less_than = bind(
            "length_constraints:number_words",
            Params::new().with("num_words", 5).with("relation", "less than"),
        );
        assert!(!less_than.check("one two three four five"));
        assert!(less_than.check("one two three four"));
        assert_eq!(less_than.describe(), "Answer with less than 5 words.");
    }

    #[test]
    fn test_number_sentences() {
        let bound = bind(
            "length_constraints:number_sentences",
            Params::new()
                .with("num_sentences", 2)
                .with("relation", "at most"),
        );
        assert!(bound.check("Ask Dr. Smith. He knows."));
        assert!(!bound.check("One. Two. Three."));
    }

    #[test]
    fn test_divided_paragraphs() {
        let bound = bind(
            "length_constraints:number_paragraphs",
            Params::new().with("num_paragraphs", 3),
        );
        assert!(bound.check("first\n***\nsecond\n***\nthird"));
        assert!(bound.check("***\nfirst ***second*** third\n***"));
        assert!(!bound.check("first\n***\n***\nthird"));
        assert!(!bound.check("first\n***\nsecond"));
    }

    #[test]
    fn test_paragraph_count() {
        let bound = bind(
            "length_constraints:paragraph_count",
            Params::new()
                .with("num_paragraphs", 2)
                .with("relation", "exactly"),
        );
        assert!(bound.check("one\n\ntwo"));
        assert!(!bound.check("one\ntwo"));
    }

    #[test]
    fn test_nth_paragraph_first_word() {
        let bound = bind(
            "length_constraints:nth_paragraph_first_word",
            Params::new()
                .with("num_paragraphs", 2)
                .with("nth_paragraph", 2)
                .with("first_word", "Summer"),
        );
        assert!(bound.check("Intro text here.\n\n\"Summer, it seems, is over.\""));
        assert!(!bound.check("Intro text here.\n\nWinter is here."));
        assert!(!bound.check("Summer one.\n\nSummer two.\n\nSummer three."));
    }

    #[test]
    fn test_nth_beyond_paragraphs_is_invalid() {
        let kind = kinds()
            .into_iter()
            .find(|k| k.id() == "length_constraints:nth_paragraph_first_word")
            .unwrap();
        let err = kind
            .bind(
                &Params::new()
                    .with("num_paragraphs", 2)
                    .with("nth_paragraph", 3)
                    .with("first_word", "a"),
            )
            .unwrap_err();
        assert!(matches!(err, InstructionError::InvalidParameter { .. }));
    }
}
