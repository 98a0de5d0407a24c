//! `change_case:` instructions: letter case, writing system and register.

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;

use super::{
    relation_param, sample_count, sample_relation, Args, Conflicts, Instruction, InstructionError,
    InstructionKind, ParamSpec, ParamType, Relation,
};
use crate::langid;
use crate::metrics;
use crate::types::Params;

lazy_static! {
    /// Polite-form (です/ます調) markers.
    static ref POLITE_FORM: Regex = Regex::new(
        r"です|ます|である|ございます|いらっしゃ|させていただ|お[^。\n]*になる"
    )
    .unwrap();
}

const MAX_CAPITAL_WORDS: usize = 20;

const CAPITAL_FREQUENCY_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("capital_frequency", ParamType::Count),
    relation_param("capital_relation"),
];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "change_case:english_capital",
            &[],
            Conflicts::With(&["change_case:english_lowercase"]),
            EnglishCase::build_capital,
            no_params,
        ),
        InstructionKind::new(
            "change_case:english_lowercase",
            &[],
            Conflicts::With(&["change_case:capital_word_frequency"]),
            EnglishCase::build_lowercase,
            no_params,
        ),
        InstructionKind::new(
            "change_case:capital_word_frequency",
            CAPITAL_FREQUENCY_PARAMS,
            Conflicts::With(&[]),
            WordFrequency::build_capital,
            WordFrequency::sample,
        ),
        InstructionKind::new(
            "change_case:japanese_hiragana",
            &[],
            Conflicts::With(&[
                "change_case:japanese_casual",
                "change_case:katakana_word_frequency",
            ]),
            HiraganaOnly::build,
            no_params,
        ),
        InstructionKind::new(
            "change_case:japanese_casual",
            &[],
            Conflicts::With(&[]),
            CasualJapanese::build,
            no_params,
        ),
        InstructionKind::new(
            "change_case:katakana_word_frequency",
            CAPITAL_FREQUENCY_PARAMS,
            Conflicts::With(&[]),
            WordFrequency::build_katakana,
            WordFrequency::sample,
        ),
    ]
}

fn no_params(_rng: &mut dyn RngCore) -> Params {
    Params::new()
}

/// Entire response in one letter case, English or undetermined language.
pub struct EnglishCase {
    upper: bool,
}

impl EnglishCase {
    fn build_capital(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self { upper: true }))
    }

    fn build_lowercase(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self { upper: false }))
    }
}

impl Instruction for EnglishCase {
    fn describe(&self) -> String {
        if self.upper {
            "Your entire response should be in English, and in all capital letters.".to_string()
        } else {
            "Your entire response should be in English, and in all lowercase letters. No \
             capital letters are allowed."
                .to_string()
        }
    }

    fn check(&self, response: &str) -> bool {
        let cased = if self.upper {
            metrics::is_all_uppercase(response)
        } else {
            metrics::is_all_lowercase(response)
        };
        cased && matches!(langid::detect_language(response), None | Some("en"))
    }
}

/// Count of capitalized words or katakana words compared against a threshold.
pub struct WordFrequency {
    threshold: usize,
    relation: Relation,
    katakana: bool,
}

impl WordFrequency {
    fn build(args: &Args<'_>, katakana: bool) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            threshold: args.count("capital_frequency")?,
            relation: args.relation("capital_relation")?,
            katakana,
        }))
    }

    fn build_capital(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Self::build(args, false)
    }

    fn build_katakana(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Self::build(args, true)
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new()
            .with("capital_frequency", sample_count(rng, 1, MAX_CAPITAL_WORDS))
            .with("capital_relation", sample_relation(rng))
    }
}

impl Instruction for WordFrequency {
    fn describe(&self) -> String {
        if self.katakana {
            format!(
                "In your response, katakana words should appear {} {} times.",
                self.relation, self.threshold
            )
        } else {
            format!(
                "In your response, words with all capital letters should appear {} {} times.",
                self.relation, self.threshold
            )
        }
    }

    fn check(&self, response: &str) -> bool {
        let count = if self.katakana {
            metrics::count_katakana_words(response)
        } else {
            metrics::count_capital_words(response)
        };
        self.relation.holds(count, self.threshold)
    }
}

fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{309F}')
}

fn is_katakana_letter(c: char) -> bool {
    matches!(c, '\u{30A1}'..='\u{30FA}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9D}')
}

fn is_kanji(c: char) -> bool {
    matches!(c, '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}')
}

/// Japanese written in hiragana only.
pub struct HiraganaOnly;

impl HiraganaOnly {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }
}

impl Instruction for HiraganaOnly {
    fn describe(&self) -> String {
        "Write your entire response in hiragana only. Do not use kanji or katakana.".to_string()
    }

    fn check(&self, response: &str) -> bool {
        response.chars().any(is_hiragana)
            && !response
                .chars()
                .any(|c| is_kanji(c) || is_katakana_letter(c))
    }
}

/// Japanese in the plain (casual) register.
pub struct CasualJapanese;

impl CasualJapanese {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }
}

impl Instruction for CasualJapanese {
    fn describe(&self) -> String {
        "Write your response in casual Japanese without polite forms such as desu or masu."
            .to_string()
    }

    fn check(&self, response: &str) -> bool {
        !POLITE_FORM.is_match(response)
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
    fn test_english_capital() {
        let bound = bind("change_case:english_capital", Params::new());
        assert!(bound.check("HELLO WORLD"));
        assert!(!bound.check("Hello World"));
        assert!(!bound.check("1234"));
    }

    #[test]
    fn test_english_lowercase() {
        let bound = bind("change_case:english_lowercase", Params::new());
        assert!(bound.check("this is all lowercase text, and it is written the way that most people write their notes."));
        assert!(!bound.check("not All lowercase"));
    }

    #[test]
    fn test_capital_word_frequency() {
        let bound = bind(
            "change_case:capital_word_frequency",
            Params::new()
                .with("capital_frequency", 2)
                .with("capital_relation", "at most"),
        );
        assert!(bound.check("This is VERY important, OK?"));
        assert!(!bound.check("THIS is VERY important, OK?"));
    }

    #[test]
    fn test_katakana_word_frequency() {
        let bound = bind(
            "change_case:katakana_word_frequency",
            Params::new().with("capital_frequency", 2),
        );
        assert!(bound.check("コーヒーとケーキをください"));
        assert!(!bound.check("コーヒーをください"));
    }

    #[test]
    fn test_hiragana_only() {
        let bound = bind("change_case:japanese_hiragana", Params::new());
        assert!(bound.check("きょうは とても いい てんきですね。"));
        assert!(bound.check("らーめんが すき"));
        assert!(!bound.check("今日は いい てんき"));
        assert!(!bound.check("コーヒーが すき"));
        assert!(!bound.check("no japanese at all"));
    }

    #[test]
    fn test_japanese_casual() {
        let bound = bind("change_case:japanese_casual", Params::new());
        assert!(bound.check("きょうは いい てんきだね。"));
        assert!(!bound.check("今日はいい天気ですね。"));
        assert!(!bound.check("明日行きます。"));
        assert!(!bound.check("先生がお帰りになる。"));
    }
}
