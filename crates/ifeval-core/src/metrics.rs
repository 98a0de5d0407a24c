//! Text-metric utilities shared by instruction checkers.
//!
//! Every counting concept a checker relies on (what a word, a sentence or a
//! paragraph is) is defined here once, so two instructions that share a
//! concept always agree on it.
//!
//! ## Segmentation rules
//!
//! - **Word**: a whitespace-delimited token containing at least one
//!   alphanumeric character. Punctuation-only tokens (`-`, `...`, `*`) are
//!   not words.
//! - **Sentence**: text ending at a cluster of `.`, `!` or `?` (optionally
//!   followed by closing quotes or brackets) that is followed by whitespace
//!   or the end of the text. A cluster made only of dots does not end a
//!   sentence after a known abbreviation, a single-letter initial, a list
//!   enumerator at the start of a line, or a dotted acronym followed by a
//!   lowercase word. The end of the text always ends a sentence. Newlines
//!   are ordinary whitespace.
//! - **Paragraph**: a block separated from its neighbours by one or more
//!   blank (empty or whitespace-only) lines.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // SEGMENTATION PATTERNS
    // =========================================================================

    /// One or more blank lines between two paragraphs.
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\r?\n(?:[^\S\r\n]*\r?\n)+").unwrap();

    /// A katakana word, optionally lengthened with the prolonged sound mark.
    static ref KATAKANA_WORD: Regex =
        Regex::new(r"[\x{30A1}-\x{30F6}][\x{30A1}-\x{30F6}\x{30FC}]*").unwrap();
}

/// Lowercased abbreviations whose trailing dot never ends a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "approx", "dept", "fig", "no",
];

const OPENING_PUNCTUATION: &[char] = &['(', '[', '{', '"', '\'', '\u{201C}', '\u{2018}'];

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '}' | '\u{201D}' | '\u{2019}')
}

/// CJK ideographs and kana. Scripts written without spaces have no word
/// boundaries, so these never count as word characters for matching.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF66}'..='\u{FF9F}')
}

/// Word character for whole-word matching.
pub fn is_word_char(c: char) -> bool {
    (c.is_alphanumeric() || c == '_') && !is_cjk(c)
}

fn has_alphanumeric(s: &str) -> bool {
    s.chars().any(char::is_alphanumeric)
}

// =========================================================================
// WORDS
// =========================================================================

/// Whitespace-delimited tokens that contain at least one alphanumeric character.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace().filter(|token| has_alphanumeric(token))
}

/// Count words in `text`.
pub fn count_words(text: &str) -> usize {
    words(text).count()
}

/// Count words written entirely in capital letters.
///
/// Surrounding punctuation is ignored; a hyphenated token counts once.
pub fn count_capital_words(text: &str) -> usize {
    words(text)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| is_all_uppercase(w))
        .count()
}

/// Count katakana words (runs of katakana letters).
pub fn count_katakana_words(text: &str) -> usize {
    KATAKANA_WORD.find_iter(text).count()
}

// =========================================================================
// SENTENCES
// =========================================================================

/// Split `text` into trimmed sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }

        let cluster_start = chars[i].0;
        let mut j = i;
        while j < chars.len() && is_terminal(chars[j].1) {
            j += 1;
        }
        let only_dots = chars[i..j].iter().all(|&(_, c)| c == '.');
        while j < chars.len() && is_closing(chars[j].1) {
            j += 1;
        }

        let end = chars.get(j).map(|&(offset, _)| offset).unwrap_or(text.len());
        let followed_by_space = chars.get(j).map_or(true, |&(_, c)| c.is_whitespace());

        if followed_by_space {
            let rest = &text[end..];
            let at_end = rest.trim().is_empty();
            if at_end || !only_dots || !dot_continues_sentence(&text[start..cluster_start], rest) {
                push_sentence(&mut sentences, &text[start..end]);
                start = end;
            }
        }

        i = j;
    }

    push_sentence(&mut sentences, &text[start..]);
    sentences
}

/// Count sentences in `text`.
pub fn count_sentences(text: &str) -> usize {
    split_sentences(text).len()
}

fn push_sentence<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if has_alphanumeric(trimmed) {
        sentences.push(trimmed);
    }
}

/// Decide whether a dot-only cluster belongs to the word before it rather
/// than ending the sentence.
///
/// `before` is the current sentence up to the dots; `after` is the text
/// following the cluster.
fn dot_continues_sentence(before: &str, after: &str) -> bool {
    let token = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(OPENING_PUNCTUATION);
    if token.is_empty() {
        return false;
    }

    let lower = token.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }

    let mut letters = token.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        if first.is_alphabetic() {
            return true;
        }
    }

    if token.chars().all(|c| c.is_ascii_digit()) {
        let line_start = before[..before.len() - token.len()]
            .rsplit('\n')
            .next()
            .map_or(true, |prefix| prefix.trim().is_empty());
        return line_start;
    }

    if token.contains('.') {
        let next_upper = after
            .trim_start()
            .trim_start_matches(OPENING_PUNCTUATION)
            .chars()
            .next()
            .map_or(false, char::is_uppercase);
        return !next_upper;
    }

    false
}

// =========================================================================
// PARAGRAPHS
// =========================================================================

/// Split `text` into trimmed, non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Count paragraphs in `text`.
pub fn count_paragraphs(text: &str) -> usize {
    split_paragraphs(text).len()
}

// =========================================================================
// FREQUENCIES
// =========================================================================

/// Count occurrences of a single character.
pub fn letter_frequency(text: &str, letter: char, case_sensitive: bool) -> usize {
    if case_sensitive {
        text.chars().filter(|&c| c == letter).count()
    } else {
        text.chars()
            .filter(|c| c.to_lowercase().eq(letter.to_lowercase()))
            .count()
    }
}

/// Count case-insensitive whole-word occurrences of a literal keyword.
///
/// A match inside a longer word does not count: `cat` is not found in
/// `category`. The boundary test applies only on a side where the keyword
/// itself starts or ends with a word character.
pub fn keyword_frequency(text: &str, keyword: &str) -> usize {
    let keyword = keyword.trim();
    let (Some(first), Some(last)) = (keyword.chars().next(), keyword.chars().last()) else {
        return 0;
    };

    let Ok(pattern) = Regex::new(&format!("(?i){}", regex::escape(keyword))) else {
        return 0;
    };

    pattern
        .find_iter(text)
        .filter(|m| {
            let left_ok = !is_word_char(first)
                || !text[..m.start()].chars().next_back().map_or(false, is_word_char);
            let right_ok = !is_word_char(last)
                || !text[m.end()..].chars().next().map_or(false, is_word_char);
            left_ok && right_ok
        })
        .count()
}

// =========================================================================
// CASING
// =========================================================================

/// At least one cased character and no lowercase character.
pub fn is_all_uppercase(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// At least one cased character and no uppercase character.
pub fn is_all_lowercase(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_uppercase() {
            return false;
        }
        if c.is_lowercase() {
            cased = true;
        }
    }
    cased
}
