//! Language identification.
//!
//! Thin wrapper over `whatlang` that speaks ISO 639-1 codes. Detection is
//! deterministic. Only text too short to identify, or text the detector
//! cannot place at all, is undetermined (`None`); callers decide what
//! undetermined means for them.

use whatlang::Lang;

/// Below this many alphabetic characters the text is not identified.
pub const MIN_ALPHABETIC_CHARS: usize = 16;

/// Supported languages: ISO 639-1 code, English name, detector language.
pub const SUPPORTED_LANGUAGES: &[(&str, &str, Lang)] = &[
    ("en", "English", Lang::Eng),
    ("es", "Spanish", Lang::Spa),
    ("pt", "Portuguese", Lang::Por),
    ("ar", "Arabic", Lang::Ara),
    ("hi", "Hindi", Lang::Hin),
    ("fr", "French", Lang::Fra),
    ("ru", "Russian", Lang::Rus),
    ("de", "German", Lang::Deu),
    ("ja", "Japanese", Lang::Jpn),
    ("it", "Italian", Lang::Ita),
    ("bn", "Bengali", Lang::Ben),
    ("uk", "Ukrainian", Lang::Ukr),
    ("th", "Thai", Lang::Tha),
    ("ur", "Urdu", Lang::Urd),
    ("ta", "Tamil", Lang::Tam),
    ("te", "Telugu", Lang::Tel),
    ("bg", "Bulgarian", Lang::Bul),
    ("ko", "Korean", Lang::Kor),
    ("pl", "Polish", Lang::Pol),
    ("he", "Hebrew", Lang::Heb),
    ("fa", "Persian", Lang::Pes),
    ("vi", "Vietnamese", Lang::Vie),
    ("ne", "Nepali", Lang::Nep),
    ("kn", "Kannada", Lang::Kan),
    ("mr", "Marathi", Lang::Mar),
    ("gu", "Gujarati", Lang::Guj),
    ("pa", "Punjabi", Lang::Pan),
    ("ml", "Malayalam", Lang::Mal),
    ("fi", "Finnish", Lang::Fin),
    ("zh", "Chinese", Lang::Cmn),
    ("nl", "Dutch", Lang::Nld),
    ("tr", "Turkish", Lang::Tur),
    ("sv", "Swedish", Lang::Swe),
];

/// English name of a supported language code.
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, _)| *name)
}

/// Whether `code` is a supported ISO 639-1 code.
pub fn is_supported(code: &str) -> bool {
    language_name(code).is_some()
}

/// Detect the language of `text`.
///
/// Supported languages come back as their ISO 639-1 code. Anything else the
/// detector recognizes comes back as its ISO 639-3 code, which never equals
/// a supported code. Low-confidence guesses are kept: short answers are
/// still judged by their best guess.
pub fn detect_language(text: &str) -> Option<&'static str> {
    if text.chars().filter(|c| c.is_alphabetic()).count() < MIN_ALPHABETIC_CHARS {
        return None;
    }

    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        tracing::debug!(lang = ?info.lang(), confidence = info.confidence(), "low-confidence language detection");
    }

    let code = SUPPORTED_LANGUAGES
        .iter()
        .find(|(_, _, lang)| *lang == info.lang())
        .map_or_else(|| info.lang().code(), |(code, _, _)| *code);
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_table() {
        assert_eq!(language_name("en"), Some("English"));
        assert_eq!(language_name("ja"), Some("Japanese"));
        assert!(is_supported("fr"));
        assert!(!is_supported("xx"));
    }

    #[test]
    fn test_short_text_undetermined() {
        assert_eq!(detect_language("HELLO WORLD"), None);
        assert_eq!(detect_language(""), None);
    }

    #[test]
    fn test_detect_english() {
        let text = "The quick brown fox jumps over the lazy dog while the farmer watches \
                    from the porch and wonders whether the weather will hold until evening.";
        assert_eq!(detect_language(text), Some("en"));
    }

    #[test]
    fn test_short_sentence_still_detected() {
        for text in [
            "I think that is a good idea.",
            "THE WEATHER IS NICE TODAY AND I AM GOING OUT.",
        ] {
            let detected = detect_language(text);
            assert!(detected.is_some(), "{text:?} left undetermined");
            assert_ne!(detected, Some("ja"));
        }
    }

    #[test]
    fn test_detect_japanese() {
        let text = "今日はとても良い天気ですね。公園に散歩に行きましょう。";
        assert_eq!(detect_language(text), Some("ja"));
    }
}
