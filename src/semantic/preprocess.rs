//! Text normalization shared by corpus loading and query handling.
//!
//! Produces the canonical search form of a phrase:
//! 1. Lowercase (Unicode-aware) and compose to NFC
//! 2. Fold `ё` into `е`
//! 3. Replace punctuation and symbols with spaces; combining marks stay
//!    attached to the word they follow
//! 4. Collapse whitespace runs and trim
//!
//! Both the embedding input and the keyword matcher consume this form, so
//! a phrase and a query must always go through the same function.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize raw phrase or query text into its canonical search form.
///
/// Total and idempotent: `normalize_phrase(&normalize_phrase(x)) == normalize_phrase(x)`.
/// Empty or whitespace-only input yields an empty string.
pub fn normalize_phrase(text: &str) -> String {
    let lowered: String = text.chars().flat_map(char::to_lowercase).collect();

    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;
    let mut in_word = false;

    for ch in lowered.nfc().map(fold_char) {
        if is_combining_mark(ch) {
            // a mark with no word before it is dropped
            if in_word {
                out.push(ch);
            }
        } else if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            in_word = true;
            out.push(ch);
        } else {
            pending_space = true;
            in_word = false;
        }
    }

    out
}

fn fold_char(ch: char) -> char {
    match ch {
        'ё' => 'е',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_phrase(""), "");
        assert_eq!(normalize_phrase("   \t\n"), "");
        assert_eq!(normalize_phrase("?!..."), "");
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(normalize_phrase("Hello World"), "hello world");
        assert_eq!(normalize_phrase("ПРИВЕТ Мир"), "привет мир");
    }

    #[test]
    fn test_collapses_whitespace_and_trims() {
        assert_eq!(normalize_phrase("  hello \t\n  world  "), "hello world");
    }

    #[test]
    fn test_punctuation_becomes_separator() {
        assert_eq!(normalize_phrase("Hello, world!"), "hello world");
        assert_eq!(normalize_phrase("a-b/c"), "a b c");
        assert_eq!(normalize_phrase("«Ваш звонок очень важен»"), "ваш звонок очень важен");
    }

    #[test]
    fn test_folds_yo() {
        assert_eq!(normalize_phrase("Ещё Ёлка"), "еще елка");
    }

    #[test]
    fn test_decomposed_letters_compose() {
        // и + combining breve
        assert_eq!(normalize_phrase("мои\u{0306} дом"), normalize_phrase("мой дом"));
        assert_eq!(normalize_phrase("мои\u{0306} дом"), "мой дом");
        // е + combining diaeresis folds like ё
        assert_eq!(normalize_phrase("Е\u{0308}лка"), "елка");
        assert_eq!(normalize_phrase("cafe\u{0301}"), "caf\u{e9}");
    }

    #[test]
    fn test_combining_marks_stay_in_word() {
        // no precomposed form exists for q + acute
        assert_eq!(normalize_phrase("q\u{0301}x y"), "q\u{0301}x y");
        assert_eq!(normalize_phrase("ab\u{0301}\u{0323}c"), normalize_phrase("ab\u{0323}\u{0301}c"));
    }

    #[test]
    fn test_leading_combining_mark_dropped() {
        assert_eq!(normalize_phrase("\u{0301}hello"), "hello");
        assert_eq!(normalize_phrase("hi, \u{0301}there"), "hi there");
        assert_eq!(normalize_phrase("\u{0301}"), "");
    }

    #[test]
    fn test_keeps_digits() {
        assert_eq!(normalize_phrase("Call 911 now"), "call 911 now");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "Hello, World!",
            "  Ещё  раз -- проверка ",
            "Straße İstanbul",
            "tabs\tand\nnewlines",
            "ÀÉÎ õü",
            "мои\u{0306} е\u{0308}ж",
            "q\u{0301}x \u{0301}y",
        ];
        for sample in samples {
            let once = normalize_phrase(sample);
            assert_eq!(normalize_phrase(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_substring_of_normalized_is_fixed_point() {
        let normalized = normalize_phrase("Hello wonderful world");
        for start in 0..normalized.len() {
            for end in start + 1..=normalized.len() {
                if let Some(sub) = normalized.get(start..end) {
                    let renormalized = normalize_phrase(sub);
                    assert!(
                        normalized.contains(&renormalized),
                        "{sub:?} normalized to {renormalized:?}"
                    );
                }
            }
        }
    }
}
