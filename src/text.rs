//! Text primitives: sentence segmentation, tokenization, syllable counting,
//! paragraph splitting, and dialogue extraction.
//!
//! Everything here is pure and panic-free; analyzers and the extractor build
//! on these instead of re-implementing segmentation ad hoc. Offsets are byte
//! offsets into the input text (stable for slicing with `&text[start..end]`).

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z']*").expect("word regex"));

static DIALOGUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["\u{201C}]([^"\u{201C}\u{201D}]*)["\u{201D}]"#).expect("dialogue regex"));

/// A span of text with its byte offsets in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split text into sentences.
///
/// A boundary is `.`, `!` or `?` (one or more) followed by whitespace and an
/// uppercase letter or an opening quote. Returns trimmed sentence strings.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_spans(text).into_iter().map(|s| s.text).collect()
}

/// Split text into sentences, keeping byte offsets.
pub fn sentence_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == '.' || c == '!' || c == '?' {
            // Swallow runs of terminal punctuation ("?!", "...").
            let mut j = i + 1;
            while j < bytes.len() && matches!(bytes[j] as char, '.' | '!' | '?') {
                j += 1;
            }
            // Boundary requires whitespace then uppercase or a quote.
            let mut k = j;
            while k < bytes.len() && (bytes[k] as char).is_whitespace() {
                k += 1;
            }
            let is_boundary = k > j
                && (k >= bytes.len() || {
                    let next = text[k..].chars().next().unwrap_or(' ');
                    next.is_uppercase() || next == '"' || next == '\u{201C}' || next == '\''
                });
            if is_boundary || k >= bytes.len() {
                push_span(text, start, j, &mut spans);
                start = k;
                i = k;
                continue;
            }
            i = j;
        } else {
            i += 1;
        }
    }

    if start < bytes.len() {
        push_span(text, start, bytes.len(), &mut spans);
    }

    spans
}

fn push_span(text: &str, start: usize, end: usize, out: &mut Vec<Span>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    let trail = raw.len() - raw.trim_end().len();
    out.push(Span {
        text: trimmed.to_string(),
        start: start + lead,
        end: end - trail,
    });
}

/// Tokenize text into words (word characters plus internal apostrophes).
/// Punctuation is ignored; positions are preserved via `word_spans`.
pub fn tokenize_words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Tokenize text into words with byte offsets.
pub fn word_spans(text: &str) -> Vec<Span> {
    WORD_RE
        .find_iter(text)
        .map(|m| Span {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Count words in text.
pub fn count_words(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

/// Count alphabetic characters in text (for Coleman-Liau / ARI).
pub fn count_letters(text: &str) -> usize {
    text.chars().filter(|c| c.is_ascii_alphabetic()).count()
}

/// Estimate syllables in a single word.
///
/// Vowel-group heuristic: count vowel runs, subtract a silent terminal `e`,
/// add one for `-le` after a consonant, subtract one for `-ed` unless the
/// preceding letter is `d` or `t`. Words of three or fewer letters count as
/// one syllable; the result is never below 1.
pub fn syllables_in_word(word: &str) -> usize {
    let word = word.to_lowercase();
    let word = word.trim();
    if word.len() <= 3 {
        return 1;
    }

    let is_vowel = |c: char| "aeiouy".contains(c);
    let chars: Vec<char> = word.chars().collect();

    let mut count = 0usize;
    let mut prev_vowel = false;
    for &c in &chars {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }

    if word.ends_with('e') && count > 1 {
        count -= 1;
    }

    if word.ends_with("le") && chars.len() > 2 && !is_vowel(chars[chars.len() - 3]) {
        count += 1;
    }

    if word.ends_with("ed") && count > 1 && chars.len() > 3 {
        let before = chars[chars.len() - 3];
        if before != 'd' && before != 't' {
            count -= 1;
        }
    }

    count.max(1)
}

/// Count total syllables across all words in text.
pub fn count_syllables(text: &str) -> usize {
    WORD_RE
        .find_iter(text)
        .map(|m| syllables_in_word(m.as_str()))
        .sum()
}

/// Count complex words (3+ syllables), excluding words whose complexity comes
/// only from a simple suffix. Used by the Gunning Fog index.
pub fn count_complex_words(text: &str) -> usize {
    const SIMPLE_SUFFIXES: [&str; 6] = ["ing", "ed", "es", "ly", "er", "est"];

    WORD_RE
        .find_iter(text)
        .filter(|m| {
            let word = m.as_str().to_lowercase();
            if syllables_in_word(&word) < 3 {
                return false;
            }
            for suffix in SIMPLE_SUFFIXES {
                if let Some(base) = word.strip_suffix(suffix) {
                    if syllables_in_word(base) < 3 {
                        return false;
                    }
                }
            }
            true
        })
        .count()
}

/// Split text into paragraphs on blank lines. Returns trimmed, non-empty
/// paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                paragraphs.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_string());
    }

    paragraphs
}

/// Extract dialogue spans from text.
///
/// Matches straight and curly double-quote pairs; matches of two characters
/// or fewer are discarded (scare quotes, stray marks). The span covers the
/// full quoted region including the quote marks; `text` holds the inner
/// dialogue only.
pub fn dialogue_spans(text: &str) -> Vec<Span> {
    DIALOGUE_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let inner = cap.get(1)?;
            if inner.as_str().chars().count() <= 2 {
                return None;
            }
            let whole = cap.get(0)?;
            Some(Span {
                text: inner.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}
