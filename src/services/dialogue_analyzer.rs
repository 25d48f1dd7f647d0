//! Dialogue analyzer: attribution balance (said-ism), impossible tags,
//! crutch words, punctuation overuse, and dialogue-to-narrative ratio.
//!
//! Attribution philosophy: 'said' is largely invisible to readers, fancy
//! tags draw attention, action beats show character while carrying
//! attribution. The analyzer reports balance against those benchmarks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::patterns::{
    ACTION_BEAT_VERBS, ALTERNATIVE_TAGS, DIALOGUE_CRUTCHES, FANCY_TAGS, IMPOSSIBLE_TAGS,
    INVISIBLE_TAGS,
};
use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::{dialogue_spans, Span};

/// Attribution counting over inflected tag lists is fairly reliable.
const ANALYZER_CONFIDENCE: f64 = 0.7;
const FANCY_WARNING_PCT: f64 = 10.0;
const FANCY_INFO_PCT: f64 = 5.0;
const ACTION_BEAT_MIN_PCT: f64 = 15.0;
const INVISIBLE_MAX_PCT: f64 = 80.0;
const HIGH_DIALOGUE_RATIO: f64 = 0.7;
const LOW_DIALOGUE_RATIO: f64 = 0.1;
const EXCLAMATION_THRESHOLD: usize = 3;
const ELLIPSIS_THRESHOLD: usize = 3;
const CRUTCH_THRESHOLD: usize = 2;
const SAID_COUNT_THRESHOLD: usize = 10;

static ACTION_BEAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\.\s+)([A-Z][a-z]+|[Hh]e|[Ss]he|[Tt]hey)\s+([a-z]+ed|[a-z]+s)\b")
        .expect("action beat regex")
});

static ADVERB_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(said|asked|replied)\s+(quickly|slowly|angrily|sadly|happily|quietly|loudly|nervously|carefully|eagerly)\b",
    )
    .expect("adverb tag regex")
});

static IMPOSSIBLE_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    IMPOSSIBLE_TAGS
        .iter()
        .map(|tag| {
            let re = Regex::new(&format!(
                r#"(?i)["\u{{201C}}][^"\u{{201C}}\u{{201D}}]+,["\u{{201D}}]\s+(?:\w+\s+)?({tag}(?:d|s|ing)?)\b"#
            ))
            .expect("impossible tag regex");
            (*tag, re)
        })
        .collect()
});

#[derive(Debug, Default)]
struct AttributionCounts {
    invisible: usize,
    alternative: usize,
    fancy: usize,
    action_beats: usize,
    fancy_tags_found: Vec<&'static str>,
}

/// Analyze dialogue in a chapter-sized text.
pub fn analyze(text: &str) -> Vec<Suggestion> {
    let lines = dialogue_spans(text);
    if lines.is_empty() {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    suggestions.extend(analyze_said_ism(text, &lines));
    suggestions.extend(check_dialogue_tags(text));
    suggestions.extend(check_impossible_tags(text));
    suggestions.extend(check_unattributed(&lines));
    suggestions.extend(check_crutches(&lines));
    suggestions.extend(check_exclamations(&lines));
    suggestions.extend(check_ellipses(&lines));
    suggestions.extend(check_dialogue_ratio(text, &lines));
    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

fn tag_count(text_lower: &str, tag: &str) -> usize {
    let re = Regex::new(&format!(r"\b{tag}(?:s|ed|ing)?\b")).expect("tag regex");
    re.find_iter(text_lower).count()
}

fn count_attributions(text: &str) -> AttributionCounts {
    let text_lower = text.to_lowercase();
    let mut counts = AttributionCounts::default();

    for tag in INVISIBLE_TAGS {
        counts.invisible += tag_count(&text_lower, tag);
    }
    for tag in ALTERNATIVE_TAGS {
        counts.alternative += tag_count(&text_lower, tag);
    }
    for tag in FANCY_TAGS {
        let n = tag_count(&text_lower, tag);
        if n > 0 {
            counts.fancy += n;
            counts.fancy_tags_found.push(tag);
        }
    }

    for caps in ACTION_BEAT_RE.captures_iter(text) {
        if let Some(verb) = caps.get(2) {
            let verb = verb.as_str().to_lowercase();
            let base = verb
                .strip_suffix("ed")
                .or_else(|| verb.strip_suffix('s'))
                .unwrap_or(&verb);
            if ACTION_BEAT_VERBS.contains(&base) || ACTION_BEAT_VERBS.contains(&verb.as_str()) {
                counts.action_beats += 1;
            }
        }
    }

    counts
}

fn analyze_said_ism(text: &str, lines: &[Span]) -> Vec<Suggestion> {
    if lines.len() < 3 {
        return Vec::new();
    }

    let counts = count_attributions(text);
    let total = counts.invisible + counts.alternative + counts.fancy + counts.action_beats;
    if total == 0 {
        return Vec::new();
    }

    let pct = |n: usize| 100.0 * n as f64 / total as f64;
    let invisible_pct = pct(counts.invisible);
    let alternative_pct = pct(counts.alternative);
    let fancy_pct = pct(counts.fancy);
    let action_beat_pct = pct(counts.action_beats);

    let mut suggestions = Vec::new();

    if fancy_pct > FANCY_WARNING_PCT {
        let examples = counts
            .fancy_tags_found
            .iter()
            .take(3)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        suggestions.push(
            Suggestion::new(
                SuggestionType::DialogueTags,
                Severity::Warning,
                format!("Fancy dialogue tags at {fancy_pct:.0}% of attributions"),
                format!(
                    "You're using elaborate dialogue tags like {examples}. These draw \
                     attention away from your dialogue. 'Said' is invisible to readers; \
                     embrace it, or use action beats to show character."
                ),
            )
            .meta("fancy_percentage", json!(fancy_pct))
            .meta("fancy_tags_found", json!(counts.fancy_tags_found))
            .meta(
                "teaching_point",
                json!(
                    "'Said-bookism' is when writers avoid 'said' with elaborate \
                     alternatives. 'Said' is nearly invisible to readers, while tags \
                     like 'exclaimed' stick out and slow reading. Most published \
                     authors use 'said' for the large majority of their tags."
                ),
            ),
        );
    } else if counts.fancy > 0 && fancy_pct > FANCY_INFO_PCT {
        suggestions.push(
            Suggestion::new(
                SuggestionType::DialogueTags,
                Severity::Info,
                format!(
                    "Some fancy dialogue tags detected ({} instances)",
                    counts.fancy
                ),
                "A few elaborate dialogue tags are fine for emphasis, but 'said' remains \
                 the workhorse of dialogue. Consider whether each fancy tag earns its \
                 place.",
            )
            .meta("fancy_percentage", json!(fancy_pct)),
        );
    }

    if action_beat_pct < ACTION_BEAT_MIN_PCT && total >= 5 {
        suggestions.push(
            Suggestion::new(
                SuggestionType::DialogueTags,
                Severity::Info,
                "Few action beats in dialogue attribution",
                format!(
                    "Only {action_beat_pct:.0}% of your dialogue uses action beats. \
                     Action beats (character movements and gestures) can replace tags \
                     while showing character and grounding the scene."
                ),
            )
            .meta("action_beat_percentage", json!(action_beat_pct)),
        );
    }

    if invisible_pct > INVISIBLE_MAX_PCT && total >= 8 {
        suggestions.push(
            Suggestion::new(
                SuggestionType::DialogueTags,
                Severity::Info,
                format!("'Said/asked' used for {invisible_pct:.0}% of dialogue"),
                "While 'said' is appropriately invisible, using it for nearly every line \
                 can create rhythmic monotony. Mix in occasional action beats to show \
                 character and vary the prose rhythm.",
            )
            .meta("invisible_percentage", json!(invisible_pct)),
        );
    }

    if total >= 10 {
        suggestions.push(
            Suggestion::new(
                SuggestionType::DialogueTags,
                Severity::Info,
                "Dialogue attribution breakdown",
                format!(
                    "Said/asked: {invisible_pct:.0}%, Alternative tags: \
                     {alternative_pct:.0}%, Action beats: {action_beat_pct:.0}%, Fancy \
                     tags: {fancy_pct:.0}%"
                ),
            )
            .meta(
                "percentages",
                json!({
                    "invisible": invisible_pct,
                    "alternative": alternative_pct,
                    "action_beats": action_beat_pct,
                    "fancy": fancy_pct,
                }),
            ),
        );
    }

    suggestions
}

fn check_dialogue_tags(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let text_lower = text.to_lowercase();

    let said_re = Regex::new(r"\bsaid\b").expect("said regex");
    let said_count = said_re.find_iter(&text_lower).count();
    if said_count > SAID_COUNT_THRESHOLD {
        suggestions.push(
            Suggestion::new(
                SuggestionType::Dialogue,
                Severity::Info,
                format!("'Said' used {said_count} times"),
                "While 'said' is generally fine, consider varying dialogue attribution \
                 or using action beats instead of tags in some cases.",
            )
            .meta("said_count", json!(said_count)),
        );
    }

    if let Some(m) = ADVERB_TAG_RE.find(text) {
        let total = ADVERB_TAG_RE.find_iter(text).count();
        suggestions.push(
            Suggestion::new(
                SuggestionType::Dialogue,
                Severity::Warning,
                format!("Dialogue tag with adverb: '{}'", m.as_str()),
                "Avoid adverbs with dialogue tags. Show emotion through the dialogue \
                 itself or action beats instead of telling.",
            )
            .at(m.start(), m.end())
            .highlight(m.as_str())
            .meta("total_count", json!(total)),
        );
    }

    suggestions
}

/// Present-participle form of a past-tense tag ("smiled" → "smiling").
fn ing_form(tag: &str) -> String {
    match tag {
        "shook" => "shaking".to_string(),
        _ => {
            let base = tag.strip_suffix("ed").unwrap_or(tag);
            format!("{base}ing")
        }
    }
}

fn check_impossible_tags(text: &str) -> Vec<Suggestion> {
    let mut found: Vec<(&str, usize, usize)> = Vec::new();

    for (tag, re) in IMPOSSIBLE_RES.iter() {
        if let Some(caps) = re.captures(text) {
            if let Some(m) = caps.get(1) {
                found.push((tag, m.start(), m.end()));
            }
        }
    }

    if found.is_empty() {
        return Vec::new();
    }

    found.sort_by_key(|(_, start, _)| *start);
    let (tag, start, end) = found[0];
    let tags: Vec<&str> = found.iter().map(|(t, _, _)| *t).collect();

    vec![Suggestion::new(
        SuggestionType::DialogueTags,
        Severity::Warning,
        format!("Impossible dialogue tag: '{tag}'"),
        format!(
            "You can't {tag} words. Make it a separate action beat with a period: \
             '…\" She {tag}.' Or keep the tag and add the action: '…\" she said, {}.'",
            ing_form(tag)
        ),
    )
    .at(start, end)
    .highlight(tag)
    .meta("impossible_tags_found", json!(tags))
    .meta("total_count", json!(found.len()))
    .meta(
        "teaching_point",
        json!(
            "Dialogue tags must be verbs of speech. 'Smiled', 'laughed', 'shrugged' \
             are physical actions, not ways of speaking. Separate them with a period, \
             or pair them with 'said'."
        ),
    )]
}

fn check_unattributed(lines: &[Span]) -> Vec<Suggestion> {
    if lines.len() < 3 {
        return Vec::new();
    }
    vec![Suggestion::new(
        SuggestionType::Dialogue,
        Severity::Info,
        format!("{} dialogue lines detected", lines.len()),
        "With multiple dialogue exchanges, ensure readers can easily track who's \
         speaking. Consider occasional dialogue tags or action beats for clarity.",
    )
    .meta("dialogue_count", json!(lines.len()))]
}

fn check_crutches(lines: &[Span]) -> Vec<Suggestion> {
    let all_dialogue = lines
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut suggestions = Vec::new();
    for crutch in DIALOGUE_CRUTCHES {
        let re = Regex::new(&format!(r"\b{}\b", regex::escape(crutch))).expect("crutch regex");
        let count = re.find_iter(&all_dialogue).count();
        if count > CRUTCH_THRESHOLD {
            suggestions.push(
                Suggestion::new(
                    SuggestionType::Dialogue,
                    Severity::Info,
                    format!("Dialogue crutch '{crutch}' used {count} times"),
                    format!(
                        "'{crutch}' is a common dialogue crutch. Occasional use adds \
                         realism; overuse weakens dialogue."
                    ),
                )
                .highlight(crutch)
                .meta("count", json!(count)),
            );
        }
    }

    suggestions
}

fn check_exclamations(lines: &[Span]) -> Vec<Suggestion> {
    let count: usize = lines.iter().map(|s| s.text.matches('!').count()).sum();
    if count > EXCLAMATION_THRESHOLD {
        return vec![Suggestion::new(
            SuggestionType::Dialogue,
            Severity::Warning,
            format!("{count} exclamation marks in dialogue"),
            "Too many exclamation marks can feel melodramatic and reduce their impact. \
             Reserve them for genuine surprise or strong emotion.",
        )
        .meta("count", json!(count))];
    }
    Vec::new()
}

fn check_ellipses(lines: &[Span]) -> Vec<Suggestion> {
    let count: usize = lines
        .iter()
        .map(|s| s.text.matches("...").count() + s.text.matches('\u{2026}').count())
        .sum();
    if count > ELLIPSIS_THRESHOLD {
        return vec![Suggestion::new(
            SuggestionType::Dialogue,
            Severity::Info,
            format!("{count} ellipses in dialogue"),
            "Frequent ellipses can make dialogue feel tentative or slow-paced. Use them \
             sparingly for trailing off or hesitation.",
        )
        .meta("count", json!(count))];
    }
    Vec::new()
}

fn check_dialogue_ratio(text: &str, lines: &[Span]) -> Vec<Suggestion> {
    if text.is_empty() {
        return Vec::new();
    }
    let dialogue_len: usize = lines.iter().map(|s| s.text.len()).sum();
    let ratio = dialogue_len as f64 / text.len() as f64;

    if ratio > HIGH_DIALOGUE_RATIO {
        return vec![Suggestion::new(
            SuggestionType::Pacing,
            Severity::Info,
            format!("High dialogue ratio ({:.0}%)", ratio * 100.0),
            "Most of this text is dialogue. Consider adding action beats, internal \
             thoughts, or description to ground readers in the setting.",
        )
        .meta("dialogue_ratio", json!(ratio))];
    }
    if ratio < LOW_DIALOGUE_RATIO && dialogue_len > 0 {
        return vec![Suggestion::new(
            SuggestionType::Pacing,
            Severity::Info,
            format!("Low dialogue ratio ({:.0}%)", ratio * 100.0),
            "Very little dialogue. Dialogue can bring scenes to life and reveal \
             character; consider whether your characters could speak more.",
        )
        .meta("dialogue_ratio", json!(ratio))];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter_with_fancy_tags() -> String {
        let mut text = String::new();
        for i in 0..15 {
            text.push_str(&format!("\"Line {i} here,\" she said. "));
        }
        text.push_str("\"Quietly now,\" he whispered. ");
        for i in 0..4 {
            text.push_str(&format!("\"Number {i}!\" he exclaimed. "));
        }
        text
    }

    #[test]
    fn test_no_dialogue_no_suggestions() {
        assert!(analyze("He walked to the well and drew water.").is_empty());
    }

    #[test]
    fn test_fancy_tag_percentage_warning() {
        let suggestions = analyze(&chapter_with_fancy_tags());
        let fancy = suggestions
            .iter()
            .find(|s| {
                s.suggestion_type == SuggestionType::DialogueTags
                    && s.severity == Severity::Warning
                    && s.message.contains("Fancy dialogue tags")
            })
            .expect("fancy tag warning");
        // 15 said + 1 whispered + 4 exclaimed = 20 attributions, 20% fancy.
        assert!(fancy.message.contains("20%"));
    }

    #[test]
    fn test_impossible_tag_detection() {
        let text = r#""Great," she smiled. "We leave at dawn," he said. "Fine," she said."#;
        let suggestions = analyze(text);
        let impossible = suggestions
            .iter()
            .find(|s| s.message.starts_with("Impossible dialogue tag"))
            .expect("impossible tag warning");
        assert_eq!(impossible.severity, Severity::Warning);
        assert_eq!(impossible.highlight_word.as_deref(), Some("smiled"));
        assert!(impossible.suggestion.contains("said, smiling"));
        let (start, end) = (
            impossible.start_char.unwrap(),
            impossible.end_char.unwrap(),
        );
        assert_eq!(&text[start..end], "smiled");
    }

    #[test]
    fn test_exclamation_overuse() {
        let text = r#""Stop!" she cried. "Now!" he said. "Go!" she said. "Run!" he said."#;
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.message.contains("exclamation marks") && s.severity == Severity::Warning));
    }

    #[test]
    fn test_ellipsis_overuse_is_info() {
        let text = r#""Well..." she said. "I..." he said. "Maybe..." she said. "So..." he said."#;
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.message.contains("ellipses") && s.severity == Severity::Info));
    }

    #[test]
    fn test_high_dialogue_ratio() {
        let text = r#""This is all dialogue and nothing else at all, every word of it spoken aloud by someone.""#;
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.suggestion_type == SuggestionType::Pacing
                && s.message.contains("High dialogue ratio")));
    }

    #[test]
    fn test_adverb_tag_combination() {
        let text = r#""Get out," she said angrily. "No," he said. "Please," she said."#;
        let suggestions = analyze(text);
        let adverb = suggestions
            .iter()
            .find(|s| s.message.contains("Dialogue tag with adverb"))
            .expect("adverb tag warning");
        assert!(adverb.highlight_word.as_deref().unwrap().contains("said angrily"));
    }

    #[test]
    fn test_crutch_overuse() {
        let text = r#""Well, I think so," she said. "Well, maybe," he said. "Well, fine," she said."#;
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.message.contains("Dialogue crutch 'well'")));
    }

    #[test]
    fn test_ing_form() {
        assert_eq!(ing_form("smiled"), "smiling");
        assert_eq!(ing_form("laughed"), "laughing");
        assert_eq!(ing_form("shrugged"), "shrugging");
        assert_eq!(ing_form("shook"), "shaking");
    }
}
