//! Rule-pattern catalog: named regexes and keyword sets shared by the
//! extractor, the writing analyzers, and the voice engine.
//!
//! Patterns are compiled once and never mutate; callers own deduplication and
//! confidence. All regex matching is case-insensitive and multiline.

use once_cell::sync::Lazy;
use regex::Regex;

/// Bumped whenever a pattern or keyword list changes in a way that affects
/// extraction output. Stored alongside scan provenance so stale suggestions
/// can be told apart from current ones.
pub const CATALOG_VERSION: &str = "2025.3";

fn ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?im){}", pattern)).expect("catalog regex")
}

// ============================================================================
// World rules
// ============================================================================

/// Statements of explicit world constraints, with a short rule-kind tag.
pub static WORLD_RULE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (ci(r"in this world,?\s+([^.!?]+)"), "declaration"),
        (ci(r"\b(\w[\w\s]{0,40}?)\s+requires\s+([^.!?]+)"), "requirement"),
        (ci(r"\bonly\s+([\w\s]{1,40}?)\s+can\s+([^.!?]+)"), "restriction"),
        (
            ci(r"\bno one can\s+([^.!?]+?)\s+without\s+([^.!?]+)"),
            "restriction",
        ),
        (ci(r"\bit is forbidden to\s+([^.!?]+)"), "prohibition"),
        (ci(r"\ball\s+([\w\s]{1,40}?)\s+must\s+([^.!?]+)"), "obligation"),
        (
            ci(r"\b(\w[\w\s]{0,40}?)\s+(?:was always|has always been|is known for)\s+([^.!?]+)"),
            "trait",
        ),
    ]
});

// ============================================================================
// Relationships
// ============================================================================

/// Explicit relationship statements: possessive, copular, and named verbs.
pub static RELATIONSHIP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "Mira's father", "Brann's commander"
        ci(r"\b([A-Z]\w+)'s\s+(father|mother|brother|sister|son|daughter|wife|husband|mentor|commander|servant|rival)\b"),
        // "Mira is the mother of Ila"
        ci(r"\b([A-Z]\w+)\s+(?:is|was)\s+the\s+(\w+)\s+of\s+([A-Z]\w+)"),
        // "Brann serves the Duke", "Ila works for Mira", "Sera is married to Brann"
        ci(r"\b([A-Z]\w+)\s+(serves|works for|is married to|answers to|commands)\s+(?:the\s+)?([A-Z]\w+)"),
    ]
});

/// Keyword cues for inferring a relationship type from a shared sentence.
pub const ROMANTIC_CUES: [&str; 5] = ["love", "kiss", "marry", "romance", "heart"];
pub const CONFLICT_CUES: [&str; 6] = ["fight", "battle", "enemy", "hate", "kill", "attack"];
pub const FAMILY_CUES: [&str; 7] = [
    "mother", "father", "sister", "brother", "family", "son", "daughter",
];
pub const PROFESSIONAL_CUES: [&str; 5] = ["work", "colleague", "boss", "employee", "partner"];
pub const ALLIANCE_CUES: [&str; 5] = ["ally", "friend", "team", "together", "help"];

// ============================================================================
// Entity extraction cues
// ============================================================================

/// Connector words allowed inside a grouped proper-noun name, when followed
/// by another proper noun ("Garai of the Fol").
pub const NAME_CONNECTORS: [&str; 3] = ["of", "the", "and"];

/// Candidate names that are never entities on their own.
pub const NAME_STOP_LIST: [&str; 4] = ["the", "a", "an", "i"];

/// Lowercase tokens rejected by the descriptive-pattern pass.
pub const DESCRIPTIVE_STOP_LIST: [&str; 7] = ["it", "this", "that", "there", "here", "one", "thing"];

/// Prepositions that mark the following proper noun as a location.
pub const LOCATION_PREPOSITIONS: [&str; 7] = ["in", "at", "to", "from", "near", "within", "outside"];

/// Sentence cues suggesting a creature or piece of lore.
pub const CREATURE_CUES: [&str; 11] = [
    "is a kind of",
    "is a type of",
    "is a species of",
    "creature",
    "beast",
    "monster",
    "animal",
    "insect",
    "arachnid",
    "lives in",
    "inhabits",
];

/// Sentence cues suggesting an item or artifact.
pub const ITEM_CUES: [&str; 7] = [
    "weapon", "sword", "dagger", "artifact", "relic", "tool", "device",
];

/// Sentence cues suggesting a character (speech and pronoun context).
pub const CHARACTER_CUES: [&str; 17] = [
    "said", "asked", "thought", "felt", "looked", "walked", "spoke", "replied", "answered",
    "whispered", "shouted", "he ", "she ", "they ", "his ", "her ", "their ",
];

/// Patterns promoting lowercase tokens to LORE candidates
/// ("the alhastra is a kind of arachnid…").
pub static DESCRIPTIVE_LORE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"(?:the|an?)\s+(\w+)\s+(?:is|was)\s+(?:a kind of|a type of|a species of)"),
        ci(r"(?:the|an?)\s+(\w+)\s+(?:is|was)\s+a\s+\w+\s+(?:creature|beast|monster|animal)"),
        ci(r"(?:the|an?)\s+(\w+)\s+(?:lives|inhabits|dwells|hunts)"),
    ]
});

// ============================================================================
// Character description buckets
// ============================================================================

pub const APPEARANCE_KEYWORDS: [&str; 29] = [
    "tall", "short", "thin", "fat", "slim", "muscular", "lean", "stocky", "hair", "eyes", "face",
    "beard", "scar", "young", "old", "elderly", "beautiful", "handsome", "ugly", "pale", "dark",
    "fair", "wore", "dressed", "blonde", "brunette", "redhead", "silver", "curly",
];

pub const PERSONALITY_KEYWORDS: [&str; 28] = [
    "brave", "coward", "kind", "cruel", "wise", "foolish", "gentle", "harsh", "calm", "nervous",
    "confident", "shy", "stubborn", "loyal", "treacherous", "honest", "deceitful", "patient",
    "impatient", "warm", "cold", "cheerful", "gloomy", "optimistic", "pessimistic", "friendly",
    "hostile", "flexible",
];

// ============================================================================
// Style / word choice
// ============================================================================

/// Be-verb + past participle, the passive-voice approximation used by the
/// style analyzer.
pub static PASSIVE_VOICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"\b(am|is|are|was|were|been|being)\s+\w+ed\b"),
        ci(r"\b(am|is|are|was|were|been|being)\s+\w+en\b"),
    ]
});

pub static ADVERB_RE: Lazy<Regex> = Lazy::new(|| ci(r"\b\w+ly\b"));

/// `-ly` words exempt from the adverb-density check.
pub const ACCEPTED_ADVERBS: [&str; 8] = [
    "early", "only", "daily", "weekly", "monthly", "yearly", "friendly", "lovely",
];

/// Weak intensifiers that usually add nothing.
pub const WEAK_WORDS: [&str; 13] = [
    "just", "really", "very", "quite", "rather", "actually", "basically", "literally", "simply",
    "fairly", "pretty", "somewhat", "slightly",
];

/// Verbs that tend to tell instead of show.
pub const TELLING_VERBS: [&str; 11] = [
    "felt", "thought", "knew", "realized", "wondered", "believed", "understood", "noticed", "saw",
    "heard", "seemed",
];

/// Filter phrases that distance the reader from the action.
pub const FILTER_PHRASES: [&str; 6] = [
    "started to", "began to", "tried to", "seemed to", "appeared to", "managed to",
];

/// Stock phrases flagged as clichés by the word analyzer.
pub static CLICHE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"\bbite the dust\b"),
        ci(r"\btime will tell\b"),
        ci(r"\bat the end of the day\b"),
        ci(r"\bthink outside the box\b"),
        ci(r"\blow-hanging fruit\b"),
        ci(r"\bpush the envelope\b"),
        ci(r"\bshe turned on her heel\b"),
        ci(r"\bhe let out a breath\b"),
    ]
});

// ============================================================================
// Dialogue attribution
// ============================================================================

/// Tags readers gloss over.
pub const INVISIBLE_TAGS: [&str; 2] = ["said", "asked"];

/// Acceptable alternatives, used sparingly.
pub const ALTERNATIVE_TAGS: [&str; 12] = [
    "replied", "answered", "whispered", "shouted", "yelled", "screamed", "muttered", "murmured",
    "called", "added", "continued", "responded",
];

/// Elaborate tags that draw attention away from the dialogue.
pub const FANCY_TAGS: [&str; 23] = [
    "exclaimed",
    "proclaimed",
    "ejaculated",
    "interjected",
    "opined",
    "stated",
    "queried",
    "inquired",
    "declared",
    "announced",
    "asserted",
    "averred",
    "remarked",
    "observed",
    "commented",
    "noted",
    "mentioned",
    "uttered",
    "vocalized",
    "articulated",
    "enunciated",
    "verbalized",
    "expounded",
];

/// Physical actions that cannot produce speech.
pub const IMPOSSIBLE_TAGS: [&str; 14] = [
    "smiled", "laughed", "grinned", "chuckled", "giggled", "snorted", "frowned", "nodded",
    "shrugged", "sighed", "shook", "winked", "grimaced", "smirked",
];

/// Verbs counted as action-beat attributions near dialogue.
pub const ACTION_BEAT_VERBS: [&str; 24] = [
    "turned", "looked", "glanced", "stepped", "moved", "reached", "grabbed", "picked", "set",
    "put", "took", "stood", "sat", "leaned", "crossed", "uncrossed", "rubbed", "scratched", "ran",
    "walked", "paced", "shifted", "settled", "adjusted",
];

/// Crutch words that weaken dialogue when overused.
pub const DIALOGUE_CRUTCHES: [&str; 19] = [
    "um", "uh", "er", "ah", "hmm", "well", "like", "you know", "i mean", "kind of", "sort of",
    "just", "actually", "basically", "literally", "honestly", "obviously", "totally", "really",
];

// ============================================================================
// Voice profiling vocabulary
// ============================================================================

pub const CONTRACTIONS: [&str; 45] = [
    "don't", "doesn't", "didn't", "won't", "wouldn't", "can't", "couldn't", "shouldn't", "isn't",
    "aren't", "wasn't", "weren't", "haven't", "hasn't", "hadn't", "i'm", "i've", "i'll", "i'd",
    "you're", "you've", "you'll", "you'd", "he's", "she's", "it's", "we're", "we've", "we'll",
    "we'd", "they're", "they've", "they'll", "they'd", "that's", "there's", "here's", "what's",
    "who's", "let's", "ain't", "gonna", "wanna", "gotta", "y'all",
];

pub const FILLER_WORDS: [&str; 22] = [
    "um", "uh", "er", "ah", "like", "you know", "i mean", "basically", "actually", "literally",
    "honestly", "well", "so", "anyway", "right", "okay", "ok", "yeah", "yep", "nope", "huh",
    "hmm",
];

pub const FORMAL_INDICATORS: [&str; 19] = [
    "therefore",
    "however",
    "furthermore",
    "moreover",
    "nevertheless",
    "consequently",
    "subsequently",
    "accordingly",
    "indeed",
    "certainly",
    "precisely",
    "absolutely",
    "undoubtedly",
    "perhaps",
    "regarding",
    "concerning",
    "approximately",
    "primarily",
    "essentially",
];

pub const INFORMAL_INDICATORS: [&str; 21] = [
    "gonna", "wanna", "gotta", "kinda", "sorta", "yeah", "yep", "nope", "cool", "awesome",
    "totally", "super", "stuff", "things", "guy", "guys", "kids", "okay", "ok", "hey", "wow",
];

pub const POSITIVE_EMOTIONS: [&str; 13] = [
    "happy", "glad", "joy", "love", "wonderful", "great", "amazing", "fantastic", "beautiful",
    "excited", "delighted", "pleased", "thrilled",
];

pub const NEGATIVE_EMOTIONS: [&str; 13] = [
    "sad", "angry", "hate", "terrible", "awful", "horrible", "disgusting", "furious", "miserable",
    "depressed", "frustrated", "annoyed", "upset",
];

/// Common words excluded from n-gram and signature-word detection.
pub const PHRASE_STOP_WORDS: [&str; 11] = [
    "the", "a", "an", "is", "was", "to", "and", "of", "in", "it", "i",
];

pub const SIGNATURE_STOP_WORDS: [&str; 9] = [
    "that", "this", "with", "have", "from", "they", "been", "were", "said",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_rule_patterns_match_declarations() {
        let text = "In this world, iron burns the fae.";
        let hit = WORLD_RULE_PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(text));
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().1, "declaration");
    }

    #[test]
    fn test_world_rule_patterns_match_restrictions() {
        let text = "Only the Emberborn can cross the glass desert.";
        assert!(WORLD_RULE_PATTERNS.iter().any(|(re, _)| re.is_match(text)));
        let text2 = "No one can enter the vault without the warden's seal.";
        assert!(WORLD_RULE_PATTERNS.iter().any(|(re, _)| re.is_match(text2)));
    }

    #[test]
    fn test_relationship_possessive_pattern() {
        let caps = RELATIONSHIP_PATTERNS[0]
            .captures("Mira's father kept the ledger.")
            .expect("possessive match");
        assert_eq!(&caps[1], "Mira");
        assert_eq!(&caps[2], "father");
    }

    #[test]
    fn test_relationship_copular_pattern() {
        let caps = RELATIONSHIP_PATTERNS[1]
            .captures("Sera is the mother of Ila.")
            .expect("copular match");
        assert_eq!(&caps[1], "Sera");
        assert_eq!(&caps[3], "Ila");
    }

    #[test]
    fn test_descriptive_lore_pattern_captures_lowercase_name() {
        let caps = DESCRIPTIVE_LORE_PATTERNS[0]
            .captures("The alhastra is a kind of arachnid that nests in chimneys.")
            .expect("lore match");
        assert_eq!(&caps[1], "alhastra");
    }

    #[test]
    fn test_passive_voice_pattern() {
        assert!(PASSIVE_VOICE_PATTERNS[0].is_match("The gate was opened by the guard."));
        assert!(!PASSIVE_VOICE_PATTERNS[0].is_match("The guard opened the gate."));
    }

    #[test]
    fn test_cliche_patterns_case_insensitive() {
        assert!(CLICHE_PATTERNS[1].is_match("Time Will Tell, she supposed."));
    }

    #[test]
    fn test_tag_sets_are_disjoint() {
        for tag in FANCY_TAGS {
            assert!(!INVISIBLE_TAGS.contains(&tag));
            assert!(!ALTERNATIVE_TAGS.contains(&tag));
            assert!(!IMPOSSIBLE_TAGS.contains(&tag));
        }
        for tag in IMPOSSIBLE_TAGS {
            assert!(!ALTERNATIVE_TAGS.contains(&tag));
        }
    }
}
