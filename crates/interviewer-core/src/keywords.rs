//! Lexical gap detection.
//!
//! The cheap, deterministic first stage of hybrid gap detection: content words
//! present in the reference answer but absent from the candidate's answer. The
//! evaluator only asks the language model to confirm gaps when this stage
//! finds any.

use std::collections::HashSet;

/// Default upper bound on reported gaps, keeping confirmation prompts small.
pub const DEFAULT_GAP_CAP: usize = 10;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "etc", "even", "every", "few", "for", "from", "further", "get", "gets", "got", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "however", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "like", "make", "makes", "many", "may", "me",
    "might", "more", "most", "much", "must", "my", "no", "nor", "not", "now", "of", "off", "often",
    "on", "once", "one", "only", "or", "other", "our", "ours", "out", "over", "own", "per",
    "rather", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "thing", "things", "this", "those",
    "through", "thus", "to", "too", "under", "until", "up", "upon", "us", "use", "used", "uses",
    "using", "very", "via", "was", "way", "we", "well", "were", "what", "when", "where", "whether",
    "which", "while", "who", "whom", "why", "will", "with", "within", "without", "would", "yes",
    "yet", "you", "your", "yours",
];

/// Pure keyword extractor and gap detector.
#[derive(Debug, Clone)]
pub struct KeywordGapExtractor {
    stop_words: HashSet<&'static str>,
    gap_cap: usize,
}

impl Default for KeywordGapExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_CAP)
    }
}

impl KeywordGapExtractor {
    pub fn new(gap_cap: usize) -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            gap_cap,
        }
    }

    /// Normalized, lower-cased, lemmatized content-word set of `text`.
    pub fn extract_keywords(&self, text: &str) -> HashSet<String> {
        self.keyword_sequence(text).into_iter().collect()
    }

    /// Reference-only keywords, in reference order, truncated to the gap cap.
    pub fn detect_keyword_gaps(
        &self,
        reference_answer: &str,
        candidate_answer: &str,
    ) -> Vec<String> {
        let answered = self.extract_keywords(candidate_answer);
        self.keyword_sequence(reference_answer)
            .into_iter()
            .filter(|k| !answered.contains(k))
            .take(self.gap_cap)
            .collect()
    }

    /// Distinct keywords in first-appearance order.
    fn keyword_sequence(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for raw in text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#')) {
            let core = raw.trim_matches(|c| c == '+' || c == '#');
            if core.is_empty() {
                continue;
            }
            // "c++", "c#", "f#" keep their symbols and skip the length filter.
            let symbolic = raw.ends_with("++") || raw.ends_with('#');
            let lemma = if symbolic {
                raw.trim_start_matches(['+', '#']).to_lowercase()
            } else {
                let token = core.to_lowercase();
                if token.chars().count() < 3
                    || token.chars().all(|c| c.is_ascii_digit())
                    || self.stop_words.contains(token.as_str())
                {
                    continue;
                }
                lemmatize(&token)
            };
            if self.stop_words.contains(lemma.as_str()) {
                continue;
            }
            if seen.insert(lemma.clone()) {
                out.push(lemma);
            }
        }
        out
    }
}

/// Suffix-stripping lemmatizer. First matching rule wins, then a trailing
/// silent `e` is dropped so "cache", "caches" and "caching" share one key.
///
/// Not linguistically exact; it only has to map inflections of the same word
/// to the same key on both sides of the comparison.
pub fn lemmatize(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || !word.is_ascii() {
        return word.to_string();
    }
    drop_silent_e(strip_suffix(word, len))
}

fn strip_suffix(word: &str, len: usize) -> String {
    if len > 4 && (word.ends_with("ies") || word.ends_with("ied")) {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.ends_with("sses") {
        return word[..word.len() - 2].to_string();
    }
    if len > 6 && word.ends_with("ness") {
        return word[..word.len() - 4].to_string();
    }
    if len > 5 && word.ends_with("ing") {
        return undouble(&word[..word.len() - 3]);
    }
    if len > 5 && word.ends_with("ed") {
        return undouble(&word[..word.len() - 2]);
    }
    if len > 5 && word.ends_with("ly") {
        return word[..word.len() - 2].to_string();
    }
    if len > 4 && word.ends_with("es") {
        let stem = &word[..word.len() - 2];
        if ["s", "x", "z", "ch", "sh"].iter().any(|s| stem.ends_with(s)) {
            return stem.to_string();
        }
    }
    if word.ends_with('s') && !["ss", "us", "is"].iter().any(|s| word.ends_with(s)) {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn drop_silent_e(stem: String) -> String {
    let n = stem.len();
    if n > 4 && stem.ends_with('e') && !stem.ends_with("ee") {
        stem[..n - 1].to_string()
    } else {
        stem
    }
}

fn undouble(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 2
        && bytes[n - 1] == bytes[n - 2]
        && !matches!(bytes[n - 1], b'l' | b's' | b'z' | b'a' | b'e' | b'i' | b'o' | b'u')
    {
        stem[..n - 1].to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lemmatizer_collapses_inflections() {
        assert_eq!(lemmatize("queries"), "query");
        assert_eq!(lemmatize("copied"), "copy");
        assert_eq!(lemmatize("cache"), "cach");
        assert_eq!(lemmatize("caches"), "cach");
        assert_eq!(lemmatize("caching"), "cach");
        assert_eq!(lemmatize("cached"), "cach");
        assert_eq!(lemmatize("running"), "run");
        assert_eq!(lemmatize("indexes"), "index");
        assert_eq!(lemmatize("threads"), "thread");
        assert_eq!(lemmatize("class"), "class");
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("quickly"), "quick");
        assert_eq!(lemmatize("api"), "api");
        assert_eq!(lemmatize("compile"), lemmatize("compiled"));
        assert_eq!(lemmatize("services"), lemmatize("service"));
        assert_eq!(lemmatize("degree"), "degree");
        assert_eq!(lemmatize("code"), "code");
    }

    #[test]
    fn extract_removes_stop_words_and_short_tokens() {
        let extractor = KeywordGapExtractor::default();
        let keywords =
            extractor.extract_keywords("The Borrow checker is enforcing 2 rules at compile time!");
        assert!(keywords.contains("borrow"));
        assert!(keywords.contains("checker"));
        assert!(keywords.contains("enforc"));
        assert!(keywords.contains("rule"));
        assert!(keywords.contains("compil"));
        assert!(!keywords.contains("the"));
        assert!(!keywords.contains("is"));
        assert!(!keywords.contains("2"));
    }

    #[test]
    fn keeps_language_names_with_symbols() {
        let extractor = KeywordGapExtractor::default();
        let keywords = extractor.extract_keywords("Experience with C++ and C# services");
        assert!(keywords.contains("c++"));
        assert!(keywords.contains("c#"));
        assert!(keywords.contains("service"));
    }

    #[test]
    fn gaps_are_reference_only_in_reference_order() {
        let extractor = KeywordGapExtractor::default();
        let gaps = extractor.detect_keyword_gaps(
            "Indexes speed up reads but slow down writes; B-tree indexes support range queries.",
            "An index makes reads faster.",
        );
        assert_eq!(gaps, vec!["speed", "slow", "writ", "tree", "support", "rang", "query"]);
    }

    #[test]
    fn inflected_answer_covers_reference() {
        let extractor = KeywordGapExtractor::default();
        let gaps = extractor.detect_keyword_gaps(
            "Caching queries reduces latency.",
            "We cached the query results to reduce the latencies.",
        );
        assert!(gaps.is_empty(), "unexpected gaps: {gaps:?}");
    }

    #[test]
    fn base_form_in_reference_matches_plural_in_answer() {
        let extractor = KeywordGapExtractor::default();
        let gaps = extractor.detect_keyword_gaps(
            "The cache sits in front of the database.",
            "Caches sit in front of databases.",
        );
        assert!(gaps.is_empty(), "unexpected gaps: {gaps:?}");
    }

    #[test]
    fn gaps_are_capped() {
        let extractor = KeywordGapExtractor::new(3);
        let gaps = extractor.detect_keyword_gaps(
            "alpha bravo charlie delta echo foxtrot",
            "nothing relevant",
        );
        assert_eq!(gaps, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn empty_reference_has_no_gaps() {
        let extractor = KeywordGapExtractor::default();
        assert!(extractor.detect_keyword_gaps("", "anything at all").is_empty());
    }
}
