//! Reference-token scanning: a single scanner over a closed enumerated
//! vocabulary per kind — Hebrew regex patterns for decision/government/
//! date-range references, plus a hand-authored closed word list for
//! ordinals, demonstratives, and back-references, all treated as fixed
//! vocabulary rather than a model call.

use ceci_domain::config::ReferenceVocabulary;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMatch {
    /// An ordinal word ("third") with its rank, 1-based.
    Ordinal(usize),
    /// The "last" ordinal — resolved against the Last Result Set's actual
    /// length at reference-resolution time rather than a fixed rank.
    LastOrdinal,
    /// A demonstrative ("this"/"that"/"it").
    Demonstrative,
    /// An explicit back-reference ("the previous one").
    BackReference,
}

/// Compiled form of [`ReferenceVocabulary`], built once per request (the
/// word lists rarely change; regex compilation cost is small enough that a
/// per-request compile is acceptable and keeps the planner stateless).
pub struct ReferenceScanner {
    ordinal_words: Vec<String>,
    demonstrative_words: Vec<String>,
    back_reference_words: Vec<String>,
    decision_patterns: Vec<Regex>,
    government_patterns: Vec<Regex>,
    date_range_patterns: Vec<Regex>,
}

impl ReferenceScanner {
    pub fn compile(vocab: &ReferenceVocabulary) -> Self {
        let compile_all = |patterns: &[String]| -> Vec<Regex> {
            patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect()
        };
        Self {
            ordinal_words: vocab.ordinal_words.clone(),
            demonstrative_words: vocab.demonstrative_words.clone(),
            back_reference_words: vocab.back_reference_words.clone(),
            decision_patterns: compile_all(&vocab.decision_patterns),
            government_patterns: compile_all(&vocab.government_patterns),
            date_range_patterns: compile_all(&vocab.date_range_patterns),
        }
    }

    /// True if `text` contains any reference-class token — the trigger
    /// condition for reference resolution and for the cacheability
    /// predicate's reference-token clause.
    pub fn has_reference_tokens(&self, text: &str) -> bool {
        self.scan(text).is_some()
    }

    /// First reference-class match found in `text`, preferring the
    /// narrowest interpretation when more than one ordinal could apply
    ///.
    pub fn scan(&self, text: &str) -> Option<ReferenceMatch> {
        if let Some(rank) = self.scan_ordinal(text) {
            if rank == self.ordinal_words.len() {
                // Configured list order puts "last" at the end; its rank
                // has no fixed meaning and must be resolved dynamically.
                return Some(ReferenceMatch::LastOrdinal);
            }
            return Some(ReferenceMatch::Ordinal(rank));
        }
        if self.back_reference_words.iter().any(|w| text.contains(w.as_str())) {
            return Some(ReferenceMatch::BackReference);
        }
        if self.demonstrative_words.iter().any(|w| text.contains(w.as_str())) {
            return Some(ReferenceMatch::Demonstrative);
        }
        None
    }

    fn scan_ordinal(&self, text: &str) -> Option<usize> {
        // Last-mentioned ordinal wins: prefer the narrower, latest-mentioned
        // interpretation under ambiguity.
        self.ordinal_words
            .iter()
            .enumerate()
            .filter(|(_, w)| text.contains(w.as_str()))
            .map(|(rank, _)| rank + 1)
            .max()
    }

    pub fn decision_number(&self, text: &str) -> Option<i64> {
        first_capture_as_i64(&self.decision_patterns, text)
    }

    pub fn government_number(&self, text: &str) -> Option<i64> {
        first_capture_as_i64(&self.government_patterns, text)
    }

    /// True if the utterance names a clock-dependent operator ("latest",
    /// "most recent") that would make a cached answer stale the moment time
    /// moves on.
    pub fn names_time_relative_operator(&self, text: &str) -> bool {
        // "אחרון" itself is excluded here — it is the bare "last" ordinal,
        // handled by `scan`/`ReferenceMatch::LastOrdinal` instead, and a
        // reference-token match already forces non-cacheable on its own.
        const TIME_RELATIVE_WORDS: &[&str] = &["אחרונה", "העדכני", "העדכנית", "לאחרונה"];
        TIME_RELATIVE_WORDS.iter().any(|w| text.contains(w))
    }

    pub fn has_date_range(&self, text: &str) -> bool {
        self.date_range_patterns.iter().any(|re| re.is_match(text))
    }
}

fn first_capture_as_i64(patterns: &[Regex], text: &str) -> Option<i64> {
    for re in patterns {
        if let Some(caps) = re.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(n) = m.as_str().parse::<i64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> ReferenceScanner {
        ReferenceScanner::compile(&ReferenceVocabulary::default())
    }

    #[test]
    fn detects_ordinal() {
        let s = scanner();
        assert_eq!(s.scan("תן לי את השלישית"), Some(ReferenceMatch::Ordinal(3)));
    }

    #[test]
    fn detects_back_reference() {
        let s = scanner();
        assert_eq!(s.scan("תן לי את הקודם"), Some(ReferenceMatch::BackReference));
    }

    #[test]
    fn detects_demonstrative_when_no_back_reference() {
        let s = scanner();
        assert_eq!(s.scan("תן לי את זה"), Some(ReferenceMatch::Demonstrative));
    }

    #[test]
    fn no_match_on_plain_text() {
        let s = scanner();
        assert_eq!(s.scan("החלטות ממשלה 37 בנושא חינוך"), None);
    }

    #[test]
    fn extracts_decision_number() {
        let s = scanner();
        assert_eq!(s.decision_number("נתח את החלטה 2983"), Some(2983));
    }

    #[test]
    fn extracts_government_number() {
        let s = scanner();
        assert_eq!(s.government_number("של ממשלה 37"), Some(37));
    }

    #[test]
    fn detects_last_ordinal_as_distinct_from_a_ranked_ordinal() {
        let s = scanner();
        assert_eq!(s.scan("תן לי את האחרון"), Some(ReferenceMatch::LastOrdinal));
    }

    #[test]
    fn detects_time_relative_operator() {
        let s = scanner();
        assert!(s.names_time_relative_operator("מה ההחלטה האחרונה?"));
        assert!(!s.names_time_relative_operator("החלטות ממשלה 37"));
    }

    #[test]
    fn ambiguous_ordinals_prefer_narrower() {
        let s = scanner();
        // "second" and "third" both mentioned; narrower (later-indexed) wins.
        assert_eq!(s.scan("השני או השלישי"), Some(ReferenceMatch::Ordinal(3)));
    }
}
