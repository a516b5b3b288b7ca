//! Turns candidate keywords into this run's search queries.
//!
//! Steps run in a fixed order and a candidate dropped by one step is never
//! seen by the next:
//! 1. stopwords
//! 2. already used
//! 3. frequency cap over the whole history (current document included)
//! 4. repeats within this run

use std::collections::HashSet;

use tracing::debug;

use reelminer_shared::Keyword;
use reelminer_storage::{KeywordHistory, UsedKeywords};

use crate::stopwords::Stopwords;

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Its lowercase form is a stopword.
    Stopword,
    /// It already produced a download on an earlier run.
    AlreadyUsed,
    /// It appears more than the cap across all history records.
    FrequencyCap { count: usize },
    /// An identical candidate was kept earlier in this run.
    Duplicate,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopword => f.write_str("stopword"),
            Self::AlreadyUsed => f.write_str("already used"),
            Self::FrequencyCap { count } => write!(f, "seen {count} times"),
            Self::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// One dropped candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub keyword: Keyword,
    pub reason: RemovalReason,
}

/// Filter result: surviving queries in input order, plus every removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub kept: Vec<Keyword>,
    pub removed: Vec<Removal>,
}

impl FilterOutcome {
    /// Removals for a given reason, in input order.
    pub fn removed_for(&self, pred: impl Fn(&RemovalReason) -> bool) -> Vec<&Keyword> {
        self.removed
            .iter()
            .filter(|r| pred(&r.reason))
            .map(|r| &r.keyword)
            .collect()
    }
}

/// Stateless filter policy.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    stopwords: Stopwords,
    frequency_cap: usize,
}

impl KeywordFilter {
    pub fn new(stopwords: Stopwords, frequency_cap: usize) -> Self {
        Self {
            stopwords,
            frequency_cap,
        }
    }

    pub fn frequency_cap(&self) -> usize {
        self.frequency_cap
    }

    /// Apply every step to `candidates`.
    ///
    /// `history` must already contain the current document's extraction;
    /// its occurrences count toward the cap.
    pub fn apply(
        &self,
        candidates: &[Keyword],
        used: &UsedKeywords,
        history: &KeywordHistory,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        let mut seen: HashSet<&Keyword> = HashSet::new();

        for keyword in candidates {
            let reason = if self.stopwords.contains(keyword) {
                Some(RemovalReason::Stopword)
            } else if used.contains(keyword) {
                Some(RemovalReason::AlreadyUsed)
            } else {
                let count = history.occurrences(keyword);
                if count > self.frequency_cap {
                    Some(RemovalReason::FrequencyCap { count })
                } else if !seen.insert(keyword) {
                    Some(RemovalReason::Duplicate)
                } else {
                    None
                }
            };

            match reason {
                Some(reason) => {
                    debug!(keyword = %keyword, %reason, "candidate dropped");
                    outcome.removed.push(Removal {
                        keyword: keyword.clone(),
                        reason,
                    });
                }
                None => outcome.kept.push(keyword.clone()),
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws(words: &[&str]) -> Vec<Keyword> {
        words.iter().filter_map(|w| Keyword::parse(w)).collect()
    }

    fn words(keywords: &[Keyword]) -> Vec<&str> {
        keywords.iter().map(Keyword::as_str).collect()
    }

    #[test]
    fn stopword_and_used_scenario() {
        let filter = KeywordFilter::new(Stopwords::from_words(["GATO"]), 15);
        let used: UsedKeywords = kws(&["PERRO"]).into_iter().collect();
        let candidates = kws(&["GATO", "PERRO", "SOL"]);
        let mut history = KeywordHistory::new();
        history.record("doc", candidates.clone());

        let outcome = filter.apply(&candidates, &used, &history);
        assert_eq!(words(&outcome.kept), vec!["SOL"]);
        assert_eq!(
            outcome.removed,
            vec![
                Removal { keyword: kws(&["GATO"])[0].clone(), reason: RemovalReason::Stopword },
                Removal { keyword: kws(&["PERRO"])[0].clone(), reason: RemovalReason::AlreadyUsed },
            ]
        );
    }

    #[test]
    fn frequency_cap_excludes_over_fifteen() {
        let filter = KeywordFilter::new(Stopwords::default(), 15);
        let mut history = KeywordHistory::new();
        for i in 0..16 {
            history.record(format!("doc-{i}"), kws(&["SOL"]));
        }

        let outcome = filter.apply(&kws(&["SOL", "MAR"]), &UsedKeywords::new(), &history);
        assert_eq!(words(&outcome.kept), vec!["MAR"]);
        assert_eq!(
            outcome.removed[0].reason,
            RemovalReason::FrequencyCap { count: 16 }
        );
    }

    #[test]
    fn frequency_cap_is_strict_and_counts_current_document() {
        let filter = KeywordFilter::new(Stopwords::default(), 15);
        let mut history = KeywordHistory::new();
        for i in 0..14 {
            history.record(format!("old-{i}"), kws(&["SOL"]));
        }
        // 14 prior + 1 current = 15, which is not over the cap
        history.record("current", kws(&["SOL"]));
        let outcome = filter.apply(&kws(&["SOL"]), &UsedKeywords::new(), &history);
        assert_eq!(words(&outcome.kept), vec!["SOL"]);

        // A second mention in the current document tips it over
        history.record("current", kws(&["SOL", "SOL"]));
        let outcome = filter.apply(&kws(&["SOL", "SOL"]), &UsedKeywords::new(), &history);
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.removed.len(), 2);
    }

    #[test]
    fn duplicates_keep_first_occurrence_and_order() {
        let filter = KeywordFilter::new(Stopwords::default(), 15);
        let candidates = kws(&["GATO", "PERRO", "GATO", "LUNA"]);
        let outcome = filter.apply(&candidates, &UsedKeywords::new(), &KeywordHistory::new());
        assert_eq!(words(&outcome.kept), vec!["GATO", "PERRO", "LUNA"]);
        assert_eq!(
            outcome.removed_for(|r| *r == RemovalReason::Duplicate),
            vec![&kws(&["GATO"])[0]]
        );
    }

    #[test]
    fn output_never_contains_stopwords_or_used() {
        let filter = KeywordFilter::new(Stopwords::for_language("es").unwrap(), 15);
        let used: UsedKeywords = kws(&["PLAYA", "NUBE"]).into_iter().collect();
        let candidates = kws(&["el", "Playa", "de", "NUBE", "sol", "Más", "arena", "y"]);
        let outcome = filter.apply(&candidates, &used, &KeywordHistory::new());

        let stop = Stopwords::for_language("es").unwrap();
        for kw in &outcome.kept {
            assert!(!stop.contains(kw));
            assert!(!used.contains(kw));
        }
        assert_eq!(words(&outcome.kept), vec!["SOL", "ARENA"]);
    }

    #[test]
    fn stopword_wins_over_later_reasons() {
        let filter = KeywordFilter::new(Stopwords::from_words(["sol"]), 0);
        let used: UsedKeywords = kws(&["SOL"]).into_iter().collect();
        let mut history = KeywordHistory::new();
        history.record("d", kws(&["SOL"]));
        let outcome = filter.apply(&kws(&["SOL"]), &used, &history);
        assert_eq!(outcome.removed[0].reason, RemovalReason::Stopword);
    }
}
