//! Content policy filter
//!
//! Screens inbound messages for prohibited terms and duplicate bursts.
//! The filter is pure bookkeeping: deletion, ledger appends, and notices are
//! the automod layer's job. Callers serialize access (`evaluate` takes
//! `&mut self`); in the daemon the filter sits behind an async mutex.

use crate::ids::UserId;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Outcome of evaluating one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Message contained a configured banned term.
    ProhibitedTerm,
    /// Identical content repeated too often within the sliding window.
    SpamBurst,
}

/// Per-author sliding window plus term matching.
///
/// Windows live in a capacity-bounded LRU so memory does not grow with the
/// number of distinct authors seen over the process lifetime; an evicted
/// author simply starts a fresh window on their next message.
pub struct ContentPolicyFilter {
    terms: Vec<String>,
    window: Duration,
    repeat_limit: usize,
    windows: LruCache<UserId, Vec<(DateTime<Utc>, String)>>,
}

impl ContentPolicyFilter {
    pub fn new(terms: &[String], window_secs: i64, repeat_limit: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            terms: terms.iter().map(|t| t.to_lowercase()).collect(),
            window: Duration::seconds(window_secs),
            repeat_limit,
            windows: LruCache::new(capacity),
        }
    }

    /// Evaluate one message. Prohibited-term matching runs first and does not
    /// record the message in the author's spam window; substring containment
    /// is sufficient, no word-boundary logic.
    pub fn evaluate(&mut self, author: UserId, content: &str, now: DateTime<Utc>) -> Verdict {
        let lowered = content.to_lowercase();
        if self.terms.iter().any(|term| lowered.contains(term)) {
            return Verdict::ProhibitedTerm;
        }

        let window = self.windows.get_or_insert_mut(author, Vec::new);
        window.push((now, content.to_string()));
        let width = self.window;
        window.retain(|(t, _)| now.signed_duration_since(*t) <= width);

        let repeats = window.iter().filter(|(_, c)| c == content).count();
        if repeats >= self.repeat_limit {
            Verdict::SpamBurst
        } else {
            Verdict::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn filter() -> ContentPolicyFilter {
        let terms = vec!["hack".to_string(), "cheat".to_string()];
        ContentPolicyFilter::new(&terms, 10, 3, 16)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_prohibited_term_is_case_insensitive_substring() {
        let mut f = filter();
        assert_eq!(f.evaluate(UserId(1), "nice HaCk bro", at(0)), Verdict::ProhibitedTerm);
        assert_eq!(f.evaluate(UserId(1), "cheater", at(0)), Verdict::ProhibitedTerm);
        assert_eq!(f.evaluate(UserId(1), "hello", at(0)), Verdict::Allow);
    }

    #[test]
    fn test_third_identical_message_within_window_is_a_burst() {
        let mut f = filter();
        let author = UserId(7);
        assert_eq!(f.evaluate(author, "X", at(0)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "X", at(1)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "X", at(2)), Verdict::SpamBurst);
    }

    #[test]
    fn test_spaced_sends_never_fire() {
        let mut f = filter();
        let author = UserId(7);
        assert_eq!(f.evaluate(author, "X", at(0)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "X", at(11)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "X", at(22)), Verdict::Allow);
    }

    #[test]
    fn test_only_identical_content_counts() {
        let mut f = filter();
        let author = UserId(7);
        assert_eq!(f.evaluate(author, "X", at(0)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "Y", at(1)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "X", at(2)), Verdict::Allow);
        assert_eq!(f.evaluate(author, "X", at(3)), Verdict::SpamBurst);
    }

    #[test]
    fn test_windows_are_per_author() {
        let mut f = filter();
        assert_eq!(f.evaluate(UserId(1), "X", at(0)), Verdict::Allow);
        assert_eq!(f.evaluate(UserId(2), "X", at(1)), Verdict::Allow);
        assert_eq!(f.evaluate(UserId(1), "X", at(2)), Verdict::Allow);
        assert_eq!(f.evaluate(UserId(2), "X", at(3)), Verdict::Allow);
    }

    #[test]
    fn test_lru_eviction_resets_an_inactive_author() {
        let terms: Vec<String> = Vec::new();
        let mut f = ContentPolicyFilter::new(&terms, 10, 3, 1);
        let (a, b) = (UserId(1), UserId(2));

        assert_eq!(f.evaluate(a, "X", at(0)), Verdict::Allow);
        assert_eq!(f.evaluate(a, "X", at(1)), Verdict::Allow);
        // b displaces a from the capacity-1 cache.
        assert_eq!(f.evaluate(b, "X", at(2)), Verdict::Allow);
        // a starts over: no stale window, no false burst.
        assert_eq!(f.evaluate(a, "X", at(3)), Verdict::Allow);
        assert_eq!(f.evaluate(a, "X", at(4)), Verdict::Allow);
        assert_eq!(f.evaluate(a, "X", at(5)), Verdict::SpamBurst);
    }
}
