use std::collections::HashSet;

use tracing::warn;

use crate::core::{
    ImplicitInterests,
    InterestEntry,
};

/// How many implicit interests are shown.
pub const IMPLICIT_TOP_N: usize = 10;

/// One user's profile as last reconciled with the server, plus staged slider edits.
///
/// Pure data. Only [`ProfileStore::stage_weight`] changes state without a backend
/// response behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStore {
    explicit: Vec<InterestEntry>,
    implicit: ImplicitInterests,
    exclusions: Vec<String>,
    top_n: usize,
    top_implicit: Vec<InterestEntry>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::with_top_n(IMPLICIT_TOP_N)
    }

    pub fn with_top_n(top_n: usize) -> Self {
        Self {
            explicit: Vec::new(),
            implicit: ImplicitInterests::new(),
            exclusions: Vec::new(),
            top_n,
            top_implicit: Vec::new(),
        }
    }

    pub fn replace_explicit(&mut self, entries: Vec<InterestEntry>) {
        let mut seen = HashSet::new();
        let mut explicit = Vec::with_capacity(entries.len());
        for entry in entries {
            if seen.insert(entry.keyword.clone()) {
                explicit.push(entry);
            } else {
                warn!(keyword = %entry.keyword, "Duplicate explicit interest in response, keeping first");
            }
        }
        self.explicit = explicit;
    }

    pub fn replace_implicit(&mut self, implicit: ImplicitInterests) {
        self.implicit = implicit;
        self.drop_excluded_implicit();
        self.refresh_top();
    }

    pub fn replace_exclusions(&mut self, exclusions: Vec<String>) {
        let mut seen = HashSet::new();
        self.exclusions = exclusions.into_iter().filter(|k| seen.insert(k.clone())).collect();
        self.drop_excluded_implicit();
        self.refresh_top();
    }

    /// Both implicit collections at once, as the exclusion routes return them.
    pub fn replace_implicit_state(&mut self, implicit: ImplicitInterests, exclusions: Vec<String>) {
        let mut seen = HashSet::new();
        self.exclusions = exclusions.into_iter().filter(|k| seen.insert(k.clone())).collect();
        self.implicit = implicit;
        self.drop_excluded_implicit();
        self.refresh_top();
    }

    /// Local-only weight edit. Returns `false`, leaving the store as is, when the
    /// keyword is not an explicit interest or the weight is not a number.
    pub fn stage_weight(&mut self, keyword: &str, weight: f64) -> bool {
        if !weight.is_finite() {
            return false;
        }
        match self.explicit.iter_mut().find(|e| e.keyword == keyword) {
            Some(entry) => {
                entry.weight = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::with_top_n(self.top_n);
    }

    fn drop_excluded_implicit(&mut self) {
        if self.exclusions.is_empty() {
            return;
        }
        let excluded: HashSet<&str> = self.exclusions.iter().map(String::as_str).collect();
        self.implicit.retain(|keyword, _| {
            let keep = !excluded.contains(keyword);
            if !keep {
                warn!(keyword, "Keyword is both implicit and excluded, hiding it");
            }
            keep
        });
    }

    fn refresh_top(&mut self) {
        self.top_implicit = self.implicit.top(self.top_n);
    }

    pub fn explicit(&self) -> &[InterestEntry] {
        &self.explicit
    }

    pub fn implicit(&self) -> &ImplicitInterests {
        &self.implicit
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Heaviest implicit interests first, ties in backend order.
    pub fn top_implicit(&self) -> &[InterestEntry] {
        &self.top_implicit
    }

    pub fn explicit_weight(&self, keyword: &str) -> Option<f64> {
        self.explicit.iter().find(|e| e.keyword == keyword).map(|e| e.weight)
    }

    pub fn contains_explicit(&self, keyword: &str) -> bool {
        self.explicit.iter().any(|e| e.keyword == keyword)
    }

    pub fn contains_implicit(&self, keyword: &str) -> bool {
        self.implicit.contains(keyword)
    }

    pub fn is_excluded(&self, keyword: &str) -> bool {
        self.exclusions.iter().any(|k| k == keyword)
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.implicit.is_empty() && self.exclusions.is_empty()
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(entries: &[InterestEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.keyword.as_str()).collect()
    }

    #[test]
    fn test_replace_explicit_keeps_order_and_drops_duplicates() {
        let mut store = ProfileStore::new();
        store.replace_explicit(vec![
            InterestEntry::new("rust", 1.0),
            InterestEntry::new("chess", 0.3),
            InterestEntry::new("rust", 0.1),
            InterestEntry::new("Rust", 0.5),
        ]);
        assert_eq!(keywords(store.explicit()), vec!["rust", "chess", "Rust"]);
        assert_eq!(store.explicit_weight("rust"), Some(1.0));
    }

    #[test]
    fn test_stage_weight() {
        let mut store = ProfileStore::new();
        store.replace_explicit(vec![InterestEntry::new("chess", 0.3), InterestEntry::new("go", 0.5)]);

        assert!(store.stage_weight("chess", 0.8));
        assert_eq!(store.explicit_weight("chess"), Some(0.8));
        assert_eq!(keywords(store.explicit()), vec!["chess", "go"]);

        assert!(store.stage_weight("go", 1.7));
        assert_eq!(store.explicit_weight("go"), Some(1.0));

        let before = store.clone();
        assert!(!store.stage_weight("poker", 0.4));
        assert!(!store.stage_weight("chess", f64::NAN));
        assert_eq!(store, before);
    }

    #[test]
    fn test_top_n_view() {
        let mut store = ProfileStore::with_top_n(2);
        store.replace_implicit([("a", 0.9), ("b", 0.9), ("c", 0.5)].into_iter().collect());
        assert_eq!(keywords(store.top_implicit()), vec!["a", "b"]);

        let mut store = ProfileStore::new();
        store.replace_implicit((0..15).map(|i| (format!("k{i}"), i as f64)).collect());
        assert_eq!(store.top_implicit().len(), IMPLICIT_TOP_N);
        assert_eq!(store.top_implicit()[0].keyword, "k14");
        assert_eq!(store.implicit().len(), 15);
    }

    #[test]
    fn test_excluded_keyword_never_in_both() {
        let mut store = ProfileStore::new();
        store.replace_implicit_state(
            [("rust", 2.0), ("python", 1.0)].into_iter().collect(),
            vec!["python".to_string()],
        );
        assert!(store.contains_implicit("rust"));
        assert!(!store.contains_implicit("python"));
        assert!(store.is_excluded("python"));
        assert_eq!(keywords(store.top_implicit()), vec!["rust"]);

        store.replace_exclusions(vec!["rust".to_string(), "python".to_string()]);
        assert!(store.implicit().is_empty());
        assert!(store.top_implicit().is_empty());
    }

    #[test]
    fn test_clear_keeps_top_n() {
        let mut store = ProfileStore::with_top_n(3);
        store.replace_explicit(vec![InterestEntry::new("chess", 0.3)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store, ProfileStore::with_top_n(3));
    }
}
