//! Token-sort similarity scoring and the memo caches used by the entity normalizers.

use std::collections::HashMap;
use std::sync::RwLock;

/// Lowercase, split on non-alphanumerics, sort tokens, rejoin with single spaces.
pub fn token_sort_key(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two strings on a 0-100 scale, insensitive to word order and case.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio_of_keys(&token_sort_key(a), &token_sort_key(b))
}

fn ratio_of_keys(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Upper bound on the ratio two keys can reach given only their lengths.
fn length_ceiling(a: usize, b: usize) -> f64 {
    let (short, long) = if a <= b { (a, b) } else { (b, a) };
    if long == 0 {
        return 100.0;
    }
    short as f64 / long as f64 * 100.0
}

/// Pre-computed token-sort keys for one vocabulary.
#[derive(Debug)]
pub struct FuzzyIndex {
    keys: Vec<String>,
}

/// Best candidate found by [`FuzzyIndex::best_match`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyHit {
    pub index: usize,
    pub score: f64,
    /// Another candidate with a different key scored the same.
    pub ambiguous: bool,
}

impl FuzzyIndex {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            keys: names.into_iter().map(token_sort_key).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Highest-scoring entry at or above `threshold`. Ties keep the earliest entry.
    pub fn best_match(&self, query: &str, threshold: f64) -> Option<FuzzyHit> {
        let query_key = token_sort_key(query);
        if query_key.is_empty() {
            return None;
        }
        let query_len = query_key.chars().count();

        let mut best: Option<FuzzyHit> = None;
        for (index, key) in self.keys.iter().enumerate() {
            if length_ceiling(query_len, key.chars().count()) < threshold {
                continue;
            }
            let score = ratio_of_keys(&query_key, key);
            if score < threshold {
                continue;
            }
            let replace = match &best {
                Some(hit) => score > hit.score,
                None => true,
            };
            if replace {
                best = Some(FuzzyHit {
                    index,
                    score,
                    ambiguous: false,
                });
            } else if let Some(hit) = best.as_mut() {
                if score == hit.score && self.keys[hit.index] != *key {
                    hit.ambiguous = true;
                }
            }
        }
        best
    }
}

/// Memo of raw → normalized values, keyed on lowercase trimmed input.
/// A poisoned lock only disables caching; lookups fall through to recomputation.
#[derive(Debug)]
pub struct NormalizationCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> NormalizationCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        match self.entries.read() {
            Ok(map) => map.get(key).cloned(),
            Err(_) => {
                tracing::warn!("Normalization cache lock poisoned, bypassing cache");
                None
            }
        }
    }

    pub fn insert(&self, key: String, value: V) {
        match self.entries.write() {
            Ok(mut map) => {
                map.insert(key, value);
            }
            Err(_) => {
                tracing::warn!("Normalization cache lock poisoned, result not cached");
            }
        }
    }

    /// Cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with(&self, key: String, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for NormalizationCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_sort_ignores_order_and_case() {
        assert_eq!(token_sort_ratio("Diabetes Type 2", "type 2 diabetes"), 100.0);
        assert_eq!(token_sort_key("  Chronic, Kidney  disease "), "chronic disease kidney");
    }

    #[test]
    fn small_typo_stays_above_threshold() {
        assert!(token_sort_ratio("hypertensoin", "hypertension") >= 80.0);
        assert!(token_sort_ratio("pneumonia", "asthma") < 50.0);
    }

    #[test]
    fn best_match_respects_threshold() {
        let index = FuzzyIndex::new(["Hypertension", "Hypotension", "Asthma"]);
        let hit = index.best_match("hypertensionn", 85.0).unwrap();
        assert_eq!(hit.index, 0);
        assert!(!hit.ambiguous);
        assert!(index.best_match("fracture", 85.0).is_none());
        assert!(index.best_match("   ", 85.0).is_none());
    }

    #[test]
    fn ties_between_distinct_keys_are_flagged() {
        let index = FuzzyIndex::new(["abcdef", "abcdeg"]);
        let hit = index.best_match("abcdex", 80.0).unwrap();
        assert_eq!(hit.index, 0);
        assert!(hit.ambiguous);
    }

    #[test]
    fn cache_computes_once() {
        let cache: NormalizationCache<String> = NormalizationCache::new();
        let key = NormalizationCache::<String>::key("  Diabetes ");
        assert_eq!(key, "diabetes");

        let first = cache.get_or_insert_with(key.clone(), || "Diabetes".to_string());
        let second = cache.get_or_insert_with(key, || panic!("should be cached"));
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_is_shared_across_threads() {
        let cache: NormalizationCache<String> = NormalizationCache::new();
        let raws = ["Diabetes", "HYPERTENSION", " asthma ", "Anemia"];

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                scope.spawn(move || {
                    for round in 0..50 {
                        let raw = raws[(worker + round) % raws.len()];
                        let key = NormalizationCache::<String>::key(raw);
                        let value = cache.get_or_insert_with(key.clone(), || key.to_uppercase());
                        assert_eq!(value, raw.trim().to_uppercase());
                    }
                });
            }
        });

        assert_eq!(cache.len(), raws.len());
        assert_eq!(cache.get("asthma").as_deref(), Some("ASTHMA"));
    }
}
