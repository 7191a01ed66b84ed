// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Text Similarity
//!
//! Set-based string similarity used for concept merging and edge creation:
//!
//! ```text
//! J(A, B) = |A ∩ B| / |A ∪ B|
//! ```
//!
//! - **Token Jaccard**: A, B = lowercase whitespace tokens
//! - **N-gram Jaccard**: A, B = sliding-window character n-grams (default bigrams)
//! - **Fast check**: length ratio, substring and character-set overlap pre-filter
//!
//! N-gram sets are memoized per `(string, n)` in a bounded cache. When the cache
//! is full, the entry inserted first is evicted (insertion order, not access
//! order). One instance is meant to be owned by a single pipeline run.

use crate::thresholds::{SimilarityThresholds, ThresholdRegistry};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Default capacity of the n-gram cache
pub const DEFAULT_NGRAM_CACHE_SIZE: usize = 1000;

type NgramKey = (String, usize);

/// Bounded n-gram cache with oldest-insertion eviction
#[derive(Debug)]
struct NgramCache {
    entries: HashMap<NgramKey, Arc<HashSet<String>>>,
    order: VecDeque<NgramKey>,
    capacity: usize,
}

impl NgramCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, key: &NgramKey) -> Option<Arc<HashSet<String>>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: NgramKey, value: Arc<HashSet<String>>) {
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// String similarity algorithms with a per-instance n-gram cache
#[derive(Debug)]
pub struct TextSimilarity {
    thresholds: SimilarityThresholds,
    cache: RefCell<NgramCache>,
}

impl Default for TextSimilarity {
    fn default() -> Self {
        Self::new(&ThresholdRegistry::default())
    }
}

impl TextSimilarity {
    /// Create with thresholds from the registry and the default cache size
    pub fn new(registry: &ThresholdRegistry) -> Self {
        Self::with_cache_capacity(registry, DEFAULT_NGRAM_CACHE_SIZE)
    }

    /// Create with an explicit n-gram cache capacity
    pub fn with_cache_capacity(registry: &ThresholdRegistry, capacity: usize) -> Self {
        Self {
            thresholds: registry.similarity().clone(),
            cache: RefCell::new(NgramCache::new(capacity)),
        }
    }

    pub fn thresholds(&self) -> &SimilarityThresholds {
        &self.thresholds
    }

    /// Lowercase whitespace tokens; empty input yields an empty set
    pub fn tokenize(s: &str) -> HashSet<String> {
        s.split_whitespace()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Jaccard similarity over token sets
    pub fn token_similarity(&self, a: &str, b: &str) -> f64 {
        let tokens_a = Self::tokenize(a);
        let tokens_b = Self::tokenize(b);

        match (tokens_a.is_empty(), tokens_b.is_empty()) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            _ => jaccard(&tokens_a, &tokens_b),
        }
    }

    /// Character n-grams of `s`, memoized by `(s, n)`.
    ///
    /// Strings shorter than `n` (and `n == 0`) yield an empty set.
    pub fn ngrams(&self, s: &str, n: usize) -> Arc<HashSet<String>> {
        let key = (s.to_string(), n);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached;
        }

        let chars: Vec<char> = s.chars().collect();
        let grams: HashSet<String> = if n == 0 || chars.len() < n {
            HashSet::new()
        } else {
            chars.windows(n).map(|w| w.iter().collect()).collect()
        };

        let grams = Arc::new(grams);
        self.cache.borrow_mut().insert(key, Arc::clone(&grams));
        grams
    }

    /// Jaccard similarity over character n-grams.
    ///
    /// Identical strings score 1.0. Distinct strings that are both shorter
    /// than `n` have no n-grams and score 0.0, so `("a", "b")` is 0.0.
    pub fn ngram_similarity(&self, a: &str, b: &str, n: usize) -> f64 {
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let grams_a = self.ngrams(a, n);
        let grams_b = self.ngrams(b, n);
        if grams_a.is_empty() && grams_b.is_empty() {
            return 0.0;
        }
        jaccard(&grams_a, &grams_b)
    }

    /// Bigram similarity
    pub fn bigram_similarity(&self, a: &str, b: &str) -> f64 {
        self.ngram_similarity(a, b, 2)
    }

    /// Cheap pre-filter for [`are_similar_terms`](Self::are_similar_terms).
    ///
    /// May accept pairs the detailed check later rejects; callers re-validate.
    pub fn fast_check(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a == b {
            return true;
        }

        let len_a = a.chars().count();
        let len_b = b.chars().count();
        let max_len = len_a.max(len_b) as f64;
        let length_delta = len_a.abs_diff(len_b) as f64 / max_len;
        if length_delta > self.thresholds.length_difference {
            return false;
        }

        if a.contains(b) || b.contains(a) {
            return true;
        }

        let chars_a: HashSet<char> = a.chars().collect();
        let chars_b: HashSet<char> = b.chars().collect();
        jaccard(&chars_a, &chars_b) > self.thresholds.fast_check
    }

    /// Whether two terms denote the same concept
    pub fn are_similar_terms(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        if !self.fast_check(a, b) {
            return false;
        }

        self.bigram_similarity(a, b) > self.thresholds.concept_merge
            || a.contains(b)
            || b.contains(a)
    }

    /// Whether the chosen metric strictly exceeds `similarity.edgeCreation`
    pub fn meets_edge_threshold(&self, a: &str, b: &str, use_tokens: bool) -> bool {
        let score = if use_tokens {
            self.token_similarity(a, b)
        } else {
            self.bigram_similarity(a, b)
        };
        score > self.thresholds.edge_creation
    }

    /// Number of cached n-gram sets
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().entries.len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.borrow().capacity
    }

    /// Whether the n-grams of `(s, n)` are resident in the cache
    pub fn is_cached(&self, s: &str, n: usize) -> bool {
        self.cache.borrow().entries.contains_key(&(s.to_string(), n))
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
