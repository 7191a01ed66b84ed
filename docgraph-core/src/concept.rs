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

//! Concept Clustering
//!
//! Partitions raw extracted terms into canonical concepts.
//!
//! ## Algorithm
//!
//! 1. Order terms by descending frequency, ties broken by byte-wise term order
//! 2. Compare each term against every existing cluster's canonical term, in
//!    cluster creation order, using [`TextSimilarity::are_similar_terms`] on the
//!    trimmed, lowercased forms
//! 3. Join the **first** matching cluster, otherwise start a new one
//!
//! The canonical term is fixed when a cluster is created and is never
//! re-elected. First-match (not best-match) keeps canonical terms stable across
//! runs; downstream consumers key on them.

use crate::error::{DocGraphError, Result};
use crate::similarity::TextSimilarity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A raw term with its corpus frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermFrequency {
    pub term: String,
    pub frequency: u64,
    /// Documents the term was extracted from
    #[serde(default)]
    pub document_ids: BTreeSet<String>,
}

impl TermFrequency {
    pub fn new(term: impl Into<String>, frequency: u64) -> Self {
        Self {
            term: term.into(),
            frequency,
            document_ids: BTreeSet::new(),
        }
    }

    pub fn with_documents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonical merged entity for one or more near-duplicate terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// Canonical term (the term that created the cluster)
    pub term: String,
    /// Every merged term, canonical included
    pub aliases: BTreeSet<String>,
    /// Sum of the constituent frequencies
    pub frequency: u64,
    pub document_ids: BTreeSet<String>,
}

impl Concept {
    fn seed(term: &TermFrequency) -> Self {
        let mut aliases = BTreeSet::new();
        aliases.insert(term.term.clone());
        Self {
            term: term.term.clone(),
            aliases,
            frequency: term.frequency,
            document_ids: term.document_ids.clone(),
        }
    }

    fn absorb(&mut self, term: &TermFrequency) {
        self.aliases.insert(term.term.clone());
        self.frequency = self.frequency.saturating_add(term.frequency);
        self.document_ids.extend(term.document_ids.iter().cloned());
    }

    /// Number of distinct documents mentioning any alias
    pub fn file_count(&self) -> usize {
        self.document_ids.len()
    }

    pub fn has_alias(&self, term: &str) -> bool {
        self.aliases.contains(term)
    }
}

/// Greedy first-match term clusterer
pub struct ConceptClusterer<'a> {
    similarity: &'a TextSimilarity,
}

impl<'a> ConceptClusterer<'a> {
    pub fn new(similarity: &'a TextSimilarity) -> Self {
        Self { similarity }
    }

    /// Partition `terms` into concepts.
    ///
    /// A literal term listed twice with the same frequency is merged; listed
    /// with conflicting frequencies it is ambiguous and rejected.
    pub fn cluster(&self, terms: &[TermFrequency]) -> Result<Vec<Concept>> {
        let ordered = Self::prepare(terms)?;

        // (normalized canonical, concept)
        let mut clusters: Vec<(String, Concept)> = Vec::new();

        for term in ordered {
            let normalized = normalize(&term.term);
            let existing = clusters
                .iter_mut()
                .find(|(canonical, _)| self.similarity.are_similar_terms(&normalized, canonical));

            match existing {
                Some((_, concept)) => concept.absorb(&term),
                None => clusters.push((normalized, Concept::seed(&term))),
            }
        }

        tracing::debug!(
            terms = terms.len(),
            concepts = clusters.len(),
            "Clustered terms into concepts"
        );

        Ok(clusters.into_iter().map(|(_, c)| c).collect())
    }

    /// Deduplicate and order the input
    fn prepare(terms: &[TermFrequency]) -> Result<Vec<TermFrequency>> {
        let mut unique: Vec<TermFrequency> = Vec::with_capacity(terms.len());
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for term in terms {
            if term.term.trim().is_empty() {
                tracing::warn!("Skipping blank term");
                continue;
            }

            match seen.get(term.term.as_str()) {
                Some(&idx) => {
                    let first = &mut unique[idx];
                    if first.frequency != term.frequency {
                        return Err(DocGraphError::InvalidInput(format!(
                            "term '{}' listed with conflicting frequencies {} and {}",
                            term.term, first.frequency, term.frequency
                        )));
                    }
                    first.document_ids.extend(term.document_ids.iter().cloned());
                }
                None => {
                    seen.insert(term.term.as_str(), unique.len());
                    unique.push(term.clone());
                }
            }
        }

        unique.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.term.cmp(&b.term)));
        Ok(unique)
    }
}

fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}
