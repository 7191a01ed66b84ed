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

//! Knowledge Pipeline
//!
//! One run turns parsed documents and raw term counts into concepts, a graph
//! and its analysis:
//!
//! ```text
//! terms ──▶ ConceptClusterer ──▶ concepts ─┐
//!                                          ├──▶ GraphBuilder ──▶ graph ──▶ GraphAnalyzer
//! documents ───────────────────────────────┘
//! ```
//!
//! Each run constructs its own [`TextSimilarity`], so n-gram caches never leak
//! between unrelated runs.

use crate::analyzer::{AnalyzerConfig, GraphAnalysis, GraphAnalyzer};
use crate::builder::{BuilderOptions, GraphBuilder};
use docgraph_core::{
    Concept, ConceptClusterer, Document, Graph, Result, TermFrequency, TextSimilarity,
    ThresholdRegistry, DEFAULT_NGRAM_CACHE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// A concept ranked for the `concepts/top` view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopConcept {
    pub concept: String,
    #[serde(default)]
    pub frequency: u64,
    #[serde(default)]
    pub file_count: usize,
    #[serde(default)]
    pub weight: f64,
}

impl TopConcept {
    /// `weight = frequency * file_count / document_count`, 0 without documents
    pub fn from_concept(concept: &Concept, document_count: usize) -> Self {
        let file_count = concept.file_count();
        let weight = if document_count == 0 {
            0.0
        } else {
            concept.frequency as f64 * file_count as f64 / document_count as f64
        };
        Self {
            concept: concept.term.clone(),
            frequency: concept.frequency,
            file_count,
            weight,
        }
    }
}

/// Sort by weight descending, then name ascending
pub fn rank_top_concepts(top: &mut [TopConcept]) {
    top.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.concept.cmp(&b.concept))
    });
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub concepts: Vec<Concept>,
    pub graph: Graph,
    pub analysis: GraphAnalysis,
    pub top_concepts: Vec<TopConcept>,
}

/// Cluster, build and analyze
#[derive(Debug, Clone)]
pub struct KnowledgePipeline {
    registry: ThresholdRegistry,
    builder: BuilderOptions,
    analyzer: AnalyzerConfig,
    ngram_cache_size: usize,
}

impl KnowledgePipeline {
    pub fn new(registry: ThresholdRegistry) -> Self {
        Self {
            registry,
            builder: BuilderOptions::default(),
            analyzer: AnalyzerConfig::default(),
            ngram_cache_size: DEFAULT_NGRAM_CACHE_SIZE,
        }
    }

    pub fn with_builder_options(mut self, options: BuilderOptions) -> Self {
        self.builder = options;
        self
    }

    pub fn with_analyzer_config(mut self, config: AnalyzerConfig) -> Self {
        self.analyzer = config;
        self
    }

    pub fn with_ngram_cache_size(mut self, size: usize) -> Self {
        self.ngram_cache_size = size;
        self
    }

    pub fn registry(&self) -> &ThresholdRegistry {
        &self.registry
    }

    /// Run the full pipeline.
    ///
    /// Terms without document ids are attributed to every document listing
    /// them in its extracted terms.
    pub fn run(&self, documents: &[Document], terms: &[TermFrequency]) -> Result<PipelineOutput> {
        let similarity = TextSimilarity::with_cache_capacity(&self.registry, self.ngram_cache_size);

        let terms = attribute_terms(terms, documents);
        let concepts = ConceptClusterer::new(&similarity).cluster(&terms)?;
        let graph =
            GraphBuilder::with_options(&similarity, self.builder.clone()).build(documents, &concepts);
        let analysis =
            GraphAnalyzer::with_config(&self.registry, self.analyzer.clone()).analyze(&graph);

        let mut top_concepts: Vec<TopConcept> = concepts
            .iter()
            .map(|c| TopConcept::from_concept(c, documents.len()))
            .collect();
        rank_top_concepts(&mut top_concepts);

        info!(
            documents = documents.len(),
            terms = terms.len(),
            concepts = concepts.len(),
            ngram_cache = similarity.cache_len(),
            "Pipeline run complete"
        );

        Ok(PipelineOutput {
            concepts,
            graph,
            analysis,
            top_concepts,
        })
    }
}

/// Count term occurrences across documents' extracted terms.
///
/// Order follows first appearance; each term carries the documents listing it.
pub fn terms_from_documents(documents: &[Document]) -> Vec<TermFrequency> {
    let mut order: Vec<TermFrequency> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for doc in documents {
        for term in &doc.terms {
            if term.trim().is_empty() {
                continue;
            }
            let i = *index.entry(term.as_str()).or_insert_with(|| {
                order.push(TermFrequency::new(term.as_str(), 0));
                order.len() - 1
            });
            order[i].frequency += 1;
            order[i].document_ids.insert(doc.key().to_string());
        }
    }

    order
}

fn attribute_terms(terms: &[TermFrequency], documents: &[Document]) -> Vec<TermFrequency> {
    let mut listed: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for doc in documents {
        for term in &doc.terms {
            listed.entry(term.as_str()).or_default().push(doc.key());
        }
    }

    terms
        .iter()
        .map(|t| {
            let mut t = t.clone();
            if t.document_ids.is_empty() {
                if let Some(docs) = listed.get(t.term.as_str()) {
                    t.document_ids.extend(docs.iter().map(|d| d.to_string()));
                }
            }
            t
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<Document> {
        vec![
            Document::new("a", "a.md").with_terms(["wallet", "api"]),
            Document::new("b", "b.md").with_terms(["api", "apis"]),
            Document::new("c", "c.md").with_terms(["staking"]),
            Document::new("d", "d.md"),
        ]
    }

    #[test]
    fn test_terms_from_documents() {
        let terms = terms_from_documents(&docs());
        let names: Vec<&str> = terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, vec!["wallet", "api", "apis", "staking"]);
        assert_eq!(terms[1].frequency, 2);
        assert_eq!(terms[1].document_ids.len(), 2);
    }

    #[test]
    fn test_run_top_concepts() {
        let pipeline = KnowledgePipeline::new(ThresholdRegistry::default());
        let documents = docs();
        let terms = vec![
            TermFrequency::new("api", 6),
            TermFrequency::new("apis", 2),
            TermFrequency::new("wallet", 3),
            TermFrequency::new("staking", 1),
        ];

        let out = pipeline.run(&documents, &terms).unwrap();
        assert_eq!(out.concepts.len(), 3);

        // api: 8 * 2 docs / 4 = 4.0; wallet: 3 * 1 / 4; staking: 1 * 1 / 4
        let top = &out.top_concepts;
        assert_eq!(top[0].concept, "api");
        assert_eq!(top[0].file_count, 2);
        assert!((top[0].weight - 4.0).abs() < 1e-9);
        assert_eq!(top[1].concept, "wallet");
        assert!((top[1].weight - 0.75).abs() < 1e-9);
        assert_eq!(top[2].concept, "staking");

        assert_eq!(out.analysis.stats.document_nodes, 4);
        assert_eq!(out.analysis.orphan_documents, vec!["doc:d".to_string()]);
    }

    #[test]
    fn test_rank_ties_by_name() {
        let mut top = vec![
            TopConcept {
                concept: "b".into(),
                frequency: 1,
                file_count: 1,
                weight: 1.0,
            },
            TopConcept {
                concept: "a".into(),
                frequency: 1,
                file_count: 1,
                weight: 1.0,
            },
        ];
        rank_top_concepts(&mut top);
        assert_eq!(top[0].concept, "a");
    }

    #[test]
    fn test_weight_without_documents() {
        let concept = Concept {
            term: "x".into(),
            aliases: ["x".to_string()].into_iter().collect(),
            frequency: 5,
            document_ids: Default::default(),
        };
        assert_eq!(TopConcept::from_concept(&concept, 0).weight, 0.0);
    }
}
