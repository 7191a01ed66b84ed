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

//! Graph Builder
//!
//! Turns documents and clustered concepts into a [`Graph`]:
//!
//! ```text
//! documents ──links──────────▶ links_to   (doc → doc, weight 1.0)
//! concepts × documents ──────▶ relates_to (concept → doc, matched aliases / aliases)
//! concepts × concepts ───────▶ similar_to (concept ↔ concept, bigram or token Jaccard)
//! ```
//!
//! Edges are emitted in the order documents and concepts were supplied, so the
//! same input always produces the same edge sequence. Concept pairs are compared
//! exhaustively (O(n²)); fine for documentation-scale corpora.

use docgraph_core::{Concept, Document, Edge, EdgeType, Graph, Node, NodeType, TextSimilarity};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Node id for a document key
pub fn document_node_id(key: &str) -> String {
    format!("doc:{}", key)
}

/// Node id for a concept's canonical term
pub fn concept_node_id(term: &str) -> String {
    format!("concept:{}", term)
}

/// Builder options
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Compare concepts by token Jaccard instead of bigram Jaccard
    pub use_token_similarity: bool,
    /// Emit `similar_to` edges between concepts
    pub concept_similarity_edges: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            use_token_similarity: false,
            concept_similarity_edges: true,
        }
    }
}

/// Builds the knowledge graph for one pipeline run
pub struct GraphBuilder<'a> {
    similarity: &'a TextSimilarity,
    options: BuilderOptions,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(similarity: &'a TextSimilarity) -> Self {
        Self::with_options(similarity, BuilderOptions::default())
    }

    pub fn with_options(similarity: &'a TextSimilarity, options: BuilderOptions) -> Self {
        Self {
            similarity,
            options,
        }
    }

    /// Build nodes and edges
    pub fn build(&self, documents: &[Document], concepts: &[Concept]) -> Graph {
        let mut graph = Graph::new();
        let mut node_ids: HashSet<String> = HashSet::new();

        let docs = self.add_document_nodes(&mut graph, &mut node_ids, documents);
        let concept_list = self.add_concept_nodes(&mut graph, &mut node_ids, concepts);

        self.add_link_edges(&mut graph, &docs);
        self.add_relates_edges(&mut graph, &docs, &concept_list);
        if self.options.concept_similarity_edges {
            self.add_similarity_edges(&mut graph, &concept_list);
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built knowledge graph"
        );
        graph
    }

    fn add_document_nodes<'d>(
        &self,
        graph: &mut Graph,
        node_ids: &mut HashSet<String>,
        documents: &'d [Document],
    ) -> Vec<&'d Document> {
        let mut accepted = Vec::with_capacity(documents.len());

        for doc in documents {
            let key = doc.key();
            if key.is_empty() {
                warn!("Skipping document without id or path");
                continue;
            }
            let id = document_node_id(key);
            if !node_ids.insert(id.clone()) {
                warn!(document = key, "Skipping duplicate document");
                continue;
            }

            let node = Node::new(id, NodeType::Document, doc.display_title())
                .with_attribute("path", doc.path.as_str())
                .with_attribute("directory", doc.directory_name())
                .with_attribute("contentType", doc.content_type_name())
                .with_attribute("wordCount", doc.word_count() as f64);
            graph.nodes.push(node);
            accepted.push(doc);
        }

        accepted
    }

    fn add_concept_nodes<'c>(
        &self,
        graph: &mut Graph,
        node_ids: &mut HashSet<String>,
        concepts: &'c [Concept],
    ) -> Vec<&'c Concept> {
        let mut accepted = Vec::with_capacity(concepts.len());

        for concept in concepts {
            let id = concept_node_id(&concept.term);
            if !node_ids.insert(id.clone()) {
                warn!(concept = %concept.term, "Skipping duplicate concept");
                continue;
            }

            let node = Node::new(id, NodeType::Concept, concept.term.as_str())
                .with_attribute("frequency", concept.frequency as f64)
                .with_attribute("fileCount", concept.file_count() as f64)
                .with_attribute("aliasCount", concept.aliases.len() as f64);
            graph.nodes.push(node);
            accepted.push(concept);
        }

        accepted
    }

    fn add_link_edges(&self, graph: &mut Graph, docs: &[&Document]) {
        // Links may name a target by id, by path, or by path without extension
        let mut targets: HashMap<&str, &str> = HashMap::new();
        for doc in docs {
            targets.entry(doc.key()).or_insert(doc.key());
        }
        for doc in docs {
            if !doc.path.is_empty() {
                targets.entry(doc.path.as_str()).or_insert(doc.key());
            }
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut unresolved = 0usize;

        for doc in docs {
            let source = doc.key();
            for link in &doc.links {
                let Some(target) = resolve_link(&targets, link) else {
                    debug!(source, link = %link, "Unresolved document link");
                    unresolved += 1;
                    continue;
                };
                if target == source || !seen.insert((source.to_string(), target.to_string())) {
                    continue;
                }
                graph.edges.push(Edge::new(
                    document_node_id(source),
                    document_node_id(target),
                    EdgeType::LinksTo,
                    1.0,
                ));
            }
        }

        if unresolved > 0 {
            debug!(unresolved, "Dropped links to unknown documents");
        }
    }

    fn add_relates_edges(&self, graph: &mut Graph, docs: &[&Document], concepts: &[&Concept]) {
        let doc_terms: Vec<HashSet<&str>> = docs
            .iter()
            .map(|d| d.terms.iter().map(String::as_str).collect())
            .collect();

        for concept in concepts {
            let alias_count = concept.aliases.len().max(1) as f64;
            for (doc, terms) in docs.iter().zip(&doc_terms) {
                let matched = concept
                    .aliases
                    .iter()
                    .filter(|a| terms.contains(a.as_str()))
                    .count();
                if matched == 0 {
                    continue;
                }
                graph.edges.push(Edge::new(
                    concept_node_id(&concept.term),
                    document_node_id(doc.key()),
                    EdgeType::RelatesTo,
                    matched as f64 / alias_count,
                ));
            }
        }
    }

    fn add_similarity_edges(&self, graph: &mut Graph, concepts: &[&Concept]) {
        let normalized: Vec<String> = concepts
            .iter()
            .map(|c| c.term.trim().to_lowercase())
            .collect();
        let use_tokens = self.options.use_token_similarity;

        for i in 0..concepts.len() {
            for j in (i + 1)..concepts.len() {
                let (a, b) = (&normalized[i], &normalized[j]);
                if !self.similarity.meets_edge_threshold(a, b, use_tokens) {
                    continue;
                }
                let score = if use_tokens {
                    self.similarity.token_similarity(a, b)
                } else {
                    self.similarity.bigram_similarity(a, b)
                };
                graph.edges.push(Edge::new(
                    concept_node_id(&concepts[i].term),
                    concept_node_id(&concepts[j].term),
                    EdgeType::SimilarTo,
                    score,
                ));
            }
        }
    }
}

fn resolve_link<'m>(targets: &HashMap<&str, &'m str>, link: &str) -> Option<&'m str> {
    if let Some(target) = targets.get(link) {
        return Some(target);
    }
    let trimmed = link.trim_start_matches("./").trim_start_matches('/');
    let trimmed = trimmed.split('#').next().unwrap_or(trimmed);
    if let Some(target) = targets.get(trimmed) {
        return Some(target);
    }
    let stem = trimmed
        .strip_suffix(".mdx")
        .or_else(|| trimmed.strip_suffix(".md"))
        .unwrap_or(trimmed);
    targets.get(stem).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{ConceptClusterer, TermFrequency};

    fn corpus() -> (Vec<Document>, Vec<TermFrequency>) {
        let docs = vec![
            Document::new("intro", "intro.md")
                .with_title("Introduction")
                .with_terms(["api", "wallet"])
                .with_links(["guides/staking", "missing-page"]),
            Document::new("guides/staking", "guides/staking.md")
                .with_title("Staking")
                .with_terms(["staking", "staking rewards"])
                .with_links(["/intro.md", "guides/staking"]),
            Document::new("reference/apis", "reference/apis.md")
                .with_terms(["apis"]),
        ];
        let terms = vec![
            TermFrequency::new("api", 4),
            TermFrequency::new("apis", 2),
            TermFrequency::new("wallet", 3),
            TermFrequency::new("staking", 3),
            TermFrequency::new("staking rewards", 1),
        ];
        (docs, terms)
    }

    fn build() -> Graph {
        let (docs, terms) = corpus();
        let sim = TextSimilarity::default();
        let concepts = ConceptClusterer::new(&sim).cluster(&terms).unwrap();
        GraphBuilder::new(&sim).build(&docs, &concepts)
    }

    #[test]
    fn test_nodes() {
        let graph = build();
        assert_eq!(graph.nodes_of_type(NodeType::Document).count(), 3);
        // api+apis merge; staking and "staking rewards" stay apart (length gate)
        assert_eq!(graph.nodes_of_type(NodeType::Concept).count(), 4);
        let intro = graph.node("doc:intro").unwrap();
        assert_eq!(intro.label, "Introduction");
        // Missing title falls back to the file stem
        assert_eq!(graph.node("doc:reference/apis").unwrap().label, "apis");
    }

    #[test]
    fn test_link_edges() {
        let graph = build();
        let links: Vec<(&str, &str)> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::LinksTo)
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();

        // Unknown target dropped, self-link dropped, path link resolved
        assert_eq!(
            links,
            vec![
                ("doc:intro", "doc:guides/staking"),
                ("doc:guides/staking", "doc:intro"),
            ]
        );
    }

    #[test]
    fn test_relates_edges() {
        let graph = build();
        let relates: Vec<&Edge> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::RelatesTo)
            .collect();

        let api_edges: Vec<&Edge> = relates
            .iter()
            .copied()
            .filter(|e| e.source == "concept:api")
            .collect();
        assert_eq!(api_edges.len(), 2);
        // intro mentions one of the two aliases
        assert_eq!(api_edges[0].target, "doc:intro");
        assert!((api_edges[0].weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_edges_no_self_loops() {
        let graph = build();
        let similar: Vec<&Edge> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::SimilarTo)
            .collect();

        assert!(similar
            .iter()
            .any(|e| e.source == "concept:staking" && e.target == "concept:staking rewards"));
        assert!(similar.iter().all(|e| e.source != e.target));
        assert!(similar.iter().all(|e| e.weight > 0.3));
    }

    #[test]
    fn test_edges_reference_existing_nodes() {
        let graph = build();
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn test_deterministic_output() {
        let a = build();
        let b = build();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_duplicate_documents_skipped() {
        let sim = TextSimilarity::default();
        let docs = vec![
            Document::new("a", "a.md"),
            Document::new("a", "a-copy.md"),
            Document::default(),
        ];
        let graph = GraphBuilder::new(&sim).build(&docs, &[]);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_similarity_edges_disabled() {
        let (docs, terms) = corpus();
        let sim = TextSimilarity::default();
        let concepts = ConceptClusterer::new(&sim).cluster(&terms).unwrap();
        let options = BuilderOptions {
            concept_similarity_edges: false,
            ..Default::default()
        };
        let graph = GraphBuilder::with_options(&sim, options).build(&docs, &concepts);
        assert!(graph
            .edges
            .iter()
            .all(|e| e.edge_type != EdgeType::SimilarTo));
    }
}
