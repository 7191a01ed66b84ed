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

//! End-to-end pipeline tests: terms and documents in, analysed graph out.

use docgraph_core::{Document, EdgeType, NodeType, TermFrequency, ThresholdRegistry};
use docgraph_query::{
    terms_from_documents, Corpus, DataLoader, GraphAnalyzer, KnowledgePipeline,
};
use std::fs;
use tempfile::TempDir;

fn handbook() -> Vec<Document> {
    vec![
        Document::new("wallets/overview", "wallets/overview.md")
            .with_title("Wallet Overview")
            .with_content("Wallets hold keys. Use the API to sign.")
            .with_terms(["wallet", "wallets", "api", "signing"])
            .with_links(["wallets/keys", "api/reference"]),
        Document::new("wallets/keys", "wallets/keys.md")
            .with_title("Key Management")
            .with_terms(["wallet", "private key", "signing"])
            .with_links(["wallets/overview"]),
        Document::new("api/reference", "api/reference.md")
            .with_title("API Reference")
            .with_content_type("reference")
            .with_terms(["api", "apis", "endpoint"])
            .with_links(["api/errors"]),
        Document::new("api/errors", "api/errors.md")
            .with_title("Errors")
            .with_terms(["api", "error codes"]),
        Document::new("changelog", "changelog.md").with_title("Changelog"),
    ]
}

#[test]
fn test_pipeline_end_to_end() {
    let documents = handbook();
    let terms = terms_from_documents(&documents);
    let out = KnowledgePipeline::new(ThresholdRegistry::default())
        .run(&documents, &terms)
        .unwrap();

    // Every raw term lands in exactly one concept
    let alias_total: usize = out.concepts.iter().map(|c| c.aliases.len()).sum();
    assert_eq!(alias_total, terms.len());

    let api = out.concepts.iter().find(|c| c.has_alias("apis")).unwrap();
    assert_eq!(api.term, "api");
    let wallet = out.concepts.iter().find(|c| c.has_alias("wallets")).unwrap();
    assert_eq!(wallet.term, "wallet");

    let graph = &out.graph;
    assert_eq!(graph.nodes_of_type(NodeType::Document).count(), 5);
    assert!(graph.dangling_edges().is_empty());
    assert_eq!(
        graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::LinksTo)
            .count(),
        4
    );

    let analysis = &out.analysis;
    assert_eq!(analysis.orphan_documents, vec!["doc:changelog".to_string()]);
    assert!(analysis.connectivity.score > 0.0 && analysis.connectivity.score <= 1.0);
    assert_eq!(analysis.top_documents[0].centrality, 1.0);
    assert_eq!(out.top_concepts[0].concept, "api");
}

#[test]
fn test_pipeline_is_reproducible() {
    let documents = handbook();
    let terms = terms_from_documents(&documents);
    let pipeline = KnowledgePipeline::new(ThresholdRegistry::default());

    let a = pipeline.run(&documents, &terms).unwrap();
    let b = pipeline.run(&documents, &terms).unwrap();
    assert_eq!(a.graph.content_hash(), b.graph.content_hash());
    assert_eq!(a.analysis, b.analysis);
}

#[test]
fn test_conflicting_term_frequencies_rejected() {
    let documents = handbook();
    let terms = vec![TermFrequency::new("api", 2), TermFrequency::new("api", 3)];
    let result = KnowledgePipeline::new(ThresholdRegistry::default()).run(&documents, &terms);
    assert!(result.is_err());
}

#[test]
fn test_corpus_snapshot_roundtrip() {
    let documents = handbook();
    let terms = terms_from_documents(&documents);
    let corpus = Corpus::from_pipeline(documents.clone(), &terms, &ThresholdRegistry::default())
        .unwrap();

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("documents.json"),
        serde_json::to_string(&documents).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join("graph.json"),
        serde_json::to_string(corpus.graph()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join("concepts.json"),
        serde_json::to_string(corpus.concepts()).unwrap(),
    )
    .unwrap();

    let loaded = Corpus::from_dir(dir.path(), &ThresholdRegistry::default()).unwrap();
    assert_eq!(loaded.graph_hash(), corpus.graph_hash());
    assert_eq!(loaded.concepts(), corpus.concepts());
    assert_eq!(loaded.analysis(), corpus.analysis());
}

#[test]
fn test_community_band_on_handbook() {
    let documents = handbook();
    let terms = terms_from_documents(&documents);
    let out = KnowledgePipeline::new(ThresholdRegistry::default())
        .run(&documents, &terms)
        .unwrap();

    let analyzer = GraphAnalyzer::default();
    let structure = analyzer.detect_communities(&out.graph);
    assert_eq!(structure.band, analyzer.band(structure.modularity));
    assert!(structure.modularity > 0.0 && structure.modularity < 1.0);
    // changelog is isolated, so it sits alone
    let changelog = structure.community_of("doc:changelog").unwrap();
    assert_eq!(structure.communities[changelog].len(), 1);
    assert!(structure.count() >= 2);
}
