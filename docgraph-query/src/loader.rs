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

//! Corpus Loading
//!
//! [`DataLoader`] is the single I/O boundary of the query layer: it hands over
//! already-parsed documents, the graph, ranked concepts and the analysis.
//! [`Corpus`] is the in-memory implementation, built from parts, from a
//! pipeline run, or from a data directory:
//!
//! ```text
//! <dir>/documents.json   required, array of document records
//! <dir>/graph.json       snapshot graph; when present the snapshot is used as-is
//! <dir>/concepts.json    { "topConcepts": [...] }
//! <dir>/analysis.json    recomputed from graph.json when absent
//! <dir>/terms.json       [{ "term", "frequency" }], pipeline input without a snapshot
//! ```

use crate::analyzer::GraphAnalyzer;
use crate::builder::{concept_node_id, document_node_id};
use crate::pipeline::{rank_top_concepts, KnowledgePipeline, TopConcept};
use docgraph_core::{
    DocGraphError, Document, EdgeType, Graph, Result, TermFrequency, ThresholdRegistry,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DOCUMENTS_FILE: &str = "documents.json";
pub const GRAPH_FILE: &str = "graph.json";
pub const CONCEPTS_FILE: &str = "concepts.json";
pub const ANALYSIS_FILE: &str = "analysis.json";
pub const TERMS_FILE: &str = "terms.json";

/// Ranked concept list as stored in `concepts.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSet {
    #[serde(default)]
    pub top_concepts: Vec<TopConcept>,
}

/// Source of pre-parsed corpus data
pub trait DataLoader {
    fn documents(&self) -> &[Document];

    fn graph(&self) -> &Graph;

    fn concepts(&self) -> &ConceptSet;

    fn analysis(&self) -> &Value;

    /// Content hash of [`graph`](Self::graph), used to key caches
    fn graph_hash(&self) -> String {
        self.graph().content_hash()
    }

    fn get_document_by_id(&self, id: &str) -> Option<&Document> {
        self.documents().iter().find(|d| d.key() == id)
    }

    fn get_document_by_path(&self, path: &str) -> Option<&Document> {
        let path = path.trim_start_matches('/');
        self.documents()
            .iter()
            .find(|d| d.path.trim_start_matches('/') == path)
    }

    /// Documents in `directory` or any directory below it
    fn get_documents_by_directory(&self, directory: &str) -> Vec<&Document> {
        let directory = directory.trim_matches('/');
        let prefix = format!("{}/", directory);
        self.documents()
            .iter()
            .filter(|d| {
                let dir = d.directory_name();
                let dir = dir.trim_matches('/');
                dir == directory || dir.starts_with(&prefix)
            })
            .collect()
    }

    fn get_documents_by_content_type(&self, content_type: &str) -> Vec<&Document> {
        self.documents()
            .iter()
            .filter(|d| d.content_type_name() == content_type)
            .collect()
    }

    /// Ranked concept by name, ignoring case
    fn get_concept_by_name(&self, name: &str) -> Option<&TopConcept> {
        let name = name.to_lowercase();
        self.concepts()
            .top_concepts
            .iter()
            .find(|c| c.concept.to_lowercase() == name)
    }

    /// Documents the concept relates to, in edge order; case-insensitive
    /// like [`DataLoader::get_concept_by_name`]
    fn get_documents_by_concept(&self, name: &str) -> Vec<&Document> {
        let source = concept_node_id(&name.to_lowercase());
        self.graph()
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::RelatesTo && e.source.to_lowercase() == source)
            .filter_map(|e| {
                self.documents()
                    .iter()
                    .find(|d| document_node_id(d.key()) == e.target)
            })
            .collect()
    }
}

/// In-memory corpus
#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<Document>,
    graph: Graph,
    concepts: ConceptSet,
    analysis: Value,
    graph_hash: String,
}

impl Corpus {
    pub fn from_parts(
        documents: Vec<Document>,
        graph: Graph,
        top_concepts: Vec<TopConcept>,
        analysis: Value,
    ) -> Self {
        let graph_hash = graph.content_hash();
        Self {
            documents,
            graph,
            concepts: ConceptSet { top_concepts },
            analysis,
            graph_hash,
        }
    }

    /// Run the pipeline over `documents` and `terms`
    pub fn from_pipeline(
        documents: Vec<Document>,
        terms: &[TermFrequency],
        registry: &ThresholdRegistry,
    ) -> Result<Self> {
        let output = KnowledgePipeline::new(registry.clone()).run(&documents, terms)?;
        let analysis = serde_json::to_value(&output.analysis)?;
        Ok(Self::from_parts(
            documents,
            output.graph,
            output.top_concepts,
            analysis,
        ))
    }

    /// Load a corpus directory
    pub fn from_dir(dir: impl AsRef<Path>, registry: &ThresholdRegistry) -> Result<Self> {
        let dir = dir.as_ref();
        let documents_path = dir.join(DOCUMENTS_FILE);
        if !documents_path.is_file() {
            return Err(DocGraphError::NotFound(format!(
                "{} in {}",
                DOCUMENTS_FILE,
                dir.display()
            )));
        }
        let documents = load_documents(&documents_path)?;

        let graph_path = dir.join(GRAPH_FILE);
        if graph_path.is_file() {
            let graph: Graph = read_json(&graph_path)?;
            let concepts: ConceptSet = read_optional(&dir.join(CONCEPTS_FILE))?.unwrap_or_default();
            let analysis = match read_optional::<Value>(&dir.join(ANALYSIS_FILE))? {
                Some(analysis) => analysis,
                None => {
                    debug!("No analysis snapshot, recomputing");
                    serde_json::to_value(GraphAnalyzer::new(registry).analyze(&graph))?
                }
            };

            let mut top_concepts = concepts.top_concepts;
            rank_top_concepts(&mut top_concepts);

            info!(
                dir = %dir.display(),
                documents = documents.len(),
                nodes = graph.node_count(),
                "Loaded corpus snapshot"
            );
            return Ok(Self::from_parts(documents, graph, top_concepts, analysis));
        }

        let terms: Vec<TermFrequency> = read_optional(&dir.join(TERMS_FILE))?.unwrap_or_default();
        info!(
            dir = %dir.display(),
            documents = documents.len(),
            terms = terms.len(),
            "Building corpus from documents"
        );
        Self::from_pipeline(documents, &terms, registry)
    }
}

impl DataLoader for Corpus {
    fn documents(&self) -> &[Document] {
        &self.documents
    }

    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn concepts(&self) -> &ConceptSet {
        &self.concepts
    }

    fn analysis(&self) -> &Value {
        &self.analysis
    }

    fn graph_hash(&self) -> String {
        self.graph_hash.clone()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| DocGraphError::Serialization(format!("{}: {}", path.display(), e)))
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Parse document records one by one so a bad record does not sink the batch
fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let records: Vec<Value> = read_json(path)?;
    let mut documents = Vec::with_capacity(records.len());

    for (i, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Document>(record) {
            Ok(doc) if doc.key().is_empty() => {
                warn!(record = i, "Skipping document without id or path");
            }
            Ok(doc) => documents.push(doc),
            Err(e) => warn!(record = i, error = %e, "Skipping malformed document"),
        }
    }

    Ok(documents)
}
