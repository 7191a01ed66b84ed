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

//! `docs://` Resources
//!
//! Read-only views over a [`DataLoader`] corpus, addressed by URI:
//!
//! | Path | Body |
//! |---|---|
//! | `graph` | full graph |
//! | `graph/summary` | node/edge counts and graph hash |
//! | `documents[?limit&offset&directory&content_type]` | paginated documents |
//! | `documents/summary[?limit&offset&directory&content_type]` | paginated metadata, no bodies |
//! | `documents/list[?directory]` | path + title |
//! | `documents/<id>` | one document, by id then by path (percent-decoded) |
//! | `concepts[?limit&offset]` | paginated ranked concepts |
//! | `concepts/top[?limit]` | highest-weight concepts |
//! | `analysis` | structural analysis |
//! | `summary` | cross-cutting digest |
//!
//! `summary` and `list` are reserved under `documents/`: a document whose id
//! is one of them is reached through its path instead (`documents/summary.md`).
//!
//! Rendered bodies are cached per graph hash, path and sorted query, so a
//! reloaded corpus never serves stale bodies.

use crate::mcp::protocol::{ReadResourceResult, Resource, ResourceContent, MIME_JSON};
use docgraph_core::{DocGraphError, Document, GraphStats, NodeType, Result};
use docgraph_query::{
    rank_top_concepts, CacheConfig, CacheManager, CacheStats, DataLoader, PaginatedResponse,
    TopConcept,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use url::form_urlencoded;

/// URI scheme prefix
pub const URI_SCHEME: &str = "docs://";

pub const DEFAULT_DOCUMENTS_LIMIT: usize = 50;
pub const DEFAULT_SUMMARY_LIMIT: usize = 100;
pub const DEFAULT_CONCEPTS_LIMIT: usize = 100;
pub const DEFAULT_TOP_CONCEPTS_LIMIT: usize = 20;

/// Concepts listed by the `summary` resource
const SUMMARY_TOP_CONCEPTS: usize = 10;

/// Parsed query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(usize),
    Text(String),
}

impl ParamValue {
    fn render(&self) -> String {
        match self {
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

/// A parsed `docs://` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub resource_path: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl ResourceRequest {
    pub fn limit(&self) -> Option<usize> {
        self.int("limit")
    }

    pub fn offset(&self) -> Option<usize> {
        self.int("offset")
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.params.get(name) {
            Some(ParamValue::Text(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    fn int(&self, name: &str) -> Option<usize> {
        match self.params.get(name) {
            Some(ParamValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// `path?k=v&...` with keys in sorted order
    pub fn canonical(&self) -> String {
        if self.params.is_empty() {
            return self.resource_path.clone();
        }
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.params {
            query.append_pair(k, &v.render());
        }
        format!("{}?{}", self.resource_path, query.finish())
    }
}

/// Split a `docs://<path>[?<query>]` URI.
///
/// `limit` and `offset` must be non-negative integers; every other parameter
/// stays a string.
pub fn parse_resource_uri(uri: &str) -> Result<ResourceRequest> {
    let rest = uri
        .strip_prefix(URI_SCHEME)
        .ok_or_else(|| DocGraphError::InvalidUri(format!("expected {}<path>: {}", URI_SCHEME, uri)))?;

    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    };
    let resource_path = path.trim_matches('/').to_string();
    if resource_path.is_empty() {
        return Err(DocGraphError::InvalidUri(format!("missing resource path: {}", uri)));
    }

    let mut params = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let parsed = match key.as_ref() {
            "limit" | "offset" => {
                let n = value.trim().parse::<usize>().map_err(|_| {
                    DocGraphError::InvalidUri(format!(
                        "{} must be a non-negative integer, got '{}'",
                        key, value
                    ))
                })?;
                ParamValue::Int(n)
            }
            _ => ParamValue::Text(value.into_owned()),
        };
        params.insert(key.into_owned(), parsed);
    }

    Ok(ResourceRequest {
        resource_path,
        params,
    })
}

/// The resources every corpus serves
pub fn resource_catalog() -> Vec<Resource> {
    let entry = |path: &str, name: &str, description: &str| Resource {
        uri: format!("{}{}", URI_SCHEME, path),
        name: name.to_string(),
        description: Some(description.to_string()),
        mime_type: Some(MIME_JSON.to_string()),
    };

    vec![
        entry("graph", "Knowledge Graph", "Full document/concept graph"),
        entry("graph/summary", "Graph Summary", "Node and edge counts by type"),
        entry(
            "documents",
            "Documents",
            "Documents with content; supports limit, offset, directory, content_type",
        ),
        entry(
            "documents/summary",
            "Document Summaries",
            "Document metadata without bodies; supports limit, offset, directory, content_type",
        ),
        entry("documents/list", "Document List", "Path and title of every document; supports directory"),
        entry("documents/{id}", "Document", "A single document by id or path"),
        entry("concepts", "Concepts", "Ranked concepts; supports limit, offset"),
        entry("concepts/top", "Top Concepts", "Highest-weight concepts; supports limit"),
        entry("analysis", "Graph Analysis", "Connectivity, centrality and community structure"),
        entry("summary", "Corpus Summary", "Counts, orphan share, top concepts and breakdowns"),
    ]
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphSummary {
    hash: String,
    #[serde(flatten)]
    stats: GraphStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentList {
    total: usize,
    documents: Vec<docgraph_core::DocumentListing>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorpusSummary {
    documents: usize,
    concepts: usize,
    nodes: usize,
    edges: usize,
    orphan_documents: usize,
    orphan_percentage: f64,
    top_concepts: Vec<TopConcept>,
    directories: BTreeMap<String, usize>,
    content_types: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connectivity_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    community_band: Option<String>,
}

/// Serves `docs://` resources from a corpus
pub struct ResourceManager<L> {
    loader: L,
    cache: CacheManager<String>,
}

impl<L: DataLoader> ResourceManager<L> {
    pub fn new(loader: L, cache: CacheConfig) -> Self {
        Self {
            loader,
            cache: CacheManager::new(cache),
        }
    }

    /// Render the resource named by `uri`
    pub fn read_resource(&mut self, uri: &str) -> Result<ReadResourceResult> {
        let request = parse_resource_uri(uri)?;
        let key = format!("{}:{}", self.loader.graph_hash(), request.canonical());

        let loader = &self.loader;
        let text = self
            .cache
            .try_get_or_insert_with(&key, || render(loader, &request))?;

        debug!(uri, bytes = text.len(), "Read resource");
        Ok(ReadResourceResult {
            contents: vec![ResourceContent::json(uri, text)],
        })
    }

    /// Highest-weight concepts, `limit` defaulting to 20
    pub fn get_top_concepts(&self, limit: Option<usize>) -> Vec<TopConcept> {
        top_concepts(&self.loader, limit.unwrap_or(DEFAULT_TOP_CONCEPTS_LIMIT))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn top_concepts<L: DataLoader>(loader: &L, limit: usize) -> Vec<TopConcept> {
    let mut ranked = loader.concepts().top_concepts.clone();
    rank_top_concepts(&mut ranked);
    ranked.truncate(limit);
    ranked
}

fn render<L: DataLoader>(loader: &L, request: &ResourceRequest) -> Result<String> {
    let path = request.resource_path.as_str();
    match path {
        "graph" => pretty(loader.graph()),
        "graph/summary" => pretty(&GraphSummary {
            hash: loader.graph_hash(),
            stats: loader.graph().stats(),
        }),
        "documents" => {
            let docs = filtered_documents(loader, request);
            let page = paginate(&docs, request, DEFAULT_DOCUMENTS_LIMIT);
            compact(&page)
        }
        "documents/summary" => {
            let docs = filtered_documents(loader, request);
            let page = paginate(&docs, request, DEFAULT_SUMMARY_LIMIT).map(|d| d.summary());
            compact(&page)
        }
        "documents/list" => {
            let docs: Vec<&Document> = match request.text("directory") {
                Some(dir) => loader.get_documents_by_directory(dir),
                None => loader.documents().iter().collect(),
            };
            compact(&DocumentList {
                total: docs.len(),
                documents: docs.iter().map(|d| d.listing()).collect(),
            })
        }
        "concepts" => {
            let mut ranked = loader.concepts().top_concepts.clone();
            rank_top_concepts(&mut ranked);
            let page = PaginatedResponse::from_slice(
                &ranked,
                request.offset().unwrap_or(0),
                request.limit().unwrap_or(DEFAULT_CONCEPTS_LIMIT),
            );
            compact(&page)
        }
        "concepts/top" => compact(&top_concepts(
            loader,
            request.limit().unwrap_or(DEFAULT_TOP_CONCEPTS_LIMIT),
        )),
        "analysis" => pretty(loader.analysis()),
        "summary" => pretty(&summarize(loader)),
        _ => match path.strip_prefix("documents/") {
            Some(raw) => {
                let id = decode_segment(raw);
                let doc = loader
                    .get_document_by_id(&id)
                    .or_else(|| loader.get_document_by_path(&id))
                    .ok_or_else(|| DocGraphError::NotFound(format!("document '{}'", id)))?;
                pretty(doc)
            }
            None => Err(DocGraphError::UnknownResource(format!(
                "{}{}",
                URI_SCHEME, path
            ))),
        },
    }
}

/// Percent-decode a path remainder; `+`, `&` and `=` stay literal
fn decode_segment(raw: &str) -> String {
    let escaped = raw
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

fn filtered_documents<'a, L: DataLoader>(loader: &'a L, request: &ResourceRequest) -> Vec<&'a Document> {
    let mut docs: Vec<&Document> = match request.text("directory") {
        Some(dir) => loader.get_documents_by_directory(dir),
        None => loader.documents().iter().collect(),
    };
    if let Some(content_type) = request.text("content_type") {
        docs.retain(|d| d.content_type_name() == content_type);
    }
    docs
}

fn paginate<'a>(
    docs: &[&'a Document],
    request: &ResourceRequest,
    default_limit: usize,
) -> PaginatedResponse<&'a Document> {
    PaginatedResponse::from_slice(
        docs,
        request.offset().unwrap_or(0),
        request.limit().unwrap_or(default_limit),
    )
}

fn summarize<L: DataLoader>(loader: &L) -> CorpusSummary {
    let graph = loader.graph();
    let degrees = graph.degrees();
    let document_nodes = graph.nodes_of_type(NodeType::Document).count();
    let orphans = graph
        .nodes_of_type(NodeType::Document)
        .filter(|n| degrees.get(n.id.as_str()).copied().unwrap_or(0) == 0)
        .count();
    let orphan_percentage = if document_nodes == 0 {
        0.0
    } else {
        (orphans as f64 / document_nodes as f64 * 10_000.0).round() / 100.0
    };

    let mut directories: BTreeMap<String, usize> = BTreeMap::new();
    let mut content_types: BTreeMap<String, usize> = BTreeMap::new();
    for doc in loader.documents() {
        *directories.entry(doc.directory_name()).or_default() += 1;
        *content_types
            .entry(doc.content_type_name().to_string())
            .or_default() += 1;
    }

    let analysis = loader.analysis();
    CorpusSummary {
        documents: loader.documents().len(),
        concepts: loader.concepts().top_concepts.len(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        orphan_documents: orphans,
        orphan_percentage,
        top_concepts: top_concepts(loader, SUMMARY_TOP_CONCEPTS),
        directories,
        content_types,
        connectivity_score: analysis.pointer("/connectivity/score").and_then(Value::as_f64),
        community_band: analysis
            .pointer("/communities/band")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn compact<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{Graph, ThresholdRegistry};
    use docgraph_query::Corpus;
    use serde_json::json;

    fn top(concept: &str, weight: f64) -> TopConcept {
        TopConcept {
            concept: concept.to_string(),
            frequency: 1,
            file_count: 1,
            weight,
        }
    }

    fn manager_with(top_concepts: Vec<TopConcept>) -> ResourceManager<Corpus> {
        let corpus = Corpus::from_parts(Vec::new(), Graph::new(), top_concepts, json!({}));
        ResourceManager::new(corpus, CacheConfig::default())
    }

    fn corpus() -> Corpus {
        let documents = vec![
            Document::new("guides/setup", "guides/setup.md")
                .with_title("Setup")
                .with_content("Install the CLI and configure a wallet.")
                .with_terms(["wallet", "cli"]),
            Document::new("guides/advanced/keys", "guides/advanced/keys.md")
                .with_content("Rotate keys regularly.")
                .with_content_type("reference")
                .with_terms(["wallet"]),
            Document::new("faq", "faq.md").with_title("FAQ"),
        ];
        let terms = docgraph_query::terms_from_documents(&documents);
        Corpus::from_pipeline(documents, &terms, &ThresholdRegistry::default()).unwrap()
    }

    fn body(manager: &mut ResourceManager<Corpus>, uri: &str) -> Value {
        let result = manager.read_resource(uri).unwrap();
        assert_eq!(result.contents[0].mime_type, MIME_JSON);
        serde_json::from_str(result.text().unwrap()).unwrap()
    }

    #[test]
    fn test_parse_uri() {
        let req = parse_resource_uri("docs://documents?limit=5&offset=10&directory=guides").unwrap();
        assert_eq!(req.resource_path, "documents");
        assert_eq!(req.limit(), Some(5));
        assert_eq!(req.offset(), Some(10));
        assert_eq!(req.text("directory"), Some("guides"));
        assert_eq!(req.canonical(), "documents?directory=guides&limit=5&offset=10");
    }

    #[test]
    fn test_parse_uri_errors() {
        for uri in ["http://graph", "docs://", "docs://documents?limit=-1", "docs://concepts?offset=abc"] {
            let err = parse_resource_uri(uri).unwrap_err();
            assert!(matches!(err, DocGraphError::InvalidUri(_)), "{}", uri);
        }
    }

    #[test]
    fn test_top_concepts_limit() {
        let manager = manager_with(vec![top("b", 5.0), top("a", 9.0), top("c", 1.0)]);

        let names: Vec<String> = manager
            .get_top_concepts(Some(2))
            .into_iter()
            .map(|c| c.concept)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(manager.get_top_concepts(None).len(), 3);
    }

    #[test]
    fn test_unknown_resource() {
        let mut manager = manager_with(vec![]);
        let err = manager.read_resource("docs://nope").unwrap_err();
        assert!(matches!(err, DocGraphError::UnknownResource(_)));
    }

    #[test]
    fn test_documents_paginated_and_filtered() {
        let mut manager = ResourceManager::new(corpus(), CacheConfig::default());

        let page = body(&mut manager, "docs://documents?limit=1");
        assert_eq!(page["total"], 3);
        assert_eq!(page["hasMore"], true);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);

        let page = body(&mut manager, "docs://documents?directory=guides");
        assert_eq!(page["total"], 2);

        let page = body(&mut manager, "docs://documents?directory=guides&content_type=reference");
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["id"], "guides/advanced/keys");
    }

    #[test]
    fn test_summary_views_never_carry_content() {
        let mut manager = ResourceManager::new(corpus(), CacheConfig::default());

        for uri in ["docs://documents/summary", "docs://documents/list", "docs://summary"] {
            let text = manager.read_resource(uri).unwrap().contents[0].text.clone();
            assert!(!text.contains("Rotate keys"), "{}", uri);
            assert!(!text.contains("\"content\""), "{}", uri);
        }
    }

    #[test]
    fn test_single_document_by_id_or_path() {
        let mut manager = ResourceManager::new(corpus(), CacheConfig::default());

        assert_eq!(body(&mut manager, "docs://documents/faq")["title"], "FAQ");
        assert_eq!(body(&mut manager, "docs://documents/faq.md")["id"], "faq");
        assert_eq!(
            body(&mut manager, "docs://documents/guides/setup")["title"],
            "Setup"
        );

        let err = manager.read_resource("docs://documents/missing").unwrap_err();
        assert!(matches!(err, DocGraphError::NotFound(_)));
    }

    #[test]
    fn test_document_ids_are_percent_decoded() {
        let documents = vec![
            Document::new("getting started", "getting started.md").with_title("Start"),
            Document::new("c++ & rust", "lang.md").with_title("Lang"),
            Document::new("summary", "summary.md").with_title("Reserved"),
        ];
        let corpus = Corpus::from_pipeline(documents, &[], &ThresholdRegistry::default()).unwrap();
        let mut manager = ResourceManager::new(corpus, CacheConfig::default());

        assert_eq!(
            body(&mut manager, "docs://documents/getting%20started")["title"],
            "Start"
        );
        assert_eq!(
            body(&mut manager, "docs://documents/c++%20%26%20rust")["title"],
            "Lang"
        );

        // Reserved id: the fixed route wins, the path still resolves
        assert!(body(&mut manager, "docs://documents/summary")["items"].is_array());
        assert_eq!(
            body(&mut manager, "docs://documents/summary.md")["title"],
            "Reserved"
        );
    }

    #[test]
    fn test_summary_contents() {
        let mut manager = ResourceManager::new(corpus(), CacheConfig::default());
        let summary = body(&mut manager, "docs://summary");

        assert_eq!(summary["documents"], 3);
        assert_eq!(summary["orphanDocuments"], 1);
        assert_eq!(summary["orphanPercentage"], 33.33);
        assert_eq!(summary["directories"]["guides"], 1);
        assert_eq!(summary["directories"]["guides/advanced"], 1);
        assert_eq!(summary["contentTypes"]["reference"], 1);
        assert_eq!(summary["topConcepts"][0]["concept"], "wallet");
        assert!(summary["connectivityScore"].is_number());
        assert!(summary["communityBand"].is_string());
    }

    #[test]
    fn test_reads_are_cached() {
        let mut manager = ResourceManager::new(corpus(), CacheConfig::default());

        let first = manager.read_resource("docs://concepts?offset=0&limit=2").unwrap();
        let second = manager.read_resource("docs://concepts?limit=2&offset=0").unwrap();
        assert_eq!(first.text(), second.text());

        let stats = manager.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut manager = manager_with(vec![]);
        assert!(manager.read_resource("docs://documents/x").is_err());
        assert_eq!(manager.cache_stats().size, 0);
    }

    #[test]
    fn test_catalog_lists_all_resources() {
        let catalog = resource_catalog();
        assert_eq!(catalog.len(), 10);
        assert!(catalog.iter().all(|r| r.uri.starts_with(URI_SCHEME)));
    }
}
