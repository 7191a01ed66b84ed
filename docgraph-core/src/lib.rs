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

//! Docgraph Core
//!
//! Data model and string-level algorithms for the documentation knowledge graph:
//! - Named, immutable similarity/analysis thresholds
//! - Token and character n-gram Jaccard similarity with a bounded n-gram cache
//! - Greedy first-match clustering of raw terms into canonical concepts
//!
//! Graph construction, analysis and caching live in `docgraph-query`.

pub mod concept;
pub mod document;
pub mod error;
pub mod graph;
pub mod similarity;
pub mod thresholds;

pub use concept::{Concept, ConceptClusterer, TermFrequency};
pub use document::{Document, DocumentListing, DocumentSummary, DEFAULT_CONTENT_TYPE};
pub use error::{DocGraphError, Result};
pub use graph::{AttributeValue, Edge, EdgeType, Graph, GraphStats, Node, NodeId, NodeType};
pub use similarity::{TextSimilarity, DEFAULT_NGRAM_CACHE_SIZE};
pub use thresholds::{
    ComparisonOp, ConnectivityWeights, GraphThresholds, SimilarityThresholds, ThresholdRegistry,
    Thresholds,
};
