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

//! Docgraph Query
//!
//! Graph construction, structural analysis and the cached, paginated query
//! layer's building blocks:
//! - [`GraphBuilder`]: documents + concepts -> weighted graph
//! - [`GraphAnalyzer`]: centrality, components, cut vertices, connectivity,
//!   community structure
//! - [`CacheManager`]: TTL cache with insertion-order capacity bound
//! - [`DataLoader`] / [`Corpus`]: the corpus handed to the resource layer
//! - [`KnowledgePipeline`]: one end-to-end run

mod adjacency;
pub mod analyzer;
pub mod builder;
pub mod cache;
pub mod community;
pub mod loader;
pub mod pagination;
pub mod pipeline;

pub use analyzer::{
    AnalyzerConfig, CommunitySummary, ConnectivityBreakdown, GraphAnalysis, GraphAnalyzer,
    RankedNode,
};
pub use builder::{concept_node_id, document_node_id, BuilderOptions, GraphBuilder};
pub use cache::{CacheConfig, CacheManager, CacheStats};
pub use community::{CommunityBand, CommunityConfig, CommunityStructure};
pub use loader::{ConceptSet, Corpus, DataLoader};
pub use pagination::PaginatedResponse;
pub use pipeline::{
    rank_top_concepts, terms_from_documents, KnowledgePipeline, PipelineOutput, TopConcept,
};
