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

//! Graph Analyzer
//!
//! Structural metrics over a built [`Graph`]. Every operation reads the graph
//! and returns a fresh value; the input is never mutated. Edges are treated as
//! undirected, parallel edges are merged, and edges that reference missing nodes
//! are ignored.
//!
//! ## Connectivity score
//!
//! ```text
//! score = giant      * weights.giantComponent
//!       + components * weights.componentCount
//!       + bridges    * weights.bridgeNodes
//!       + cuts       * weights.articulationPoints
//! ```
//!
//! Each factor lies in [0, 1]. Weights are applied as configured and are not
//! renormalized, so the score lies in [0, Σ weights]; the default weights sum to 1.

use crate::adjacency::Adjacency;
use crate::community::{self, CommunityBand, CommunityConfig, CommunityDetector, CommunityStructure};
use docgraph_core::{
    ConnectivityWeights, Graph, GraphStats, GraphThresholds, NodeId, NodeType, ThresholdRegistry,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

const UNVISITED: usize = usize::MAX;

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Sum edge weights instead of counting incident edges
    pub weighted_centrality: bool,
    /// Number of documents reported by [`GraphAnalyzer::analyze`]
    pub top_documents: usize,
    pub community: CommunityConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            weighted_centrality: false,
            top_documents: 10,
            community: CommunityConfig::default(),
        }
    }
}

/// Per-factor view of the connectivity score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityBreakdown {
    /// Fraction of nodes in the largest component
    pub giant_component: f64,
    /// 1 for a single component, 0 when every node is isolated
    pub component_count: f64,
    /// 1 minus the share of giant-component nodes that are cut vertices
    pub bridge_nodes: f64,
    /// 1 minus the share of all nodes that are cut vertices
    pub articulation_points: f64,
    pub score: f64,
}

/// A node ranked by centrality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub id: NodeId,
    pub label: String,
    pub centrality: f64,
}

/// Community summary carried by [`GraphAnalysis`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySummary {
    pub modularity: f64,
    pub band: CommunityBand,
    pub count: usize,
    pub largest: usize,
}

/// Full structural report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAnalysis {
    pub stats: GraphStats,
    pub top_documents: Vec<RankedNode>,
    pub component_count: usize,
    pub giant_component_size: usize,
    pub giant_component_fraction: f64,
    pub articulation_points: Vec<NodeId>,
    pub bridge_nodes: Vec<NodeId>,
    pub connectivity: ConnectivityBreakdown,
    pub communities: CommunitySummary,
    pub orphan_documents: Vec<NodeId>,
    pub dangling_edges: usize,
}

/// Structural analysis over a graph
#[derive(Debug, Clone)]
pub struct GraphAnalyzer {
    graph_thresholds: GraphThresholds,
    weights: ConnectivityWeights,
    config: AnalyzerConfig,
}

impl Default for GraphAnalyzer {
    fn default() -> Self {
        Self::new(&ThresholdRegistry::default())
    }
}

impl GraphAnalyzer {
    pub fn new(registry: &ThresholdRegistry) -> Self {
        Self::with_config(registry, AnalyzerConfig::default())
    }

    pub fn with_config(registry: &ThresholdRegistry, config: AnalyzerConfig) -> Self {
        Self {
            graph_thresholds: registry.graph().clone(),
            weights: registry.weights().clone(),
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Degree centrality normalized so the top node scores 1.0.
    ///
    /// Nodes without edges score 0; an edgeless graph scores 0 everywhere.
    pub fn centrality(&self, graph: &Graph) -> BTreeMap<NodeId, f64> {
        let raw: Vec<(&str, f64)> = if self.config.weighted_centrality {
            let adj = Adjacency::from_graph(graph);
            (0..adj.len()).map(|i| (adj.ids[i], adj.strength(i))).collect()
        } else {
            let degrees = graph.degrees();
            graph
                .nodes
                .iter()
                .map(|n| {
                    let d = degrees.get(n.id.as_str()).copied().unwrap_or(0);
                    (n.id.as_str(), d as f64)
                })
                .collect()
        };

        let max = raw.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        raw.into_iter()
            .map(|(id, v)| {
                let score = if max > 0.0 { v / max } else { 0.0 };
                (id.to_string(), score)
            })
            .collect()
    }

    /// Partition of all nodes into connected components, in node order
    pub fn connected_components(&self, graph: &Graph) -> Vec<BTreeSet<NodeId>> {
        let adj = Adjacency::from_graph(graph);
        components(&adj)
            .into_iter()
            .map(|members| members.into_iter().map(|i| adj.ids[i].to_string()).collect())
            .collect()
    }

    /// Cut vertices of the undirected graph
    pub fn articulation_points(&self, graph: &Graph) -> BTreeSet<NodeId> {
        let adj = Adjacency::from_graph(graph);
        cut_vertices(&adj)
            .into_iter()
            .map(|i| adj.ids[i].to_string())
            .collect()
    }

    /// Articulation points inside the giant component
    pub fn bridge_nodes(&self, graph: &Graph) -> BTreeSet<NodeId> {
        let adj = Adjacency::from_graph(graph);
        let structure = Structure::compute(&adj);
        structure
            .bridges()
            .map(|i| adj.ids[i].to_string())
            .collect()
    }

    /// Weighted composite connectivity; 0 for the empty graph
    pub fn connectivity_score(&self, graph: &Graph) -> f64 {
        self.connectivity(graph).score
    }

    pub fn connectivity(&self, graph: &Graph) -> ConnectivityBreakdown {
        let adj = Adjacency::from_graph(graph);
        self.breakdown(&Structure::compute(&adj))
    }

    /// Modularity of the detected community partition
    pub fn community_structure(&self, graph: &Graph) -> f64 {
        self.detect_communities(graph).modularity
    }

    pub fn detect_communities(&self, graph: &Graph) -> CommunityStructure {
        let adj = Adjacency::from_graph(graph);
        self.communities(&adj)
    }

    /// Modularity of a caller-supplied partition.
    ///
    /// Nodes missing from every community are treated as singletons.
    pub fn partition_modularity(&self, graph: &Graph, communities: &[BTreeSet<NodeId>]) -> f64 {
        let adj = Adjacency::from_graph(graph);
        let mut assigned: HashMap<&str, usize> = HashMap::new();
        for (c, members) in communities.iter().enumerate() {
            for member in members {
                assigned.entry(member.as_str()).or_insert(c);
            }
        }

        let mut next = communities.len();
        let membership: Vec<usize> = adj
            .ids
            .iter()
            .map(|id| match assigned.get(id) {
                Some(&c) => c,
                None => {
                    next += 1;
                    next
                }
            })
            .collect();

        community::modularity(&adj, &membership, self.config.community.resolution)
    }

    /// Community band of a modularity value
    pub fn band(&self, modularity: f64) -> CommunityBand {
        CommunityBand::classify(modularity, &self.graph_thresholds)
    }

    /// Run every analysis pass
    pub fn analyze(&self, graph: &Graph) -> GraphAnalysis {
        let adj = Adjacency::from_graph(graph);
        let structure = Structure::compute(&adj);
        let connectivity = self.breakdown(&structure);
        let communities = self.communities(&adj);

        let centrality = self.centrality(graph);
        let mut top_documents: Vec<RankedNode> = graph
            .nodes_of_type(NodeType::Document)
            .map(|n| RankedNode {
                id: n.id.clone(),
                label: n.label.clone(),
                centrality: centrality.get(&n.id).copied().unwrap_or(0.0),
            })
            .collect();
        top_documents.sort_by(|a, b| {
            b.centrality
                .total_cmp(&a.centrality)
                .then_with(|| a.id.cmp(&b.id))
        });
        top_documents.truncate(self.config.top_documents);

        let degrees = graph.degrees();
        let orphan_documents = graph
            .nodes_of_type(NodeType::Document)
            .filter(|n| degrees.get(n.id.as_str()).copied().unwrap_or(0) == 0)
            .map(|n| n.id.clone())
            .collect();

        let n = adj.len();
        let giant_component_size = structure.giant_len();
        let analysis = GraphAnalysis {
            stats: graph.stats(),
            top_documents,
            component_count: structure.components.len(),
            giant_component_size,
            giant_component_fraction: ratio(giant_component_size, n),
            articulation_points: structure.cuts.iter().map(|&i| adj.ids[i].to_string()).collect(),
            bridge_nodes: structure.bridges().map(|i| adj.ids[i].to_string()).collect(),
            connectivity,
            communities: CommunitySummary {
                modularity: communities.modularity,
                band: communities.band,
                count: communities.count(),
                largest: communities.largest(),
            },
            orphan_documents,
            dangling_edges: graph.dangling_edges().len(),
        };

        tracing::info!(
            nodes = n,
            components = analysis.component_count,
            connectivity = analysis.connectivity.score,
            modularity = analysis.communities.modularity,
            "Analyzed knowledge graph"
        );
        analysis
    }

    /// Copy of `graph` whose nodes carry a `centrality` attribute
    pub fn annotate_centrality(&self, graph: &Graph) -> Graph {
        let centrality = self.centrality(graph);
        let mut annotated = graph.clone();
        for node in &mut annotated.nodes {
            let score = centrality.get(&node.id).copied().unwrap_or(0.0);
            node.attributes.insert("centrality".to_string(), score.into());
        }
        annotated
    }

    fn communities(&self, adj: &Adjacency<'_>) -> CommunityStructure {
        let detector = CommunityDetector::new(&self.config.community, &self.graph_thresholds);
        let membership = detector.detect(adj);
        let modularity = community::modularity(adj, &membership, self.config.community.resolution);

        CommunityStructure {
            modularity,
            communities: community::group(adj, &membership),
            band: self.band(modularity),
        }
    }

    fn breakdown(&self, structure: &Structure) -> ConnectivityBreakdown {
        let n = structure.node_count;
        if n == 0 {
            return ConnectivityBreakdown::default();
        }

        let giant = structure.giant_len();
        let component_count = if n == 1 {
            1.0
        } else {
            1.0 - (structure.components.len() - 1) as f64 / (n - 1) as f64
        };

        let mut b = ConnectivityBreakdown {
            giant_component: ratio(giant, n),
            component_count,
            bridge_nodes: 1.0 - ratio(structure.bridges().count(), giant),
            articulation_points: 1.0 - ratio(structure.cuts.len(), n),
            score: 0.0,
        };
        let w = &self.weights;
        b.score = b.giant_component * w.giant_component
            + b.component_count * w.component_count
            + b.bridge_nodes * w.bridge_nodes
            + b.articulation_points * w.articulation_points;
        b
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Components and cut vertices computed once per analysis
struct Structure {
    node_count: usize,
    components: Vec<Vec<usize>>,
    /// Index into `components` of the largest; first wins ties
    giant: Option<usize>,
    component_of: Vec<usize>,
    cuts: BTreeSet<usize>,
}

impl Structure {
    fn compute(adj: &Adjacency<'_>) -> Self {
        let components = components(adj);
        let mut component_of = vec![0; adj.len()];
        for (c, members) in components.iter().enumerate() {
            for &m in members {
                component_of[m] = c;
            }
        }

        let mut giant: Option<usize> = None;
        for (c, members) in components.iter().enumerate() {
            if giant.map_or(true, |g| members.len() > components[g].len()) {
                giant = Some(c);
            }
        }

        Self {
            node_count: adj.len(),
            components,
            giant,
            component_of,
            cuts: cut_vertices(adj),
        }
    }

    fn giant_len(&self) -> usize {
        self.giant.map_or(0, |g| self.components[g].len())
    }

    fn bridges(&self) -> impl Iterator<Item = usize> + '_ {
        self.cuts
            .iter()
            .copied()
            .filter(move |&i| Some(self.component_of[i]) == self.giant)
    }
}

/// BFS partition, each component's members in discovery order
fn components(adj: &Adjacency<'_>) -> Vec<Vec<usize>> {
    let mut seen = vec![false; adj.len()];
    let mut result = Vec::new();

    for start in 0..adj.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            members.push(node);
            for &(neighbor, _) in &adj.neighbors[node] {
                if !seen[neighbor] {
                    seen[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        result.push(members);
    }

    result
}

/// Tarjan's articulation points, iterative so deep chains cannot overflow the stack
fn cut_vertices(adj: &Adjacency<'_>) -> BTreeSet<usize> {
    let n = adj.len();
    let mut disc = vec![UNVISITED; n];
    let mut low = vec![0usize; n];
    let mut parent = vec![UNVISITED; n];
    let mut cuts = BTreeSet::new();
    let mut timer = 0usize;

    for root in 0..n {
        if disc[root] != UNVISITED {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        let mut root_children = 0usize;

        // (node, next neighbor position)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(top) = stack.last_mut() {
            let u = top.0;
            if top.1 < adj.neighbors[u].len() {
                let v = adj.neighbors[u][top.1].0;
                top.1 += 1;

                if disc[v] == UNVISITED {
                    parent[v] = u;
                    disc[v] = timer;
                    low[v] = timer;
                    timer += 1;
                    if u == root {
                        root_children += 1;
                    }
                    stack.push((v, 0));
                } else if v != parent[u] {
                    low[u] = low[u].min(disc[v]);
                }
            } else {
                stack.pop();
                if let Some(&(p, _)) = stack.last() {
                    low[p] = low[p].min(low[u]);
                    if p != root && low[u] >= disc[p] {
                        cuts.insert(p);
                    }
                }
            }
        }

        if root_children > 1 {
            cuts.insert(root);
        }
    }

    cuts
}
