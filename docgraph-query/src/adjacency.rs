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

//! Undirected weighted view of a [`Graph`] shared by the analysis passes.

use docgraph_core::Graph;
use std::collections::BTreeMap;

/// Adjacency lists indexed by node position.
///
/// Only valid edges contribute (both endpoints present, no self-loops).
/// Parallel edges between the same pair, in either direction, are merged and
/// their weights summed.
pub(crate) struct Adjacency<'g> {
    pub ids: Vec<&'g str>,
    pub neighbors: Vec<Vec<(usize, f64)>>,
}

impl<'g> Adjacency<'g> {
    pub fn from_graph(graph: &'g Graph) -> Self {
        let index = graph.node_index();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut merged: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); ids.len()];

        for edge in graph.valid_edges() {
            let (Some(&s), Some(&t)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if s == t {
                continue;
            }
            *merged[s].entry(t).or_default() += edge.weight;
            *merged[t].entry(s).or_default() += edge.weight;
        }

        let neighbors = merged
            .into_iter()
            .map(|m| m.into_iter().collect())
            .collect();

        Self { ids, neighbors }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Sum of incident edge weights
    pub fn strength(&self, node: usize) -> f64 {
        self.neighbors[node].iter().map(|(_, w)| w).sum()
    }

    /// Total edge weight `m`
    pub fn total_weight(&self) -> f64 {
        (0..self.len()).map(|i| self.strength(i)).sum::<f64>() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{Edge, EdgeType, Node, NodeType};

    #[test]
    fn test_parallel_edges_merge() {
        let graph = Graph {
            nodes: vec![
                Node::new("a", NodeType::Document, "a"),
                Node::new("b", NodeType::Document, "b"),
            ],
            edges: vec![
                Edge::new("a", "b", EdgeType::LinksTo, 1.0),
                Edge::new("b", "a", EdgeType::LinksTo, 1.0),
                Edge::new("a", "a", EdgeType::LinksTo, 1.0),
                Edge::new("a", "ghost", EdgeType::LinksTo, 1.0),
            ],
        };
        let adj = Adjacency::from_graph(&graph);

        assert_eq!(adj.neighbors[0], vec![(1, 2.0)]);
        assert_eq!(adj.neighbors[1], vec![(0, 2.0)]);
        assert!((adj.total_weight() - 2.0).abs() < 1e-9);
    }
}
