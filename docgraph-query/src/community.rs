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

//! Community Detection
//!
//! Leiden-style modularity optimisation over the undirected document/concept
//! graph:
//!
//! 1. **Local moving**: visit nodes in a seeded random order and move each to the
//!    neighbouring community with the largest modularity gain
//! 2. **Refinement**: split communities whose members are not connected
//!    through edges inside the community
//! 3. **Renumber**: community ids follow first appearance in node order
//!
//! ## Modularity
//!
//! Q = Σc [ Lc / m - γ (Kc / 2m)² ]
//!
//! Where:
//! - Lc = total weight of edges inside community c
//! - Kc = sum of the weighted degrees of c's members
//! - m = total edge weight
//! - γ = resolution
//!
//! On graphs with at least `graph.minCommunitySize` nodes, edges lighter than
//! `graph.communityNeighbor` are not used to propose moves. They still count
//! toward modularity.

use crate::adjacency::Adjacency;
use docgraph_core::{GraphThresholds, NodeId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Community detection configuration
#[derive(Debug, Clone)]
pub struct CommunityConfig {
    /// Resolution parameter (higher = more communities)
    pub resolution: f64,
    /// Maximum local-moving passes
    pub max_iterations: usize,
    /// Minimum modularity improvement to continue
    pub min_improvement: f64,
    /// Seed for the visiting order
    pub seed: u64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_iterations: 100,
            min_improvement: 1e-6,
            seed: 42,
        }
    }
}

/// Strength of community structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityBand {
    Weak,
    Moderate,
    Strong,
}

impl CommunityBand {
    /// Band for a modularity value
    pub fn classify(modularity: f64, thresholds: &GraphThresholds) -> Self {
        if modularity >= thresholds.strong_community {
            CommunityBand::Strong
        } else if modularity >= thresholds.moderate_community {
            CommunityBand::Moderate
        } else {
            CommunityBand::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityBand::Weak => "weak",
            CommunityBand::Moderate => "moderate",
            CommunityBand::Strong => "strong",
        }
    }
}

impl fmt::Display for CommunityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detected partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityStructure {
    pub modularity: f64,
    /// Members per community, ordered by community id
    pub communities: Vec<BTreeSet<NodeId>>,
    pub band: CommunityBand,
}

impl CommunityStructure {
    pub fn count(&self) -> usize {
        self.communities.len()
    }

    pub fn largest(&self) -> usize {
        self.communities.iter().map(BTreeSet::len).max().unwrap_or(0)
    }

    /// Community id of `node`
    pub fn community_of(&self, node: &str) -> Option<usize> {
        self.communities.iter().position(|c| c.contains(node))
    }
}

pub(crate) struct CommunityDetector<'a> {
    config: &'a CommunityConfig,
    thresholds: &'a GraphThresholds,
}

impl<'a> CommunityDetector<'a> {
    pub fn new(config: &'a CommunityConfig, thresholds: &'a GraphThresholds) -> Self {
        Self { config, thresholds }
    }

    /// Community id per node position
    pub fn detect(&self, adj: &Adjacency<'_>) -> Vec<usize> {
        let n = adj.len();
        let mut membership: Vec<usize> = (0..n).collect();

        let total_weight = adj.total_weight();
        if n == 0 || total_weight <= 0.0 {
            return membership;
        }

        let degrees: Vec<f64> = (0..n).map(|i| adj.strength(i)).collect();
        let min_neighbor_weight = if n >= self.thresholds.min_community_size {
            self.thresholds.community_neighbor
        } else {
            0.0
        };

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut current = modularity(adj, &membership, self.config.resolution);

        for iteration in 0..self.config.max_iterations {
            let moved = self.local_moving(
                adj,
                &mut membership,
                &degrees,
                total_weight,
                min_neighbor_weight,
                &mut rng,
            );
            refine(adj, &mut membership);
            membership = renumber(&membership);

            let updated = modularity(adj, &membership, self.config.resolution);
            let improvement = updated - current;
            current = updated;

            tracing::trace!(iteration, modularity = current, "Community pass");
            if !moved || improvement < self.config.min_improvement {
                break;
            }
        }

        membership
    }

    fn local_moving(
        &self,
        adj: &Adjacency<'_>,
        membership: &mut [usize],
        degrees: &[f64],
        total_weight: f64,
        min_neighbor_weight: f64,
        rng: &mut StdRng,
    ) -> bool {
        let n = membership.len();
        let two_m = 2.0 * total_weight;
        let resolution = self.config.resolution;

        // Community ids are < n after renumbering, so a dense vector suffices
        let mut totals = vec![0.0; n];
        for (node, &c) in membership.iter().enumerate() {
            totals[c] += degrees[node];
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut moved = false;
        for &node in &order {
            let current = membership[node];
            let k = degrees[node];
            if k == 0.0 {
                continue;
            }
            totals[current] -= k;

            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            links.insert(current, 0.0);
            for &(neighbor, w) in &adj.neighbors[node] {
                let c = membership[neighbor];
                let entry = links.entry(c).or_default();
                // Light edges still bind a node to its current community
                if w >= min_neighbor_weight || c == current {
                    *entry += w;
                }
            }

            let gain = |c: usize, w: f64| w - resolution * k * totals[c] / two_m;

            let mut best = current;
            let mut best_gain = gain(current, links[&current]);
            for (&c, &w) in &links {
                if c == current || w == 0.0 {
                    continue;
                }
                let g = gain(c, w);
                if g > best_gain + 1e-12 {
                    best = c;
                    best_gain = g;
                }
            }

            totals[best] += k;
            if best != current {
                membership[node] = best;
                moved = true;
            }
        }

        moved
    }
}

/// Split communities whose members are not connected internally
fn refine(adj: &Adjacency<'_>, membership: &mut [usize]) {
    let n = membership.len();
    let mut seen = vec![false; n];
    let mut next_id = n;

    let mut first_part: BTreeSet<usize> = BTreeSet::new();
    for start in 0..n {
        if seen[start] {
            continue;
        }
        let community = membership[start];
        let label = if first_part.insert(community) {
            community
        } else {
            next_id += 1;
            next_id
        };

        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(node) = queue.pop_front() {
            membership[node] = label;
            for &(neighbor, _) in &adj.neighbors[node] {
                if !seen[neighbor] && membership[neighbor] == community {
                    seen[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }
}

/// Renumber communities contiguously by first appearance
fn renumber(membership: &[usize]) -> Vec<usize> {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    membership
        .iter()
        .map(|&c| {
            let next = mapping.len();
            *mapping.entry(c).or_insert(next)
        })
        .collect()
}

/// Modularity of `membership` (community id per node position)
pub(crate) fn modularity(adj: &Adjacency<'_>, membership: &[usize], resolution: f64) -> f64 {
    let total_weight = adj.total_weight();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let two_m = 2.0 * total_weight;

    let mut internal = 0.0;
    let mut totals: BTreeMap<usize, f64> = BTreeMap::new();
    for node in 0..adj.len() {
        let c = membership[node];
        *totals.entry(c).or_default() += adj.strength(node);
        for &(neighbor, w) in &adj.neighbors[node] {
            if membership[neighbor] == c {
                internal += w;
            }
        }
    }

    let expected: f64 = totals.values().map(|t| (t / two_m).powi(2)).sum();
    internal / two_m - resolution * expected
}

/// Group node ids by community id
pub(crate) fn group(adj: &Adjacency<'_>, membership: &[usize]) -> Vec<BTreeSet<NodeId>> {
    let count = membership.iter().map(|&c| c + 1).max().unwrap_or(0);
    let mut communities = vec![BTreeSet::new(); count];
    for (node, &c) in membership.iter().enumerate() {
        communities[c].insert(adj.ids[node].to_string());
    }
    communities.retain(|c| !c.is_empty());
    communities
}
