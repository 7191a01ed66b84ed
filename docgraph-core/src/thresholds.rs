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

//! Threshold Registry
//!
//! Every similarity, clustering and analysis decision in the engine is driven by
//! a named constant. The constants live in a typed, nested, immutable struct
//! built once at start-up; the registry additionally resolves dotted paths
//! (`similarity.conceptMerge`) for callers that address thresholds by name.
//!
//! ## Defaults
//!
//! | Path | Value |
//! |---|---|
//! | `similarity.conceptMerge` | 0.75 |
//! | `similarity.edgeCreation` | 0.3 |
//! | `similarity.fastCheck` | 0.6 |
//! | `similarity.lengthDifference` | 0.3 |
//! | `graph.moderateCommunity` | 0.3 |
//! | `graph.strongCommunity` | 0.6 |
//! | `graph.communityNeighbor` | 0.3 |
//! | `graph.minCommunitySize` | 50 |
//! | `weights.giantComponent` | 0.4 |
//! | `weights.componentCount` | 0.3 |
//! | `weights.bridgeNodes` | 0.15 |
//! | `weights.articulationPoints` | 0.15 |
//!
//! A missing path is a configuration bug: lookups fail with
//! [`DocGraphError::NotFound`] instead of falling back to a default.

use crate::error::{DocGraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Thresholds used by the string similarity layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityThresholds {
    /// Merge threshold for two terms into one concept
    pub concept_merge: f64,
    /// Minimum similarity to create a graph edge
    pub edge_creation: f64,
    /// Character-overlap pass-through threshold
    pub fast_check: f64,
    /// Max relative length delta before fast rejection
    pub length_difference: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            concept_merge: 0.75,
            edge_creation: 0.3,
            fast_check: 0.6,
            length_difference: 0.3,
        }
    }
}

/// Thresholds used by community detection and banding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphThresholds {
    /// Modularity at or above this is at least "moderate" community structure
    pub moderate_community: f64,
    /// Modularity at or above this is "strong" community structure
    pub strong_community: f64,
    /// Minimum edge weight for a neighbour to be considered during community expansion
    pub community_neighbor: f64,
    /// Node count from which the neighbour filter applies
    pub min_community_size: usize,
}

impl Default for GraphThresholds {
    fn default() -> Self {
        Self {
            moderate_community: 0.3,
            strong_community: 0.6,
            community_neighbor: 0.3,
            min_community_size: 50,
        }
    }
}

/// Composition weights of the connectivity score.
///
/// The defaults sum to 1.0. Nothing downstream renormalizes them, so a
/// configuration whose weights sum to `w` yields scores in `[0, w]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityWeights {
    pub giant_component: f64,
    pub component_count: f64,
    pub bridge_nodes: f64,
    pub articulation_points: f64,
}

impl Default for ConnectivityWeights {
    fn default() -> Self {
        Self {
            giant_component: 0.4,
            component_count: 0.3,
            bridge_nodes: 0.15,
            articulation_points: 0.15,
        }
    }
}

impl ConnectivityWeights {
    /// Sum of all weights (upper bound of the connectivity score)
    pub fn total(&self) -> f64 {
        self.giant_component + self.component_count + self.bridge_nodes + self.articulation_points
    }
}

/// The full threshold set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub similarity: SimilarityThresholds,
    pub graph: GraphThresholds,
    pub weights: ConnectivityWeights,
}

/// Comparison operator accepted by [`ThresholdRegistry::meets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
}

impl ComparisonOp {
    /// Apply the operator as `value <op> threshold`
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Greater => value > threshold,
            ComparisonOp::Less => value < threshold,
            ComparisonOp::GreaterOrEqual => value >= threshold,
            ComparisonOp::LessOrEqual => value <= threshold,
            ComparisonOp::Equal => value == threshold,
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = DocGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ">" => Ok(ComparisonOp::Greater),
            "<" => Ok(ComparisonOp::Less),
            ">=" => Ok(ComparisonOp::GreaterOrEqual),
            "<=" => Ok(ComparisonOp::LessOrEqual),
            "===" | "==" => Ok(ComparisonOp::Equal),
            other => Err(DocGraphError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Greater => ">",
            ComparisonOp::Less => "<",
            ComparisonOp::GreaterOrEqual => ">=",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::Equal => "===",
        };
        f.write_str(s)
    }
}

/// Read-only registry of named thresholds
#[derive(Debug, Clone)]
pub struct ThresholdRegistry {
    thresholds: Thresholds,
    /// JSON view of `thresholds` used for dotted-path lookup
    tree: Value,
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl ThresholdRegistry {
    /// Create a registry from a typed threshold set
    pub fn new(thresholds: Thresholds) -> Self {
        let tree = serde_json::to_value(&thresholds).unwrap_or(Value::Null);
        Self { thresholds, tree }
    }

    /// Create a registry from the defaults with a partial overlay applied.
    ///
    /// Every leaf of `overrides` must name an existing numeric threshold;
    /// unknown paths fail with `NotFound`.
    pub fn with_overrides(overrides: &toml::Value) -> Result<Self> {
        let mut tree = serde_json::to_value(Thresholds::default())?;
        let table = overrides.as_table().ok_or_else(|| {
            DocGraphError::Config("threshold overrides must be a table".to_string())
        })?;

        let mut path = Vec::new();
        apply_overlay(&mut tree, table, &mut path)?;

        let thresholds: Thresholds = serde_json::from_value(tree)
            .map_err(|e| DocGraphError::Config(format!("invalid threshold override: {}", e)))?;
        tracing::debug!(?thresholds, "Threshold overrides applied");
        Ok(Self::new(thresholds))
    }

    /// Parse a TOML overlay document and apply it over the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let overrides: toml::Value = toml::from_str(content)?;
        Self::with_overrides(&overrides)
    }

    /// Typed access to the threshold set
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn similarity(&self) -> &SimilarityThresholds {
        &self.thresholds.similarity
    }

    pub fn graph(&self) -> &GraphThresholds {
        &self.thresholds.graph
    }

    pub fn weights(&self) -> &ConnectivityWeights {
        &self.thresholds.weights
    }

    /// Resolve a dotted path such as `similarity.conceptMerge`
    pub fn get(&self, path: &str) -> Result<f64> {
        let mut node = &self.tree;
        for segment in path.split('.') {
            node = node
                .get(segment)
                .ok_or_else(|| DocGraphError::NotFound(format!("threshold '{}'", path)))?;
        }
        node.as_f64().ok_or_else(|| {
            DocGraphError::NotFound(format!("threshold '{}' is a group, not a value", path))
        })
    }

    /// Check `value <operator> threshold(path)`
    pub fn meets(&self, value: f64, path: &str, operator: &str) -> Result<bool> {
        let op: ComparisonOp = operator.parse()?;
        let threshold = self.get(path)?;
        Ok(op.apply(value, threshold))
    }
}

fn apply_overlay(
    tree: &mut Value,
    table: &toml::map::Map<String, toml::Value>,
    path: &mut Vec<String>,
) -> Result<()> {
    for (key, value) in table {
        path.push(key.clone());
        let target = tree
            .get_mut(key.as_str())
            .ok_or_else(|| DocGraphError::NotFound(format!("threshold '{}'", path.join("."))))?;

        match value {
            toml::Value::Table(inner) => {
                if !target.is_object() {
                    return Err(DocGraphError::Config(format!(
                        "threshold '{}' is a value, not a group",
                        path.join(".")
                    )));
                }
                apply_overlay(target, inner, path)?;
            }
            toml::Value::Integer(i) => {
                ensure_leaf(target, path)?;
                *target = Value::from(*i);
            }
            toml::Value::Float(f) => {
                ensure_leaf(target, path)?;
                *target = Value::from(*f);
            }
            _ => {
                return Err(DocGraphError::Config(format!(
                    "threshold '{}' must be numeric",
                    path.join(".")
                )))
            }
        }
        path.pop();
    }
    Ok(())
}

fn ensure_leaf(target: &Value, path: &[String]) -> Result<()> {
    if target.is_number() {
        Ok(())
    } else {
        Err(DocGraphError::Config(format!(
            "threshold '{}' is a group, not a value",
            path.join(".")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let registry = ThresholdRegistry::default();
        assert_eq!(registry.get("similarity.conceptMerge").unwrap(), 0.75);
        assert_eq!(registry.get("similarity.edgeCreation").unwrap(), 0.3);
        assert_eq!(registry.get("similarity.fastCheck").unwrap(), 0.6);
        assert_eq!(registry.get("similarity.lengthDifference").unwrap(), 0.3);
        assert_eq!(registry.get("graph.moderateCommunity").unwrap(), 0.3);
        assert_eq!(registry.get("graph.communityNeighbor").unwrap(), 0.3);
        assert_eq!(registry.get("graph.minCommunitySize").unwrap(), 50.0);
        assert_eq!(registry.get("weights.giantComponent").unwrap(), 0.4);
        assert_eq!(registry.get("weights.articulationPoints").unwrap(), 0.15);
        assert!((registry.weights().total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_path() {
        let registry = ThresholdRegistry::default();
        assert!(matches!(
            registry.get("similarity.nope"),
            Err(DocGraphError::NotFound(_))
        ));
        assert!(matches!(
            registry.get("nope.conceptMerge"),
            Err(DocGraphError::NotFound(_))
        ));
        // A group is not a value
        assert!(matches!(
            registry.get("similarity"),
            Err(DocGraphError::NotFound(_))
        ));
    }

    #[test]
    fn test_meets() {
        let registry = ThresholdRegistry::default();
        assert!(registry.meets(0.8, "similarity.conceptMerge", ">").unwrap());
        assert!(!registry.meets(0.75, "similarity.conceptMerge", ">").unwrap());
        assert!(registry.meets(0.75, "similarity.conceptMerge", ">=").unwrap());
        assert!(registry.meets(0.75, "similarity.conceptMerge", "===").unwrap());
        assert!(registry.meets(0.1, "similarity.edgeCreation", "<").unwrap());
        assert!(registry.meets(0.3, "similarity.edgeCreation", "<=").unwrap());
    }

    #[test]
    fn test_meets_invalid_operator() {
        let registry = ThresholdRegistry::default();
        assert!(matches!(
            registry.meets(0.5, "similarity.conceptMerge", "=>"),
            Err(DocGraphError::InvalidOperator(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let registry = ThresholdRegistry::from_toml_str(
            r#"
            [similarity]
            conceptMerge = 0.9

            [graph]
            minCommunitySize = 10
            "#,
        )
        .unwrap();

        assert_eq!(registry.similarity().concept_merge, 0.9);
        assert_eq!(registry.graph().min_community_size, 10);
        // Untouched values keep their defaults
        assert_eq!(registry.similarity().edge_creation, 0.3);
        assert_eq!(registry.get("similarity.conceptMerge").unwrap(), 0.9);
    }

    #[test]
    fn test_override_unknown_path() {
        let err = ThresholdRegistry::from_toml_str(
            r#"
            [similarity]
            conceptMerg = 0.9
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DocGraphError::NotFound(_)));
    }

    #[test]
    fn test_override_non_numeric() {
        let err = ThresholdRegistry::from_toml_str(
            r#"
            [weights]
            bridgeNodes = "high"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DocGraphError::Config(_)));
    }
}
