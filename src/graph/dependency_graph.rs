//! Dependency graph implementation using petgraph.
//!
//! Collapses a resolved [`DependencyNode`] tree into a directed graph keyed
//! by package name, so that cycles and version conflicts can be reported
//! across the whole tree rather than per path.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::tree::DependencyNode;

/// A package in the collapsed graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// Package name (e.g., "react", "lodash")
    pub name: String,
    /// Version of the first occurrence found in the tree
    pub version: String,
    /// Depth of the first occurrence found in the tree
    pub depth: usize,
}

/// A directed graph of resolved packages.
///
/// Edges point from the dependent package to its dependency. The edge into
/// a circular leaf is kept, which is what closes a cycle in the graph.
///
/// # Example
///
/// ```rust
/// use depscope::graph::{DependencyGraph, DependencyNode};
///
/// let mut tree = DependencyNode::new("a", "1.0.0")
///     .with_child(DependencyNode::new("b", "1.0.0").with_child(DependencyNode::new("a", "1.0.0")));
/// tree.normalize(false, false);
///
/// let graph = DependencyGraph::from_tree(&tree);
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.get_cycle_details()[0].cycle_path(), "a → b → a");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<PackageNode, ()>,
    /// Maps package names to their node indices for O(1) lookup
    node_indices: HashMap<String, NodeIndex>,
    /// package_name -> [(version, required_by)]
    version_requirements: HashMap<String, Vec<VersionRequirement>>,
}

impl DependencyGraph {
    /// Creates a new empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from a normalized tree.
    pub fn from_tree(root: &DependencyNode) -> Self {
        let mut graph = Self::new();
        graph.add_package(&root.name, &root.version, root.depth);
        graph.add_subtree(root);
        graph
    }

    fn add_subtree(&mut self, parent: &DependencyNode) {
        for child in &parent.children {
            self.add_package(&child.name, &child.version, child.depth);
            self.add_edge(&parent.name, &child.name);
            self.track_version_requirement(&child.name, &child.version, &parent.name);
            self.add_subtree(child);
        }
    }

    /// Adds a package to the graph.
    ///
    /// If a package with the same name already exists, returns its
    /// existing node index without modification.
    pub fn add_package(&mut self, name: &str, version: &str, depth: usize) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            return idx;
        }

        let idx = self.graph.add_node(PackageNode {
            name: name.to_string(),
            version: version.to_string(),
            depth,
        });
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    /// Adds an edge from `from` (the dependent) to `to` (the dependency).
    ///
    /// Repeated edges are collapsed. Returns `false` if either node doesn't
    /// exist.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        let (Some(&from_idx), Some(&to_idx)) =
            (self.node_indices.get(from), self.node_indices.get(to))
        else {
            return false;
        };

        self.graph.update_edge(from_idx, to_idx, ());
        true
    }

    /// Detects every cycle in the graph.
    ///
    /// There is one entry per strongly connected component with more than
    /// one package, or per package with a self-loop, sorted by member names.
    /// `members` lists the component in first-reached order and `nodes` is
    /// one concrete cycle through it, starting at the first member.
    pub fn get_cycle_details(&self) -> Vec<CycleInfo> {
        let mut cycles = Vec::new();

        for mut scc in tarjan_scc(&self.graph) {
            let is_cycle = scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]);
            if !is_cycle {
                continue;
            }
            scc.sort();
            let walk = self.walk_cycle(&scc);
            cycles.push(CycleInfo {
                members: self.names(&scc),
                nodes: self.names(&walk),
            });
        }

        cycles.sort_by(|a, b| a.members.cmp(&b.members));
        cycles
    }

    /// Shortest cycle from the first member of `scc` back to itself, using
    /// only edges inside the component.
    fn walk_cycle(&self, scc: &[NodeIndex]) -> Vec<NodeIndex> {
        let Some(&start) = scc.first() else {
            return Vec::new();
        };
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if next == start {
                    let mut path = vec![node];
                    let mut current = node;
                    while current != start {
                        match parent.get(&current) {
                            Some(&p) => {
                                path.push(p);
                                current = p;
                            }
                            None => break,
                        }
                    }
                    path.reverse();
                    return path;
                }
                if members.contains(&next) && !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        scc.to_vec()
    }

    fn names(&self, indices: &[NodeIndex]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&idx| self.graph.node_weight(idx))
            .map(|node| node.name.clone())
            .collect()
    }

    /// Records that `required_by` pulled in `package_name` at `version`.
    pub fn track_version_requirement(&mut self, package_name: &str, version: &str, required_by: &str) {
        self.version_requirements
            .entry(package_name.to_string())
            .or_default()
            .push(VersionRequirement::new(version, required_by));
    }

    /// Detects packages resolved at more than one version, sorted by name.
    pub fn detect_version_conflicts(&self) -> Vec<VersionConflict> {
        let mut conflicts: BTreeMap<&str, VersionConflict> = BTreeMap::new();

        for (package_name, requirements) in &self.version_requirements {
            let versions: HashSet<&str> = requirements.iter().map(|r| r.version.as_str()).collect();
            if versions.len() > 1 {
                conflicts.insert(
                    package_name,
                    VersionConflict {
                        package_name: package_name.clone(),
                        requirements: requirements.clone(),
                    },
                );
            }
        }

        conflicts.into_values().collect()
    }

    /// Returns the number of packages in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of distinct dependency edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }
}

/// Information about a detected circular dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// Every package in the strongly connected component
    pub members: Vec<String>,
    /// One closed walk through the component; each step is a real edge
    pub nodes: Vec<String>,
}

impl CycleInfo {
    /// Returns a formatted string showing the cycle path.
    ///
    /// Example: "a → b → c → a"
    pub fn cycle_path(&self) -> String {
        match self.nodes.first() {
            Some(first) => {
                let mut path = self.nodes.join(" → ");
                path.push_str(" → ");
                path.push_str(first);
                path
            }
            None => String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A version requested by a specific dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    pub version: String,
    pub required_by: String,
}

impl VersionRequirement {
    pub fn new(version: impl Into<String>, required_by: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            required_by: required_by.into(),
        }
    }
}

/// A package resolved at more than one version within one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub package_name: String,
    pub requirements: Vec<VersionRequirement>,
}

impl VersionConflict {
    /// Human-readable summary, e.g. "ms: 2.0.0 (via debug), 2.1.3 (via send)".
    pub fn description(&self) -> String {
        let parts: Vec<String> = self
            .requirements
            .iter()
            .map(|r| format!("{} (via {})", r.version, r.required_by))
            .collect();
        format!("{}: {}", self.package_name, parts.join(", "))
    }
}
