//! Recursive dependency tree.
//!
//! A [`DependencyNode`] owns its children. Trees arrive from an external
//! data source and are normalized locally: depth is reassigned from the
//! root and cycle flags are recomputed from the ancestor path, never
//! taken on trust from upstream.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One node of a resolved transitive dependency tree.
///
/// # Invariants (after [`DependencyNode::normalize`])
///
/// - A circular node has no children.
/// - Every child's depth is exactly its parent's depth plus one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    /// Package name
    pub name: String,
    /// Resolved version
    #[serde(rename = "resolvedVersion", alias = "version", default)]
    pub version: String,
    /// Child dependencies
    #[serde(default, alias = "dependencies")]
    pub children: Vec<DependencyNode>,
    #[serde(default)]
    pub is_dev: bool,
    #[serde(default)]
    pub is_peer: bool,
    /// Name repeats an ancestor on the path from the root; descent stops here.
    #[serde(default)]
    pub is_circular: bool,
    /// Depth in the tree (0 = root)
    #[serde(default)]
    pub depth: usize,
}

impl DependencyNode {
    /// Create a new leaf node at depth 0.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            children: Vec::new(),
            is_dev: false,
            is_peer: false,
            is_circular: false,
            depth: 0,
        }
    }

    /// Builder-style variant of [`DependencyNode::add_child`].
    pub fn with_child(mut self, child: DependencyNode) -> Self {
        self.add_child(child);
        self
    }

    /// Add a child node, shifting its whole subtree below this node.
    pub fn add_child(&mut self, mut child: DependencyNode) {
        child.set_depth(self.depth + 1);
        self.children.push(child);
    }

    fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depth(depth + 1);
        }
    }

    /// Check if this node has children
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Rewrites the tree in place so that the structural invariants hold.
    ///
    /// Depth is assigned positionally from 0 at this node. A node whose
    /// name already appears among its ancestors is marked circular and its
    /// children are dropped; any circular flag supplied by the data source
    /// is discarded first. `is_dev`/`is_peer` from the root category are
    /// OR-ed into every node.
    ///
    /// # Example
    ///
    /// ```
    /// use depscope::graph::DependencyNode;
    ///
    /// let mut tree = DependencyNode::new("a", "1.0.0").with_child(
    ///     DependencyNode::new("b", "1.0.0")
    ///         .with_child(DependencyNode::new("a", "1.0.0").with_child(DependencyNode::new("b", "1.0.0"))),
    /// );
    /// tree.normalize(false, false);
    ///
    /// let inner_a = &tree.children[0].children[0];
    /// assert!(inner_a.is_circular);
    /// assert!(inner_a.children.is_empty());
    /// assert_eq!(inner_a.depth, 2);
    /// ```
    pub fn normalize(&mut self, is_dev: bool, is_peer: bool) {
        let mut ancestors = HashSet::new();
        self.normalize_recursive(0, is_dev, is_peer, &mut ancestors);
    }

    fn normalize_recursive(
        &mut self,
        depth: usize,
        is_dev: bool,
        is_peer: bool,
        ancestors: &mut HashSet<String>,
    ) {
        self.depth = depth;
        self.is_dev |= is_dev;
        self.is_peer |= is_peer;

        if ancestors.contains(&self.name) {
            self.is_circular = true;
            self.children.clear();
            return;
        }
        self.is_circular = false;

        ancestors.insert(self.name.clone());
        for child in &mut self.children {
            child.normalize_recursive(depth + 1, is_dev, is_peer, ancestors);
        }
        ancestors.remove(&self.name);
    }

    /// Returns true if the circular-leaf and depth invariants hold for the
    /// whole subtree.
    pub fn is_well_formed(&self) -> bool {
        if self.is_circular && self.has_children() {
            return false;
        }
        self.children
            .iter()
            .all(|c| c.depth == self.depth + 1 && c.is_well_formed())
    }

    /// Pre-order iterator over every node in the tree.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Total number of nodes, including this one.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Deepest depth reached in this subtree.
    pub fn max_depth(&self) -> usize {
        self.iter().map(|n| n.depth).max().unwrap_or(self.depth)
    }

    pub fn circular_count(&self) -> usize {
        self.iter().filter(|n| n.is_circular).count()
    }

    /// Finds the first node (pre-order) with the given name.
    pub fn find(&self, name: &str) -> Option<&DependencyNode> {
        self.iter().find(|n| n.name == name)
    }

    /// Returns the ancestor chain for every circular node, ending with the
    /// repeated name (e.g. `["a", "b", "a"]`).
    pub fn circular_paths(&self) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        let mut path = Vec::new();
        self.collect_circular_paths(&mut path, &mut paths);
        paths
    }

    fn collect_circular_paths<'a>(
        &'a self,
        path: &mut Vec<&'a str>,
        paths: &mut Vec<Vec<String>>,
    ) {
        if self.is_circular {
            if let Some(start) = path.iter().position(|n| *n == self.name) {
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(self.name.clone());
                paths.push(cycle);
            }
            return;
        }

        path.push(&self.name);
        for child in &self.children {
            child.collect_circular_paths(path, paths);
        }
        path.pop();
    }

    /// Summary statistics for the tree.
    pub fn stats(&self) -> TreeStats {
        let unique: HashSet<&str> = self.iter().map(|n| n.name.as_str()).collect();
        TreeStats {
            nodes: self.node_count(),
            unique_packages: unique.len(),
            max_depth: self.max_depth(),
            circular: self.circular_count(),
        }
    }

    /// Flatten the tree into a pre-order list for rendering.
    pub fn flatten(&self) -> Vec<FlattenedNode> {
        let mut result = vec![self.flattened(true, true, Vec::new())];
        let mut guides = Vec::new();
        self.flatten_children(&mut result, &mut guides);
        result
    }

    fn flatten_children(&self, result: &mut Vec<FlattenedNode>, guides: &mut Vec<bool>) {
        let child_count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            let is_last = i == child_count - 1;
            result.push(child.flattened(false, is_last, guides.clone()));
            guides.push(!is_last);
            child.flatten_children(result, guides);
            guides.pop();
        }
    }

    fn flattened(&self, is_root: bool, is_last_child: bool, guides: Vec<bool>) -> FlattenedNode {
        FlattenedNode {
            name: self.name.clone(),
            version: self.version.clone(),
            depth: self.depth,
            is_root,
            is_last_child,
            guides,
            is_circular: self.is_circular,
            is_dev: self.is_dev,
            is_peer: self.is_peer,
        }
    }
}

/// Pre-order traversal over a [`DependencyNode`] tree.
pub struct Iter<'a> {
    stack: Vec<&'a DependencyNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a DependencyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Aggregate numbers describing a resolved tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TreeStats {
    pub nodes: usize,
    pub unique_packages: usize,
    pub max_depth: usize,
    pub circular: usize,
}

/// A flattened node representation for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedNode {
    pub name: String,
    pub version: String,
    pub depth: usize,
    pub is_root: bool,
    /// Whether this is the last child of its parent
    pub is_last_child: bool,
    /// For each ancestor below the root, whether a vertical guide continues
    /// past this row (the ancestor still has later siblings).
    pub guides: Vec<bool>,
    pub is_circular: bool,
    pub is_dev: bool,
    pub is_peer: bool,
}

impl FlattenedNode {
    /// Returns the box-drawing prefix for this row (empty for the root).
    pub fn prefix(&self) -> String {
        if self.is_root {
            return String::new();
        }
        let mut prefix = String::new();
        for &continues in &self.guides {
            prefix.push_str(if continues { "│   " } else { "    " });
        }
        prefix.push_str(if self.is_last_child { "└── " } else { "├── " });
        prefix
    }
}
