//! Graph module for dependency relationship modeling.
//!
//! [`DependencyNode`] is the owned, recursive tree produced by the
//! resolver. [`DependencyGraph`] collapses such a tree by package name to
//! report cycles and version conflicts.
//!
//! # Example
//!
//! ```rust
//! use depscope::graph::{DependencyGraph, DependencyNode};
//!
//! let mut tree = DependencyNode::new("react-dom", "18.2.0")
//!     .with_child(DependencyNode::new("scheduler", "0.23.0"));
//! tree.normalize(false, false);
//!
//! let graph = DependencyGraph::from_tree(&tree);
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! ```

mod dependency_graph;
pub mod tree;

pub use dependency_graph::{
    CycleInfo, DependencyGraph, PackageNode, VersionConflict, VersionRequirement,
};
pub use tree::{DependencyNode, FlattenedNode, TreeStats};
