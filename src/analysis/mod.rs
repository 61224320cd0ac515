//! Manifest analysis module for depscope.
//!
//! This module turns raw `package.json` text into a [`ManifestAnalysis`]:
//!
//! - Count packages per category (production, development, peer)
//! - Produce the flat package list used to pick a tree root
//! - Report names declared under more than one category
//! - Flag the first few caret-range packages as "outdated" (heuristic only)
//!
//! # Example
//!
//! ```
//! use depscope::analysis::{AnalysisError, ManifestAnalyzer};
//!
//! let analyzer = ManifestAnalyzer::new();
//! assert!(matches!(
//!     analyzer.analyze(r#"{"name": "p"}"#),
//!     Err(AnalysisError::NoDependencies)
//! ));
//! ```

pub mod manifest;

pub use manifest::{AnalysisError, ManifestAnalysis, ManifestAnalyzer, OUTDATED_LIMIT};
