//! depscope - npm manifest analyzer and dependency tree explorer
//!
//! This crate reads a `package.json`, summarizes its declared dependencies,
//! resolves per-package dependency trees through an external source with a
//! session-scoped cache, and annotates packages with known vulnerabilities.

pub mod analysis;
pub mod config;
pub mod export;
pub mod graph;
pub mod logging;
pub mod parser;
pub mod resolver;
pub mod session;
pub mod source;
pub mod vulnerability;

pub use analysis::{AnalysisError, ManifestAnalysis, ManifestAnalyzer};
pub use config::Config;
pub use graph::DependencyNode;
pub use parser::{DependencyType, PackageDescriptor};
pub use resolver::{ResolutionError, TreeResolver};
pub use session::{AnalysisSession, Notice, NoticeLevel, SessionConfig};
