//! Shared types for manifest parsing.
//!
//! This module defines the data structures used to represent a
//! package manifest and the flat package list extracted from it.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Ordered map of package name to version range, as written in the manifest.
pub type DependencyMap = IndexMap<String, String>;

/// Represents the structure of a package.json file.
///
/// Only the fields needed for dependency analysis are captured; everything
/// else in the manifest is ignored. Dependency maps keep manifest order so
/// that list-order policies (duplicates, outdated flags) are reproducible.
/// The metadata fields are informational: a non-string value reads as `None`
/// rather than failing the whole manifest.
///
/// # Example
///
/// ```
/// use depscope::parser::types::PackageJson;
///
/// let json = r#"{"name": "my-app", "version": "1.0.0"}"#;
/// let pkg: PackageJson = serde_json::from_str(json).unwrap();
/// assert_eq!(pkg.name, Some("my-app".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageJson {
    /// The name of the package.
    #[serde(default, deserialize_with = "string_or_none")]
    pub name: Option<String>,

    /// The version of the package (semver format).
    #[serde(default, deserialize_with = "string_or_none")]
    pub version: Option<String>,

    /// A brief description of the package.
    #[serde(default, deserialize_with = "string_or_none")]
    pub description: Option<String>,

    /// Production dependencies required at runtime.
    pub dependencies: Option<DependencyMap>,

    /// Development-only dependencies (testing, building, etc.).
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: Option<DependencyMap>,

    /// Peer dependencies that the host package must provide.
    #[serde(rename = "peerDependencies")]
    pub peer_dependencies: Option<DependencyMap>,
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl PackageJson {
    /// Returns true if at least one dependency map is present, even if empty.
    pub fn declares_dependencies(&self) -> bool {
        self.dependencies.is_some()
            || self.dev_dependencies.is_some()
            || self.peer_dependencies.is_some()
    }

    /// Returns the total count of all dependencies.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.as_ref().map_or(0, |d| d.len())
            + self.dev_dependencies.as_ref().map_or(0, |d| d.len())
            + self.peer_dependencies.as_ref().map_or(0, |d| d.len())
    }
}

/// Categorizes the type of dependency relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Production dependencies - required at runtime.
    #[default]
    Production,

    /// Development dependencies - only needed during development.
    Development,

    /// Peer dependencies - expected to be provided by the consumer.
    Peer,
}

impl DependencyType {
    /// All categories, in the order they are read from a manifest.
    pub const ALL: [DependencyType; 3] = [
        DependencyType::Production,
        DependencyType::Development,
        DependencyType::Peer,
    ];
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Production => "production",
            DependencyType::Development => "development",
            DependencyType::Peer => "peer",
        };
        write!(f, "{}", s)
    }
}

/// One (name, version range, category) entry extracted from a manifest.
///
/// Descriptors are created once by the manifest analyzer and never
/// mutated afterwards. The same name may appear under several categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    /// The package name (e.g., "react", "lodash").
    pub name: String,

    /// The version range as written (e.g., "^18.0.0", "~1.2.3").
    pub version: String,

    /// The category of this dependency.
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
}

impl PackageDescriptor {
    /// Creates a new descriptor.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dep_type: DependencyType,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dep_type,
        }
    }

    pub fn is_dev(&self) -> bool {
        self.dep_type == DependencyType::Development
    }

    pub fn is_peer(&self) -> bool {
        self.dep_type == DependencyType::Peer
    }

    /// Returns true if the version range uses a caret (`^`) specifier.
    pub fn has_caret_range(&self) -> bool {
        self.version.contains('^')
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.dep_type)
    }
}
