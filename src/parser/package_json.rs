//! Parser for npm package.json files.
//!
//! This module turns manifest text into a [`PackageJson`] and flattens its
//! dependency maps into an ordered list of [`PackageDescriptor`]s.

use serde::de::IgnoredAny;
use serde_json::error::Category;

use super::types::{DependencyMap, DependencyType, PackageDescriptor, PackageJson};

/// Errors that can occur during package.json parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text is not valid JSON.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[source] serde_json::Error),

    /// The text is valid JSON but not an object.
    #[error("Manifest is not a JSON object")]
    NotAnObject,

    /// A dependency map has the wrong shape (e.g. a non-string version).
    #[error("Invalid package.json: {0}")]
    InvalidPackage(#[source] serde_json::Error),
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a package.json from a string.
///
/// The text is deserialized directly so that dependency maps keep the
/// order the manifest declares them in. Syntax errors, non-object documents
/// and malformed dependency maps are reported as distinct [`ParseError`]
/// variants; non-string `name`/`version`/`description` values are ignored.
///
/// # Example
///
/// ```
/// use depscope::parser::package_json::parse_str;
///
/// let json = r#"{"name": "my-app", "version": "1.0.0"}"#;
/// let pkg = parse_str(json).unwrap();
/// assert_eq!(pkg.name, Some("my-app".to_string()));
/// ```
pub fn parse_str(content: &str) -> ParseResult<PackageJson> {
    if !content.trim_start().starts_with('{') {
        serde_json::from_str::<IgnoredAny>(content).map_err(ParseError::JsonError)?;
        return Err(ParseError::NotAnObject);
    }

    serde_json::from_str(content).map_err(|e| match e.classify() {
        Category::Data => ParseError::InvalidPackage(e),
        Category::Io | Category::Syntax | Category::Eof => ParseError::JsonError(e),
    })
}

/// Extracts all dependencies from a PackageJson into a flat, ordered list.
///
/// Production entries come first, then development, then peer; each group
/// keeps the order the manifest declares them in.
///
/// # Example
///
/// ```
/// use depscope::parser::package_json::{parse_str, extract_descriptors};
/// use depscope::parser::types::DependencyType;
///
/// let json = r#"{
///     "name": "my-app",
///     "dependencies": {"react": "^18.0.0"},
///     "devDependencies": {"typescript": "^5.0.0"}
/// }"#;
///
/// let pkg = parse_str(json).unwrap();
/// let deps = extract_descriptors(&pkg);
///
/// assert_eq!(deps.len(), 2);
/// assert_eq!(deps[0].name, "react");
/// assert_eq!(deps[1].dep_type, DependencyType::Development);
/// ```
pub fn extract_descriptors(pkg: &PackageJson) -> Vec<PackageDescriptor> {
    let mut deps = Vec::with_capacity(pkg.dependency_count());

    for dep_type in DependencyType::ALL {
        if let Some(map) = dependency_map(pkg, dep_type) {
            deps.extend(
                map.iter()
                    .map(|(name, version)| PackageDescriptor::new(name, version, dep_type)),
            );
        }
    }

    deps
}

fn dependency_map(pkg: &PackageJson, dep_type: DependencyType) -> Option<&DependencyMap> {
    match dep_type {
        DependencyType::Production => pkg.dependencies.as_ref(),
        DependencyType::Development => pkg.dev_dependencies.as_ref(),
        DependencyType::Peer => pkg.peer_dependencies.as_ref(),
    }
}
