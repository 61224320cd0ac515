//! Manifest analysis.
//!
//! Runs a single pass over a parsed manifest, producing per-category
//! counts, the flat package list, repeated names across categories and a
//! placeholder "outdated" flag set.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::parser::{
    extract_descriptors, parse_str, DependencyType, PackageDescriptor, ParseError,
};

/// Maximum number of caret-range packages flagged as outdated.
///
/// The outdated flag is a heuristic, not a registry lookup: callers must not
/// treat it as authoritative.
pub const OUTDATED_LIMIT: usize = 3;

/// Errors returned by [`ManifestAnalyzer::analyze`].
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The manifest text is not valid JSON.
    #[error("Invalid JSON format: {0}")]
    Parse(#[source] serde_json::Error),

    /// The manifest declares none of the dependency maps.
    #[error("No dependencies found in package.json")]
    NoDependencies,

    /// The manifest is JSON but a dependency map has the wrong shape.
    #[error("Malformed dependency section: {0}")]
    InvalidManifest(#[source] serde_json::Error),
}

impl From<ParseError> for AnalysisError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::JsonError(e) => AnalysisError::Parse(e),
            ParseError::InvalidPackage(e) => AnalysisError::InvalidManifest(e),
            ParseError::NotAnObject => AnalysisError::NoDependencies,
        }
    }
}

/// The result of analyzing one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestAnalysis {
    pub project_name: Option<String>,
    pub project_version: Option<String>,
    pub total: usize,
    pub production: usize,
    pub development: usize,
    pub peer: usize,
    /// Every declared package, production first, then development, then peer.
    pub packages: Vec<PackageDescriptor>,
    /// One entry per repeated occurrence of a name; not deduplicated.
    pub duplicates: Vec<String>,
    /// The first [`OUTDATED_LIMIT`] packages with a caret range.
    pub outdated: Vec<PackageDescriptor>,
}

impl ManifestAnalysis {
    /// Returns the first descriptor with the given name.
    pub fn find(&self, name: &str) -> Option<&PackageDescriptor> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn is_outdated(&self, name: &str) -> bool {
        self.outdated.iter().any(|p| p.name == name)
    }

    pub fn by_type(&self, dep_type: DependencyType) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.iter().filter(move |p| p.dep_type == dep_type)
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Stateless analyzer for package manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestAnalyzer;

impl ManifestAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyzes manifest text.
    ///
    /// A manifest that declares no dependency map at all is an error for
    /// this tool, not an empty result. A present but empty map is accepted.
    ///
    /// # Example
    ///
    /// ```
    /// use depscope::analysis::ManifestAnalyzer;
    ///
    /// let json = r#"{"dependencies": {"x": "1.0.0"}, "devDependencies": {"x": "1.0.0"}}"#;
    /// let analysis = ManifestAnalyzer::new().analyze(json).unwrap();
    ///
    /// assert_eq!(analysis.total, 2);
    /// assert_eq!(analysis.duplicates, vec!["x".to_string()]);
    /// ```
    pub fn analyze(&self, text: &str) -> Result<ManifestAnalysis, AnalysisError> {
        let pkg = parse_str(text)?;
        if !pkg.declares_dependencies() {
            return Err(AnalysisError::NoDependencies);
        }

        let packages = extract_descriptors(&pkg);
        let duplicates = find_duplicates(&packages);
        let outdated = flag_outdated(&packages);

        let count = |t: DependencyType| packages.iter().filter(|p| p.dep_type == t).count();
        let analysis = ManifestAnalysis {
            project_name: pkg.name,
            project_version: pkg.version,
            total: packages.len(),
            production: count(DependencyType::Production),
            development: count(DependencyType::Development),
            peer: count(DependencyType::Peer),
            duplicates,
            outdated,
            packages,
        };

        info!(
            total = analysis.total,
            production = analysis.production,
            development = analysis.development,
            peer = analysis.peer,
            duplicates = analysis.duplicates.len(),
            "analyzed manifest"
        );
        Ok(analysis)
    }
}

/// Marks every repeat occurrence of a name; the first occurrence wins.
fn find_duplicates(packages: &[PackageDescriptor]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for pkg in packages {
        if !seen.insert(pkg.name.as_str()) {
            debug!(name = %pkg.name, category = %pkg.dep_type, "duplicate package name");
            duplicates.push(pkg.name.clone());
        }
    }

    duplicates
}

fn flag_outdated(packages: &[PackageDescriptor]) -> Vec<PackageDescriptor> {
    packages
        .iter()
        .filter(|p| p.has_caret_range())
        .take(OUTDATED_LIMIT)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "web",
        "version": "2.1.0",
        "dependencies": {"react": "^18.2.0", "lodash": "4.17.21"},
        "devDependencies": {"jest": "~29.0.0"},
        "peerDependencies": {"react": ">=16"}
    }"#;

    #[test]
    fn test_analyze_counts() {
        let analysis = ManifestAnalyzer::new().analyze(SAMPLE).unwrap();

        assert_eq!(analysis.project_name.as_deref(), Some("web"));
        assert_eq!(analysis.project_version.as_deref(), Some("2.1.0"));
        assert_eq!(analysis.total, 4);
        assert_eq!(analysis.production, 2);
        assert_eq!(analysis.development, 1);
        assert_eq!(analysis.peer, 1);
        assert_eq!(analysis.by_type(DependencyType::Production).count(), 2);
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let analyzer = ManifestAnalyzer::new();
        let first = analyzer.analyze(SAMPLE).unwrap();
        let second = analyzer.analyze(SAMPLE).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_reported_once_for_two_occurrences() {
        let json = r#"{"dependencies": {"x": "1.0.0"}, "devDependencies": {"x": "1.0.0"}}"#;
        let analysis = ManifestAnalyzer::new().analyze(json).unwrap();

        assert_eq!(analysis.duplicates, vec!["x".to_string()]);
        assert!(analysis.has_duplicates());
    }

    #[test]
    fn test_duplicate_list_marks_every_repeat() {
        let json = r#"{
            "dependencies": {"x": "1"},
            "devDependencies": {"x": "1"},
            "peerDependencies": {"x": "1"}
        }"#;
        let analysis = ManifestAnalyzer::new().analyze(json).unwrap();

        assert_eq!(analysis.duplicates, vec!["x".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_no_dependency_maps_is_an_error() {
        let err = ManifestAnalyzer::new().analyze(r#"{"name":"p"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::NoDependencies));
    }

    #[test]
    fn test_empty_dependency_map_is_accepted() {
        let analysis = ManifestAnalyzer::new()
            .analyze(r#"{"dependencies": {}}"#)
            .unwrap();
        assert_eq!(analysis.total, 0);
        assert!(analysis.packages.is_empty());
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let err = ManifestAnalyzer::new().analyze("not json at all").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
        assert_ne!(err.to_string(), AnalysisError::NoDependencies.to_string());
    }

    #[test]
    fn test_non_object_json_has_no_dependencies() {
        let err = ManifestAnalyzer::new().analyze("[]").unwrap_err();
        assert!(matches!(err, AnalysisError::NoDependencies));
    }

    #[test]
    fn test_malformed_section_is_invalid_manifest() {
        let err = ManifestAnalyzer::new()
            .analyze(r#"{"dependencies": ["react"]}"#)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidManifest(_)));
    }

    #[test]
    fn test_outdated_capped_at_first_three_carets() {
        let json = r#"{
            "dependencies": {"a": "^1.0.0", "b": "1.0.0", "c": "^2.0.0"},
            "devDependencies": {"d": "^3.0.0", "e": "^4.0.0", "f": "^5.0.0"}
        }"#;
        let analysis = ManifestAnalyzer::new().analyze(json).unwrap();

        let names: Vec<_> = analysis.outdated.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
        assert!(analysis.is_outdated("d"));
        assert!(!analysis.is_outdated("e"));
        assert!(!analysis.is_outdated("b"));
    }

    #[test]
    fn test_find_returns_first_occurrence() {
        let analysis = ManifestAnalyzer::new().analyze(SAMPLE).unwrap();
        let react = analysis.find("react").unwrap();

        assert_eq!(react.dep_type, DependencyType::Production);
        assert_eq!(react.version, "^18.2.0");
        assert!(analysis.find("missing").is_none());
    }

    #[test]
    fn test_outdated_follows_manifest_order() {
        let json = r#"{"dependencies": {"zod": "^3.22.0", "yup": "^1.3.0", "react": "^18.2.0", "axios": "^1.6.0", "lodash": "^4.17.21"}}"#;
        let analysis = ManifestAnalyzer::new().analyze(json).unwrap();

        let names: Vec<_> = analysis.outdated.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zod", "yup", "react"]);
    }

    #[test]
    fn test_duplicates_follow_manifest_order() {
        let json = r#"{
            "dependencies": {"zod": "3", "axios": "1"},
            "devDependencies": {"zod": "3", "axios": "1"}
        }"#;
        let analysis = ManifestAnalyzer::new().analyze(json).unwrap();

        assert_eq!(analysis.duplicates, vec!["zod".to_string(), "axios".to_string()]);
    }

    #[test]
    fn test_non_string_metadata_does_not_fail_analysis() {
        let json = r#"{"name": "web", "version": 1, "description": {"en": "x"}, "dependencies": {"a": "^1.0.0"}}"#;
        let analysis = ManifestAnalyzer::new().analyze(json).unwrap();

        assert_eq!(analysis.project_name.as_deref(), Some("web"));
        assert!(analysis.project_version.is_none());
        assert_eq!(analysis.total, 1);
    }
}
