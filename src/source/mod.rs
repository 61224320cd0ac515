//! External data sources.
//!
//! The resolver and the vulnerability scanner never talk to a registry
//! themselves: they consume pre-resolved responses from the collaborators
//! defined here. [`http::HttpSource`] implements both traits over HTTP.

pub mod http;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::DependencyNode;
use crate::parser::PackageDescriptor;

pub use http::HttpSource;

/// Errors raised while contacting an external data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The source is unavailable for another reason.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// A root package sent to the tree data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRoot {
    pub name: String,
    pub version: String,
    pub is_dev: bool,
    pub is_peer: bool,
}

impl From<&PackageDescriptor> for TreeRoot {
    fn from(pkg: &PackageDescriptor) -> Self {
        Self {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            is_dev: pkg.is_dev(),
            is_peer: pkg.is_peer(),
        }
    }
}

/// A package sent to the vulnerability data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageQuery {
    pub name: String,
    pub version: String,
}

impl From<&PackageDescriptor> for PackageQuery {
    fn from(pkg: &PackageDescriptor) -> Self {
        Self {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
        }
    }
}

/// Severity reported by the vulnerability data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Moderate,
    Low,
    Info,
    Unknown,
}

impl Severity {
    /// Parses a severity label case-insensitively; unrecognized labels map
    /// to [`Severity::Unknown`].
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "moderate" | "medium" => Severity::Moderate,
            "low" => Severity::Low,
            "info" => Severity::Info,
            _ => Severity::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Severity::from_label(&label))
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Moderate => "moderate",
            Severity::Low => "low",
            Severity::Info => "info",
            Severity::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One advisory as returned by the vulnerability data source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Advisory {
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// All advisories for one package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageVulnerabilities {
    pub package: String,
    #[serde(default)]
    pub vulnerabilities: Vec<Advisory>,
}

/// Resolves dependency trees for root packages.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Returns one tree per requested root, in request order.
    async fn fetch_trees(&self, roots: &[TreeRoot]) -> Result<Vec<DependencyNode>, SourceError>;
}

/// Looks up known vulnerabilities for a batch of packages.
#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    async fn fetch_vulnerabilities(
        &self,
        packages: &[PackageQuery],
    ) -> Result<Vec<PackageVulnerabilities>, SourceError>;
}
