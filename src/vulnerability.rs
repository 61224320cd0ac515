//! Vulnerability annotation.
//!
//! Sends the whole package list to a [`VulnerabilitySource`] in one batch and
//! flattens the per-package advisories. A failing source never fails the
//! caller: the report comes back empty and marked as degraded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::parser::PackageDescriptor;
use crate::source::{PackageQuery, Severity, SourceError, VulnerabilitySource};

/// Why a vulnerability check produced no data.
#[derive(Debug, thiserror::Error)]
pub enum VulnerabilityCheckError {
    #[error("Failed to check vulnerabilities: {0}")]
    Source(#[from] SourceError),

    #[error("Vulnerability check timed out after {0:?}")]
    Timeout(Duration),
}

/// One advisory attached to one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vulnerability {
    pub package: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub id: String,
    pub references: Vec<String>,
}

/// The outcome of one vulnerability check.
#[derive(Debug, Default, Serialize)]
pub struct VulnerabilityReport {
    pub vulnerabilities: Vec<Vulnerability>,
    /// Set when the source could not be reached; `vulnerabilities` is then empty.
    #[serde(skip)]
    pub degraded: Option<VulnerabilityCheckError>,
}

impl VulnerabilityReport {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn len(&self) -> usize {
        self.vulnerabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vulnerabilities.is_empty()
    }

    /// Number of advisories per severity, most severe first; zero counts are omitted.
    pub fn counts_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for vuln in &self.vulnerabilities {
            *counts.entry(vuln.severity).or_insert(0) += 1;
        }
        counts
    }
}

/// Runs batched vulnerability checks against a source.
#[derive(Clone)]
pub struct VulnerabilityScanner {
    source: Arc<dyn VulnerabilitySource>,
    timeout: Duration,
}

impl VulnerabilityScanner {
    pub fn new(source: Arc<dyn VulnerabilitySource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Checks every package in one request. Never fails; see
    /// [`VulnerabilityReport::degraded`].
    pub async fn check(&self, packages: &[PackageDescriptor]) -> VulnerabilityReport {
        match self.try_check(packages).await {
            Ok(vulnerabilities) => {
                info!(
                    packages = packages.len(),
                    vulnerabilities = vulnerabilities.len(),
                    "vulnerability check complete"
                );
                VulnerabilityReport {
                    vulnerabilities,
                    degraded: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "vulnerability check failed; reporting none");
                VulnerabilityReport {
                    vulnerabilities: Vec::new(),
                    degraded: Some(err),
                }
            }
        }
    }

    async fn try_check(
        &self,
        packages: &[PackageDescriptor],
    ) -> Result<Vec<Vulnerability>, VulnerabilityCheckError> {
        let queries: Vec<PackageQuery> = packages.iter().map(PackageQuery::from).collect();
        let entries = tokio::time::timeout(self.timeout, self.source.fetch_vulnerabilities(&queries))
            .await
            .map_err(|_| VulnerabilityCheckError::Timeout(self.timeout))??;

        Ok(entries
            .into_iter()
            .flat_map(|entry| {
                let package = entry.package;
                entry
                    .vulnerabilities
                    .into_iter()
                    .map(move |advisory| Vulnerability {
                        package: package.clone(),
                        severity: advisory.severity,
                        title: advisory.title,
                        description: advisory.description,
                        id: advisory.id,
                        references: advisory.references,
                    })
            })
            .collect())
    }
}
