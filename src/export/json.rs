//! JSON export implementation.
//!
//! Exports analysis results in JSON format for machine-readable output.

use super::{ExportData, Exporter};
use crate::graph::{DependencyNode, TreeStats};
use crate::parser::PackageDescriptor;
use crate::source::Severity;
use crate::vulnerability::Vulnerability;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Serializable cycle info for JSON output.
#[derive(Serialize)]
struct JsonCycle {
    packages: Vec<String>,
    path: String,
}

/// Serializable version conflict for JSON output.
#[derive(Serialize)]
struct JsonVersionConflict {
    package: String,
    requirements: Vec<JsonVersionRequirement>,
}

#[derive(Serialize)]
struct JsonVersionRequirement {
    version: String,
    required_by: String,
}

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    total_dependencies: usize,
    production: usize,
    development: usize,
    peer: usize,
    duplicates: usize,
    outdated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    vulnerabilities: Option<usize>,
}

#[derive(Serialize)]
struct JsonTree<'a> {
    root: &'a DependencyNode,
    stats: TreeStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    circular_dependencies: Vec<JsonCycle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    version_conflicts: Vec<JsonVersionConflict>,
}

#[derive(Serialize)]
struct JsonVulnerabilities<'a> {
    available: bool,
    by_severity: BTreeMap<Severity, usize>,
    items: &'a [Vulnerability],
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport<'a> {
    project: JsonProject<'a>,
    summary: JsonSummary,
    packages: &'a [PackageDescriptor],
    duplicates: &'a [String],
    outdated: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<JsonTree<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vulnerabilities: Option<JsonVulnerabilities<'a>>,
}

/// Project info for JSON output.
#[derive(Serialize)]
struct JsonProject<'a> {
    name: &'a str,
    version: &'a str,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ExportData<'_>, writer: &mut W) -> io::Result<()> {
        let analysis = data.analysis;

        let tree = data.tree.as_ref().map(|tree| JsonTree {
            root: tree.root,
            stats: tree.stats,
            circular_dependencies: tree
                .cycles
                .iter()
                .map(|c| JsonCycle {
                    packages: c.members.clone(),
                    path: c.cycle_path(),
                })
                .collect(),
            version_conflicts: tree
                .version_conflicts
                .iter()
                .map(|c| JsonVersionConflict {
                    package: c.package_name.clone(),
                    requirements: c
                        .requirements
                        .iter()
                        .map(|r| JsonVersionRequirement {
                            version: r.version.clone(),
                            required_by: r.required_by.clone(),
                        })
                        .collect(),
                })
                .collect(),
        });

        let vulnerabilities = data.vulnerabilities.map(|report| JsonVulnerabilities {
            available: !report.is_degraded(),
            by_severity: report.counts_by_severity(),
            items: &report.vulnerabilities,
        });

        let export = JsonExport {
            project: JsonProject {
                name: data.project_name(),
                version: data.project_version(),
            },
            summary: JsonSummary {
                total_dependencies: analysis.total,
                production: analysis.production,
                development: analysis.development,
                peer: analysis.peer,
                duplicates: analysis.duplicates.len(),
                outdated: analysis.outdated.len(),
                vulnerabilities: data.vulnerabilities.map(|r| r.len()),
            },
            packages: &analysis.packages,
            duplicates: &analysis.duplicates,
            outdated: analysis.outdated.iter().map(|p| p.name.as_str()).collect(),
            tree,
            vulnerabilities,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
