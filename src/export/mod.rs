//! Export functionality for analysis results.
//!
//! This module provides exporters for writing a manifest analysis, an
//! optional resolved tree and an optional vulnerability report as plain
//! text, JSON or Markdown.

pub mod json;
pub mod markdown;
pub mod text;

use crate::analysis::ManifestAnalysis;
use crate::graph::{CycleInfo, DependencyGraph, DependencyNode, TreeStats, VersionConflict};
use crate::vulnerability::VulnerabilityReport;
use std::io::{self, Write};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Human-readable summary with a box-drawn tree
    #[default]
    Text,
    /// JSON format - machine-readable, full data
    Json,
    /// Markdown format - documentation/reporting
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: text, json, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Text => write!(f, "text"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Resolved-tree section of an export.
#[derive(Debug, Clone)]
pub struct TreeExport<'a> {
    pub root: &'a DependencyNode,
    pub stats: TreeStats,
    pub cycles: Vec<CycleInfo>,
    pub version_conflicts: Vec<VersionConflict>,
}

impl<'a> TreeExport<'a> {
    pub fn new(root: &'a DependencyNode) -> Self {
        let graph = DependencyGraph::from_tree(root);
        Self {
            root,
            stats: root.stats(),
            cycles: graph.get_cycle_details(),
            version_conflicts: graph.detect_version_conflicts(),
        }
    }
}

/// Data container for export operations.
#[derive(Debug, Clone)]
pub struct ExportData<'a> {
    pub analysis: &'a ManifestAnalysis,
    pub tree: Option<TreeExport<'a>>,
    pub vulnerabilities: Option<&'a VulnerabilityReport>,
}

impl<'a> ExportData<'a> {
    pub fn new(analysis: &'a ManifestAnalysis) -> Self {
        Self {
            analysis,
            tree: None,
            vulnerabilities: None,
        }
    }

    pub fn with_tree(mut self, root: &'a DependencyNode) -> Self {
        self.tree = Some(TreeExport::new(root));
        self
    }

    pub fn with_vulnerabilities(mut self, report: &'a VulnerabilityReport) -> Self {
        self.vulnerabilities = Some(report);
        self
    }

    pub fn project_name(&self) -> &str {
        self.analysis.project_name.as_deref().unwrap_or("unnamed")
    }

    pub fn project_version(&self) -> &str {
        self.analysis.project_version.as_deref().unwrap_or("0.0.0")
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData<'_>, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
pub fn export<W: Write>(
    format: ExportFormat,
    data: &ExportData<'_>,
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ExportFormat::Text => text::TextExporter.export(data, writer),
        ExportFormat::Json => json::JsonExporter.export(data, writer),
        ExportFormat::Markdown => markdown::MarkdownExporter.export(data, writer),
    }
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ExportData<'_>) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
