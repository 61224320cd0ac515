//! Markdown export implementation.
//!
//! Exports manifest analysis results in Markdown format for documentation and reporting.

use super::text::render_tree;
use super::{ExportData, Exporter};
use crate::parser::DependencyType;
use std::io::{self, Write};

/// Markdown exporter implementation.
pub struct MarkdownExporter;

fn section_title(dep_type: DependencyType) -> &'static str {
    match dep_type {
        DependencyType::Production => "Production Dependencies",
        DependencyType::Development => "Development Dependencies",
        DependencyType::Peer => "Peer Dependencies",
    }
}

impl Exporter for MarkdownExporter {
    fn export<W: Write>(&self, data: &ExportData<'_>, writer: &mut W) -> io::Result<()> {
        let analysis = data.analysis;

        // Title
        writeln!(writer, "# Dependency Analysis Report")?;
        writeln!(writer)?;
        writeln!(
            writer,
            "**Project:** {} v{}",
            data.project_name(),
            data.project_version()
        )?;
        writeln!(writer)?;

        // Summary section
        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "| Metric | Count |")?;
        writeln!(writer, "|--------|-------|")?;
        writeln!(writer, "| Total Dependencies | {} |", analysis.total)?;
        writeln!(writer, "| Production | {} |", analysis.production)?;
        writeln!(writer, "| Development | {} |", analysis.development)?;
        writeln!(writer, "| Peer | {} |", analysis.peer)?;
        writeln!(writer, "| Duplicates | {} |", analysis.duplicates.len())?;
        writeln!(writer, "| Possibly Outdated | {} |", analysis.outdated.len())?;
        if let Some(report) = data.vulnerabilities {
            writeln!(writer, "| Vulnerabilities | {} |", report.len())?;
        }
        writeln!(writer)?;

        // Dependencies by type
        writeln!(writer, "## Dependencies")?;
        writeln!(writer)?;

        for dep_type in DependencyType::ALL {
            let deps: Vec<_> = analysis.by_type(dep_type).collect();
            if deps.is_empty() {
                continue;
            }

            writeln!(writer, "### {} ({})", section_title(dep_type), deps.len())?;
            writeln!(writer)?;
            writeln!(writer, "| Package | Version | Note |")?;
            writeln!(writer, "|---------|---------|------|")?;
            for dep in deps {
                let note = if analysis.is_outdated(&dep.name) {
                    "possibly outdated"
                } else {
                    ""
                };
                writeln!(writer, "| {} | {} | {} |", dep.name, dep.version, note)?;
            }
            writeln!(writer)?;
        }

        if analysis.has_duplicates() {
            writeln!(writer, "### Duplicates")?;
            writeln!(writer)?;
            writeln!(
                writer,
                "The following packages are declared in more than one category:"
            )?;
            writeln!(writer)?;
            for name in &analysis.duplicates {
                writeln!(writer, "- `{}`", name)?;
            }
            writeln!(writer)?;
        }

        if let Some(tree) = &data.tree {
            writeln!(writer, "## Dependency Tree: {}", tree.root.name)?;
            writeln!(writer)?;
            writeln!(writer, "| Metric | Count |")?;
            writeln!(writer, "|--------|-------|")?;
            writeln!(writer, "| Nodes | {} |", tree.stats.nodes)?;
            writeln!(writer, "| Unique Packages | {} |", tree.stats.unique_packages)?;
            writeln!(writer, "| Max Depth | {} |", tree.stats.max_depth)?;
            writeln!(writer, "| Circular References | {} |", tree.stats.circular)?;
            writeln!(writer)?;
            writeln!(writer, "```text")?;
            write!(writer, "{}", render_tree(tree.root))?;
            writeln!(writer, "```")?;
            writeln!(writer)?;

            // Circular dependencies
            if !tree.cycles.is_empty() {
                writeln!(writer, "### Circular Dependencies")?;
                writeln!(writer)?;
                writeln!(
                    writer,
                    "The following circular dependencies were detected:"
                )?;
                writeln!(writer)?;
                for (i, cycle) in tree.cycles.iter().enumerate() {
                    writeln!(writer, "{}. `{}`", i + 1, cycle.cycle_path())?;
                }
                writeln!(writer)?;
            }

            // Version conflicts
            if !tree.version_conflicts.is_empty() {
                writeln!(writer, "### Version Conflicts")?;
                writeln!(writer)?;
                writeln!(
                    writer,
                    "The following packages resolve to more than one version:"
                )?;
                writeln!(writer)?;

                for conflict in &tree.version_conflicts {
                    writeln!(writer, "#### {}", conflict.package_name)?;
                    writeln!(writer)?;
                    writeln!(writer, "| Version | Required By |")?;
                    writeln!(writer, "|---------|-------------|")?;
                    for req in &conflict.requirements {
                        writeln!(writer, "| {} | {} |", req.version, req.required_by)?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        if let Some(report) = data.vulnerabilities {
            writeln!(writer, "## Vulnerabilities")?;
            writeln!(writer)?;
            if report.is_degraded() {
                writeln!(writer, "*The vulnerability check could not be completed.*")?;
            } else if report.is_empty() {
                writeln!(writer, "No known vulnerabilities.")?;
            } else {
                let counts: Vec<String> = report
                    .counts_by_severity()
                    .iter()
                    .map(|(severity, count)| format!("{} {}", count, severity))
                    .collect();
                writeln!(writer, "**By severity:** {}", counts.join(", "))?;
                writeln!(writer)?;
                writeln!(writer, "| Package | Severity | ID | Title |")?;
                writeln!(writer, "|---------|----------|----|-------|")?;
                for vuln in &report.vulnerabilities {
                    writeln!(
                        writer,
                        "| {} | {} | {} | {} |",
                        vuln.package, vuln.severity, vuln.id, vuln.title
                    )?;
                }
            }
            writeln!(writer)?;
        }

        // Footer
        writeln!(writer, "---")?;
        writeln!(writer, "*Generated by depscope*")?;

        Ok(())
    }
}
