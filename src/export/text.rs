//! Plain-text export implementation.
//!
//! Prints a short summary followed by the resolved tree drawn with
//! box-drawing connectors, in the style of `npm ls`.

use super::{ExportData, Exporter};
use crate::graph::DependencyNode;
use std::io::{self, Write};

/// Plain-text exporter implementation.
pub struct TextExporter;

/// Renders a tree, one package per line.
///
/// ```
/// use depscope::export::text::render_tree;
/// use depscope::graph::DependencyNode;
///
/// let tree = DependencyNode::new("a", "1.0.0").with_child(DependencyNode::new("b", "2.0.0"));
/// assert_eq!(render_tree(&tree), "a@1.0.0\n└── b@2.0.0\n");
/// ```
pub fn render_tree(root: &DependencyNode) -> String {
    let mut out = String::new();
    for row in root.flatten() {
        out.push_str(&row.prefix());
        out.push_str(&row.name);
        out.push('@');
        out.push_str(&row.version);
        if row.is_dev {
            out.push_str(" [dev]");
        }
        if row.is_peer {
            out.push_str(" [peer]");
        }
        if row.is_circular {
            out.push_str(" (circular)");
        }
        out.push('\n');
    }
    out
}

impl Exporter for TextExporter {
    fn export<W: Write>(&self, data: &ExportData<'_>, writer: &mut W) -> io::Result<()> {
        let analysis = data.analysis;

        writeln!(writer, "{}@{}", data.project_name(), data.project_version())?;
        writeln!(
            writer,
            "{} packages ({} production, {} development, {} peer)",
            analysis.total, analysis.production, analysis.development, analysis.peer
        )?;

        if analysis.has_duplicates() {
            writeln!(writer, "Duplicates: {}", analysis.duplicates.join(", "))?;
        }
        if !analysis.outdated.is_empty() {
            let names: Vec<&str> = analysis.outdated.iter().map(|p| p.name.as_str()).collect();
            writeln!(writer, "Possibly outdated (heuristic): {}", names.join(", "))?;
        }

        if let Some(report) = data.vulnerabilities {
            if report.is_degraded() {
                writeln!(writer, "Vulnerabilities: check unavailable")?;
            } else {
                writeln!(writer, "Vulnerabilities: {}", report.len())?;
                for vuln in &report.vulnerabilities {
                    writeln!(
                        writer,
                        "  [{}] {} {} - {}",
                        vuln.severity, vuln.package, vuln.id, vuln.title
                    )?;
                }
            }
        }

        if let Some(tree) = &data.tree {
            writeln!(writer)?;
            write!(writer, "{}", render_tree(tree.root))?;
            writeln!(writer)?;
            writeln!(
                writer,
                "{} nodes, {} unique packages, max depth {}, {} circular",
                tree.stats.nodes, tree.stats.unique_packages, tree.stats.max_depth, tree.stats.circular
            )?;
            for cycle in &tree.cycles {
                writeln!(writer, "Cycle: {}", cycle.cycle_path())?;
            }
            for conflict in &tree.version_conflicts {
                writeln!(writer, "Version conflict: {}", conflict.description())?;
            }
        }

        Ok(())
    }
}
