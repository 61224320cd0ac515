use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use depscope::config::{Config, ConfigOverrides};
use depscope::export::{self, ExportData, ExportFormat};
use depscope::logging;
use depscope::session::AnalysisSession;
use depscope::source::HttpSource;

#[derive(Parser)]
#[command(name = "depscope")]
#[command(version)]
#[command(about = "npm manifest analyzer and dependency tree explorer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dependency tree endpoint
    #[arg(long, global = true, env = "DEPSCOPE_TREE_ENDPOINT")]
    tree_endpoint: Option<String>,

    /// Vulnerability check endpoint
    #[arg(long, global = true, env = "DEPSCOPE_VULNERABILITY_ENDPOINT")]
    vulnerability_endpoint: Option<String>,

    /// Upper bound for each external call, in seconds
    #[arg(long, global = true, env = "DEPSCOPE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the dependencies declared in a package.json
    Analyze {
        /// Path to package.json
        manifest: PathBuf,

        /// Also check every package for known vulnerabilities
        #[arg(short, long)]
        audit: bool,

        /// Output format (text, json, markdown)
        #[arg(short, long, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
    },
    /// Resolve and print the dependency tree of one declared package
    Tree {
        /// Path to package.json
        manifest: PathBuf,

        /// Package name as declared in the manifest
        package: String,

        /// Output format (text, json, markdown)
        #[arg(short, long, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
    },
    /// Show version information
    Version,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let overrides = ConfigOverrides {
            tree_endpoint: self.tree_endpoint.clone(),
            vulnerability_endpoint: self.vulnerability_endpoint.clone(),
            timeout_secs: self.timeout_secs,
        };
        let config = Config::load(self.config.as_deref(), overrides)
            .context("Failed to load configuration")?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn open_session(&self) -> Result<AnalysisSession> {
        let config = self.load_config()?;
        let source = Arc::new(HttpSource::from_config(&config).context("Failed to create HTTP client")?);
        Ok(AnalysisSession::new(
            source.clone(),
            source,
            config.session_config(),
        ))
    }
}

fn read_manifest(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_notices(session: &mut AnalysisSession) {
    for notice in session.take_notices() {
        eprintln!("{}", notice);
    }
}

fn write_report(format: ExportFormat, data: &ExportData<'_>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    export::export(format, data, &mut out).context("Failed to write report")?;
    out.flush().context("Failed to write report")?;
    Ok(())
}

async fn run_analyze(cli: &Cli, manifest: &Path, audit: bool, format: ExportFormat) -> Result<()> {
    let text = read_manifest(manifest)?;
    let mut session = cli.open_session()?;

    let outcome = if audit {
        session.analyze_and_check(&text).await.map(|_| ())
    } else {
        session.analyze(&text).map(|_| ())
    };
    if let Err(err) = outcome {
        bail!("Failed to analyze {}: {}", manifest.display(), err);
    }
    print_notices(&mut session);

    let analysis = session.analysis().context("analysis missing after success")?;
    let mut data = ExportData::new(analysis);
    if let Some(report) = session.vulnerabilities() {
        data = data.with_vulnerabilities(report);
    }
    write_report(format, &data)
}

async fn run_tree(cli: &Cli, manifest: &Path, package: &str, format: ExportFormat) -> Result<()> {
    let text = read_manifest(manifest)?;
    let mut session = cli.open_session()?;

    if let Err(err) = session.analyze(&text) {
        bail!("Failed to analyze {}: {}", manifest.display(), err);
    }

    let resolved = session.select_package(package).await;
    print_notices(&mut session);
    let tree = resolved.with_context(|| format!("Failed to resolve dependency tree for {}", package))?;

    let analysis = session.analysis().context("analysis missing after success")?;
    let data = ExportData::new(analysis).with_tree(&tree);
    write_report(format, &data)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match &cli.command {
        Some(Commands::Analyze {
            manifest,
            audit,
            format,
        }) => run_analyze(&cli, manifest, *audit, *format).await,
        Some(Commands::Tree {
            manifest,
            package,
            format,
        }) => run_tree(&cli, manifest, package, *format).await,
        Some(Commands::Version) => {
            println!("depscope v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            println!("depscope - npm manifest analyzer and dependency tree explorer");
            println!("Run 'depscope analyze <package.json>' to summarize dependencies");
            println!("Run 'depscope --help' for more information");
            Ok(())
        }
    }
}
