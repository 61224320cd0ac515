//! Analysis session state.
//!
//! An [`AnalysisSession`] owns everything one user interaction cycle
//! produces: the manifest analysis, the tree resolver with its cache, the
//! last vulnerability report and a queue of transient notices. Clearing or
//! re-analyzing replaces the resolver wholesale; the previous one is
//! cancelled so responses still in flight cannot land in the new cache.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::analysis::{AnalysisError, ManifestAnalysis, ManifestAnalyzer};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::graph::DependencyNode;
use crate::resolver::{ResolutionError, TreeResolver};
use crate::source::{TreeSource, VulnerabilitySource};
use crate::vulnerability::{VulnerabilityReport, VulnerabilityScanner};

/// Per-session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound for each external call.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

/// One analyzer/resolver/scanner cycle with its results.
///
/// Analysis errors are kept inline ([`Self::last_error`]); resolution and
/// vulnerability problems are queued as [`Notice`]s for the caller to drain.
pub struct AnalysisSession {
    analyzer: ManifestAnalyzer,
    tree_source: Arc<dyn TreeSource>,
    scanner: VulnerabilityScanner,
    config: SessionConfig,
    resolver: TreeResolver,
    analysis: Option<ManifestAnalysis>,
    last_error: Option<AnalysisError>,
    vulnerabilities: Option<VulnerabilityReport>,
    notices: Vec<Notice>,
}

impl AnalysisSession {
    pub fn new(
        tree_source: Arc<dyn TreeSource>,
        vulnerability_source: Arc<dyn VulnerabilitySource>,
        config: SessionConfig,
    ) -> Self {
        Self {
            analyzer: ManifestAnalyzer::new(),
            resolver: TreeResolver::new(tree_source.clone(), config.timeout),
            scanner: VulnerabilityScanner::new(vulnerability_source, config.timeout),
            tree_source,
            config,
            analysis: None,
            last_error: None,
            vulnerabilities: None,
            notices: Vec::new(),
        }
    }

    /// Analyzes manifest text, replacing all earlier results.
    ///
    /// The resolver cache is rebuilt either way. On failure the previous
    /// analysis is dropped and the error is kept in [`Self::last_error`].
    pub fn analyze(&mut self, text: &str) -> Result<&ManifestAnalysis, &AnalysisError> {
        self.reset_results();
        match self.analyzer.analyze(text) {
            Ok(analysis) => Ok(self.store(analysis)),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Analyzes the manifest, then checks its packages for vulnerabilities.
    ///
    /// Only an analysis failure is returned as an error; a failed
    /// vulnerability check leaves an empty report and a warning notice.
    pub async fn analyze_and_check(
        &mut self,
        text: &str,
    ) -> Result<&ManifestAnalysis, &AnalysisError> {
        self.reset_results();
        match self.analyzer.analyze(text) {
            Ok(analysis) => {
                let report = self.scanner.check(&analysis.packages).await;
                self.record_report(report);
                Ok(self.store(analysis))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn reset_results(&mut self) {
        self.reset_resolver();
        self.vulnerabilities = None;
    }

    fn store(&mut self, analysis: ManifestAnalysis) -> &ManifestAnalysis {
        self.last_error = None;
        self.analysis.insert(analysis)
    }

    fn fail(&mut self, err: AnalysisError) -> &AnalysisError {
        self.analysis = None;
        self.last_error.insert(err)
    }

    /// Resolves the dependency tree of a package from the current analysis.
    ///
    /// Failures are returned and also queued as a single error notice.
    pub async fn select_package(&mut self, name: &str) -> Result<Arc<DependencyNode>, ResolutionError> {
        let result = match self.analysis.as_ref().and_then(|a| a.find(name)).cloned() {
            Some(descriptor) => self.resolver.resolve(&descriptor).await,
            None => Err(ResolutionError::UnknownPackage(name.to_string())),
        };

        if let Err(err) = &result {
            warn!(package = name, error = %err, "dependency tree resolution failed");
            self.notices.push(Notice::new(NoticeLevel::Error, err.to_string()));
        }
        result
    }

    /// Checks the analyzed packages for known vulnerabilities.
    ///
    /// Without an analysis there is nothing to check and an empty report is
    /// returned.
    pub async fn check_vulnerabilities(&mut self) -> &VulnerabilityReport {
        let report = match &self.analysis {
            Some(analysis) => self.scanner.check(&analysis.packages).await,
            None => VulnerabilityReport::default(),
        };
        self.record_report(report)
    }

    fn record_report(&mut self, report: VulnerabilityReport) -> &VulnerabilityReport {
        if let Some(err) = &report.degraded {
            self.notices.push(Notice::new(NoticeLevel::Warning, err.to_string()));
        } else if !report.is_empty() {
            self.notices.push(Notice::new(
                NoticeLevel::Info,
                format!("Found {} vulnerabilities", report.len()),
            ));
        }
        self.vulnerabilities.insert(report)
    }

    /// Discards all analyzer and resolver state.
    pub fn clear(&mut self) {
        self.reset_resolver();
        self.analysis = None;
        self.last_error = None;
        self.vulnerabilities = None;
        self.notices.clear();
    }

    fn reset_resolver(&mut self) {
        self.resolver.cancel();
        self.resolver = TreeResolver::new(self.tree_source.clone(), self.config.timeout);
    }

    pub fn analysis(&self) -> Option<&ManifestAnalysis> {
        self.analysis.as_ref()
    }

    pub fn last_error(&self) -> Option<&AnalysisError> {
        self.last_error.as_ref()
    }

    pub fn vulnerabilities(&self) -> Option<&VulnerabilityReport> {
        self.vulnerabilities.as_ref()
    }

    /// A handle to the current resolver, for resolving outside `&mut self`.
    ///
    /// The handle is invalidated (cancelled) by the next `analyze` or `clear`.
    pub fn resolver(&self) -> TreeResolver {
        self.resolver.clone()
    }

    /// Drains queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{ScriptedTreeSource, StaticVulnerabilitySource};
    use crate::source::{Advisory, PackageVulnerabilities, Severity};

    const MANIFEST: &str = r#"{
        "name": "shop",
        "dependencies": {"express": "^4.18.2", "a": "1.0.0"},
        "devDependencies": {"jest": "^29.0.0"}
    }"#;

    fn session_with(tree: ScriptedTreeSource, vulns: StaticVulnerabilitySource) -> AnalysisSession {
        AnalysisSession::new(Arc::new(tree), Arc::new(vulns), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_analyze_then_select() {
        let tree = DependencyNode::new("express", "4.18.2").with_child(DependencyNode::new("accepts", "1.3.8"));
        let mut session = session_with(
            ScriptedTreeSource::new().reply(tree),
            StaticVulnerabilitySource::empty(),
        );

        let analysis = session.analyze(MANIFEST).unwrap();
        assert_eq!(analysis.total, 3);

        let tree = session.select_package("express").await.unwrap();
        assert_eq!(tree.children[0].depth, 1);
        assert!(session.resolver().cache().contains("express"));
        assert!(session.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_package_notifies() {
        let mut session = session_with(ScriptedTreeSource::new(), StaticVulnerabilitySource::empty());
        session.analyze(MANIFEST).unwrap();

        let err = session.select_package("left-pad").await.unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownPackage(_)));

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_resolution_failure_keeps_analysis() {
        let mut session = session_with(
            ScriptedTreeSource::new().fail("503"),
            StaticVulnerabilitySource::empty(),
        );
        session.analyze(MANIFEST).unwrap();

        assert!(session.select_package("a").await.is_err());
        assert!(session.analysis().is_some());
        assert_eq!(session.take_notices().len(), 1);
        assert!(session.resolver().cache().is_empty());
    }

    #[tokio::test]
    async fn test_failed_vulnerability_check_does_not_fail_analysis() {
        let mut session = session_with(ScriptedTreeSource::new(), StaticVulnerabilitySource::failing());

        let analysis = session.analyze_and_check(MANIFEST).await.unwrap();
        assert_eq!(analysis.total, 3);

        let report = session.vulnerabilities().unwrap();
        assert!(report.is_empty());
        assert!(report.is_degraded());

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_analyze_and_check_reports_vulnerabilities() {
        let vulns = StaticVulnerabilitySource::with(vec![PackageVulnerabilities {
            package: "express".to_string(),
            vulnerabilities: vec![Advisory {
                severity: Severity::Moderate,
                title: "Open redirect".to_string(),
                description: String::new(),
                id: "CVE-2024-29041".to_string(),
                references: Vec::new(),
            }],
        }]);
        let mut session = session_with(ScriptedTreeSource::new(), vulns);

        session.analyze_and_check(MANIFEST).await.unwrap();

        assert_eq!(session.vulnerabilities().unwrap().len(), 1);
        assert_eq!(session.take_notices()[0].level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn test_analyze_error_is_inline_and_drops_previous_result() {
        let mut session = session_with(ScriptedTreeSource::new(), StaticVulnerabilitySource::empty());
        session.analyze(MANIFEST).unwrap();

        assert!(matches!(
            session.analyze(r#"{"name":"p"}"#),
            Err(AnalysisError::NoDependencies)
        ));
        assert!(session.analysis().is_none());
        assert!(session.last_error().is_some());
        assert!(session.take_notices().is_empty());

        assert!(matches!(
            session.analyze_and_check("{oops").await,
            Err(AnalysisError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_reanalyze_invalidates_cache() {
        let mut session = session_with(
            ScriptedTreeSource::new()
                .reply(DependencyNode::new("a", "1.0.0"))
                .reply(DependencyNode::new("a", "1.0.1")),
            StaticVulnerabilitySource::empty(),
        );
        session.analyze(MANIFEST).unwrap();
        session.select_package("a").await.unwrap();

        session.analyze(MANIFEST).unwrap();
        assert!(session.resolver().cache().is_empty());
        assert_eq!(session.select_package("a").await.unwrap().version, "1.0.1");
    }

    #[tokio::test]
    async fn test_clear_then_late_response_does_not_populate_new_cache() {
        let (source, gate) = ScriptedTreeSource::gated();
        let source = Arc::new(source.reply(DependencyNode::new("a", "1.0.0")));
        let mut session = AnalysisSession::new(
            source.clone(),
            Arc::new(StaticVulnerabilitySource::empty()),
            SessionConfig::default(),
        );
        session.analyze(MANIFEST).unwrap();

        let stale = session.resolver();
        let descriptor = session.analysis().unwrap().find("a").unwrap().clone();
        let handle = tokio::spawn(async move { stale.resolve(&descriptor).await });
        while source.calls() == 0 {
            tokio::task::yield_now().await;
        }

        session.clear();
        gate.add_permits(1);

        assert!(matches!(
            handle.await.unwrap(),
            Err(ResolutionError::Cancelled(_))
        ));
        assert!(session.resolver().cache().is_empty());
        assert!(!session.resolver().is_cancelled());
        assert!(session.analysis().is_none());
    }
}
