//! In-memory sources for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{
    PackageQuery, PackageVulnerabilities, SourceError, TreeRoot, TreeSource, VulnerabilitySource,
};
use crate::graph::DependencyNode;

type TreeReply = Result<Vec<DependencyNode>, String>;

/// Replies to successive calls from a script; an exhausted script fails.
#[derive(Default)]
pub(crate) struct ScriptedTreeSource {
    replies: Mutex<VecDeque<TreeReply>>,
    requests: Mutex<Vec<Vec<TreeRoot>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTreeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call consumes one permit of the returned semaphore before
    /// replying; it starts with none.
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let source = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (source, gate)
    }

    pub(crate) fn reply(self, tree: DependencyNode) -> Self {
        self.push(Ok(vec![tree]));
        self
    }

    pub(crate) fn reply_many(self, trees: Vec<DependencyNode>) -> Self {
        self.push(Ok(trees));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.push(Err(message.to_string()));
        self
    }

    fn push(&self, reply: TreeReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<Vec<TreeRoot>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TreeSource for ScriptedTreeSource {
    async fn fetch_trees(&self, roots: &[TreeRoot]) -> Result<Vec<DependencyNode>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(roots.to_vec());

        // Take the reply before waiting so concurrent callers keep call order.
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        match reply {
            Some(Ok(trees)) => Ok(trees),
            Some(Err(message)) => Err(SourceError::Unavailable(message)),
            None => Err(SourceError::Unavailable("script exhausted".to_string())),
        }
    }
}

/// Returns a fixed vulnerability reply, or fails when built with `failing`.
pub(crate) struct StaticVulnerabilitySource {
    reply: Option<Vec<PackageVulnerabilities>>,
    queries: Mutex<Vec<Vec<PackageQuery>>>,
}

impl StaticVulnerabilitySource {
    pub(crate) fn with(reply: Vec<PackageVulnerabilities>) -> Self {
        Self {
            reply: Some(reply),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::with(Vec::new())
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queries(&self) -> Vec<Vec<PackageQuery>> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl VulnerabilitySource for StaticVulnerabilitySource {
    async fn fetch_vulnerabilities(
        &self,
        packages: &[PackageQuery],
    ) -> Result<Vec<PackageVulnerabilities>, SourceError> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(packages.to_vec());

        self.reply
            .clone()
            .ok_or_else(|| SourceError::Unavailable("vulnerability service down".to_string()))
    }
}
