//! Dependency tree resolution.
//!
//! [`TreeResolver`] resolves one root package at a time against a
//! [`TreeSource`], normalizes the returned tree and memoizes it in a
//! [`TreeCache`] keyed by package name.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use depscope::resolver::TreeResolver;
//!
//! let resolver = TreeResolver::new(Arc::new(source), Duration::from_secs(30));
//! let tree = resolver.resolve(&descriptor).await?;
//! println!("{} nodes", tree.node_count());
//! ```

pub mod cache;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::graph::DependencyNode;
use crate::parser::PackageDescriptor;
use crate::source::{SourceError, TreeRoot, TreeSource};

pub use cache::TreeCache;

/// Errors returned by [`TreeResolver::resolve`].
///
/// None of these are cached: the next request for the same name goes back
/// to the source.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Package '{0}' is not part of the analyzed manifest")]
    UnknownPackage(String),

    #[error("Failed to fetch dependency tree for '{package}': {source}")]
    Source {
        package: String,
        #[source]
        source: SourceError,
    },

    #[error("Dependency tree source returned no tree for '{0}'")]
    EmptyResponse(String),

    #[error("Timed out after {timeout:?} resolving '{package}'")]
    Timeout { package: String, timeout: Duration },

    #[error("Resolution of '{0}' was cancelled")]
    Cancelled(String),
}

/// Resolves and memoizes dependency trees.
///
/// Cloning is cheap and shares the source, the cache and the cancellation
/// token, so clones can resolve different packages concurrently.
#[derive(Clone)]
pub struct TreeResolver {
    source: Arc<dyn TreeSource>,
    cache: Arc<TreeCache>,
    cancel: CancellationToken,
    timeout: Duration,
}

impl fmt::Debug for TreeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeResolver")
            .field("cached", &self.cache.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TreeResolver {
    /// Creates a resolver with an empty cache and a fresh cancellation token.
    pub fn new(source: Arc<dyn TreeSource>, timeout: Duration) -> Self {
        Self {
            source,
            cache: Arc::new(TreeCache::new()),
            cancel: CancellationToken::new(),
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<TreeCache> {
        &self.cache
    }

    pub fn cached(&self, name: &str) -> Option<Arc<DependencyNode>> {
        self.cache.get(name)
    }

    /// Cancels every in-flight and future resolution on this resolver and
    /// its clones. Cancelled calls never write to the cache.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves the tree rooted at `root`.
    ///
    /// A cached tree for the same name is returned as is, whatever version
    /// range is requested. On a miss the source is asked for exactly one
    /// root; the first tree it returns is normalized (depth, cycle flags,
    /// dev/peer tags) and cached before being returned.
    pub async fn resolve(
        &self,
        root: &PackageDescriptor,
    ) -> Result<Arc<DependencyNode>, ResolutionError> {
        if let Some(tree) = self.cache.get(&root.name) {
            debug!(package = %root.name, "dependency tree cache hit");
            return Ok(tree);
        }
        if self.cancel.is_cancelled() {
            return Err(ResolutionError::Cancelled(root.name.clone()));
        }

        debug!(package = %root.name, version = %root.version, "resolving dependency tree");
        let request = [TreeRoot::from(root)];
        let fetch = tokio::time::timeout(self.timeout, self.source.fetch_trees(&request));

        let trees = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(ResolutionError::Cancelled(root.name.clone()));
            }
            result = fetch => match result {
                Ok(Ok(trees)) => trees,
                Ok(Err(source)) => {
                    return Err(ResolutionError::Source {
                        package: root.name.clone(),
                        source,
                    });
                }
                Err(_elapsed) => {
                    return Err(ResolutionError::Timeout {
                        package: root.name.clone(),
                        timeout: self.timeout,
                    });
                }
            },
        };

        let mut tree = trees
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::EmptyResponse(root.name.clone()))?;
        tree.normalize(root.is_dev(), root.is_peer());
        let tree = Arc::new(tree);

        if self.cancel.is_cancelled() {
            return Err(ResolutionError::Cancelled(root.name.clone()));
        }
        self.cache.insert(root.name.clone(), tree.clone());

        let stats = tree.stats();
        info!(
            package = %root.name,
            nodes = stats.nodes,
            max_depth = stats.max_depth,
            circular = stats.circular,
            "resolved dependency tree"
        );
        Ok(tree)
    }
}
