//! HTTP implementation of the tree and vulnerability sources.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{
    PackageQuery, PackageVulnerabilities, SourceError, TreeRoot, TreeSource, VulnerabilitySource,
};
use crate::config::Config;
use crate::graph::DependencyNode;

#[derive(Serialize)]
struct PackagesRequest<'a, T> {
    packages: &'a [T],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeResponse {
    #[serde(default)]
    dependency_trees: Vec<DependencyNode>,
}

#[derive(Deserialize)]
struct VulnerabilityResponse {
    #[serde(default)]
    vulnerabilities: Vec<PackageVulnerabilities>,
}

/// Talks to the dependency-tree and vulnerability endpoints over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    tree_endpoint: Url,
    vulnerability_endpoint: Url,
}

impl HttpSource {
    /// Creates a source with its own `reqwest::Client`.
    ///
    /// `timeout` bounds each whole request, connect through body.
    pub fn new(
        tree_endpoint: Url,
        vulnerability_endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("depscope/", env!("CARGO_PKG_VERSION"))),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            tree_endpoint,
            vulnerability_endpoint,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(
            config.tree_endpoint.clone(),
            config.vulnerability_endpoint.clone(),
            config.timeout(),
        )
    }

    async fn post<B, R>(&self, url: &Url, body: &B) -> Result<R, SourceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(%url, "POST");
        let response = self.client.post(url.clone()).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TreeSource for HttpSource {
    async fn fetch_trees(&self, roots: &[TreeRoot]) -> Result<Vec<DependencyNode>, SourceError> {
        let response: TreeResponse = self
            .post(&self.tree_endpoint, &PackagesRequest { packages: roots })
            .await?;
        Ok(response.dependency_trees)
    }
}

#[async_trait]
impl VulnerabilitySource for HttpSource {
    async fn fetch_vulnerabilities(
        &self,
        packages: &[PackageQuery],
    ) -> Result<Vec<PackageVulnerabilities>, SourceError> {
        let response: VulnerabilityResponse = self
            .post(&self.vulnerability_endpoint, &PackagesRequest { packages })
            .await?;
        Ok(response.vulnerabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Severity;

    #[test]
    fn test_tree_request_body() {
        let roots = vec![TreeRoot {
            name: "react".to_string(),
            version: "^18.2.0".to_string(),
            is_dev: false,
            is_peer: true,
        }];
        let body = serde_json::to_value(PackagesRequest { packages: &roots }).unwrap();

        assert_eq!(body["packages"][0]["name"], "react");
        assert_eq!(body["packages"][0]["isPeer"], true);
    }

    #[test]
    fn test_tree_response_decode() {
        let json = r#"{
            "dependencyTrees": [
                {"name": "a", "version": "1.0.0", "depth": 0,
                 "children": [{"name": "b", "version": "2.0.0", "depth": 1}]}
            ]
        }"#;
        let response: TreeResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.dependency_trees.len(), 1);
        assert_eq!(response.dependency_trees[0].children[0].name, "b");
    }

    #[test]
    fn test_vulnerability_response_decode() {
        let json = r#"{
            "vulnerabilities": [
                {"package": "lodash", "vulnerabilities": [
                    {"severity": "high", "title": "Prototype Pollution", "description": "d",
                     "id": "CVE-2020-8203", "references": ["https://nvd.nist.gov/vuln/detail/CVE-2020-8203"]}
                ]},
                {"package": "react", "vulnerabilities": []}
            ]
        }"#;
        let response: VulnerabilityResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.vulnerabilities.len(), 2);
        assert_eq!(response.vulnerabilities[0].vulnerabilities[0].severity, Severity::High);
    }

    #[test]
    fn test_empty_response_object_decodes() {
        let response: TreeResponse = serde_json::from_str("{}").unwrap();
        assert!(response.dependency_trees.is_empty());
    }

    #[test]
    fn test_new_from_config() {
        let source = HttpSource::from_config(&Config::defaults().unwrap()).unwrap();
        assert_eq!(source.tree_endpoint.path(), "/api/dependency-tree");
    }
}
