//! OCI registry upstreams
//!
//! A package upstream such as `oci://registry.example.com/charts/nginx:1.2.0`
//! points at one chart version. Pulling downloads the chart content layer
//! and unpacks it into the package's working directory.

use oci_distribution::Reference;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use std::path::Path;

use charts_build_core::extract_archive_bytes;

use crate::error::{RepoError, Result};

/// Media types for Helm charts in OCI
pub mod media_types {
    /// Helm chart config
    pub const HELM_CONFIG: &str = "application/vnd.cncf.helm.config.v1+json";
    /// Helm chart content layer
    pub const HELM_CONTENT: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";
}

/// Chart upstream stored in an OCI registry
pub struct OciUpstream {
    url: String,
    reference: Reference,
    client: Client,
    auth: RegistryAuth,
}

impl std::fmt::Debug for OciUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OciUpstream").field("url", &self.url).finish()
    }
}

impl OciUpstream {
    /// Create an upstream for `url` (`oci://registry/repo:tag`)
    ///
    /// A tag is required: an upstream always names one chart version.
    pub fn new(url: &str) -> Result<Self> {
        let parsed = OciReference::parse(url)?;
        if parsed.tag.is_none() && parsed.digest.is_none() {
            return Err(RepoError::InvalidOciReference {
                reference: format!("{}: missing chart version tag", url),
            });
        }
        let reference = Reference::try_from(parsed.to_oci_string().as_str()).map_err(|e| {
            RepoError::InvalidOciReference {
                reference: format!("{}: {}", url, e),
            }
        })?;
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };
        Ok(Self {
            url: url.to_string(),
            reference,
            client: Client::new(config),
            auth: RegistryAuth::Anonymous,
        })
    }

    /// Authenticate with username and password
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = RegistryAuth::Basic(username.into(), password.into());
        self
    }

    /// Upstream URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the packaged chart
    pub async fn pull(&self) -> Result<Vec<u8>> {
        tracing::info!(url = %self.url, "pulling from upstream");

        let image_data = self
            .client
            .pull(
                &self.reference,
                &self.auth,
                vec![media_types::HELM_CONFIG, media_types::HELM_CONTENT],
            )
            .await
            .map_err(|e| RepoError::Oci {
                message: format!("Failed to pull {}: {}", self.url, e),
            })?;

        let chart_layer = image_data
            .layers
            .iter()
            .find(|l| l.media_type == media_types::HELM_CONTENT)
            .ok_or_else(|| RepoError::Oci {
                message: format!("No chart content layer found in {}", self.url),
            })?;

        Ok(chart_layer.data.clone())
    }

    /// Pull the chart and unpack it into `dest`
    pub async fn pull_to(&self, dest: &Path) -> Result<()> {
        let data = self.pull().await?;
        extract_archive_bytes(&data, dest, true)?;
        Ok(())
    }
}

/// OCI reference helper
#[derive(Debug, Clone, PartialEq)]
pub struct OciReference {
    pub registry: String,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl OciReference {
    /// Parse an OCI reference string
    pub fn parse(s: &str) -> Result<Self> {
        let clean = s
            .trim_start_matches("oci://")
            .trim_start_matches("https://")
            .trim_start_matches("http://");

        let (registry, rest) =
            clean
                .split_once('/')
                .ok_or_else(|| RepoError::InvalidOciReference {
                    reference: s.to_string(),
                })?;
        if registry.is_empty() || rest.is_empty() {
            return Err(RepoError::InvalidOciReference {
                reference: s.to_string(),
            });
        }

        let (repo_tag, digest) = match rest.rsplit_once('@') {
            Some((repo_tag, digest)) => (repo_tag, Some(digest.to_string())),
            None => (rest, None),
        };

        let (repository, tag) = match repo_tag.rsplit_once(':') {
            Some((r, t)) => (r.to_string(), Some(t.to_string())),
            None => (repo_tag.to_string(), None),
        };

        Ok(Self {
            registry: registry.to_string(),
            repository,
            tag,
            digest,
        })
    }

    /// Convert to string representation
    pub fn to_oci_string(&self) -> String {
        let mut s = format!("{}/{}", self.registry, self.repository);
        if let Some(tag) = &self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }

    /// Last path segment of the repository, i.e. the chart name
    pub fn chart_name(&self) -> &str {
        self.repository
            .rsplit('/')
            .next()
            .unwrap_or(&self.repository)
    }
}
