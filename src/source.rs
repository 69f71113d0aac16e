// Copyright (c) 2025 - Cowboy AI, Inc.
//! Intent Sources
//!
//! Where the site and VPN documents come from. Both documents are always
//! returned with their namespaced keys (`site-service:sites`,
//! `vpn-service:vpns`), whatever the source stores.
//!
//! - [`FileIntentSource`]: `services/sites.json` and `services/vpns.json`
//!   under a local root
//! - [`RestconfIntentSource`]: read-only RESTCONF view of the service
//!   database (`restconf` feature)

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::domain::merge_documents;
#[cfg(feature = "restconf")]
use crate::store::to_external_keys;
use crate::store::PersistenceError;

/// Failure to obtain an intent document
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("Cannot read intent file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Intent document {document} is not valid JSON: {source}")]
    Parse {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Service database error: {0}")]
    Transport(String),

    #[error("Intent document {document} has conflicting keys: {source}")]
    Conflict {
        document: String,
        #[source]
        source: PersistenceError,
    },
}

/// Result type for intent sources
pub type IntentResult<T> = Result<T, IntentError>;

/// Provider of the two intent documents
#[async_trait]
pub trait IntentSource: Send + Sync {
    /// Document holding `site-service:sites`
    async fn site_document(&self) -> IntentResult<Value>;

    /// Document holding `vpn-service:vpns`
    async fn vpn_document(&self) -> IntentResult<Value>;

    /// Both documents merged into one service document
    async fn service_document(&self) -> IntentResult<Value> {
        let sites = self.site_document().await?;
        let vpns = self.vpn_document().await?;
        Ok(merge_documents(&sites, &vpns))
    }
}

/// Intent files on the local filesystem
#[derive(Debug, Clone)]
pub struct FileIntentSource {
    site_path: PathBuf,
    vpn_path: PathBuf,
}

impl FileIntentSource {
    /// `services/sites.json` and `services/vpns.json` under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let services = root.as_ref().join("services");
        Self {
            site_path: services.join("sites.json"),
            vpn_path: services.join("vpns.json"),
        }
    }

    pub fn with_paths(site_path: impl Into<PathBuf>, vpn_path: impl Into<PathBuf>) -> Self {
        Self {
            site_path: site_path.into(),
            vpn_path: vpn_path.into(),
        }
    }

    async fn read(path: &Path) -> IntentResult<Value> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| IntentError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Read intent document {}", path.display());
        serde_json::from_str(&raw).map_err(|source| IntentError::Parse {
            document: path.display().to_string(),
            source,
        })
    }
}

#[async_trait]
impl IntentSource for FileIntentSource {
    async fn site_document(&self) -> IntentResult<Value> {
        Self::read(&self.site_path).await
    }

    async fn vpn_document(&self) -> IntentResult<Value> {
        Self::read(&self.vpn_path).await
    }
}

#[cfg(feature = "restconf")]
pub use restconf::RestconfIntentSource;

#[cfg(feature = "restconf")]
mod restconf {
    use super::*;
    use crate::config::ServiceDbConfig;
    use reqwest::Client;
    use std::time::Duration;
    use tracing::info;

    /// RESTCONF view of the service database
    ///
    /// The database answers with plain `sites` / `vpns` keys; they are renamed
    /// to the namespaced form on the way in.
    pub struct RestconfIntentSource {
        config: ServiceDbConfig,
        client: Client,
    }

    impl RestconfIntentSource {
        pub fn new(config: ServiceDbConfig) -> IntentResult<Self> {
            info!("Using service database at {}", config.base_url);
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| {
                    IntentError::Transport(format!("Failed to create HTTP client: {}", e))
                })?;
            Ok(Self { config, client })
        }

        pub(super) fn resource_url(&self, resource: &str) -> String {
            format!(
                "{}/restconf/data/{}",
                self.config.base_url.trim_end_matches('/'),
                resource
            )
        }

        async fn fetch(&self, resource: &str) -> IntentResult<Value> {
            let url = self.resource_url(resource);
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/yang-data+json")
                .send()
                .await
                .map_err(|e| IntentError::Transport(format!("GET {}: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(IntentError::Transport(format!(
                    "GET {} returned {}: {}",
                    url, status, body
                )));
            }

            let document: Value = response
                .json()
                .await
                .map_err(|e| IntentError::Transport(format!("GET {}: {}", url, e)))?;
            to_external_keys(document).map_err(|source| IntentError::Conflict {
                document: url,
                source,
            })
        }
    }

    #[async_trait]
    impl IntentSource for RestconfIntentSource {
        async fn site_document(&self) -> IntentResult<Value> {
            self.fetch("site-service:sites").await
        }

        async fn vpn_document(&self) -> IntentResult<Value> {
            self.fetch("vpn-service:vpns").await
        }
    }
}
