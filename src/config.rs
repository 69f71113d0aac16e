// Copyright (c) 2025 - Cowboy AI, Inc.

//! Collaborator configuration
//!
//! Every external collaborator gets an explicit config struct that is built
//! once at process start and handed to the client that needs it. Each has a
//! `Default` suitable for local development and a `from_env()` constructor.
//!
//! | Variable | Used by |
//! |----------|---------|
//! | `NETBOX_URL`, `NETBOX_TOKEN`, `NETBOX_TIMEOUT_SECS`, `NETBOX_VERIFY_TLS` | [`NetBoxConfig`] |
//! | `GITLAB_URL`, `GITLAB_TOKEN`, `GITLAB_PROJECT_ID`, `SITE_SERVICE`, `VPN_SERVICE` | [`GitLabConfig`] |
//! | `PUBLISH_AUTHOR_NAME`, `PUBLISH_AUTHOR_EMAIL` | [`PublisherConfig`] |
//! | `SERVICE_DB_URL` | [`ServiceDbConfig`] |
//! | `INTENT_ROOT`, `SCHEMA_DIR` | [`PathsConfig`] |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Environment variable {var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::Missing(var))
}

fn optional(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// NetBox inventory connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxConfig {
    /// NetBox base URL (e.g., "https://netbox.example.com")
    pub base_url: String,

    /// API token for authentication
    pub api_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Verify the server certificate
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

impl Default for NetBoxConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token: String::new(),
            timeout_secs: default_timeout(),
            verify_tls: default_verify_tls(),
        }
    }
}

impl NetBoxConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: optional("NETBOX_URL").unwrap_or(defaults.base_url),
            api_token: required("NETBOX_TOKEN")?,
            timeout_secs: parsed("NETBOX_TIMEOUT_SECS", defaults.timeout_secs)?,
            verify_tls: parsed("NETBOX_VERIFY_TLS", defaults.verify_tls)?,
        })
    }
}

/// GitLab project holding the service intent files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabConfig {
    pub base_url: String,
    pub private_token: String,
    /// Numeric id or `group/project` path
    pub project_id: String,
    /// Repository path of the site service document
    pub site_service_path: String,
    /// Repository path of the VPN service document
    pub vpn_service_path: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gitlab.com".to_string(),
            private_token: String::new(),
            project_id: String::new(),
            site_service_path: "services/sites.json".to_string(),
            vpn_service_path: "services/vpns.json".to_string(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GitLabConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: optional("GITLAB_URL").unwrap_or(defaults.base_url),
            private_token: required("GITLAB_TOKEN")?,
            project_id: required("GITLAB_PROJECT_ID")?,
            site_service_path: optional("SITE_SERVICE").unwrap_or(defaults.site_service_path),
            vpn_service_path: optional("VPN_SERVICE").unwrap_or(defaults.vpn_service_path),
            timeout_secs: defaults.timeout_secs,
        })
    }
}

/// Identity and naming used by the change publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Branch that review requests target
    pub trunk: String,
    /// Prefix of generated branch names
    pub branch_prefix: String,
    pub author_name: String,
    pub author_email: String,
    pub site_commit_message: String,
    pub vpn_commit_message: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            trunk: "main".to_string(),
            branch_prefix: "services_".to_string(),
            author_name: "service-api".to_string(),
            author_email: "service-api@localhost".to_string(),
            site_commit_message: "site service update by service-api".to_string(),
            vpn_commit_message: "vpn service update by service-api".to_string(),
        }
    }
}

impl PublisherConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            author_name: optional("PUBLISH_AUTHOR_NAME").unwrap_or(defaults.author_name.clone()),
            author_email: optional("PUBLISH_AUTHOR_EMAIL").unwrap_or(defaults.author_email.clone()),
            ..defaults
        }
    }
}

/// Read-only RESTCONF view of the service database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDbConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceDbConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ServiceDbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: required("SERVICE_DB_URL")?,
            ..Self::default()
        })
    }
}

/// Local filesystem layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root holding `services/` inputs and compiled artifacts
    pub intent_root: PathBuf,
    /// Directory holding the schemas and their `modules/`
    pub schema_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            intent_root: PathBuf::from("."),
            schema_dir: PathBuf::from("schemas"),
        }
    }
}

impl PathsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            intent_root: optional("INTENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.intent_root),
            schema_dir: optional("SCHEMA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.schema_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netbox_config_default() {
        let config = NetBoxConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_netbox_config_serde_defaults() {
        let config: NetBoxConfig = serde_json::from_str(
            r#"{"base_url": "https://netbox.example.com", "api_token": "abc"}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_publisher_defaults() {
        let config = PublisherConfig::default();
        assert_eq!(config.trunk, "main");
        assert_eq!(config.branch_prefix, "services_");
    }

    #[test]
    fn test_missing_error_names_variable() {
        assert_eq!(
            ConfigError::Missing("NETBOX_TOKEN").to_string(),
            "Required environment variable NETBOX_TOKEN is not set"
        );
    }
}
