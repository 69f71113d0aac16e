// Copyright (c) 2025 - Cowboy AI, Inc.

//! GitLab Version Control
//!
//! [`VersionControl`] over the GitLab REST API (v4).
//!
//! ```text
//! create_branch         POST /api/v4/projects/:id/repository/branches
//! get_file              GET  /api/v4/projects/:id/repository/files/:path?ref=
//! save_file             POST|PUT /api/v4/projects/:id/repository/files/:path
//! create_merge_request  POST /api/v4/projects/:id/merge_requests
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{CommitAction, FileCommit, MergeRequest, MergeRequestState, VcsError, VersionControl};
use crate::config::GitLabConfig;

#[derive(Debug, Deserialize)]
struct RepositoryFile {
    content: String,
    #[serde(default)]
    encoding: String,
}

impl RepositoryFile {
    fn decode(self) -> Result<String, VcsError> {
        if self.encoding != "base64" {
            return Ok(self.content);
        }
        let compact: String = self.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| VcsError::Malformed(format!("file content is not base64: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| VcsError::Malformed(format!("file content is not UTF-8: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct FileUpdate<'a> {
    branch: &'a str,
    content: &'a str,
    commit_message: &'a str,
    author_name: &'a str,
    author_email: &'a str,
    encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct NewMergeRequest<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    remove_source_branch: bool,
}

#[derive(Debug, Deserialize)]
struct MergeRequestResponse {
    state: String,
    #[serde(default)]
    iid: Option<u64>,
    #[serde(default)]
    web_url: Option<String>,
}

/// GitLab-backed [`VersionControl`]
pub struct GitLabClient {
    config: GitLabConfig,
    client: Client,
}

impl GitLabClient {
    pub fn new(config: GitLabConfig) -> Result<Self, VcsError> {
        info!("Using GitLab project {} at {}", config.project_id, config.base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::HeaderName::from_static("private-token"),
                    config
                        .private_token
                        .parse()
                        .map_err(|e| VcsError::Transport(format!("Invalid private token: {}", e)))?,
                );
                headers
            })
            .build()
            .map_err(|e| VcsError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn project_url(&self, suffix: &str) -> String {
        format!(
            "{}/api/v4/projects/{}{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.project_id),
            suffix
        )
    }

    fn file_url(&self, path: &str) -> String {
        self.project_url(&format!("/repository/files/{}", urlencoding::encode(path)))
    }

    async fn check(response: Response) -> Result<Response, VcsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(VcsError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn transport(e: reqwest::Error) -> VcsError {
    VcsError::Transport(format!("GitLab API error: {}", e))
}

#[async_trait]
impl VersionControl for GitLabClient {
    async fn create_branch(&self, branch: &str, source_ref: &str) -> Result<(), VcsError> {
        let response = self
            .client
            .post(self.project_url("/repository/branches"))
            .query(&[("branch", branch), ("ref", source_ref)])
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        debug!("GitLab branch {} created from {}", branch, source_ref);
        Ok(())
    }

    async fn get_file(&self, path: &str, git_ref: &str) -> Result<Option<String>, VcsError> {
        let response = self
            .client
            .get(self.file_url(path))
            .query(&[("ref", git_ref)])
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} does not exist on {}", path, git_ref);
            return Ok(None);
        }

        let file: RepositoryFile = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| VcsError::Malformed(e.to_string()))?;
        file.decode().map(Some)
    }

    async fn save_file(&self, commit: &FileCommit) -> Result<(), VcsError> {
        let url = self.file_url(&commit.path);
        let request = match commit.action {
            CommitAction::Create => self.client.post(url),
            CommitAction::Update => self.client.put(url),
        };
        let body = FileUpdate {
            branch: &commit.branch,
            content: &commit.content,
            commit_message: &commit.message,
            author_name: &commit.author_name,
            author_email: &commit.author_email,
            encoding: "text",
        };

        let response = request.json(&body).send().await.map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_merge_request(
        &self,
        request: &MergeRequest,
    ) -> Result<MergeRequestState, VcsError> {
        let body = NewMergeRequest {
            source_branch: &request.source_branch,
            target_branch: &request.target_branch,
            title: &request.title,
            remove_source_branch: request.remove_source_branch,
        };
        let response = self
            .client
            .post(self.project_url("/merge_requests"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let created: MergeRequestResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| VcsError::Malformed(e.to_string()))?;
        Ok(MergeRequestState {
            state: created.state,
            iid: created.iid,
            web_url: created.web_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitLabClient {
        GitLabClient::new(GitLabConfig {
            base_url: "https://gitlab.example.com/".to_string(),
            private_token: "glpat-test".to_string(),
            project_id: "netops/services".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_file_url_encodes_project_and_path() {
        assert_eq!(
            client().file_url("services/sites.json"),
            "https://gitlab.example.com/api/v4/projects/netops%2Fservices/repository/files/services%2Fsites.json"
        );
    }

    #[test]
    fn test_decode_base64_file() {
        let file = RepositoryFile {
            content: STANDARD.encode("{\n    \"vpn-service:vpns\": []\n}"),
            encoding: "base64".to_string(),
        };
        assert_eq!(file.decode().unwrap(), "{\n    \"vpn-service:vpns\": []\n}");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let file = RepositoryFile {
            content: "***".to_string(),
            encoding: "base64".to_string(),
        };
        assert!(matches!(file.decode(), Err(VcsError::Malformed(_))));
    }
}
