// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Publisher
//!
//! Proposes the current service intent to the version-controlled source of
//! truth as a review request:
//!
//! ```text
//! Idle ──create branch──▶ BranchCreated ──commit changed files──▶ FilesStaged
//!   ──open merge request──▶ RequestOpened ──▶ Done
//!
//! any failing remote call ──▶ Failed
//! ```
//!
//! The stages are driven through [`PublishStage`] so every attempt leaves a
//! transition history behind. Nothing is retried.

#[cfg(feature = "gitlab")]
pub mod gitlab;

#[cfg(feature = "gitlab")]
pub use gitlab::GitLabClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::domain::{SITES_KEY, VPNS_KEY};
use crate::state_machine::{
    PublishStage, PublishStep, StateMachineWithHistory, Transition, TransitionError,
};
use crate::store::to_external_keys;

/// Version-control collaborator failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VcsError {
    #[error("Version control transport error: {0}")]
    Transport(String),

    #[error("Version control returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected version control response: {0}")]
    Malformed(String),
}

/// Whether a commit creates the file or replaces its content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitAction {
    Create,
    Update,
}

/// A single-file commit on a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    pub branch: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub action: CommitAction,
}

/// Review request from a working branch into trunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub remove_source_branch: bool,
}

/// Review request as reported by the version-control service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestState {
    pub state: String,
    pub iid: Option<u64>,
    pub web_url: Option<String>,
}

/// Branch, file and review-request operations of a version-control service
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn create_branch(&self, branch: &str, source_ref: &str) -> Result<(), VcsError>;

    /// Decoded file content on `git_ref`, `None` if the file does not exist there
    async fn get_file(&self, path: &str, git_ref: &str) -> Result<Option<String>, VcsError>;

    async fn save_file(&self, commit: &FileCommit) -> Result<(), VcsError>;

    async fn create_merge_request(
        &self,
        request: &MergeRequest,
    ) -> Result<MergeRequestState, VcsError>;
}

/// Publication failure
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Cannot render {document} document: {reason}")]
    Render { document: &'static str, reason: String },

    #[error("Failed to create branch {branch}: {source}")]
    BranchCreate {
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("Failed to fetch {path} on {branch}: {source}")]
    FileFetch {
        path: String,
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("Failed to commit {path} on {branch}: {source}")]
    FileSave {
        path: String,
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("Failed to open merge request for {branch}: {source}")]
    RequestOpen {
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("Publish lifecycle error: {0}")]
    Transition(#[from] TransitionError),
}

/// Result type for publication steps
pub type PublishResult<T> = Result<T, PublishError>;

/// A publication that ended in [`PublishStage::Failed`]
#[derive(Debug, Error)]
#[error("Publication failed at stage {stage}: {source}")]
pub struct PublishFailure {
    /// Last stage reached before the failure
    pub stage: PublishStage,
    #[source]
    pub source: PublishError,
    /// Every transition taken, ending with the abort into `Failed`
    pub history: Vec<Transition<PublishStage, PublishStep>>,
}

impl PublishFailure {
    pub fn failed_at(&self) -> PublishStage {
        self.stage
    }
}

/// What a successful publication did
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub branch: String,
    pub committed: Vec<String>,
    pub unchanged: Vec<String>,
    pub request: MergeRequestState,
    pub history: Vec<Transition<PublishStage, PublishStep>>,
}

/// 4-space pretty printer that escapes every non-ASCII character as `\uXXXX`
///
/// Matches the byte layout of files already committed to the repository, so
/// unchanged documents compare equal.
struct AsciiPrettyFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl AsciiPrettyFormatter<'_> {
    fn new() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter<'_> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }
}

/// Pretty JSON with 4-space indentation and ASCII-only output
fn render(document: &Value) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, AsciiPrettyFormatter::new());
    document.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Extract one namespaced collection and render it as a standalone file
fn render_collection(
    document: &Value,
    key: &'static str,
    name: &'static str,
) -> PublishResult<String> {
    let external = to_external_keys(document.clone()).map_err(|e| PublishError::Render {
        document: name,
        reason: e.to_string(),
    })?;
    let collection = external.get(key).ok_or_else(|| PublishError::Render {
        document: name,
        reason: format!("missing {}", key),
    })?;
    let mut standalone = Map::new();
    standalone.insert(key.to_string(), collection.clone());
    render(&Value::Object(standalone)).map_err(|e| PublishError::Render {
        document: name,
        reason: e.to_string(),
    })
}

/// Working branch name for a publication started at `now`
pub fn branch_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}{}", prefix, now.format("%Y%m%d%H%M"))
}

/// Drives one publication against a [`VersionControl`] service
pub struct ChangePublisher<'a> {
    vcs: &'a dyn VersionControl,
    config: PublisherConfig,
    site_path: String,
    vpn_path: String,
}

impl<'a> ChangePublisher<'a> {
    pub fn new(vcs: &'a dyn VersionControl, config: PublisherConfig) -> Self {
        Self {
            vcs,
            config,
            site_path: "services/sites.json".to_string(),
            vpn_path: "services/vpns.json".to_string(),
        }
    }

    /// Repository paths of the site and VPN documents
    pub fn with_paths(mut self, site_path: impl Into<String>, vpn_path: impl Into<String>) -> Self {
        self.site_path = site_path.into();
        self.vpn_path = vpn_path.into();
        self
    }

    pub async fn publish(
        &self,
        site_doc: &Value,
        vpn_doc: &Value,
    ) -> Result<PublishOutcome, PublishFailure> {
        self.publish_at(Utc::now(), site_doc, vpn_doc).await
    }

    /// Publish with an explicit start time (names the branch)
    pub async fn publish_at(
        &self,
        now: DateTime<Utc>,
        site_doc: &Value,
        vpn_doc: &Value,
    ) -> Result<PublishOutcome, PublishFailure> {
        let mut lifecycle = StateMachineWithHistory::new(PublishStage::Idle);

        match self.run(&mut lifecycle, now, site_doc, vpn_doc).await {
            Ok(outcome) => Ok(outcome),
            Err(source) => {
                let stage = *lifecycle.current_state();
                if !stage.is_terminal() {
                    let abort = PublishStep::Abort {
                        reason: source.to_string(),
                    };
                    if let Err(e) = lifecycle.transition_with_history(abort, Utc::now()) {
                        warn!("Cannot record abort of publication: {}", e);
                    }
                }
                let history = lifecycle.into_history();
                error!(
                    "Publication failed at {} after {} transition(s): {}",
                    stage,
                    history.len(),
                    source
                );
                for transition in &history {
                    debug!("  {} -> {} at {}", transition.from, transition.to, transition.timestamp);
                }
                Err(PublishFailure {
                    stage,
                    source,
                    history,
                })
            }
        }
    }

    async fn run(
        &self,
        lifecycle: &mut StateMachineWithHistory<PublishStage>,
        now: DateTime<Utc>,
        site_doc: &Value,
        vpn_doc: &Value,
    ) -> PublishResult<PublishOutcome> {
        let files = [
            (
                self.site_path.as_str(),
                render_collection(site_doc, SITES_KEY, "site")?,
                self.config.site_commit_message.as_str(),
            ),
            (
                self.vpn_path.as_str(),
                render_collection(vpn_doc, VPNS_KEY, "vpn")?,
                self.config.vpn_commit_message.as_str(),
            ),
        ];

        let branch = branch_name(&self.config.branch_prefix, now);
        self.vcs
            .create_branch(&branch, &self.config.trunk)
            .await
            .map_err(|source| PublishError::BranchCreate {
                branch: branch.clone(),
                source,
            })?;
        info!("Created branch {} from {}", branch, self.config.trunk);
        lifecycle.transition_with_history(
            PublishStep::CreateBranch {
                branch: branch.clone(),
            },
            Utc::now(),
        )?;

        let mut committed = Vec::new();
        let mut unchanged = Vec::new();
        for (path, content, message) in files {
            let current = self
                .vcs
                .get_file(path, &branch)
                .await
                .map_err(|source| PublishError::FileFetch {
                    path: path.to_string(),
                    branch: branch.clone(),
                    source,
                })?;

            let action = match current {
                Some(existing) if existing == content => {
                    debug!("{} unchanged on {}", path, branch);
                    unchanged.push(path.to_string());
                    continue;
                }
                Some(_) => CommitAction::Update,
                None => CommitAction::Create,
            };

            let commit = FileCommit {
                branch: branch.clone(),
                path: path.to_string(),
                content,
                message: message.to_string(),
                author_name: self.config.author_name.clone(),
                author_email: self.config.author_email.clone(),
                action,
            };
            self.vcs
                .save_file(&commit)
                .await
                .map_err(|source| PublishError::FileSave {
                    path: path.to_string(),
                    branch: branch.clone(),
                    source,
                })?;
            info!("Committed {} on {}", path, branch);
            committed.push(path.to_string());
        }

        let staged = lifecycle.transition_with_history(
            PublishStep::StageFiles {
                committed: committed.len(),
                unchanged: unchanged.len(),
            },
            Utc::now(),
        )?;
        for warning in staged.warnings {
            warn!("{}", warning);
        }

        let request = MergeRequest {
            source_branch: branch.clone(),
            target_branch: self.config.trunk.clone(),
            title: branch.clone(),
            remove_source_branch: true,
        };
        let state = self
            .vcs
            .create_merge_request(&request)
            .await
            .map_err(|source| PublishError::RequestOpen {
                branch: branch.clone(),
                source,
            })?;
        info!("Merge request for {} is {}", branch, state.state);
        lifecycle.transition_with_history(
            PublishStep::OpenRequest {
                state: state.state.clone(),
            },
            Utc::now(),
        )?;
        lifecycle.transition_with_history(PublishStep::Finish, Utc::now())?;

        Ok(PublishOutcome {
            branch,
            committed,
            unchanged,
            request: state,
            history: std::mem::take(&mut lifecycle.history),
        })
    }
}
