// Copyright (c) 2025 - Cowboy AI, Inc.
//! Artifact Store
//!
//! Durable, named locations for the JSON documents the pipeline produces and
//! the per-device baselines learned from the network.
//!
//! | Target | Path under the store root |
//! |--------|---------------------------|
//! | [`ArtifactTarget::Service`] | `services/terraform/netbox/terraform.tfvars.json` |
//! | [`ArtifactTarget::Routing`] | `services/terraform/routing/terraform.tfvars.json` |
//! | [`ArtifactTarget::Switching`] | `services/terraform/switching/terraform.tfvars.json` |
//! | [`ArtifactTarget::Baseline`] | `baseline/base-<kind>_<device>.json` |
//!
//! Writes replace the whole document and go through a temporary sibling file
//! that is renamed into place, so a failed write never leaves a truncated
//! artifact behind.
//!
//! The service document is the only one whose keys differ between the outside
//! world and storage: the namespaced `site-service:sites` / `vpn-service:vpns`
//! keys are stored as plain `sites` / `vpns`. The rename happens here and
//! nowhere else.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{SITES_KEY, VPNS_KEY};

/// External ↔ internal key pairs for the service document
const SERVICE_KEY_RENAMES: [(&str, &str); 2] = [(SITES_KEY, "sites"), (VPNS_KEY, "vpns")];

/// Artifact persistence failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Artifact {target} not found at {path}")]
    NotFound { target: String, path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact {target} cannot be (de)serialized: {source}")]
    Serialization {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    /// Renaming `key` would overwrite `existing`, which the document also carries
    #[error("Document carries both {key} and {existing}")]
    KeyCollision { key: String, existing: String },

    #[error("Invalid artifact target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// Result type for store operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// What a per-device baseline captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaselineKind {
    /// Learned VRF state of a router
    Vrf,
    /// Learned VLAN state of a switch
    Vlan,
}

impl BaselineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineKind::Vrf => "vrf",
            BaselineKind::Vlan => "vlan",
        }
    }
}

/// A named artifact location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactTarget {
    Service,
    Routing,
    Switching,
    Baseline { kind: BaselineKind, device: String },
}

impl ArtifactTarget {
    /// Path relative to the store root
    ///
    /// Baseline device names must be a single plain path component.
    pub fn relative_path(&self) -> PersistenceResult<PathBuf> {
        match self {
            ArtifactTarget::Service => Ok(PathBuf::from(
                "services/terraform/netbox/terraform.tfvars.json",
            )),
            ArtifactTarget::Routing => Ok(PathBuf::from(
                "services/terraform/routing/terraform.tfvars.json",
            )),
            ArtifactTarget::Switching => Ok(PathBuf::from(
                "services/terraform/switching/terraform.tfvars.json",
            )),
            ArtifactTarget::Baseline { kind, device } => {
                check_device_name(self, device)?;
                Ok(PathBuf::from("baseline").join(format!("base-{}_{}.json", kind.as_str(), device)))
            }
        }
    }
}

fn check_device_name(target: &ArtifactTarget, device: &str) -> PersistenceResult<()> {
    let invalid = |reason: &str| PersistenceError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    };
    if device.is_empty() {
        return Err(invalid("empty device name"));
    }
    if device.contains(|c: char| c == '/' || c == '\\') || device.contains("..") {
        return Err(invalid("device name must not contain path separators or '..'"));
    }
    let mut components = Path::new(device).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("device name is not a plain file name")),
    }
}

impl fmt::Display for ArtifactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactTarget::Service => f.write_str("service"),
            ArtifactTarget::Routing => f.write_str("routing"),
            ArtifactTarget::Switching => f.write_str("switching"),
            ArtifactTarget::Baseline { kind, device } => {
                write!(f, "{} baseline of {}", kind.as_str(), device)
            }
        }
    }
}

fn rename_keys(document: Value, from_external: bool) -> PersistenceResult<Value> {
    let map = match document {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    let mut renamed = Map::with_capacity(map.len());
    for (external, internal) in SERVICE_KEY_RENAMES {
        let (from, to) = if from_external {
            (external, internal)
        } else {
            (internal, external)
        };
        if map.contains_key(from) && map.contains_key(to) {
            return Err(PersistenceError::KeyCollision {
                key: from.to_string(),
                existing: to.to_string(),
            });
        }
    }
    for (key, value) in map {
        let key = SERVICE_KEY_RENAMES
            .iter()
            .find_map(|(external, internal)| {
                let (from, to) = if from_external {
                    (external, internal)
                } else {
                    (internal, external)
                };
                (key == *from).then(|| to.to_string())
            })
            .unwrap_or(key);
        renamed.insert(key, value);
    }
    Ok(Value::Object(renamed))
}

/// `site-service:sites` → `sites`, `vpn-service:vpns` → `vpns`
///
/// Fails with [`PersistenceError::KeyCollision`] if the document already
/// carries the plain form of a key it would rename.
pub fn to_internal_keys(document: Value) -> PersistenceResult<Value> {
    rename_keys(document, true)
}

/// `sites` → `site-service:sites`, `vpns` → `vpn-service:vpns`
pub fn to_external_keys(document: Value) -> PersistenceResult<Value> {
    rename_keys(document, false)
}

/// Serialize `document` as the JSON value stored under `target`
pub fn to_document<T: Serialize>(target: &ArtifactTarget, document: &T) -> PersistenceResult<Value> {
    serde_json::to_value(document).map_err(|source| PersistenceError::Serialization {
        target: target.to_string(),
        source,
    })
}

/// A document written to its staging file, not yet renamed into place
struct Staged {
    staging: PathBuf,
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

async fn discard(staged: &[Staged]) {
    for entry in staged {
        let _ = tokio::fs::remove_file(&entry.staging).await;
    }
}

/// Put back what `committed` replaced
async fn roll_back(committed: &[Staged]) {
    for entry in committed.iter().rev() {
        let restored = match &entry.previous {
            Some(bytes) => tokio::fs::write(&entry.path, bytes).await,
            None => tokio::fs::remove_file(&entry.path).await,
        };
        if let Err(e) = restored {
            warn!("Cannot roll back {}: {}", entry.path.display(), e);
        }
    }
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, target: &ArtifactTarget) -> PersistenceResult<PathBuf> {
        Ok(self.root.join(target.relative_path()?))
    }

    /// Replace the document stored under `target`
    pub async fn write<T: Serialize>(
        &self,
        target: &ArtifactTarget,
        document: &T,
    ) -> PersistenceResult<PathBuf> {
        let value = to_document(target, document)?;
        let path = self.path_for(target)?;
        self.write_all(vec![(target.clone(), value)]).await?;
        Ok(path)
    }

    /// Replace several documents together
    ///
    /// Every document is staged before any is renamed into place. If staging
    /// fails nothing is renamed; if a rename fails the documents already
    /// renamed are restored to what they replaced.
    pub async fn write_all(
        &self,
        documents: Vec<(ArtifactTarget, Value)>,
    ) -> PersistenceResult<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(documents.len());
        for (target, document) in &documents {
            match self.stage(target, document.clone()).await {
                Ok(entry) => staged.push(entry),
                Err(e) => {
                    discard(&staged).await;
                    return Err(e);
                }
            }
        }

        for (index, entry) in staged.iter().enumerate() {
            if let Err(source) = tokio::fs::rename(&entry.staging, &entry.path).await {
                discard(&staged[index..]).await;
                roll_back(&staged[..index]).await;
                return Err(PersistenceError::Io {
                    path: entry.path.clone(),
                    source,
                });
            }
        }

        let mut paths = Vec::with_capacity(staged.len());
        for ((target, _), entry) in documents.iter().zip(staged) {
            info!("Saved {} artifact to {}", target, entry.path.display());
            paths.push(entry.path);
        }
        Ok(paths)
    }

    async fn stage(&self, target: &ArtifactTarget, document: Value) -> PersistenceResult<Staged> {
        let document = match target {
            ArtifactTarget::Service => to_internal_keys(document)?,
            _ => document,
        };
        let mut bytes =
            serde_json::to_vec_pretty(&document).map_err(|source| PersistenceError::Serialization {
                target: target.to_string(),
                source,
            })?;
        bytes.push(b'\n');

        let path = self.path_for(target)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let previous = match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        let staging = path.with_extension("json.tmp");
        if let Err(source) = tokio::fs::write(&staging, &bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(PersistenceError::Io {
                path: staging,
                source,
            });
        }
        debug!("Staged {} artifact at {}", target, staging.display());

        Ok(Staged {
            staging,
            path,
            previous,
        })
    }

    /// Read the document stored under `target`
    pub async fn read(&self, target: &ArtifactTarget) -> PersistenceResult<Value> {
        let path = self.path_for(target)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound {
                    target: target.to_string(),
                    path,
                })
            }
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        let value: Value =
            serde_json::from_slice(&raw).map_err(|source| PersistenceError::Serialization {
                target: target.to_string(),
                source,
            })?;
        debug!("Loaded {} artifact from {}", target, path.display());

        match target {
            ArtifactTarget::Service => to_external_keys(value),
            _ => Ok(value),
        }
    }

    /// Read and deserialize the document stored under `target`
    pub async fn read_as<T: DeserializeOwned>(&self, target: &ArtifactTarget) -> PersistenceResult<T> {
        let value = self.read(target).await?;
        serde_json::from_value(value).map_err(|source| PersistenceError::Serialization {
            target: target.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_rename_only_touches_service_keys() {
        let external = json!({
            "site-service:sites": [1],
            "vpn-service:vpns": [2],
            "routing:router": []
        });
        let internal = to_internal_keys(external.clone()).unwrap();
        assert_eq!(internal, json!({"sites": [1], "vpns": [2], "routing:router": []}));
        assert_eq!(to_external_keys(internal).unwrap(), external);
    }

    #[test]
    fn test_rename_rejects_both_key_forms() {
        let err = to_internal_keys(json!({"site-service:sites": [1], "sites": [2]})).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::KeyCollision { ref key, ref existing }
                if key == "site-service:sites" && existing == "sites"
        ));

        let err = to_external_keys(json!({"vpns": [1], "vpn-service:vpns": [2]})).unwrap_err();
        assert!(matches!(err, PersistenceError::KeyCollision { .. }));
    }

    #[test]
    fn test_baseline_path() {
        let target = ArtifactTarget::Baseline {
            kind: BaselineKind::Vlan,
            device: "zrh-sw-01".into(),
        };
        assert_eq!(
            target.relative_path().unwrap(),
            PathBuf::from("baseline/base-vlan_zrh-sw-01.json")
        );
    }

    #[test]
    fn test_baseline_device_cannot_leave_baseline_dir() {
        for device in ["../x", "a/b", "..", "", "sw\\01", "."] {
            let target = ArtifactTarget::Baseline {
                kind: BaselineKind::Vrf,
                device: device.into(),
            };
            assert!(
                matches!(
                    target.relative_path(),
                    Err(PersistenceError::InvalidTarget { .. })
                ),
                "accepted device name {:?}",
                device
            );
        }
    }

    #[tokio::test]
    async fn test_service_document_stored_with_plain_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let document = json!({"site-service:sites": [], "vpn-service:vpns": []});

        let path = store.write(&ArtifactTarget::Service, &document).await.unwrap();
        let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"sites": [], "vpns": []}));

        let read_back = store.read(&ArtifactTarget::Service).await.unwrap();
        assert_eq!(read_back, document);
    }

    #[tokio::test]
    async fn test_colliding_service_document_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store
            .write(
                &ArtifactTarget::Service,
                &json!({"site-service:sites": [1], "sites": [2]}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PersistenceError::KeyCollision { .. }));
        assert!(!store.path_for(&ArtifactTarget::Service).unwrap().exists());
    }

    #[tokio::test]
    async fn test_read_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.read(&ArtifactTarget::Routing).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        store
            .write(&ArtifactTarget::Switching, &json!({"switches": [1], "extra": true}))
            .await
            .unwrap();
        store
            .write(&ArtifactTarget::Switching, &json!({"switches": []}))
            .await
            .unwrap();

        let document = store.read(&ArtifactTarget::Switching).await.unwrap();
        assert_eq!(document, json!({"switches": []}));
        assert!(!store
            .path_for(&ArtifactTarget::Switching)
            .unwrap()
            .with_extension("json.tmp")
            .exists());
    }

    #[tokio::test]
    async fn test_write_all_stages_before_renaming() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let routing = store.path_for(&ArtifactTarget::Routing).unwrap();
        let switching = store.path_for(&ArtifactTarget::Switching).unwrap();
        std::fs::create_dir_all(&switching).unwrap();

        let err = store
            .write_all(vec![
                (ArtifactTarget::Routing, json!({"router": []})),
                (ArtifactTarget::Switching, json!({"switches": []})),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, PersistenceError::Io { .. }));
        assert!(!routing.exists());
        assert!(!routing.with_extension("json.tmp").exists());
        assert!(!switching.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_all_keeps_previous_documents_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write(&ArtifactTarget::Routing, &json!({"router": ["old"]}))
            .await
            .unwrap();
        std::fs::create_dir_all(store.path_for(&ArtifactTarget::Switching).unwrap()).unwrap();

        store
            .write_all(vec![
                (ArtifactTarget::Routing, json!({"router": ["new"]})),
                (ArtifactTarget::Switching, json!({"switches": []})),
            ])
            .await
            .unwrap_err();

        let routing = store.read(&ArtifactTarget::Routing).await.unwrap();
        assert_eq!(routing, json!({"router": ["old"]}));
    }

    #[tokio::test]
    async fn test_write_all_returns_paths_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let paths = store
            .write_all(vec![
                (ArtifactTarget::Routing, json!({"router": []})),
                (ArtifactTarget::Switching, json!({"switches": []})),
            ])
            .await
            .unwrap();

        assert_eq!(
            paths,
            vec![
                store.path_for(&ArtifactTarget::Routing).unwrap(),
                store.path_for(&ArtifactTarget::Switching).unwrap(),
            ]
        );
    }
}
