// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for service-intent
//!
//! Deterministic intent, inventory and version-control stand-ins shared by the
//! integration tests. Nothing here talks to a network.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use service_intent::inventory::InventorySnapshot;
use service_intent::publisher::{
    FileCommit, MergeRequest, MergeRequestState, VcsError, VersionControl,
};

/// Fixed publication time (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Schemas shipped with the crate
pub fn schema_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas")
}

/// Zurich (DC, one router, two switches) and Geneva (Branch, one router)
pub fn site_document() -> Value {
    json!({
        "site-service:sites": [
            {
                "id": 100,
                "name": "zurich",
                "type": "DC",
                "router": ["FGL2231A0CK"],
                "switches": ["FOC2244X0AB", "FOC2244X0AC"]
            },
            {
                "id": 200,
                "name": "geneva",
                "type": "Branch",
                "router": ["FGL2231A1DM"],
                "switches": []
            }
        ]
    })
}

/// Corporate everywhere, Guest in the data center only
pub fn vpn_document() -> Value {
    json!({
        "vpn-service:vpns": [
            {"id": 10, "name": "Corporate", "sites": ["DC", "Branch"]},
            {"id": 20, "name": "Guest", "sites": ["DC"]}
        ]
    })
}

/// Inventory matching [`site_document`] and [`vpn_document`]
pub fn inventory_snapshot() -> InventorySnapshot {
    InventorySnapshot::default()
        .with_device(1, "zrh-rtr-01", "FGL2231A0CK", "C8000V", "zurich")
        .with_device(2, "gva-rtr-01", "FGL2231A1DM", "C8000V", "geneva")
        .with_device(3, "zrh-sw-01", "FOC2244X0AB", "C9KV-UADP-8P", "zurich")
        .with_device(4, "zrh-sw-02", "FOC2244X0AC", "C9KV-UADP-8P", "zurich")
        // zrh-rtr-01
        .with_interface(11, 1, "Sdwan-system-intf", "")
        .with_interface(12, 1, "GigabitEthernet1", "WAN")
        .with_interface(13, 1, "GigabitEthernet2", "INFRA")
        .with_interface(14, 1, "GigabitEthernet3", "Corporate")
        .with_interface(15, 1, "GigabitEthernet4", "Guest")
        .with_address(101, 11, "10.255.0.1/32")
        .with_address(102, 12, "203.0.113.2/30")
        .with_address(103, 13, "10.99.0.1/24")
        .with_address(104, 14, "10.10.0.1/24")
        .with_address(105, 15, "10.20.0.1/24")
        // gva-rtr-01
        .with_interface(21, 2, "Sdwan-system-intf", "")
        .with_interface(22, 2, "GigabitEthernet1", "WAN")
        .with_interface(23, 2, "GigabitEthernet2", "INFRA")
        .with_interface(24, 2, "GigabitEthernet3", "Corporate")
        .with_address(201, 21, "10.255.0.2/32")
        .with_address(202, 22, "198.51.100.2/30")
        .with_address(203, 23, "10.99.1.1/24")
        .with_address(204, 24, "10.10.1.1/24")
        // zrh-sw-01
        .with_interface(31, 3, "GigabitEthernet1/0/5", "Guest")
        .with_interface(32, 3, "GigabitEthernet1/0/2", "Corporate")
        .with_interface(33, 3, "Vlan20", "Guest")
        // zrh-sw-02
        .with_interface(41, 4, "GigabitEthernet1/0/7", "Guest")
        .with_interface(42, 4, "TenGigabitEthernet1/1/1", "Corporate")
        .with_role("C8000V")
        .with_role("C9KV-UADP-8P")
        .with_role("ISR4331")
}

/// Write `services/sites.json` and `services/vpns.json` under `root`
pub fn write_intent(root: &Path, sites: &Value, vpns: &Value) {
    let services = root.join("services");
    std::fs::create_dir_all(&services).unwrap();
    std::fs::write(
        services.join("sites.json"),
        serde_json::to_string_pretty(sites).unwrap(),
    )
    .unwrap();
    std::fs::write(
        services.join("vpns.json"),
        serde_json::to_string_pretty(vpns).unwrap(),
    )
    .unwrap();
}

/// Temporary intent root holding the default fixture intent
pub fn intent_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_intent(dir.path(), &site_document(), &vpn_document());
    dir
}

/// Rendered file as the publisher writes it (4-space indent)
pub fn render_file(document: &Value) -> String {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    serde::Serialize::serialize(document, &mut serializer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[derive(Debug, Default)]
struct FakeRepository {
    /// Files on trunk; a new branch starts as a copy of trunk
    files: BTreeMap<String, String>,
    branches: Vec<(String, String)>,
    commits: Vec<FileCommit>,
    requests: Vec<MergeRequest>,
}

/// In-memory [`VersionControl`] recording every call
#[derive(Debug, Default)]
pub struct FakeVcs {
    repository: Mutex<FakeRepository>,
    fail_branch: bool,
    fail_request: bool,
}

impl FakeVcs {
    pub fn with_file(self, path: &str, content: impl Into<String>) -> Self {
        self.repository
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.into());
        self
    }

    pub fn failing_branch(mut self) -> Self {
        self.fail_branch = true;
        self
    }

    pub fn failing_request(mut self) -> Self {
        self.fail_request = true;
        self
    }

    pub fn commits(&self) -> Vec<FileCommit> {
        self.repository.lock().unwrap().commits.clone()
    }

    pub fn branches(&self) -> Vec<(String, String)> {
        self.repository.lock().unwrap().branches.clone()
    }

    pub fn requests(&self) -> Vec<MergeRequest> {
        self.repository.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn create_branch(&self, branch: &str, source_ref: &str) -> Result<(), VcsError> {
        if self.fail_branch {
            return Err(VcsError::Status {
                status: 400,
                body: "Branch already exists".to_string(),
            });
        }
        self.repository
            .lock()
            .unwrap()
            .branches
            .push((branch.to_string(), source_ref.to_string()));
        Ok(())
    }

    async fn get_file(&self, path: &str, _git_ref: &str) -> Result<Option<String>, VcsError> {
        Ok(self.repository.lock().unwrap().files.get(path).cloned())
    }

    async fn save_file(&self, commit: &FileCommit) -> Result<(), VcsError> {
        let mut repository = self.repository.lock().unwrap();
        repository
            .files
            .insert(commit.path.clone(), commit.content.clone());
        repository.commits.push(commit.clone());
        Ok(())
    }

    async fn create_merge_request(
        &self,
        request: &MergeRequest,
    ) -> Result<MergeRequestState, VcsError> {
        if self.fail_request {
            return Err(VcsError::Transport("connection reset".to_string()));
        }
        let mut repository = self.repository.lock().unwrap();
        repository.requests.push(request.clone());
        Ok(MergeRequestState {
            state: "opened".to_string(),
            iid: Some(repository.requests.len() as u64),
            web_url: None,
        })
    }
}
