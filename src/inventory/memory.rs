// Copyright (c) 2025 - Cowboy AI, Inc.

//! In-memory inventory backed by a snapshot document
//!
//! A snapshot is a JSON export of the devices, interfaces, addresses and
//! roles a compilation needs. Matching follows the same exact-match rules as
//! the NetBox filters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use super::{
    exactly_one, Device, DeviceRef, Interface, InterfaceAddress, InventoryClient, LookupError,
    LookupResult,
};

/// Serializable inventory contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub ip_addresses: Vec<InterfaceAddress>,
    /// Every role known to the inventory, in inventory order
    #[serde(default)]
    pub roles: Vec<String>,
}

impl InventorySnapshot {
    /// Load a snapshot from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> LookupResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            LookupError::Transport(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| LookupError::Malformed {
            kind: "snapshot",
            reason: e.to_string(),
        })
    }

    pub fn with_device(mut self, id: i64, name: &str, serial: &str, role: &str, site: &str) -> Self {
        self.devices.push(Device {
            id,
            name: name.to_string(),
            serial: serial.to_string(),
            role: role.to_string(),
            site: site.to_string(),
        });
        self
    }

    pub fn with_interface(mut self, id: i64, device_id: i64, name: &str, description: &str) -> Self {
        self.interfaces.push(Interface {
            id,
            device_id,
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_address(mut self, id: i64, interface_id: i64, address: &str) -> Self {
        self.ip_addresses.push(InterfaceAddress {
            id,
            interface_id,
            address: address.to_string(),
        });
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }
}

/// [`InventoryClient`] over an [`InventorySnapshot`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    snapshot: InventorySnapshot,
}

impl InMemoryInventory {
    pub fn new(snapshot: InventorySnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &InventorySnapshot {
        &self.snapshot
    }

    fn device_ids(&self, device: &DeviceRef) -> Vec<i64> {
        match device {
            DeviceRef::Id(id) => vec![*id],
            DeviceRef::Name(name) => self
                .snapshot
                .devices
                .iter()
                .filter(|d| &d.name == name)
                .map(|d| d.id)
                .collect(),
        }
    }

    fn interfaces_where<F>(&self, device: &DeviceRef, predicate: F) -> Vec<Interface>
    where
        F: Fn(&Interface) -> bool,
    {
        let device_ids = self.device_ids(device);
        self.snapshot
            .interfaces
            .iter()
            .filter(|i| device_ids.contains(&i.device_id) && predicate(i))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn device_by_serial(&self, serial: &str) -> LookupResult<Device> {
        let matches = self
            .snapshot
            .devices
            .iter()
            .filter(|d| d.serial == serial)
            .cloned()
            .collect();
        exactly_one("device", format!("serial={}", serial), matches)
    }

    async fn interface_by_name_and_device(
        &self,
        name: &str,
        device: &DeviceRef,
    ) -> LookupResult<Interface> {
        let matches = self.interfaces_where(device, |i| i.name == name);
        exactly_one("interface", format!("name={} {}", name, device), matches)
    }

    async fn interface_by_description_and_device(
        &self,
        description: &str,
        device: &DeviceRef,
    ) -> LookupResult<Interface> {
        let matches = self.interfaces_where(device, |i| i.description == description);
        exactly_one(
            "interface",
            format!("description={} {}", description, device),
            matches,
        )
    }

    async fn interfaces_by_description_and_device(
        &self,
        description: &str,
        device: &DeviceRef,
    ) -> LookupResult<Vec<Interface>> {
        let matches = self.interfaces_where(device, |i| i.description == description);
        debug!(
            "{} interfaces tagged {} on {}",
            matches.len(),
            description,
            device
        );
        Ok(matches)
    }

    async fn ip_address_by_interface(&self, interface_id: i64) -> LookupResult<InterfaceAddress> {
        let matches = self
            .snapshot
            .ip_addresses
            .iter()
            .filter(|a| a.interface_id == interface_id)
            .cloned()
            .collect();
        exactly_one(
            "ip address",
            format!("interface_id={}", interface_id),
            matches,
        )
    }

    async fn roles_for_device_types_present(
        &self,
        present: &BTreeSet<String>,
    ) -> LookupResult<Vec<String>> {
        Ok(self
            .snapshot
            .roles
            .iter()
            .filter(|role| present.contains(*role))
            .cloned()
            .collect())
    }
}
