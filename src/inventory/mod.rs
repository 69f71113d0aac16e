// Copyright (c) 2025 - Cowboy AI, Inc.

//! Inventory Client
//!
//! Read-only view of the device/interface/IP inventory that intent is
//! compiled against.
//!
//! Intent and physical topology are joined by free-text tags: an interface
//! whose description is `WAN`, `INFRA` or a VPN name realizes that network on
//! its device. That convention lives entirely behind [`InventoryClient`], so
//! the deriver never matches strings itself.
//!
//! # Implementations
//!
//! - [`NetBoxInventory`] - NetBox REST API (feature `netbox`)
//! - [`InMemoryInventory`] - a loaded [`InventorySnapshot`], for offline runs
//!   and tests
//!
//! # Lookup semantics
//!
//! Single-result lookups must match exactly one object. Zero matches is
//! [`LookupError::NotFound`], more than one is [`LookupError::AmbiguousMatch`].
//! Callers treat both as fatal for the record being built.

pub mod memory;
#[cfg(feature = "netbox")]
pub mod netbox;

pub use memory::{InMemoryInventory, InventorySnapshot};
#[cfg(feature = "netbox")]
pub use netbox::NetBoxInventory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::domain::{AddressError, CidrAddress};

/// Interface name of the SD-WAN system loopback
pub const SYSTEM_INTERFACE_NAME: &str = "Sdwan-system-intf";

/// Description tag of the WAN transport interface
pub const WAN_DESCRIPTION: &str = "WAN";

/// Description tag of the management interface
pub const MANAGEMENT_DESCRIPTION: &str = "INFRA";

/// Inventory lookup failure
#[derive(Debug, Error)]
pub enum LookupError {
    /// No object matched the query
    #[error("{kind} not found: {query}")]
    NotFound { kind: &'static str, query: String },

    /// More than one object matched a query that must be unique
    #[error("{kind} query is ambiguous ({count} matches): {query}")]
    AmbiguousMatch {
        kind: &'static str,
        query: String,
        count: usize,
    },

    /// The inventory could not be reached or answered with an error
    #[error("Inventory transport error: {0}")]
    Transport(String),

    /// The inventory answered with data that could not be interpreted
    #[error("Inventory returned malformed {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// Result type for inventory lookups
pub type LookupResult<T> = Result<T, LookupError>;

/// Reduce a filtered result set to its single element
pub fn exactly_one<T>(kind: &'static str, query: impl Into<String>, mut matches: Vec<T>) -> LookupResult<T> {
    match matches.len() {
        0 => Err(LookupError::NotFound {
            kind,
            query: query.into(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(LookupError::AmbiguousMatch {
            kind,
            query: query.into(),
            count,
        }),
    }
}

/// Reference to a device, by inventory id or by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceRef {
    Id(i64),
    Name(String),
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRef::Id(id) => write!(f, "device_id={}", id),
            DeviceRef::Name(name) => write!(f, "device={}", name),
        }
    }
}

/// A physical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub serial: String,
    /// Role name, e.g. `C8000V` or `C9KV-UADP-8P`
    pub role: String,
    /// Site name
    #[serde(default)]
    pub site: String,
}

impl Device {
    pub fn reference(&self) -> DeviceRef {
        DeviceRef::Id(self.id)
    }
}

/// A device interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: i64,
    pub device_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// An address assigned to an interface, as stored (with mask)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    pub id: i64,
    pub interface_id: i64,
    pub address: String,
}

impl InterfaceAddress {
    /// Address exactly as the inventory returned it
    pub fn as_returned(&self) -> &str {
        &self.address
    }

    /// Parse into a [`CidrAddress`] to pick a flavor explicitly
    pub fn cidr(&self) -> Result<CidrAddress, AddressError> {
        CidrAddress::new(&self.address)
    }
}

/// Read-only inventory queries used by the variable deriver
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Device with the given serial number
    async fn device_by_serial(&self, serial: &str) -> LookupResult<Device>;

    /// Interface on `device` with the given exact name
    async fn interface_by_name_and_device(
        &self,
        name: &str,
        device: &DeviceRef,
    ) -> LookupResult<Interface>;

    /// The single interface on `device` carrying the description tag
    async fn interface_by_description_and_device(
        &self,
        description: &str,
        device: &DeviceRef,
    ) -> LookupResult<Interface>;

    /// Every interface on `device` carrying the description tag (may be empty)
    async fn interfaces_by_description_and_device(
        &self,
        description: &str,
        device: &DeviceRef,
    ) -> LookupResult<Vec<Interface>>;

    /// The address assigned to an interface
    async fn ip_address_by_interface(&self, interface_id: i64) -> LookupResult<InterfaceAddress>;

    /// Inventory role names that are among `present`, in inventory order
    async fn roles_for_device_types_present(
        &self,
        present: &BTreeSet<String>,
    ) -> LookupResult<Vec<String>>;
}
