// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compiled Variable Documents
//!
//! The terminal artifacts of a compilation run. Routing variables describe
//! every router's VRF bindings, switching variables describe every switch and
//! the VLANs carried across them.
//!
//! All maps and sets are ordered so that a document compiled twice from the
//! same inputs serializes to the same bytes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::intent::{SiteType, Vpn};
use super::interface_name::InterfaceBinding;

/// VPN id bound to the WAN transport interface
pub const WAN_VPN_ID: i64 = 0;

/// VPN id bound to the management (INFRA) interface
pub const MANAGEMENT_VPN_ID: i64 = 99;

/// Per-router variables consumed by the routing templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterVariables {
    pub system_site_id: i64,
    /// Loopback address without mask
    pub system_system_ip: String,
    pub system_host_name: String,
    /// `vpn<id>_interface` and `vpn<id>_ipv4_address` pairs
    #[serde(flatten)]
    pub vpn_bindings: BTreeMap<String, String>,
}

impl RouterVariables {
    pub fn new(site_id: i64, system_ip: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            system_site_id: site_id,
            system_system_ip: system_ip.into(),
            system_host_name: host_name.into(),
            vpn_bindings: BTreeMap::new(),
        }
    }

    /// Record the interface and address realizing a VPN on this router
    ///
    /// A later binding for the same VPN id replaces the earlier one.
    pub fn bind_vpn(&mut self, vpn_id: i64, interface: impl Into<String>, address: impl Into<String>) {
        self.vpn_bindings
            .insert(format!("vpn{}_interface", vpn_id), interface.into());
        self.vpn_bindings
            .insert(format!("vpn{}_ipv4_address", vpn_id), address.into());
    }

    pub fn vpn_interface(&self, vpn_id: i64) -> Option<&str> {
        self.vpn_bindings
            .get(&format!("vpn{}_interface", vpn_id))
            .map(String::as_str)
    }

    pub fn vpn_address(&self, vpn_id: i64) -> Option<&str> {
        self.vpn_bindings
            .get(&format!("vpn{}_ipv4_address", vpn_id))
            .map(String::as_str)
    }
}

/// One router in the routing document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRecord {
    /// Serial number
    pub id: String,
    /// Inventory role
    #[serde(rename = "type")]
    pub role: String,
    pub variables: RouterVariables,
}

/// One switch in the switching document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// Serial number
    pub id: String,
    pub name: String,
    /// Inventory site name
    pub site: String,
    /// Inventory role
    #[serde(rename = "type")]
    pub role: String,
}

/// A VPN as realized on the switching fabric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanRecord {
    pub id: i64,
    pub name: String,
    /// Site types that contributed at least one interface
    pub sites: BTreeSet<SiteType>,
    pub interfaces: Vec<InterfaceBinding>,
}

/// Routing variables document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingVariables {
    pub router: Vec<RouterRecord>,
    pub vpns: Vec<Vpn>,
    pub device_roles: Vec<String>,
}

/// Switching variables document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingVariables {
    pub switches: Vec<SwitchRecord>,
    pub vlans: Vec<VlanRecord>,
    pub device_roles: Vec<String>,
}
