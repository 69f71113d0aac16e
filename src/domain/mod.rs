// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Intent Domain Models
//!
//! Core concepts shared by every stage of compilation: the declared intent
//! (sites and VPNs), the compiled variable documents, and the value objects
//! used to interpret raw inventory data.
//!
//! # Intent
//!
//! - [`Site`] - a location of type [`SiteType`] and the devices implementing it
//! - [`Vpn`] - a network isolation domain and the site types it applies to
//!
//! # Compiled Variables
//!
//! - [`RoutingVariables`] - per-router VRF/interface/IP bindings
//! - [`SwitchingVariables`] - per-switch records and VLAN port bindings
//!
//! # Value Objects
//!
//! - [`CidrAddress`] - inventory address with explicit IP-only / with-mask flavors
//! - [`InterfaceBinding`] - recognized switch port (family + slot/subslot/port)

pub mod address;
pub mod intent;
pub mod interface_name;
pub mod variables;

pub use address::{AddressError, CidrAddress};
pub use intent::{
    merge_documents, ServiceIntent, Site, SiteService, SiteType, Vpn, VpnService, SITES_KEY,
    VPNS_KEY,
};
pub use interface_name::{parse_interface_name, InterfaceBinding, InterfaceFamily};
pub use variables::{
    RouterRecord, RouterVariables, RoutingVariables, SwitchRecord, SwitchingVariables,
    VlanRecord, MANAGEMENT_VPN_ID, WAN_VPN_ID,
};
