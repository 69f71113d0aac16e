// Copyright (c) 2025 - Cowboy AI, Inc.
//! Variable Deriver
//!
//! Joins service intent with inventory facts to produce the routing and
//! switching variable documents.
//!
//! # Routing
//!
//! Each router is resolved by an explicit sequential pipeline, because every
//! step needs the device found by the first one:
//!
//! ```text
//! serial ──> device ──> loopback (IP only)
//!                   ──> WAN interface  (vpn0,  with mask)
//!                   ──> INFRA interface (vpn99, with mask)
//!                   ──> one interface per VPN applying to the site type
//! ```
//!
//! # Switching
//!
//! Switches are resolved first, then every VPN is matched against the
//! interfaces of every switch. Interface names outside the two recognized
//! families are dropped without error.
//!
//! # Failure
//!
//! Routers and switches are resolved concurrently. The first failed mandatory
//! lookup aborts the whole derivation; no partial document is returned.

use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    parse_interface_name, AddressError, CidrAddress, InterfaceBinding, RouterRecord,
    RouterVariables, RoutingVariables, ServiceIntent, Site, SiteType, SwitchRecord,
    SwitchingVariables, VlanRecord, Vpn, MANAGEMENT_VPN_ID, WAN_VPN_ID,
};
use crate::inventory::{
    Device, InventoryClient, LookupError, MANAGEMENT_DESCRIPTION, SYSTEM_INTERFACE_NAME,
    WAN_DESCRIPTION,
};

/// Derivation failure
#[derive(Debug, Error)]
pub enum DeriveError {
    /// A mandatory inventory lookup failed
    #[error("Inventory lookup for {device} failed: {source}")]
    Lookup {
        device: String,
        #[source]
        source: LookupError,
    },

    /// The inventory holds an address that cannot be interpreted
    #[error("Device {device} has malformed address {address:?}: {source}")]
    InvalidAddress {
        device: String,
        address: String,
        #[source]
        source: AddressError,
    },
}

impl DeriveError {
    /// The underlying lookup error, if this failure came from the inventory
    pub fn lookup_error(&self) -> Option<&LookupError> {
        match self {
            DeriveError::Lookup { source, .. } => Some(source),
            DeriveError::InvalidAddress { .. } => None,
        }
    }
}

/// Result type for derivation
pub type DeriveResult<T> = Result<T, DeriveError>;

/// A switch resolved from inventory, with the type of its owning site
struct ResolvedSwitch {
    device: Device,
    site_type: SiteType,
}

/// Builds compiled variable documents from intent plus inventory
pub struct VariableDeriver<'a> {
    inventory: &'a dyn InventoryClient,
}

impl<'a> VariableDeriver<'a> {
    pub fn new(inventory: &'a dyn InventoryClient) -> Self {
        Self { inventory }
    }

    /// Derive the routing variables document
    pub async fn routing(&self, intent: &ServiceIntent) -> DeriveResult<RoutingVariables> {
        let pending = intent.sites.iter().flat_map(move |site| {
            site.router
                .iter()
                .map(move |serial| self.router_record(intent, site, serial))
        });
        let router = try_join_all(pending).await?;

        let present: BTreeSet<String> = router.iter().map(|r| r.role.clone()).collect();
        let device_roles = self.roles(&present).await?;

        info!(
            "Derived routing variables: {} router(s), {} role(s)",
            router.len(),
            device_roles.len()
        );

        Ok(RoutingVariables {
            router,
            vpns: intent.vpns.clone(),
            device_roles,
        })
    }

    /// Derive the switching variables document
    pub async fn switching(&self, intent: &ServiceIntent) -> DeriveResult<SwitchingVariables> {
        let pending = intent.sites.iter().flat_map(move |site| {
            site.switches
                .iter()
                .map(move |serial| self.resolve_switch(site, serial))
        });
        let resolved = try_join_all(pending).await?;

        let mut vlans = Vec::with_capacity(intent.vpns.len());
        for vpn in &intent.vpns {
            vlans.push(self.vlan_record(vpn, &resolved).await?);
        }

        let switches: Vec<SwitchRecord> = resolved
            .iter()
            .map(|switch| SwitchRecord {
                id: switch.device.serial.clone(),
                name: switch.device.name.clone(),
                site: switch.device.site.clone(),
                role: switch.device.role.clone(),
            })
            .collect();

        let present: BTreeSet<String> = switches.iter().map(|s| s.role.clone()).collect();
        let device_roles = self.roles(&present).await?;

        info!(
            "Derived switching variables: {} switch(es), {} VLAN(s), {} role(s)",
            switches.len(),
            vlans.len(),
            device_roles.len()
        );

        Ok(SwitchingVariables {
            switches,
            vlans,
            device_roles,
        })
    }

    async fn roles(&self, present: &BTreeSet<String>) -> DeriveResult<Vec<String>> {
        self.inventory
            .roles_for_device_types_present(present)
            .await
            .map_err(|source| DeriveError::Lookup {
                device: "device roles".to_string(),
                source,
            })
    }

    async fn router_record(
        &self,
        intent: &ServiceIntent,
        site: &Site,
        serial: &str,
    ) -> DeriveResult<RouterRecord> {
        let lookup = |source: LookupError| DeriveError::Lookup {
            device: serial.to_string(),
            source,
        };

        let device = self
            .inventory
            .device_by_serial(serial)
            .await
            .map_err(lookup)?;
        let device_ref = device.reference();
        debug!("Resolving router {} ({}) at site {}", device.name, serial, site.name);

        let system_interface = self
            .inventory
            .interface_by_name_and_device(SYSTEM_INTERFACE_NAME, &device_ref)
            .await
            .map_err(lookup)?;
        let system_address = self.cidr_address(&device, system_interface.id).await?;

        let mut variables =
            RouterVariables::new(site.id, system_address.ip_only(), device.name.clone());

        for (vpn_id, description) in [
            (WAN_VPN_ID, WAN_DESCRIPTION),
            (MANAGEMENT_VPN_ID, MANAGEMENT_DESCRIPTION),
        ] {
            let interface = self
                .inventory
                .interface_by_description_and_device(description, &device_ref)
                .await
                .map_err(lookup)?;
            let address = self.cidr_address(&device, interface.id).await?;
            variables.bind_vpn(vpn_id, interface.name, address.with_mask());
        }

        for vpn in intent.vpns_for(site.site_type) {
            let interface = self
                .inventory
                .interface_by_description_and_device(&vpn.name, &device_ref)
                .await
                .map_err(lookup)?;
            let address = self
                .inventory
                .ip_address_by_interface(interface.id)
                .await
                .map_err(lookup)?;
            variables.bind_vpn(vpn.id, interface.name, address.as_returned());
        }

        Ok(RouterRecord {
            id: device.serial,
            role: device.role,
            variables,
        })
    }

    async fn cidr_address(&self, device: &Device, interface_id: i64) -> DeriveResult<CidrAddress> {
        let address = self
            .inventory
            .ip_address_by_interface(interface_id)
            .await
            .map_err(|source| DeriveError::Lookup {
                device: device.serial.clone(),
                source,
            })?;

        address.cidr().map_err(|source| DeriveError::InvalidAddress {
            device: device.serial.clone(),
            address: address.address.clone(),
            source,
        })
    }

    async fn resolve_switch(&self, site: &Site, serial: &str) -> DeriveResult<ResolvedSwitch> {
        let device = self
            .inventory
            .device_by_serial(serial)
            .await
            .map_err(|source| DeriveError::Lookup {
                device: serial.to_string(),
                source,
            })?;
        debug!("Resolved switch {} ({}) at site {}", device.name, serial, site.name);

        Ok(ResolvedSwitch {
            device,
            site_type: site.site_type,
        })
    }

    /// Collect the switch ports tagged with a VPN's name across all switches
    ///
    /// Ports are deduplicated on `"<family>:<slot/subslot/port>"`; on a
    /// duplicate key the binding seen last wins.
    async fn vlan_record(&self, vpn: &Vpn, switches: &[ResolvedSwitch]) -> DeriveResult<VlanRecord> {
        let tagged = try_join_all(switches.iter().map(move |switch| async move {
            self.inventory
                .interfaces_by_description_and_device(&vpn.name, &switch.device.reference())
                .await
                .map_err(|source| DeriveError::Lookup {
                    device: switch.device.serial.clone(),
                    source,
                })
        }))
        .await?;

        let mut bindings: BTreeMap<String, InterfaceBinding> = BTreeMap::new();
        let mut sites = BTreeSet::new();

        for (switch, interfaces) in switches.iter().zip(tagged) {
            let mut contributed = false;
            for interface in interfaces {
                match parse_interface_name(&interface.name) {
                    Some(binding) => {
                        bindings.insert(binding.key(), binding);
                        contributed = true;
                    }
                    None => debug!(
                        "Skipping {} on {}: not a switch port",
                        interface.name, switch.device.name
                    ),
                }
            }
            if contributed {
                sites.insert(switch.site_type);
            }
        }

        Ok(VlanRecord {
            id: vpn.id,
            name: vpn.name.clone(),
            sites,
            interfaces: bindings.into_values().collect(),
        })
    }
}
