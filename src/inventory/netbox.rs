// Copyright (c) 2025 - Cowboy AI, Inc.

//! NetBox Inventory Client
//!
//! Implements [`InventoryClient`] against the NetBox REST API. Every call is
//! a filtered `GET`; nothing is ever written back.
//!
//! ```text
//! device_by_serial                      GET /api/dcim/devices/?serial=
//! interface_by_name_and_device          GET /api/dcim/interfaces/?name=&device_id=
//! interface(s)_by_description_and_device GET /api/dcim/interfaces/?description=&device=
//! ip_address_by_interface               GET /api/ipam/ip-addresses/?interface_id=
//! roles_for_device_types_present        GET /api/dcim/device-roles/
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use service_intent::config::NetBoxConfig;
//! use service_intent::inventory::{InventoryClient, NetBoxInventory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NetBoxConfig {
//!         base_url: "https://netbox.example.com".to_string(),
//!         api_token: "your-token-here".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let inventory = NetBoxInventory::new(config)?;
//!     inventory.health_check().await?;
//!     let device = inventory.device_by_serial("FGL2231A0CK").await?;
//!     println!("{} is a {}", device.name, device.role);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    exactly_one, Device, DeviceRef, Interface, InterfaceAddress, InventoryClient, LookupError,
    LookupResult,
};
use crate::config::NetBoxConfig;

/// One page of a NetBox list endpoint
#[derive(Debug, Deserialize)]
struct NetBoxPage<T> {
    #[serde(default)]
    next: Option<String>,
    results: Vec<T>,
}

/// Nested object reference (`{"id": 1, "name": "..."}`)
#[derive(Debug, Clone, Deserialize)]
struct NestedRef {
    id: i64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct NetBoxDevice {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    serial: String,
    /// `role` since NetBox 3.6, `device_role` before
    #[serde(alias = "device_role")]
    role: NestedRef,
    site: NestedRef,
}

impl From<NetBoxDevice> for Device {
    fn from(device: NetBoxDevice) -> Self {
        Device {
            id: device.id,
            name: device.name.unwrap_or_default(),
            serial: device.serial,
            role: device.role.name,
            site: device.site.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NetBoxInterface {
    id: i64,
    device: NestedRef,
    name: String,
    #[serde(default)]
    description: String,
}

impl From<NetBoxInterface> for Interface {
    fn from(interface: NetBoxInterface) -> Self {
        Interface {
            id: interface.id,
            device_id: interface.device.id,
            name: interface.name,
            description: interface.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NetBoxIpAddress {
    id: i64,
    address: String,
    #[serde(default)]
    assigned_object_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct NetBoxRole {
    name: String,
}

/// NetBox-backed [`InventoryClient`]
pub struct NetBoxInventory {
    config: NetBoxConfig,
    client: Client,
}

impl NetBoxInventory {
    /// Build the HTTP client; no request is made until the first lookup
    pub fn new(config: NetBoxConfig) -> LookupResult<Self> {
        info!("Using NetBox inventory at {}", config.base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    "Authorization",
                    format!("Token {}", config.api_token)
                        .parse()
                        .map_err(|e| LookupError::Transport(format!("Invalid API token: {}", e)))?,
                );
                headers.insert(
                    "Accept",
                    "application/json"
                        .parse()
                        .map_err(|e| LookupError::Transport(format!("Invalid header: {}", e)))?,
                );
                headers
            })
            .build()
            .map_err(|e| LookupError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Verify the API answers
    pub async fn health_check(&self) -> LookupResult<()> {
        let url = format!("{}/api/status/", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(format!("NetBox health check failed: {}", e)))?;

        if response.status().is_success() {
            debug!("NetBox health check passed");
            Ok(())
        } else {
            Err(LookupError::Transport(format!(
                "NetBox returned status: {}",
                response.status()
            )))
        }
    }

    /// Fetch every page of a filtered list endpoint
    async fn list<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> LookupResult<Vec<T>> {
        let mut results = Vec::new();
        let mut request = self
            .client
            .get(format!("{}{}", self.config.base_url, endpoint))
            .query(query);

        loop {
            let response = request
                .send()
                .await
                .map_err(|e| LookupError::Transport(format!("NetBox API error: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LookupError::Transport(format!(
                    "NetBox API returned {} for {}: {}",
                    status, endpoint, body
                )));
            }

            let page: NetBoxPage<T> = response.json().await.map_err(|e| LookupError::Malformed {
                kind,
                reason: e.to_string(),
            })?;
            results.extend(page.results);

            match page.next {
                Some(next) => request = self.client.get(next),
                None => break,
            }
        }

        debug!("{} {} result(s) from {}", results.len(), kind, endpoint);
        Ok(results)
    }

    fn device_filter(device: &DeviceRef) -> (&'static str, String) {
        match device {
            DeviceRef::Id(id) => ("device_id", id.to_string()),
            DeviceRef::Name(name) => ("device", name.clone()),
        }
    }

    async fn interfaces(&self, filter: (&'static str, String), device: &DeviceRef) -> LookupResult<Vec<Interface>> {
        let query = [filter, Self::device_filter(device)];
        let interfaces: Vec<NetBoxInterface> =
            self.list("interface", "/api/dcim/interfaces/", &query).await?;
        Ok(interfaces.into_iter().map(Interface::from).collect())
    }
}

#[async_trait]
impl InventoryClient for NetBoxInventory {
    async fn device_by_serial(&self, serial: &str) -> LookupResult<Device> {
        let devices: Vec<NetBoxDevice> = self
            .list(
                "device",
                "/api/dcim/devices/",
                &[("serial", serial.to_string())],
            )
            .await?;
        let device = exactly_one("device", format!("serial={}", serial), devices)?;
        Ok(device.into())
    }

    async fn interface_by_name_and_device(
        &self,
        name: &str,
        device: &DeviceRef,
    ) -> LookupResult<Interface> {
        let matches = self.interfaces(("name", name.to_string()), device).await?;
        exactly_one("interface", format!("name={} {}", name, device), matches)
    }

    async fn interface_by_description_and_device(
        &self,
        description: &str,
        device: &DeviceRef,
    ) -> LookupResult<Interface> {
        let matches = self
            .interfaces_by_description_and_device(description, device)
            .await?;
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
        self.interfaces(("description", description.to_string()), device)
            .await
    }

    async fn ip_address_by_interface(&self, interface_id: i64) -> LookupResult<InterfaceAddress> {
        let addresses: Vec<NetBoxIpAddress> = self
            .list(
                "ip address",
                "/api/ipam/ip-addresses/",
                &[("interface_id", interface_id.to_string())],
            )
            .await?;
        let address = exactly_one(
            "ip address",
            format!("interface_id={}", interface_id),
            addresses,
        )?;

        Ok(InterfaceAddress {
            id: address.id,
            interface_id: address.assigned_object_id.unwrap_or(interface_id),
            address: address.address,
        })
    }

    async fn roles_for_device_types_present(
        &self,
        present: &BTreeSet<String>,
    ) -> LookupResult<Vec<String>> {
        let roles: Vec<NetBoxRole> = self
            .list("device role", "/api/dcim/device-roles/", &[])
            .await?;

        Ok(roles
            .into_iter()
            .map(|role| role.name)
            .filter(|name| present.contains(name))
            .collect())
    }
}
