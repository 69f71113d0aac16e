// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Intent Domain Model
//!
//! Sites and VPNs as declared by the service database. These are read-only
//! inputs to compilation; the compiler never edits them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Namespaced key under which the site collection is exchanged externally
pub const SITES_KEY: &str = "site-service:sites";

/// Namespaced key under which the VPN collection is exchanged externally
pub const VPNS_KEY: &str = "vpn-service:vpns";

/// Kind of site a VPN can be realized at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SiteType {
    /// Data center
    #[serde(rename = "DC")]
    Dc,
    /// Branch office
    Branch,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Dc => "DC",
            SiteType::Branch => "Branch",
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A site and the devices that implement it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub site_type: SiteType,
    /// Router serial numbers, in declaration order
    #[serde(default)]
    pub router: Vec<String>,
    /// Switch serial numbers, in declaration order
    #[serde(default)]
    pub switches: Vec<String>,
}

/// A VPN and the site types it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpn {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sites: Vec<SiteType>,
}

impl Vpn {
    /// Whether this VPN is realized at sites of the given type
    pub fn applies_to(&self, site_type: SiteType) -> bool {
        self.sites.contains(&site_type)
    }
}

/// `{"site-service:sites": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteService {
    #[serde(rename = "site-service:sites")]
    pub sites: Vec<Site>,
}

/// `{"vpn-service:vpns": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnService {
    #[serde(rename = "vpn-service:vpns")]
    pub vpns: Vec<Vpn>,
}

/// Complete service intent: every site and every VPN
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceIntent {
    pub sites: Vec<Site>,
    pub vpns: Vec<Vpn>,
}

impl ServiceIntent {
    pub fn new(sites: SiteService, vpns: VpnService) -> Self {
        Self {
            sites: sites.sites,
            vpns: vpns.vpns,
        }
    }

    /// Parse intent out of a merged service document
    pub fn from_document(document: &Value) -> Result<Self, serde_json::Error> {
        let sites = SiteService::deserialize(document)?;
        let vpns = VpnService::deserialize(document)?;
        Ok(Self::new(sites, vpns))
    }

    /// VPNs realized at a site of the given type, in declaration order
    pub fn vpns_for(&self, site_type: SiteType) -> impl Iterator<Item = &Vpn> {
        self.vpns.iter().filter(move |vpn| vpn.applies_to(site_type))
    }

    /// Total number of declared routers and switches
    pub fn device_count(&self) -> usize {
        self.sites
            .iter()
            .map(|site| site.router.len() + site.switches.len())
            .sum()
    }
}

/// Merge the site and VPN documents into a single service document
///
/// Keys of the VPN document win on collision, mirroring the order in which the
/// two inputs are read.
pub fn merge_documents(site_document: &Value, vpn_document: &Value) -> Value {
    let mut merged = serde_json::Map::new();
    for document in [site_document, vpn_document] {
        if let Value::Object(map) = document {
            for (key, value) in map {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}
