// Copyright (c) 2025 - Cowboy AI, Inc.
//! Interface Address Value Object
//!
//! Inventory stores every interface address with its mask ("10.0.0.1/24").
//! Downstream templates want two different flavors of that value:
//!
//! - **IP only** (`10.0.0.1`) for the system loopback
//! - **Address with mask** (`10.0.0.1/24`) for transport and service interfaces
//!
//! [`CidrAddress`] keeps both available and makes the caller say which one
//! it means.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Address parsing error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Missing prefix length: {0}")]
    MissingPrefix(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),
}

/// IP address with a mandatory prefix length
///
/// # Examples
///
/// ```rust
/// use service_intent::domain::CidrAddress;
///
/// let address = CidrAddress::new("192.168.1.10/24").unwrap();
/// assert_eq!(address.ip_only(), "192.168.1.10");
/// assert_eq!(address.with_mask(), "192.168.1.10/24");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrAddress {
    address: IpAddr,
    prefix_length: u8,
}

impl CidrAddress {
    /// Parse `address/prefix`
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, AddressError> {
        let cidr = cidr.as_ref();
        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| AddressError::MissingPrefix(cidr.to_string()))?;

        let address = IpAddr::from_str(addr_str)
            .map_err(|_| AddressError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| AddressError::InvalidCidr(cidr.to_string()))?;

        let max_prefix = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_length > max_prefix {
            return Err(AddressError::InvalidPrefixLength(prefix_length));
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Bare address, e.g. `10.255.0.1`
    pub fn ip_only(&self) -> String {
        self.address.to_string()
    }

    /// Address with mask, e.g. `10.255.0.1/32`
    pub fn with_mask(&self) -> String {
        format!("{}/{}", self.address, self.prefix_length)
    }
}

impl fmt::Display for CidrAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.with_mask())
    }
}

impl FromStr for CidrAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CidrAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CidrAddress> for String {
    fn from(value: CidrAddress) -> Self {
        value.with_mask()
    }
}
