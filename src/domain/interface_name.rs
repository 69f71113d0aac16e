// Copyright (c) 2025 - Cowboy AI, Inc.
//! Interface Name Recognition
//!
//! Inventory interface names are free text. Switch port bindings only
//! understand two families, `GigabitEthernet<slot>/<subslot>/<port>` and
//! `TenGigabitEthernet<slot>/<subslot>/<port>`; everything else is ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static INTERFACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(GigabitEthernet|TenGigabitEthernet)(\d+/\d+/\d+)")
        .expect("interface pattern is a valid regex")
});

/// Physical interface family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InterfaceFamily {
    GigabitEthernet,
    TenGigabitEthernet,
}

impl InterfaceFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceFamily::GigabitEthernet => "GigabitEthernet",
            InterfaceFamily::TenGigabitEthernet => "TenGigabitEthernet",
        }
    }
}

impl fmt::Display for InterfaceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A switch port: family plus `slot/subslot/port`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceBinding {
    #[serde(rename = "type")]
    pub family: InterfaceFamily,
    pub name: String,
}

impl InterfaceBinding {
    /// Deduplication key, `"<family>:<slot/subslot/port>"`
    pub fn key(&self) -> String {
        format!("{}:{}", self.family, self.name)
    }
}

/// Recognize an interface name, or `None` if it belongs to neither family
///
/// Only the leading part has to match, so subinterfaces such as
/// `GigabitEthernet1/0/5.100` resolve to their parent port.
pub fn parse_interface_name(name: &str) -> Option<InterfaceBinding> {
    let captures = INTERFACE_PATTERN.captures(name)?;
    let family = match &captures[1] {
        "GigabitEthernet" => InterfaceFamily::GigabitEthernet,
        "TenGigabitEthernet" => InterfaceFamily::TenGigabitEthernet,
        _ => return None,
    };

    Some(InterfaceBinding {
        family,
        name: captures[2].to_string(),
    })
}
