// Copyright (c) 2025 - Cowboy AI, Inc.
//! Intent Invariants
//!
//! Rules over the whole intent document that a per-item JSON Schema cannot
//! check. All functions are pure and stop at the first violation.
//!
//! # Rules
//!
//! 1. Site ids are unique
//! 2. VPN ids are unique
//! 3. Every site type a VPN applies to is the type of at least one site

use std::collections::BTreeSet;

use super::{ValidationError, ValidationResult};
use crate::domain::{ServiceIntent, Site, SiteType, Vpn};

/// Validate site ids are unique
pub fn validate_unique_site_ids(sites: &[Site]) -> ValidationResult {
    let mut seen = BTreeSet::new();
    for site in sites {
        if !seen.insert(site.id) {
            return Err(ValidationError::DuplicateSiteId(site.id));
        }
    }
    Ok(())
}

/// Validate VPN ids are unique
pub fn validate_unique_vpn_ids(vpns: &[Vpn]) -> ValidationResult {
    let mut seen = BTreeSet::new();
    for vpn in vpns {
        if !seen.insert(vpn.id) {
            return Err(ValidationError::DuplicateVpnId(vpn.id));
        }
    }
    Ok(())
}

/// Validate every VPN site type is declared by some site
pub fn validate_vpn_site_types(intent: &ServiceIntent) -> ValidationResult {
    let declared: BTreeSet<SiteType> = intent.sites.iter().map(|s| s.site_type).collect();
    for vpn in &intent.vpns {
        if let Some(site_type) = vpn.sites.iter().find(|t| !declared.contains(*t)) {
            return Err(ValidationError::UnknownSiteType {
                vpn_id: vpn.id,
                site_type: *site_type,
            });
        }
    }
    Ok(())
}

/// Run every intent invariant
pub fn validate_intent(intent: &ServiceIntent) -> ValidationResult {
    validate_unique_site_ids(&intent.sites)?;
    validate_unique_vpn_ids(&intent.vpns)?;
    validate_vpn_site_types(intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: i64, site_type: SiteType) -> Site {
        Site {
            id,
            name: format!("site-{}", id),
            site_type,
            router: vec![],
            switches: vec![],
        }
    }

    fn vpn(id: i64, sites: Vec<SiteType>) -> Vpn {
        Vpn {
            id,
            name: format!("vpn-{}", id),
            sites,
        }
    }

    #[test]
    fn test_valid_intent() {
        let intent = ServiceIntent {
            sites: vec![site(1, SiteType::Dc), site(2, SiteType::Branch)],
            vpns: vec![vpn(10, vec![SiteType::Dc, SiteType::Branch])],
        };
        assert!(validate_intent(&intent).is_ok());
    }

    #[test]
    fn test_duplicate_vpn_id() {
        let intent = ServiceIntent {
            sites: vec![site(1, SiteType::Dc)],
            vpns: vec![vpn(10, vec![SiteType::Dc]), vpn(10, vec![SiteType::Dc])],
        };
        assert_eq!(
            validate_intent(&intent),
            Err(ValidationError::DuplicateVpnId(10))
        );
    }

    #[test]
    fn test_vpn_site_type_without_site() {
        let intent = ServiceIntent {
            sites: vec![site(1, SiteType::Dc)],
            vpns: vec![vpn(20, vec![SiteType::Dc, SiteType::Branch])],
        };
        assert_eq!(
            validate_intent(&intent),
            Err(ValidationError::UnknownSiteType {
                vpn_id: 20,
                site_type: SiteType::Branch
            })
        );
    }

    #[test]
    fn test_empty_intent_is_valid() {
        assert!(validate_intent(&ServiceIntent::default()).is_ok());
    }
}
