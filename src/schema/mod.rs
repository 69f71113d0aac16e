// Copyright (c) 2025 - Cowboy AI, Inc.

//! Schema Validator
//!
//! Gate in front of everything derived from intent. A document is checked in
//! two passes:
//!
//! 1. **Structural**: JSON Schema validation against a schema loaded from the
//!    schema directory. `$ref`s to other schema files are resolved through the
//!    fixed module search path (`<schema_dir>/modules`).
//! 2. **Semantic**: invariants JSON Schema cannot express, such as id
//!    uniqueness across sites (see [`invariants`]).
//!
//! Any failure is a [`ValidationError`] and ends the compilation run.

pub mod invariants;

use jsonschema::{Retrieve, Uri};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::domain::{ServiceIntent, SiteType};

/// Validation outcome
pub type ValidationResult = Result<(), ValidationError>;

/// Why a document was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Schema file missing or unreadable
    #[error("Schema {schema} could not be loaded: {reason}")]
    SchemaUnavailable { schema: String, reason: String },

    /// Schema file is not a usable JSON Schema
    #[error("Schema {schema} is invalid: {reason}")]
    InvalidSchema { schema: String, reason: String },

    /// Document does not satisfy the schema; one entry per violated rule
    #[error("Document violates {schema}: {}", .violations.join("; "))]
    Violations {
        schema: String,
        violations: Vec<String>,
    },

    /// Two sites share an id
    #[error("Duplicate site id: {0}")]
    DuplicateSiteId(i64),

    /// Two VPNs share an id
    #[error("Duplicate VPN id: {0}")]
    DuplicateVpnId(i64),

    /// A VPN applies to a site type no site declares
    #[error("VPN {vpn_id} references site type {site_type} which no site declares")]
    UnknownSiteType { vpn_id: i64, site_type: SiteType },

    /// Structurally valid document that still cannot be read as intent
    #[error("Intent cannot be interpreted: {0}")]
    Malformed(String),
}

/// Which schema a document is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    /// Raw service intent (sites + VPNs)
    Services,
    /// Intent merged with the prefixed routing and switching variables
    Variables,
    /// Any other schema file in the schema directory
    Named(String),
}

impl SchemaRef {
    pub fn file_name(&self) -> &str {
        match self {
            SchemaRef::Services => "services.schema.json",
            SchemaRef::Variables => "variables.schema.json",
            SchemaRef::Named(name) => name,
        }
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Resolves `$ref`s to sibling schema files from the module search path
struct ModuleRetriever {
    search_path: PathBuf,
}

impl Retrieve for ModuleRetriever {
    fn retrieve(
        &self,
        uri: &Uri<String>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let file_name = uri
            .as_str()
            .split('#')
            .next()
            .and_then(|without_fragment| without_fragment.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| format!("cannot resolve schema module from {}", uri.as_str()))?;

        let path = self.search_path.join(file_name);
        debug!("Resolving schema module {} from {}", uri.as_str(), path.display());
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| format!("schema module {}: {}", path.display(), e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Loads schemas from a directory and validates documents against them
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema_dir: PathBuf,
    module_path: PathBuf,
}

impl SchemaValidator {
    /// Schemas in `schema_dir`, modules in `schema_dir/modules`
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        let schema_dir = schema_dir.into();
        let module_path = schema_dir.join("modules");
        Self {
            schema_dir,
            module_path,
        }
    }

    pub fn with_module_path(mut self, module_path: impl Into<PathBuf>) -> Self {
        self.module_path = module_path.into();
        self
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    fn load_schema(&self, schema: &SchemaRef) -> Result<Value, ValidationError> {
        let path = self.schema_dir.join(schema.file_name());
        let raw = std::fs::read_to_string(&path).map_err(|e| ValidationError::SchemaUnavailable {
            schema: schema.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        serde_json::from_str(&raw).map_err(|e| ValidationError::InvalidSchema {
            schema: schema.to_string(),
            reason: e.to_string(),
        })
    }

    /// Check `document` against `schema`
    ///
    /// The services schema additionally enforces the intent invariants.
    pub fn validate(&self, schema: &SchemaRef, document: &Value) -> ValidationResult {
        let result = self.check(schema, document);
        match &result {
            Ok(()) => info!("Data validation against {}: success", schema),
            Err(e) => error!("Data validation against {}: failed. {}", schema, e),
        }
        result
    }

    fn check(&self, schema: &SchemaRef, document: &Value) -> ValidationResult {
        let schema_value = self.load_schema(schema)?;
        let validator = jsonschema::options()
            .with_retriever(ModuleRetriever {
                search_path: self.module_path.clone(),
            })
            .build(&schema_value)
            .map_err(|e| ValidationError::InvalidSchema {
                schema: schema.to_string(),
                reason: e.to_string(),
            })?;

        let violations: Vec<String> = validator
            .iter_errors(document)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        if !violations.is_empty() {
            return Err(ValidationError::Violations {
                schema: schema.to_string(),
                violations,
            });
        }

        if *schema == SchemaRef::Services {
            let intent = ServiceIntent::from_document(document)
                .map_err(|e| ValidationError::Malformed(e.to_string()))?;
            invariants::validate_intent(&intent)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas"))
    }

    fn intent() -> Value {
        json!({
            "site-service:sites": [
                {"id": 1, "name": "zurich", "type": "DC", "router": ["SN-R1"], "switches": ["SN-S1"]},
                {"id": 2, "name": "geneva", "type": "Branch", "router": ["SN-R2"], "switches": []}
            ],
            "vpn-service:vpns": [
                {"id": 10, "name": "Guest", "sites": ["DC", "Branch"]}
            ]
        })
    }

    #[test]
    fn test_valid_intent() {
        assert_eq!(validator().validate(&SchemaRef::Services, &intent()), Ok(()));
    }

    #[test]
    fn test_unknown_site_type_is_schema_violation() {
        let mut document = intent();
        document["site-service:sites"][0]["type"] = json!("Campus");

        let err = validator()
            .validate(&SchemaRef::Services, &document)
            .unwrap_err();
        match err {
            ValidationError::Violations { schema, violations } => {
                assert_eq!(schema, "services.schema.json");
                assert_eq!(violations.len(), 1);
                assert!(violations[0].starts_with("/site-service:sites/0/type"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_collection() {
        let document = json!({"site-service:sites": []});
        assert!(matches!(
            validator().validate(&SchemaRef::Services, &document),
            Err(ValidationError::Violations { .. })
        ));
    }

    #[test]
    fn test_duplicate_site_id() {
        let mut document = intent();
        document["site-service:sites"][1]["id"] = json!(1);
        assert_eq!(
            validator().validate(&SchemaRef::Services, &document),
            Err(ValidationError::DuplicateSiteId(1))
        );
    }

    #[test]
    fn test_missing_schema_file() {
        let err = validator()
            .validate(&SchemaRef::Named("nope.schema.json".into()), &intent())
            .unwrap_err();
        assert!(matches!(err, ValidationError::SchemaUnavailable { .. }));
    }

    #[test]
    fn test_missing_module_path() {
        let validator = validator().with_module_path("/nonexistent/modules");
        assert!(validator.validate(&SchemaRef::Services, &intent()).is_err());
    }
}
