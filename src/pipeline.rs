// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compilation Pipeline
//!
//! Wires the schema validator, variable deriver, artifact store and change
//! publisher into the three runs the binary exposes:
//!
//! ```text
//! services   intent ─▶ validate(services) ─▶ store(Service)
//! variables  intent ─▶ validate(services) ─▶ derive(routing, switching)
//!                   ─▶ validate(variables) ─▶ store(Routing, Switching)
//! publish    intent ─▶ validate(services) ─▶ branch ─▶ commits ─▶ merge request
//! ```
//!
//! Every run gets a UUID v7 run id attached to its tracing span. Nothing is
//! written unless every step before the write succeeded.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::deriver::VariableDeriver;
use crate::domain::{RoutingVariables, ServiceIntent, SwitchingVariables};
use crate::errors::{PipelineError, PipelineResult};
use crate::inventory::InventoryClient;
use crate::publisher::{ChangePublisher, PublishOutcome};
use crate::schema::{SchemaRef, SchemaValidator, ValidationError};
use crate::source::IntentSource;
use crate::store::{to_document, ArtifactStore, ArtifactTarget};

/// Prefix of routing keys in the variables validation document
pub const ROUTING_PREFIX: &str = "routing";

/// Prefix of switching keys in the variables validation document
pub const SWITCHING_PREFIX: &str = "switching";

/// Validated intent, as a document and as typed values
#[derive(Debug, Clone)]
pub struct LoadedIntent {
    pub document: Value,
    pub intent: ServiceIntent,
}

/// Paths written by a variables run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledVariables {
    pub routing: PathBuf,
    pub switching: PathBuf,
}

/// Flatten `fields` of a serialized struct under `<prefix>:<field>` keys
fn prefixed<T: Serialize>(
    prefix: &str,
    fields: &T,
    into: &mut Map<String, Value>,
) -> Result<(), ValidationError> {
    match serde_json::to_value(fields) {
        Ok(Value::Object(map)) => {
            for (key, value) in map {
                into.insert(format!("{}:{}", prefix, key), value);
            }
            Ok(())
        }
        Ok(other) => Err(ValidationError::Malformed(format!(
            "{} variables serialized to {}",
            prefix, other
        ))),
        Err(e) => Err(ValidationError::Malformed(e.to_string())),
    }
}

/// The intent document extended with `routing:*` and `switching:*` keys
pub fn variables_document(
    intent_document: &Value,
    routing: &RoutingVariables,
    switching: &SwitchingVariables,
) -> Result<Value, ValidationError> {
    let mut merged = match intent_document {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    prefixed(ROUTING_PREFIX, routing, &mut merged)?;
    prefixed(SWITCHING_PREFIX, switching, &mut merged)?;
    Ok(Value::Object(merged))
}

/// Validator plus store for one intent root
#[derive(Debug, Clone)]
pub struct Pipeline {
    validator: SchemaValidator,
    store: ArtifactStore,
}

impl Pipeline {
    pub fn new(validator: SchemaValidator, store: ArtifactStore) -> Self {
        Self { validator, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fetch the merged service document and gate it through the services schema
    pub async fn load_intent(&self, source: &dyn IntentSource) -> PipelineResult<LoadedIntent> {
        let document = source.service_document().await?;
        self.validator.validate(&SchemaRef::Services, &document)?;
        let intent = ServiceIntent::from_document(&document)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Ok(LoadedIntent { document, intent })
    }

    /// Validate intent and persist the merged service document
    pub async fn compile_services(&self, source: &dyn IntentSource) -> PipelineResult<PathBuf> {
        let span = info_span!("compile", run_id = %Uuid::now_v7(), run = "services");
        async {
            let loaded = self.load_intent(source).await?;
            let path = self
                .store
                .write(&ArtifactTarget::Service, &loaded.document)
                .await?;
            info!(
                "Compiled service document: {} site(s), {} VPN(s)",
                loaded.intent.sites.len(),
                loaded.intent.vpns.len()
            );
            Ok::<_, PipelineError>(path)
        }
        .instrument(span)
        .await
    }

    /// Derive, validate and persist the routing and switching documents
    pub async fn compile_variables(
        &self,
        source: &dyn IntentSource,
        inventory: &dyn InventoryClient,
    ) -> PipelineResult<CompiledVariables> {
        let span = info_span!("compile", run_id = %Uuid::now_v7(), run = "variables");
        async {
            let loaded = self.load_intent(source).await?;
            info!(
                "Deriving variables for {} device(s)",
                loaded.intent.device_count()
            );

            let deriver = VariableDeriver::new(inventory);
            let routing = deriver.routing(&loaded.intent).await?;
            let switching = deriver.switching(&loaded.intent).await?;

            let document = variables_document(&loaded.document, &routing, &switching)?;
            self.validator.validate(&SchemaRef::Variables, &document)?;

            let documents = vec![
                (
                    ArtifactTarget::Routing,
                    to_document(&ArtifactTarget::Routing, &routing)?,
                ),
                (
                    ArtifactTarget::Switching,
                    to_document(&ArtifactTarget::Switching, &switching)?,
                ),
            ];
            let compiled = CompiledVariables {
                routing: self.store.path_for(&ArtifactTarget::Routing)?,
                switching: self.store.path_for(&ArtifactTarget::Switching)?,
            };
            self.store.write_all(documents).await?;
            Ok::<_, PipelineError>(compiled)
        }
        .instrument(span)
        .await
    }

    /// Validate intent and propose it as a merge request
    pub async fn publish(
        &self,
        source: &dyn IntentSource,
        publisher: &ChangePublisher<'_>,
    ) -> PipelineResult<PublishOutcome> {
        let span = info_span!("publish", run_id = %Uuid::now_v7());
        async {
            let sites = source.site_document().await?;
            let vpns = source.vpn_document().await?;
            let merged = crate::domain::merge_documents(&sites, &vpns);
            self.validator.validate(&SchemaRef::Services, &merged)?;

            let outcome = publisher.publish(&sites, &vpns).await?;
            info!(
                "Published {}: {} committed, {} unchanged, merge request {}",
                outcome.branch,
                outcome.committed.len(),
                outcome.unchanged.len(),
                outcome.request.state
            );
            Ok::<_, PipelineError>(outcome)
        }
        .instrument(span)
        .await
    }
}
