// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service intent compiler
//!
//! Turns a declarative network service intent (sites, VPNs) into the variable
//! documents that drive router and switch configuration, and proposes intent
//! changes to version control for review.
//!
//! ```text
//! intent ─▶ schema ─▶ deriver ◀─ inventory
//!                        │
//!                        ▼
//!                      store            publisher ─▶ version control
//! ```

pub mod config;
pub mod deriver;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod pipeline;
pub mod publisher;
pub mod schema;
pub mod source;
pub mod state_machine;
pub mod store;

// Re-export commonly used types
pub use deriver::{DeriveError, VariableDeriver};
pub use errors::{PipelineError, PipelineResult};
pub use inventory::{InMemoryInventory, InventoryClient, InventorySnapshot, LookupError};
pub use pipeline::{CompiledVariables, Pipeline};
pub use publisher::{ChangePublisher, PublishError, PublishFailure, PublishOutcome, VersionControl};
pub use schema::{SchemaRef, SchemaValidator, ValidationError};
pub use source::{FileIntentSource, IntentSource};
pub use store::{ArtifactStore, ArtifactTarget, PersistenceError};
