// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for a compilation or publication run

use thiserror::Error;

use crate::config::ConfigError;
use crate::deriver::DeriveError;
use crate::publisher::PublishFailure;
use crate::schema::ValidationError;
use crate::source::IntentError;
use crate::store::PersistenceError;

/// Any failure that ends a run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration missing or unparseable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Intent could not be obtained
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// Intent or compiled variables rejected by a schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Inventory lookup failed while deriving variables
    #[error(transparent)]
    Derive(#[from] DeriveError),

    /// Artifact could not be written or read
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Change publication failed
    #[error(transparent)]
    Publish(#[from] PublishFailure),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
