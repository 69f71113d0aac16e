// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Intent CLI
//!
//! Compiles service intent into deployment variables and publishes intent
//! changes as merge requests.
//!
//! ```text
//! service-intent services                     validate + store service document
//! service-intent variables                    derive routing/switching from NetBox
//! service-intent variables --inventory-snapshot inventory.json
//! service-intent publish [--from-service-db]  branch, commit, merge request
//! ```
//!
//! Configuration comes from the environment (`NETBOX_URL`, `NETBOX_TOKEN`,
//! `GITLAB_URL`, `GITLAB_TOKEN`, `GITLAB_PROJECT_ID`, `SERVICE_DB_URL`,
//! `INTENT_ROOT`, `SCHEMA_DIR`); path flags override it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use service_intent::config::{
    GitLabConfig, NetBoxConfig, PathsConfig, PublisherConfig, ServiceDbConfig,
};
use service_intent::inventory::{InMemoryInventory, InventoryClient, InventorySnapshot, NetBoxInventory};
use service_intent::publisher::{ChangePublisher, GitLabClient};
use service_intent::source::{FileIntentSource, IntentSource, RestconfIntentSource};
use service_intent::{ArtifactStore, Pipeline, SchemaValidator};

#[derive(Parser)]
#[command(name = "service-intent")]
#[command(version)]
#[command(about = "Compile network service intent into deployment variables")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root holding services/ inputs and compiled artifacts
    #[arg(long, global = true)]
    intent_root: Option<PathBuf>,

    /// Directory holding the schemas and their modules/
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate intent and store the merged service document
    Services,

    /// Derive and store routing and switching variables
    Variables {
        /// Read inventory from a JSON snapshot instead of NetBox
        #[arg(long)]
        inventory_snapshot: Option<PathBuf>,
    },

    /// Propose the current intent as a merge request
    Publish {
        /// Read intent from the service database instead of local files
        #[arg(long)]
        from_service_db: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut paths = PathsConfig::from_env();
    if let Some(root) = cli.intent_root {
        paths.intent_root = root;
    }
    if let Some(dir) = cli.schema_dir {
        paths.schema_dir = dir;
    }
    info!(
        "Intent root {}, schemas {}",
        paths.intent_root.display(),
        paths.schema_dir.display()
    );

    let pipeline = Pipeline::new(
        SchemaValidator::new(&paths.schema_dir),
        ArtifactStore::new(&paths.intent_root),
    );
    let files = FileIntentSource::new(&paths.intent_root);

    match cli.command {
        Commands::Services => {
            let path = pipeline
                .compile_services(&files)
                .await
                .context("Service compilation failed")?;
            info!("Service document written to {}", path.display());
        }

        Commands::Variables { inventory_snapshot } => {
            let inventory: Box<dyn InventoryClient> = match inventory_snapshot {
                Some(path) => {
                    let snapshot = InventorySnapshot::load(&path)
                        .await
                        .with_context(|| format!("Failed to load {}", path.display()))?;
                    Box::new(InMemoryInventory::new(snapshot))
                }
                None => {
                    let config = NetBoxConfig::from_env().context("NetBox configuration")?;
                    Box::new(
                        NetBoxInventory::new(config).context("Failed to create NetBox client")?,
                    )
                }
            };

            let compiled = pipeline
                .compile_variables(&files, inventory.as_ref())
                .await
                .context("Variable compilation failed")?;
            info!(
                "Variables written to {} and {}",
                compiled.routing.display(),
                compiled.switching.display()
            );
        }

        Commands::Publish { from_service_db } => {
            let gitlab = GitLabConfig::from_env().context("GitLab configuration")?;
            let vcs = GitLabClient::new(gitlab.clone()).context("Failed to create GitLab client")?;
            let publisher = ChangePublisher::new(&vcs, PublisherConfig::from_env())
                .with_paths(gitlab.site_service_path, gitlab.vpn_service_path);

            let source: Box<dyn IntentSource> = if from_service_db {
                let config = ServiceDbConfig::from_env().context("Service database configuration")?;
                Box::new(
                    RestconfIntentSource::new(config)
                        .context("Failed to create service database client")?,
                )
            } else {
                Box::new(files)
            };

            let outcome = pipeline
                .publish(source.as_ref(), &publisher)
                .await
                .context("Publication failed")?;
            info!(
                "Merge request for {} is {}",
                outcome.branch, outcome.request.state
            );
            if let Some(url) = outcome.request.web_url {
                info!("Review at {}", url);
            }
        }
    }

    Ok(())
}
