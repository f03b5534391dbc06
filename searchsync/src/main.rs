//! Entry point for the searchsync operational binary.
//!
//! ```text
//! searchsync bootstrap         provision missing indices, aliases, and the
//!                              migrations index for every record kind
//! searchsync cutover <Kind>    rebuild one kind's index and switch its alias
//! ```

use std::env;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use searchsync::cutover::cutover;
use searchsync::{Dependencies, IndexingError};
use searchsync_repository::{index_mappings, index_settings, CreateIndexOptions};
use searchsync_shared::RecordKind;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "searchsync failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), IndexingError> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("bootstrap") => {
            let deps = Dependencies::new().await?;
            bootstrap(&deps).await
        }
        Some("cutover") => {
            let kind = args
                .get(1)
                .ok_or_else(|| IndexingError::config("cutover requires a record kind argument"))
                .and_then(|token| {
                    RecordKind::parse(token)
                        .map_err(|e| IndexingError::config(format!("invalid record kind: {}", e)))
                })?;

            let deps = Dependencies::new().await?;
            let destination = cutover(
                &deps.manager,
                kind,
                deps.reindex_slices,
                deps.task_poll_interval,
            )
            .await?;

            info!(index = %destination, "New write index is live");
            Ok(())
        }
        Some(other) => Err(IndexingError::config(format!("unknown command '{}'", other))),
        None => Err(IndexingError::config(
            "usage: searchsync <bootstrap | cutover <Kind>>",
        )),
    }
}

/// Provision every kind's index and alias, plus the migration bookkeeping
/// index. Idempotent: anything already present is left untouched.
async fn bootstrap(deps: &Dependencies) -> Result<(), IndexingError> {
    for kind in RecordKind::ALL {
        let alias = kind.index_alias();
        let name = deps
            .manager
            .create_index(
                alias,
                index_settings(kind),
                index_mappings(kind),
                CreateIndexOptions {
                    skip_if_exists: true,
                    ..CreateIndexOptions::default()
                },
            )
            .await?;
        info!(alias = %alias, index = %name, "Provisioned index");
    }

    let migrations = ensure_migrations_index(deps).await?;
    info!(index = %migrations, "Provisioned migrations index");
    Ok(())
}

/// Provision the migration bookkeeping index, skipped when already present.
async fn ensure_migrations_index(deps: &Dependencies) -> Result<String, IndexingError> {
    let name = searchsync_repository::IndexManager::migrations_index_name("searchsync");
    if deps.manager.index_exists(&name).await? {
        return Ok(name);
    }
    Ok(deps.manager.create_migrations_index("searchsync").await?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
