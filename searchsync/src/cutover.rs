//! Zero-downtime index cutover.
//!
//! Rebuilds one record kind's index under a fresh timestamped name, copies
//! the documents over with a sliced reindex, verifies the copy, and only
//! then retargets the alias. Readers and writers keep using the alias
//! throughout and never observe a half-built index.
//!
//! The superseded physical index is left in place, still queryable by its
//! physical name, so the operator can roll back or delete it once satisfied.

use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::IndexingError;
use searchsync_repository::{
    index_mappings, index_settings, CreateIndexOptions, IndexManager,
};
use searchsync_shared::RecordKind;

/// Rebuild the index behind `kind`'s alias and atomically switch to it.
///
/// Polls the reindex task until completion with no upper bound; a stuck
/// reindex is surfaced by the cluster's task API, not by this routine
/// timing out underneath a copy that is still making progress.
///
/// # Returns
///
/// The physical name of the new write index.
pub async fn cutover(
    manager: &IndexManager,
    kind: RecordKind,
    slices: i64,
    poll_interval: Duration,
) -> Result<String, IndexingError> {
    let alias = kind.index_alias();

    // A deployment without the alias has a physical index squatting on the
    // alias name; an alias can never be layered on top of that in place.
    if !manager.alias_exists(alias).await? {
        return Err(IndexingError::cutover(format!(
            "alias '{}' does not exist; bootstrap the deployment first",
            alias
        )));
    }

    let source = manager.target_index_name(alias).await?;

    let destination = manager
        .create_index(
            alias,
            index_settings(kind),
            index_mappings(kind),
            CreateIndexOptions {
                index_name: None,
                with_alias: false,
                skip_if_exists: false,
            },
        )
        .await?;

    info!(
        alias = %alias,
        source = %source,
        destination = %destination,
        "Starting cutover"
    );

    let task = manager
        .reindex(&source, &destination, slices, false)
        .await?
        .ok_or_else(|| {
            IndexingError::cutover(format!(
                "reindex from '{}' to '{}' returned no task handle",
                source, destination
            ))
        })?;

    while !manager.task_completed(&task).await? {
        sleep(poll_interval).await;
    }

    manager.refresh_index(&destination).await?;

    let source_count = manager.documents_count(&source).await?;
    let destination_count = manager.documents_count(&destination).await?;
    if source_count != destination_count {
        return Err(IndexingError::cutover(format!(
            "document count mismatch after reindex: '{}' has {}, '{}' has {}",
            source, source_count, destination, destination_count
        )));
    }

    manager.switch_alias(&source, &destination, alias).await?;

    info!(
        alias = %alias,
        source = %source,
        destination = %destination,
        documents = destination_count,
        "Cutover complete"
    );
    Ok(destination)
}
