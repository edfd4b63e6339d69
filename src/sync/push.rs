use chrono::{DateTime, Utc};
use homebase_core::sync::resolve;
use homebase_core::{
    ChangeOperation, EntityKind, PushResponse, Resolution, Snapshot, SyncConflict, SyncPushEntry,
};
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ChangeRecorder, EntityHandler, EntityRecord, EntityRegistry, SyncError, TenantScope};
use crate::db::ChangeLedger;

/// What happened to one accepted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Stored and recorded in the ledger.
    Applied,
    /// Accepted, but storage already held the requested state.
    Unchanged,
    Skipped(&'static str),
}

/// Applies client mutations under the last-writer-wins rule.
#[derive(Clone)]
pub struct PushEngine {
    registry: Arc<EntityRegistry>,
    recorder: ChangeRecorder,
}

impl PushEngine {
    pub fn new(registry: Arc<EntityRegistry>, recorder: ChangeRecorder) -> Self {
        Self { registry, recorder }
    }

    /// Processes `entries` in order on `conn`, which must be inside a
    /// transaction the caller commits only when this returns `Ok`.
    ///
    /// An entry is rejected when its timestamp is strictly older than the
    /// latest ledger entry for the same entity as of the start of the call.
    /// Unknown kinds, unusable snapshots, missing update targets and targets
    /// owned by another tenant are skipped and counted in `skipped_count`.
    pub async fn push(
        &self,
        conn: &mut SqliteConnection,
        scope: TenantScope,
        entries: &[SyncPushEntry],
        cancel: &CancellationToken,
    ) -> Result<PushResponse, SyncError> {
        let mut response = PushResponse::default();
        if entries.is_empty() {
            return Ok(response);
        }

        let baseline = self.baseline(conn, entries).await?;

        for entry in entries {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let (kind, handler) = match self.registry.resolve(&entry.entity_kind) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!("Skipping push entry {}: {}", entry.entity_id, e);
                    response.skipped_count += 1;
                    continue;
                }
            };

            // Foreign targets are skipped before the conflict check.
            let existing = handler.load_by_id(conn, entry.entity_id).await?;
            if let Some(existing) = &existing {
                if !scope.can_write(existing.tenant_id) {
                    tracing::warn!(
                        "Skipping {} {} {}: entity belongs to another tenant",
                        entry.operation,
                        kind,
                        entry.entity_id
                    );
                    response.skipped_count += 1;
                    continue;
                }
            }

            let server_latest = baseline.get(&(kind, entry.entity_id)).copied();
            if let Resolution::Reject { server_timestamp } =
                resolve(entry.timestamp, server_latest)
            {
                tracing::debug!(
                    "Rejecting {} {} {}: client {} older than server {}",
                    entry.operation,
                    kind,
                    entry.entity_id,
                    entry.timestamp,
                    server_timestamp
                );
                response.rejected_count += 1;
                response.conflicts.push(SyncConflict {
                    entity_kind: entry.entity_kind.clone(),
                    entity_id: entry.entity_id,
                    client_timestamp: entry.timestamp,
                    server_timestamp,
                });
                continue;
            }

            match self.apply(conn, scope, kind, handler, entry, existing).await {
                Ok(Outcome::Applied) | Ok(Outcome::Unchanged) => response.applied_count += 1,
                Ok(Outcome::Skipped(reason)) => {
                    tracing::warn!(
                        "Skipping {} {} {}: {}",
                        entry.operation,
                        kind,
                        entry.entity_id,
                        reason
                    );
                    response.skipped_count += 1;
                }
                Err(SyncError::Decode(e)) => {
                    tracing::warn!(
                        "Skipping {} {} {}: snapshot does not match schema: {}",
                        entry.operation,
                        kind,
                        entry.entity_id,
                        e
                    );
                    response.skipped_count += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(response)
    }

    /// Latest ledger timestamp per `(kind, id)` named by the batch, read once
    /// before any entry is applied.
    async fn baseline(
        &self,
        conn: &mut SqliteConnection,
        entries: &[SyncPushEntry],
    ) -> Result<HashMap<(EntityKind, Uuid), DateTime<Utc>>, SyncError> {
        let mut by_kind: BTreeMap<EntityKind, Vec<Uuid>> = BTreeMap::new();
        for entry in entries {
            if let Ok(kind) = EntityKind::from_str(&entry.entity_kind) {
                by_kind.entry(kind).or_default().push(entry.entity_id);
            }
        }

        let mut baseline = HashMap::new();
        for (kind, mut ids) in by_kind {
            ids.sort_unstable();
            ids.dedup();
            for (id, timestamp) in ChangeLedger::latest_timestamps(conn, kind, &ids).await? {
                baseline.insert((kind, id), timestamp);
            }
        }

        Ok(baseline)
    }

    /// Applies an accepted entry. `existing` is the stored target, soft-deleted
    /// rows included, already checked as writable by `scope`.
    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        scope: TenantScope,
        kind: EntityKind,
        handler: &dyn EntityHandler,
        entry: &SyncPushEntry,
        existing: Option<EntityRecord>,
    ) -> Result<Outcome, SyncError> {
        match entry.operation {
            ChangeOperation::Created => {
                let Some(data) = entry.data.as_ref() else {
                    return Ok(Outcome::Skipped("created without a snapshot"));
                };

                // A repeated create for a known id becomes an update.
                if let Some(existing) = existing {
                    return self.overwrite(conn, kind, handler, existing, data).await;
                }

                let record = handler
                    .insert(conn, entry.entity_id, data, scope.tenant_id())
                    .await?;
                self.recorder
                    .record(conn, kind, ChangeOperation::Created, &record)
                    .await?;
                Ok(Outcome::Applied)
            }
            ChangeOperation::Updated => {
                let Some(data) = entry.data.as_ref() else {
                    return Ok(Outcome::Skipped("updated without a snapshot"));
                };

                match existing {
                    Some(existing) => self.overwrite(conn, kind, handler, existing, data).await,
                    None => Ok(Outcome::Skipped("update target does not exist")),
                }
            }
            ChangeOperation::Deleted => {
                let Some(existing) = existing else {
                    return Ok(Outcome::Unchanged);
                };
                if existing.is_deleted() {
                    return Ok(Outcome::Unchanged);
                }

                if !handler
                    .mark_deleted(conn, existing.id, self.recorder.now())
                    .await?
                {
                    return Ok(Outcome::Unchanged);
                }
                self.recorder
                    .record(conn, kind, ChangeOperation::Deleted, &existing)
                    .await?;
                Ok(Outcome::Applied)
            }
        }
    }

    async fn overwrite(
        &self,
        conn: &mut SqliteConnection,
        kind: EntityKind,
        handler: &dyn EntityHandler,
        existing: EntityRecord,
        data: &Snapshot,
    ) -> Result<Outcome, SyncError> {
        if handler.canonicalize(existing.id, data)? == existing.snapshot {
            return Ok(Outcome::Unchanged);
        }

        let record = handler.overwrite_scalars(conn, &existing, data).await?;
        self.recorder
            .record(conn, kind, ChangeOperation::Updated, &record)
            .await?;
        Ok(Outcome::Applied)
    }
}
