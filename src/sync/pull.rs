use homebase_core::{ChangeOperation, EntityKind, PullRequest, PullResponse, Snapshot, SyncChangeEntry};
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{EntityRegistry, SyncError, TenantScope};
use crate::db::{ChangeLedger, ChangeLogEntry};

/// Answers "what changed after cursor X" from the ledger.
#[derive(Clone)]
pub struct PullEngine {
    registry: Arc<EntityRegistry>,
}

impl PullEngine {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the next page of ledger entries visible to `scope`, each
    /// non-delete entry carrying the entity's current snapshot.
    ///
    /// The page holds at most `request.effective_limit()` entries in id
    /// order. `cursor` in the response is the id of the last returned entry,
    /// or the request cursor when nothing matched.
    pub async fn pull(
        &self,
        conn: &mut SqliteConnection,
        scope: TenantScope,
        request: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<PullResponse, SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let cursor = request.cursor();
        let limit = request.effective_limit();

        // One extra row tells whether another page exists.
        let mut entries =
            ChangeLedger::fetch_page(conn, cursor, scope.tenant_id(), request.space_id, limit + 1)
                .await?;
        let has_more = entries.len() as i64 > limit;
        entries.truncate(limit as usize);

        let new_cursor = entries.last().map(|entry| entry.id).unwrap_or(cursor);
        let snapshots = self.hydrate(conn, &entries, cancel).await?;

        let changes: Vec<SyncChangeEntry> = entries
            .into_iter()
            .map(|entry| {
                let data = match entry.operation {
                    ChangeOperation::Deleted => None,
                    _ => snapshots.get(&(entry.entity_kind, entry.entity_id)).cloned(),
                };
                SyncChangeEntry {
                    id: entry.id,
                    entity_kind: entry.entity_kind,
                    entity_id: entry.entity_id,
                    operation: entry.operation,
                    tenant_id: entry.tenant_id,
                    space_id: entry.space_id,
                    timestamp: entry.timestamp,
                    data,
                }
            })
            .collect();

        tracing::debug!(
            "Pulled {} change(s) after cursor {} (next cursor {}, has_more {})",
            changes.len(),
            cursor,
            new_cursor,
            has_more
        );

        Ok(PullResponse {
            changes,
            cursor: new_cursor,
            has_more,
        })
    }

    /// Loads current snapshots for every non-delete entry, one query per
    /// kind. Soft-deleted rows are included; rows that no longer exist are
    /// simply absent from the map.
    async fn hydrate(
        &self,
        conn: &mut SqliteConnection,
        entries: &[ChangeLogEntry],
        cancel: &CancellationToken,
    ) -> Result<HashMap<(EntityKind, Uuid), Snapshot>, SyncError> {
        let mut wanted: BTreeMap<EntityKind, Vec<Uuid>> = BTreeMap::new();
        for entry in entries {
            if entry.operation != ChangeOperation::Deleted {
                wanted.entry(entry.entity_kind).or_default().push(entry.entity_id);
            }
        }

        let mut snapshots = HashMap::new();
        for (kind, mut ids) in wanted {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let handler = match self.registry.lookup(kind) {
                Ok(handler) => handler,
                Err(e) => {
                    tracing::warn!("Pulling {} entries without snapshots: {}", kind, e);
                    continue;
                }
            };

            ids.sort_unstable();
            ids.dedup();
            for record in handler.load_by_ids(conn, &ids).await? {
                snapshots.insert((kind, record.id), record.snapshot);
            }
        }

        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ContactStore, EntityStore, NewChange};
    use crate::sync::test_support::{harness, seed_change, t0};
    use crate::sync::{ChangeRecorder, Clock};
    use homebase_core::sync::to_snapshot;
    use homebase_core::{Contact, ShoppingList, TaskList};

    fn page(cursor: i64, limit: i32) -> PullRequest {
        PullRequest {
            cursor: Some(cursor),
            space_id: None,
            limit: Some(limit),
        }
    }

    #[tokio::test]
    async fn test_has_more_boundary_at_exact_limit() {
        let h = harness().await;
        for _ in 0..5 {
            seed_change(&h.pool, EntityKind::Contact, Uuid::new_v4(), None, t0()).await;
        }

        let response = h
            .engine
            .pull(&TenantScope::System, &page(0, 5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 5);
        assert!(!response.has_more);
        assert_eq!(response.cursor, response.changes[4].id);
    }

    #[tokio::test]
    async fn test_has_more_boundary_one_over_limit() {
        let h = harness().await;
        for _ in 0..6 {
            seed_change(&h.pool, EntityKind::Contact, Uuid::new_v4(), None, t0()).await;
        }

        let response = h
            .engine
            .pull(&TenantScope::System, &page(0, 5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 5);
        assert!(response.has_more);
        assert_eq!(response.cursor, response.changes[4].id);
    }

    #[tokio::test]
    async fn test_chained_pages_equal_single_pull() {
        let h = harness().await;
        for _ in 0..23 {
            seed_change(&h.pool, EntityKind::TaskItem, Uuid::new_v4(), None, t0()).await;
        }
        let cancel = CancellationToken::new();

        let single = h
            .engine
            .pull(&TenantScope::System, &page(0, 23), &cancel)
            .await
            .unwrap();

        for size in [1, 4, 7, 23, 50] {
            let mut cursor = 0;
            let mut collected = Vec::new();
            loop {
                let response = h
                    .engine
                    .pull(&TenantScope::System, &page(cursor, size), &cancel)
                    .await
                    .unwrap();
                collected.extend(response.changes.iter().map(|c| c.id));
                cursor = response.cursor;
                if !response.has_more {
                    break;
                }
            }

            let expected: Vec<i64> = single.changes.iter().map(|c| c.id).collect();
            assert_eq!(collected, expected, "page size {}", size);
        }

        // Pulling past the end returns nothing and keeps the cursor.
        let tail = h
            .engine
            .pull(&TenantScope::System, &page(single.cursor, 10), &cancel)
            .await
            .unwrap();
        assert!(tail.changes.is_empty());
        assert_eq!(tail.cursor, single.cursor);
        assert!(!tail.has_more);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let h = harness().await;
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        let a_entity = Uuid::new_v4();
        let b_entity = Uuid::new_v4();
        let global = Uuid::new_v4();

        seed_change(&h.pool, EntityKind::Contact, a_entity, Some(tenant_a), t0()).await;
        seed_change(&h.pool, EntityKind::Contact, b_entity, Some(tenant_b), t0()).await;
        seed_change(&h.pool, EntityKind::Contact, global, None, t0()).await;
        let cancel = CancellationToken::new();

        let for_b = h
            .engine
            .pull(&TenantScope::Tenant(tenant_b), &PullRequest::default(), &cancel)
            .await
            .unwrap();
        let ids: Vec<Uuid> = for_b.changes.iter().map(|c| c.entity_id).collect();
        assert_eq!(ids, vec![b_entity, global]);

        let for_system = h
            .engine
            .pull(&TenantScope::System, &PullRequest::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(for_system.changes.len(), 3);
    }

    #[tokio::test]
    async fn test_space_filter_excludes_other_and_null_spaces() {
        let h = harness().await;
        let space = Uuid::new_v4();
        let mut conn = h.pool.acquire().await.unwrap();
        for space_id in [Some(space), Some(Uuid::new_v4()), None] {
            ChangeLedger::append(
                &mut conn,
                &NewChange {
                    entity_kind: EntityKind::ShoppingItem,
                    entity_id: Uuid::new_v4(),
                    operation: ChangeOperation::Created,
                    tenant_id: None,
                    space_id,
                    timestamp: t0(),
                },
            )
            .await
            .unwrap();
        }
        drop(conn);

        let request = PullRequest {
            space_id: Some(space),
            ..PullRequest::default()
        };
        let response = h
            .engine
            .pull(&TenantScope::System, &request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 1);
        assert_eq!(response.changes[0].space_id, Some(space));
    }

    #[tokio::test]
    async fn test_snapshots_include_soft_deleted_rows() {
        let h = harness().await;
        let recorder = ChangeRecorder::new(h.clock.clone());
        let contact = Contact::new("Margaret");

        let mut tx = h.pool.begin().await.unwrap();
        ContactStore.insert(&mut *tx, &contact).await.unwrap();
        recorder
            .record_identity(
                &mut *tx,
                EntityKind::Contact,
                contact.id,
                ChangeOperation::Created,
                None,
                None,
            )
            .await
            .unwrap();
        ContactStore
            .mark_deleted(&mut *tx, contact.id, h.clock.now())
            .await
            .unwrap();
        recorder
            .record_identity(
                &mut *tx,
                EntityKind::Contact,
                contact.id,
                ChangeOperation::Deleted,
                None,
                None,
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let response = h
            .engine
            .pull(&TenantScope::System, &PullRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 2);

        let created = &response.changes[0];
        assert_eq!(created.operation, ChangeOperation::Created);
        let data = created.data.as_ref().unwrap();
        assert_eq!(data["display_name"], "Margaret");
        assert!(data.contains_key("deleted_at"));

        assert_eq!(response.changes[1].operation, ChangeOperation::Deleted);
        assert!(response.changes[1].data.is_none());
    }

    #[tokio::test]
    async fn test_missing_row_yields_entry_without_snapshot() {
        let h = harness().await;
        seed_change(&h.pool, EntityKind::Calendar, Uuid::new_v4(), None, t0()).await;

        let response = h
            .engine
            .pull(&TenantScope::System, &PullRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 1);
        assert!(response.changes[0].data.is_none());
    }

    #[tokio::test]
    async fn test_unregistered_kind_yields_entry_without_snapshot() {
        let h = harness().await;
        let list = ShoppingList::new("Hardware");
        let mut conn = h.pool.acquire().await.unwrap();
        crate::db::ShoppingListStore.insert(&mut conn, &list).await.unwrap();
        drop(conn);
        seed_change(&h.pool, EntityKind::ShoppingList, list.id, None, t0()).await;

        let mut registry = EntityRegistry::new();
        registry.register(ContactStore);
        let engine = PullEngine::new(Arc::new(registry));

        let mut conn = h.pool.acquire().await.unwrap();
        let response = engine
            .pull(
                &mut conn,
                TenantScope::System,
                &PullRequest::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 1);
        assert!(response.changes[0].data.is_none());
    }

    #[tokio::test]
    async fn test_hydrates_mixed_kinds_in_one_page() {
        let h = harness().await;
        let contact = Contact::new("Katherine");
        let list = TaskList::new("Launch prep");

        let mut conn = h.pool.acquire().await.unwrap();
        ContactStore.insert(&mut conn, &contact).await.unwrap();
        crate::db::TaskListStore.insert(&mut conn, &list).await.unwrap();
        drop(conn);

        seed_change(&h.pool, EntityKind::Contact, contact.id, None, t0()).await;
        seed_change(&h.pool, EntityKind::TaskList, list.id, None, t0()).await;
        seed_change(&h.pool, EntityKind::Contact, contact.id, None, t0()).await;

        let response = h
            .engine
            .pull(&TenantScope::System, &PullRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.changes.len(), 3);
        assert_eq!(
            response.changes[0].data.as_ref(),
            Some(&to_snapshot(&contact).unwrap())
        );
        assert_eq!(
            response.changes[1].data.as_ref(),
            Some(&to_snapshot(&list).unwrap())
        );
        assert_eq!(response.changes[0].data, response.changes[2].data);
    }

    #[tokio::test]
    async fn test_cancelled_pull() {
        let h = harness().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h
            .engine
            .pull(&TenantScope::System, &PullRequest::default(), &cancel)
            .await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
    }
}
