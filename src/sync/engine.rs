use homebase_core::{PullRequest, PullResponse, PushRequest, PushResponse};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{
    ChangeRecorder, Clock, EntityRegistry, PullEngine, PushEngine, SyncError, SystemClock,
    TenantProvider,
};
use crate::db::{ChangeLedger, EntityStore, TrackedRepository};

/// Entry point for the pull and push operations.
///
/// Each call runs in its own transaction: a pull reads one consistent view of
/// the ledger, and a push commits all of its accepted entries together or
/// none of them.
#[derive(Clone)]
pub struct SyncEngine {
    pool: SqlitePool,
    recorder: ChangeRecorder,
    pull: PullEngine,
    push: PushEngine,
}

impl SyncEngine {
    pub fn new(pool: SqlitePool, registry: Arc<EntityRegistry>, clock: Arc<dyn Clock>) -> Self {
        let recorder = ChangeRecorder::new(clock);
        Self {
            pool,
            pull: PullEngine::new(registry.clone()),
            push: PushEngine::new(registry, recorder.clone()),
            recorder,
        }
    }

    /// Engine over every built-in entity kind using the system clock.
    pub fn standard(pool: SqlitePool) -> Self {
        Self::new(
            pool,
            Arc::new(EntityRegistry::standard()),
            Arc::new(SystemClock),
        )
    }

    /// CRUD write path for one kind that records into this engine's ledger.
    pub fn tracked<S: EntityStore>(&self, store: S) -> TrackedRepository<S> {
        TrackedRepository::new(self.pool.clone(), store, self.recorder.clone())
    }

    pub async fn pull(
        &self,
        tenant: &dyn TenantProvider,
        request: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<PullResponse, SyncError> {
        let mut tx = self.pool.begin().await?;
        let response = self
            .pull
            .pull(&mut *tx, tenant.tenant_scope(), request, cancel)
            .await?;
        tx.commit().await?;
        Ok(response)
    }

    pub async fn push(
        &self,
        tenant: &dyn TenantProvider,
        request: &PushRequest,
        cancel: &CancellationToken,
    ) -> Result<PushResponse, SyncError> {
        if request.changes.is_empty() {
            return Ok(PushResponse::default());
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let scope = tenant.tenant_scope();
        let mut tx = self.pool.begin().await?;
        ChangeLedger::lock_for_write(&mut *tx).await?;
        let response = self
            .push
            .push(&mut *tx, scope, &request.changes, cancel)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Push of {} entr(ies) for {:?}: {} applied, {} rejected, {} skipped",
            request.changes.len(),
            scope,
            response.applied_count,
            response.rejected_count,
            response.skipped_count
        );
        Ok(response)
    }
}
