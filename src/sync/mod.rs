//! Server side of the incremental sync protocol.
//!
//! # Components
//!
//! - [`EntityRegistry`]: maps each entity kind to an [`EntityHandler`] so the
//!   engines can load, insert, overwrite and soft-delete any kind through one
//!   table.
//! - [`ChangeRecorder`]: appends ledger entries, stamped with server time, in
//!   the transaction of the entity write they describe.
//! - [`PullEngine`]: cursor-paged reads of the ledger with current snapshots.
//! - [`PushEngine`]: last-writer-wins application of client mutations.
//! - [`SyncEngine`]: runs each pull or push in its own transaction.
//!
//! # Usage
//!
//! ```no_run
//! # async fn run(pool: sqlx::SqlitePool) -> Result<(), homebase::sync::SyncError> {
//! use homebase::sync::{SyncEngine, TenantScope};
//! use homebase_core::PullRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = SyncEngine::standard(pool);
//! let page = engine
//!     .pull(&TenantScope::System, &PullRequest::default(), &CancellationToken::new())
//!     .await?;
//! println!("{} change(s), next cursor {}", page.changes.len(), page.cursor);
//! # Ok(())
//! # }
//! ```

mod clock;
mod engine;
mod error;
mod pull;
mod push;
mod recorder;
mod registry;
mod tenant;

#[cfg(test)]
mod test_support;

#[cfg(test)]
pub(crate) use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use engine::SyncEngine;
pub use error::SyncError;
pub use pull::PullEngine;
pub use push::PushEngine;
pub use recorder::ChangeRecorder;
pub use registry::{EntityHandler, EntityRecord, EntityRegistry, StoreHandler};
pub use tenant::{TenantProvider, TenantScope};
