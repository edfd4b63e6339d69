//! Incremental sync protocol shared by the server and its clients.
//!
//! ## Protocol
//!
//! 1. The server appends one ledger entry per accepted mutation; entry ids
//!    are a global total order.
//! 2. A client pulls with the last ledger id it has consumed (its cursor) and
//!    receives the following entries, each with a current snapshot of the
//!    entity unless it was a delete.
//! 3. A client pushes its own mutations stamped with its wall clock. The
//!    server rejects a mutation whose timestamp is older than the latest
//!    ledger entry for the same entity (last writer wins, ties accepted).

mod conflict;
mod error;
mod protocol;
mod snapshot;

pub use conflict::{resolve, Resolution};
pub use error::SnapshotError;
pub use protocol::{
    ChangeOperation, EntityKind, PullRequest, PullResponse, PushRequest, PushResponse,
    SyncChangeEntry, SyncConflict, SyncPushEntry, DEFAULT_PULL_LIMIT, MAX_PULL_LIMIT,
};
pub use snapshot::{from_snapshot, to_snapshot, Snapshot};
