//! Last-writer-wins conflict rule.
//!
//! Clients evaluate the same rule locally to predict which of their pending
//! mutations the server will reject.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accept,
    Reject { server_timestamp: DateTime<Utc> },
}

impl Resolution {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Resolution::Accept)
    }
}

/// Compares a client-asserted timestamp with the timestamp of the latest
/// ledger entry recorded for the same entity.
///
/// Rejects only when the client is strictly older. Equal timestamps are
/// accepted, as is any write to an entity with no ledger history.
pub fn resolve(client_timestamp: DateTime<Utc>, server_latest: Option<DateTime<Utc>>) -> Resolution {
    match server_latest {
        Some(server_timestamp) if client_timestamp < server_timestamp => {
            Resolution::Reject { server_timestamp }
        }
        _ => Resolution::Accept,
    }
}
