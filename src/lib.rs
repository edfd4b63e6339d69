//! Homebase server library.
//!
//! SQLite persistence for the organizer's entities and change ledger, the
//! incremental sync engine built on them, and the HTTP adapter that exposes
//! pull and push.

pub mod config;
pub mod db;
pub mod server;
pub mod sync;

pub use config::Config;
pub use db::init_db;
pub use sync::{SyncEngine, SyncError};
