//! Named, versioned cache stores of request/response pairs.
//!
//! Two backends implement [`CacheStorage`]:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, entries cascade with their store
//! - [`MemoryCacheStorage`]: process memory, for tests and ephemeral hosts
//!
//! Entries are keyed by SHA-256 of method and fragment-less URL, and further
//! constrained by the request headers the response's `Vary` names.

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod storage;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryCacheStorage;
pub use storage::{CacheStorage, StoredEntry};
