//! Cache inspection tools.
//!
//! Read-only views of the agent's cache stores.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
