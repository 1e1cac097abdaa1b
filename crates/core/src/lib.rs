//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Request/response values passed between agent, network and cache
//! - Cache store abstraction with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod message;

pub use http;

pub use cache::{CacheDb, CacheStorage, MemoryCacheStorage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use message::{Request, RequestMode, Response, ResponseSource};
