//! In-memory cache stores.
//!
//! Same semantics as [`CacheDb`](super::CacheDb) without touching disk.
//! Useful for tests and for hosts that do not persist between runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::compute_cache_key;
use super::storage::{CacheStorage, StoredEntry};
use crate::Error;
use crate::message::{Request, Response};

#[derive(Debug, Default)]
struct MemoryStore {
    entries: HashMap<String, StoredEntry>,
    /// Key hashes in first-insert order.
    order: Vec<String>,
}

impl MemoryStore {
    fn insert(&mut self, entry: StoredEntry) {
        if !self.entries.contains_key(&entry.key_hash) {
            self.order.push(entry.key_hash.clone());
        }
        self.entries.insert(entry.key_hash.clone(), entry);
    }
}

/// Cache stores held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    /// Stores in creation order.
    stores: RwLock<Vec<(String, MemoryStore)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn store_mut<'a>(stores: &'a mut Vec<(String, MemoryStore)>, name: &str) -> &'a mut MemoryStore {
    let index = match stores.iter().position(|(n, _)| n == name) {
        Some(index) => index,
        None => {
            stores.push((name.to_string(), MemoryStore::default()));
            stores.len() - 1
        }
    };
    &mut stores[index].1
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        store_mut(&mut stores, name);
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.stores.read().await.iter().any(|(n, _)| n == name))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().await.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|(n, _)| n != name);
        Ok(stores.len() != before)
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = compute_cache_key(request.method.as_str(), &request.url);
        let stores = self.stores.read().await;
        let entry = stores
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, store)| store.entries.get(&key_hash))
            .filter(|entry| entry.vary_matches(request));

        entry.map(StoredEntry::to_response).transpose()
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let entry = StoredEntry::capture(request, response)?;
        let mut stores = self.stores.write().await;
        store_mut(&mut stores, name).insert(entry);
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let captured = entries
            .iter()
            .map(|(request, response)| StoredEntry::capture(request, response))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stores = self.stores.write().await;
        let store = store_mut(&mut stores, name);
        for entry in captured {
            store.insert(entry);
        }
        Ok(())
    }

    async fn requests(&self, name: &str) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        let urls = stores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, store)| {
                store
                    .order
                    .iter()
                    .filter_map(|key| store.entries.get(key))
                    .map(|entry| entry.url.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(urls)
    }
}
