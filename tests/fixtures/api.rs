//! Annotated API the root build script generates wrappers for. Included by the
//! integration tests as `crate::api`, together with the generated units.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
}

#[recast::recast_sync]
#[recast::recast_async(scoped)]
pub async fn get_user(id: String) -> User {
    tokio::time::sleep(Duration::from_millis(5)).await;
    User {
        name: Some(format!("name-{}", id)),
        id,
    }
}

#[recast::recast_sync]
pub async fn rename(id: String, #[not_null] name: Option<String>) -> User {
    User { id, name }
}

#[recast::recast_sync]
#[recast::recast_async]
pub async fn first<T: Clone>(items: Vec<T>) -> Option<T> {
    tokio::task::yield_now().await;
    items.first().cloned()
}

#[derive(Debug, Clone, Default)]
pub struct UserRepository {
    names: Arc<Mutex<BTreeMap<u64, String>>>,
}

#[recast::recast_async]
impl UserRepository {
    #[recast::recast_sync(suffix = "_blocking")]
    pub async fn insert(&self, id: u64, name: String) -> usize {
        tokio::task::yield_now().await;
        let mut names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        names.insert(id, name);
        names.len()
    }

    pub async fn find(&self, id: u64) -> Option<String> {
        tokio::task::yield_now().await;
        let names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        names.get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.names.lock().map(|names| names.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Cache<K> {
    entries: Arc<Mutex<Vec<K>>>,
}

impl<K> Cache<K> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[recast::recast_sync]
#[recast::recast_async]
impl<K: Clone> Cache<K> {
    pub async fn push(&self, key: K) -> usize {
        tokio::task::yield_now().await;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(key);
        entries.len()
    }

    pub async fn snapshot(&self) -> Vec<K> {
        tokio::task::yield_now().await;
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[recast::recast_async]
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn price(&self, sku: String) -> u32;
}

#[derive(Debug, Clone)]
pub struct FlatCatalog(pub u32);

#[async_trait::async_trait]
impl Catalog for FlatCatalog {
    async fn price(&self, sku: String) -> u32 {
        self.0 * sku.len() as u32
    }
}

#[recast::recast_sync]
#[allow(async_fn_in_trait)]
pub trait Session {
    async fn close(self) -> u32;
}

pub struct CountingSession {
    pub requests: u32,
}

impl Session for CountingSession {
    async fn close(self) -> u32 {
        tokio::task::yield_now().await;
        self.requests
    }
}

include!(concat!(env!("OUT_DIR"), "/crate/api/api_recast.rs"));
include!(concat!(env!("OUT_DIR"), "/crate/api/UserRepository.rs"));
include!(concat!(env!("OUT_DIR"), "/crate/api/Cache.rs"));
include!(concat!(env!("OUT_DIR"), "/crate/api/Catalog.rs"));
include!(concat!(env!("OUT_DIR"), "/crate/api/Session.rs"));
