use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Destination for fetched content, keyed by data name. The hosting
/// application supplies its own implementation; [`MemoryStore`] is the
/// default.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save(&self, data_name: &str, value: Value) -> Result<()>;
    async fn get(&self, data_name: &str) -> Result<Option<Value>>;
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-process store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn save(&self, data_name: &str, value: Value) -> Result<()> {
        let mut map = self.inner.lock().expect("store mutex poisoned");
        map.insert(data_name.to_string(), value);
        Ok(())
    }

    async fn get(&self, data_name: &str) -> Result<Option<Value>> {
        let map = self.inner.lock().expect("store mutex poisoned");
        Ok(map.get(data_name).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let map = self.inner.lock().expect("store mutex poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = MemoryStore::new();
        store.save("about-us", json!({"title": "About"})).await.unwrap();
        let got = store.get("about-us").await.unwrap().unwrap();
        assert_eq!(got["title"], "About");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_existing_key() {
        let store = MemoryStore::new();
        store.save("menu", json!(1)).await.unwrap();
        store.save("menu", json!(2)).await.unwrap();
        assert_eq!(store.get("menu").await.unwrap().unwrap(), json!(2));
        assert_eq!(store.keys().await.unwrap(), vec!["menu"]);
    }
}
