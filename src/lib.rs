pub mod client;
pub mod config;
pub mod db;
pub mod hooks;
pub mod mapping;
pub mod options;
pub mod store;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::client::{MetaPayload, WpClient};
    pub use crate::config::{EditablePluginConfig, MenusSelection, MetaConfig, PluginConfig};
    pub use crate::hooks::{async_data, build_async_data, pick_meta_source, AsyncDataHook, MetaMixin};
    pub use crate::options::{ResourceOptions, SlugSource};
    pub use crate::store::{ContentStore, MemoryStore};
    pub use crate::types::{
        is_loader_request_element, ContentType, FetchDescriptor, FetchEntry, FetchHookKind,
        FetchedContent, LoaderItem, LoaderRequest, LoaderRequestElement, MetaSource,
    };
    pub use crate::{ContentStats, LoadOutcome, Presswork};
}

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::client::{MetaPayload, WpClient};
use crate::config::{EditablePluginConfig, PluginConfig};
use crate::db::{CacheStats, Database};
use crate::mapping::{cache_key, element_from_entry, entry_from_element, fetched_from};
use crate::options::ResourceOptions;
use crate::store::{ContentStore, MemoryStore};
use crate::types::{
    ContentType, FetchEntry, FetchedContent, LoaderRequest, LoaderRequestElement, MetaSource,
};

/// Result of running a loader request: the fetched values in request
/// order, plus resolved metadata when the hook carried a mixin.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub data: Vec<FetchedContent>,
    pub meta: Option<MetaPayload>,
}

/// Counts reported by [`Presswork::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentStats {
    pub cache: CacheStats,
    pub store_keys: usize,
}

/// Async library entry point. Owns the cache database, the REST client,
/// and a handle to the content store.
pub struct Presswork {
    db: Database,
    client: WpClient,
    store: Arc<dyn ContentStore>,
    config: PluginConfig,
    // Caching TTL (seconds)
    content_ttl_secs: i64,
}

impl Presswork {
    /// Initialize with an in-memory store. Connects the cache database
    /// and (optionally) runs migrations.
    pub async fn connect(
        config: PluginConfig,
        database_url: Option<&str>,
        run_migrations: bool,
    ) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()), database_url, run_migrations).await
    }

    /// Initialize with a caller-supplied content store.
    pub async fn with_store(
        config: PluginConfig,
        store: Arc<dyn ContentStore>,
        database_url: Option<&str>,
        run_migrations: bool,
    ) -> Result<Self> {
        config.validate()?;
        let db = Database::connect(database_url).await?;
        if run_migrations { db.run_migrations().await?; }
        let client = WpClient::new(&config)?;
        // TTL via env with default
        let content_ttl_secs = std::env::var("PRESSWORK_CONTENT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);
        Ok(Self { db, client, store, config, content_ttl_secs })
    }

    pub fn config(&self) -> &PluginConfig { &self.config }

    pub fn store(&self) -> Arc<dyn ContentStore> { self.store.clone() }

    /// Apply the editable config subset and rebuild the client with it.
    pub fn update_config(&mut self, edit: EditablePluginConfig) -> Result<()> {
        self.config.apply(edit);
        self.config.validate()?;
        self.client = WpClient::new(&self.config)?;
        Ok(())
    }

    /// Run a loader request: build the async-data hook, fetch every
    /// entry (cache-aware), save values into the store under their data
    /// names, and resolve metadata when requested.
    pub async fn load(&self, request: &LoaderRequest, set_meta: bool) -> Result<LoadOutcome> {
        let hook = hooks::async_data(request, set_meta);
        let entries = &hook.async_data().entries;
        let mut data = Vec::with_capacity(entries.len());
        for entry in entries {
            let value = self.fetch_entry_cached(entry, false).await?;
            self.store.save(&entry.data_name, value.clone()).await?;
            data.push(fetched_from(element_from_entry(entry), value));
        }

        let meta = match hook.mixins() {
            Some(mixins) => Some(self.client.fetch_meta(&mixins[0].source).await?),
            None => None,
        };
        Ok(LoadOutcome { data, meta })
    }

    /// Fetch a page by slug with caching; saves into the store.
    pub async fn fetch_page_cached(&self, slug: &str, refresh: bool) -> Result<Value> {
        self.fetch_kind_cached(ContentType::Page, slug, refresh).await
    }

    /// Fetch a post by slug with caching; saves into the store.
    pub async fn fetch_post_cached(&self, slug: &str, refresh: bool) -> Result<Value> {
        self.fetch_kind_cached(ContentType::Post, slug, refresh).await
    }

    /// Fetch one menu by slug; saves into the store.
    pub async fn fetch_menu(&self, slug: &str) -> Result<Value> {
        self.fetch_kind_cached(ContentType::Menu, slug, false).await
    }

    /// Fetch a resource with full per-resource options. Lifecycle hooks
    /// run inside the client; `force_refetch` bypasses the cache.
    pub async fn fetch_resource(&self, options: &ResourceOptions) -> Result<Value> {
        let entry = options.to_entry();
        let key = cache_key(&self.config.lang, &entry);
        let now = current_epoch();
        if !options.force_refetch {
            if let Some(value) = self.cached_value(&key, now).await {
                self.store.save(&entry.data_name, value.clone()).await?;
                return Ok(value);
            }
        }
        let value = self.client.fetch_resource(options).await?;
        let payload = serde_json::to_string(&value)?;
        let _ = self.db.put_cache(&key, &payload, now + self.content_ttl_secs).await;
        self.store.save(&entry.data_name, value.clone()).await?;
        Ok(value)
    }

    /// Resolve page metadata for a slug.
    pub async fn fetch_meta(&self, content_type: ContentType, slug: &str) -> Result<MetaPayload> {
        let source = MetaSource { content_type, slug: slug.to_string() };
        self.client.fetch_meta(&source).await
    }

    /// Fetch the menus named in the config. With `menus = true` the
    /// whole index lands in the store under `menus`; named menus land
    /// under their own slugs.
    pub async fn load_menus(&self) -> Result<Vec<FetchedContent>> {
        if !self.config.menus.is_enabled() {
            return Ok(Vec::new());
        }
        match self.config.menus.slugs() {
            Some(slugs) => {
                let mut out = Vec::with_capacity(slugs.len());
                for slug in slugs {
                    let mut element = LoaderRequestElement::from_slug(slug);
                    element.content_type = Some(ContentType::Menu);
                    let entry = entry_from_element(&element);
                    let value = self.fetch_entry_cached(&entry, false).await?;
                    self.store.save(&entry.data_name, value.clone()).await?;
                    out.push(fetched_from(element, value));
                }
                Ok(out)
            }
            None => {
                let value = self.client.fetch_menus_index().await?;
                self.store.save("menus", value.clone()).await?;
                let mut element = LoaderRequestElement::from_slug("menus");
                element.content_type = Some(ContentType::Menu);
                Ok(vec![fetched_from(element, value)])
            }
        }
    }

    /// Clear cache entries by prefix. Returns number of rows removed.
    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        self.db.clear_cache_prefix(prefix).await
    }

    /// Vacuum/compact the cache database (SQLite only; no-op on others).
    pub async fn vacuum_db(&self) -> Result<()> { self.db.vacuum().await }

    pub async fn stats(&self) -> Result<ContentStats> {
        let cache = self.db.cache_stats(current_epoch()).await?;
        let store_keys = self.store.keys().await?.len();
        Ok(ContentStats { cache, store_keys })
    }

    // --- helpers ---

    async fn cached_value(&self, key: &str, now: i64) -> Option<Value> {
        let payload = self.db.get_cache(key, now).await.ok().flatten()?;
        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!(%key, "cache hit");
                Some(value)
            }
            Err(_) => None,
        }
    }

    async fn fetch_entry_cached(&self, entry: &FetchEntry, refresh: bool) -> Result<Value> {
        let key = cache_key(&self.config.lang, entry);
        let now = current_epoch();
        if !refresh {
            if let Some(value) = self.cached_value(&key, now).await {
                return Ok(value);
            }
        }
        let value = self.client.fetch_entry(entry).await?;
        let payload = serde_json::to_string(&value)?;
        let _ = self.db.put_cache(&key, &payload, now + self.content_ttl_secs).await;
        Ok(value)
    }

    async fn fetch_kind_cached(&self, content_type: ContentType, slug: &str, refresh: bool) -> Result<Value> {
        let mut element = LoaderRequestElement::from_slug(slug);
        element.content_type = Some(content_type);
        let entry = entry_from_element(&element);
        let value = self.fetch_entry_cached(&entry, refresh).await?;
        self.store.save(&entry.data_name, value.clone()).await?;
        Ok(value)
    }
}

fn current_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn presswork_for(server: &mockito::ServerGuard, dir: &tempfile::TempDir) -> Presswork {
        let config = PluginConfig::new(server.url(), "en");
        let path = dir.path().join("presswork.db");
        let url = format!("sqlite:///{}?mode=rwc", path.to_string_lossy());
        Presswork::connect(config, Some(&url), true).await.unwrap()
    }

    async fn mock_page(server: &mut mockito::ServerGuard, slug: &str, hits: usize) -> mockito::Mock {
        server
            .mock("GET", "/wp-json/wp/v2/pages")
            .match_query(Matcher::UrlEncoded("slug".into(), slug.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"slug": slug, "title": {"rendered": slug.to_uppercase()}}]).to_string())
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn load_saves_each_entry_under_its_data_name() {
        let mut server = mockito::Server::new_async().await;
        let _a = mock_page(&mut server, "home", 1).await;
        let _b = mock_page(&mut server, "about-us", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let pw = presswork_for(&server, &dir).await;

        let request = LoaderRequest::List(vec![
            "home".into(),
            crate::types::LoaderItem::Element(LoaderRequestElement {
                slug: "about-us".into(),
                meta: false,
                data_name: Some("about".into()),
                content_type: None,
                embed: false,
            }),
        ]);
        let outcome = pw.load(&request, false).await.unwrap();
        assert_eq!(outcome.data.len(), 2);
        assert!(outcome.meta.is_none());

        let store = pw.store();
        assert!(store.get("home").await.unwrap().is_some());
        assert!(store.get("about").await.unwrap().is_some());
        assert!(store.get("about-us").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_with_meta_resolves_the_picked_source() {
        let mut server = mockito::Server::new_async().await;
        // one hit for the data fetch, one for the meta fields fetch
        let _m = mock_page(&mut server, "about-us", 2).await;
        let dir = tempfile::tempdir().unwrap();
        let pw = presswork_for(&server, &dir).await;

        let outcome = pw.load(&LoaderRequest::from("about-us"), true).await.unwrap();
        let meta = outcome.meta.expect("meta resolved");
        assert_eq!(meta.title.as_deref(), Some("ABOUT-US"));
    }

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_page(&mut server, "home", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let pw = presswork_for(&server, &dir).await;

        pw.load(&LoaderRequest::from("home"), false).await.unwrap();
        pw.load(&LoaderRequest::from("home"), false).await.unwrap();
        mock.assert_async().await;

        let stats = pw.stats().await.unwrap();
        assert_eq!(stats.cache.entries, 1);
        assert_eq!(stats.store_keys, 1);
    }

    #[tokio::test]
    async fn force_refetch_bypasses_the_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_page(&mut server, "news", 2).await;
        let dir = tempfile::tempdir().unwrap();
        let pw = presswork_for(&server, &dir).await;

        let options = ResourceOptions::new("news").force_refetch(true);
        pw.fetch_resource(&options).await.unwrap();
        pw.fetch_resource(&options).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_config_rebuilds_the_client() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_page(&mut server, "home", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let mut pw = {
            let config = PluginConfig::new("https://unreachable.invalid", "en");
            let path = dir.path().join("presswork.db");
            let url = format!("sqlite:///{}?mode=rwc", path.to_string_lossy());
            Presswork::connect(config, Some(&url), true).await.unwrap()
        };

        pw.update_config(EditablePluginConfig { url: Some(server.url()), ..Default::default() })
            .unwrap();
        let value = pw.fetch_page_cached("home", false).await.unwrap();
        assert_eq!(value["slug"], "home");
    }
}
