use anyhow::{anyhow, Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::{MetaConfig, PluginConfig};
use crate::mapping::{element_from_entry, fetched_from, rest_route};
use crate::options::ResourceOptions;
use crate::types::{ContentType, FetchDescriptor, FetchEntry, FetchedContent, MetaSource};

/// Metadata resolved for a page: title (after template substitution),
/// description, and canonical link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

/// REST client for one WordPress install. Stateless apart from the
/// connection pool inside `reqwest`; safe to share.
pub struct WpClient {
    http: reqwest::Client,
    base: Url,
    prefix: String,
    lang: String,
    meta: MetaConfig,
}

impl WpClient {
    pub fn new(config: &PluginConfig) -> Result<Self> {
        let base = config.base_url()?;
        let http = reqwest::Client::builder().user_agent("presswork/0.1").build()?;
        Ok(Self {
            http,
            base,
            prefix: config.request_prefix().to_string(),
            lang: config.lang.clone(),
            meta: config.meta_config(),
        })
    }

    fn url_for_path(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).with_context(|| format!("building request URL: {joined}"))
    }

    /// Full request URL for one entry. Collection routes are filtered by
    /// slug and language; the menus route addresses the menu directly.
    pub fn endpoint_url(&self, entry: &FetchEntry) -> Result<String> {
        let route = rest_route(entry.content_type);
        if entry.content_type == ContentType::Menu {
            let url = self.url_for_path(&format!("{}/{}/{}", self.prefix, route, entry.slug))?;
            return Ok(url.to_string());
        }
        let mut url = self.url_for_path(&format!("{}/wp/v2/{}", self.prefix, route))?;
        url.query_pairs_mut()
            .append_pair("slug", &entry.slug)
            .append_pair("lang", &self.lang);
        if entry.embed {
            url.query_pairs_mut().append_pair("_embed", "true");
        }
        Ok(url.to_string())
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!(%url, "GET");
        let resp = self.http.get(url).send().await.with_context(|| format!("requesting {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("request to {url} failed with status {status}"));
        }
        resp.json::<Value>().await.with_context(|| format!("decoding response from {url}"))
    }

    /// Fetch one resource, honoring the shaping parameters and lifecycle
    /// hooks in `options`. Collection responses collapse to their first
    /// element; a missing item runs the `before_save_failed` hook if one
    /// is set, otherwise it is an error.
    pub async fn fetch_resource(&self, options: &ResourceOptions) -> Result<Value> {
        let entry = options.to_entry();
        let mut url = self.endpoint_url(&entry)?;
        if entry.content_type != ContentType::Menu {
            let mut parsed = Url::parse(&url)?;
            if !options.fields.is_empty() {
                parsed.query_pairs_mut().append_pair("_fields", &options.fields.join(","));
            }
            if let Some(per_page) = options.per_page {
                parsed.query_pairs_mut().append_pair("per_page", &per_page.to_string());
            }
            url = parsed.to_string();
        }
        if let Some(hook) = &options.before_request {
            url = hook(url);
        }

        let fetched = self.get_json(&url).await;
        let value = match fetched {
            Ok(body) => match unwrap_collection(body, entry.content_type) {
                Some(item) => item,
                None => {
                    return match &options.before_save_failed {
                        Some(hook) => {
                            warn!(slug = %entry.slug, "no content found; using fallback value");
                            Ok(hook())
                        }
                        None => Err(anyhow!(
                            "no {} found for slug '{}'",
                            crate::mapping::kind_str(entry.content_type),
                            entry.slug
                        )),
                    };
                }
            },
            Err(e) => {
                return match &options.before_save_failed {
                    Some(hook) => {
                        warn!(slug = %entry.slug, error = %e, "fetch failed; using fallback value");
                        Ok(hook())
                    }
                    None => Err(e),
                };
            }
        };

        Ok(match &options.before_save {
            Some(hook) => hook(value),
            None => value,
        })
    }

    /// Fetch the item behind one normalized entry.
    pub async fn fetch_entry(&self, entry: &FetchEntry) -> Result<Value> {
        self.fetch_resource(&ResourceOptions::from(entry)).await
    }

    /// Execute a fetch plan: all entries concurrently, results in entry
    /// order, each paired back with its request element.
    pub async fn execute(&self, descriptor: &FetchDescriptor) -> Result<Vec<FetchedContent>> {
        let request_id = uuid::Uuid::new_v4();
        debug!(%request_id, entries = descriptor.entries.len(), "executing fetch plan");
        let fetches = descriptor.entries.iter().map(|entry| self.fetch_entry(entry));
        let values = try_join_all(fetches).await?;
        Ok(descriptor
            .entries
            .iter()
            .zip(values)
            .map(|(entry, value)| fetched_from(element_from_entry(entry), value))
            .collect())
    }

    /// All menus known to the install.
    pub async fn fetch_menus_index(&self) -> Result<Value> {
        let url = self.url_for_path(&format!("{}/{}", self.prefix, rest_route(ContentType::Menu)))?;
        self.get_json(url.as_str()).await
    }

    /// Resolve the metadata payload for a (type, slug) pair.
    pub async fn fetch_meta(&self, source: &MetaSource) -> Result<MetaPayload> {
        let entry = FetchEntry {
            slug: source.slug.clone(),
            data_name: source.slug.clone(),
            content_type: source.content_type,
            embed: false,
        };
        let value = self
            .fetch_resource(
                &ResourceOptions::from(&entry).fields(["title", "excerpt", "link"]),
            )
            .await?;
        Ok(meta_payload_from(&value, &self.meta))
    }
}

// WordPress collection routes answer slug queries with an array.
fn unwrap_collection(body: Value, content_type: ContentType) -> Option<Value> {
    if content_type == ContentType::Menu {
        return Some(body);
    }
    match body {
        Value::Array(mut items) => {
            if items.is_empty() { None } else { Some(items.remove(0)) }
        }
        other => Some(other),
    }
}

// Rendered fields come wrapped as {"rendered": "..."} on full objects.
fn rendered(value: &Value, field: &str) -> Option<String> {
    let v = value.get(field)?;
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("rendered").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn meta_payload_from(value: &Value, config: &MetaConfig) -> MetaPayload {
    let title = rendered(value, "title").map(|t| match &config.title_template {
        Some(template) => template.replace("%s", &t),
        None => t,
    });
    MetaPayload {
        title,
        description: rendered(value, "excerpt"),
        link: value.get("link").and_then(Value::as_str).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> WpClient {
        let mut config = PluginConfig::new(server.url(), "en");
        config.title_template = Some("%s | Example".to_string());
        WpClient::new(&config).unwrap()
    }

    #[test]
    fn endpoint_urls_route_by_content_type() {
        let config = PluginConfig::new("https://cms.example.org", "en");
        let client = WpClient::new(&config).unwrap();

        let page = FetchEntry {
            slug: "about-us".into(),
            data_name: "about-us".into(),
            content_type: ContentType::Page,
            embed: true,
        };
        let url = client.endpoint_url(&page).unwrap();
        assert!(url.starts_with("https://cms.example.org/wp-json/wp/v2/pages?"));
        assert!(url.contains("slug=about-us"));
        assert!(url.contains("lang=en"));
        assert!(url.contains("_embed=true"));

        let menu = FetchEntry {
            slug: "main".into(),
            data_name: "main".into(),
            content_type: ContentType::Menu,
            embed: false,
        };
        assert_eq!(
            client.endpoint_url(&menu).unwrap(),
            "https://cms.example.org/wp-json/menus/v1/menus/main"
        );
    }

    #[tokio::test]
    async fn fetch_resource_unwraps_collection_and_runs_hooks() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/wp-json/wp/v2/pages")
            .match_query(Matcher::UrlEncoded("slug".into(), "about-us".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"slug": "about-us", "title": {"rendered": "About"}}]).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let options = ResourceOptions::new("about-us")
            .before_save(|mut v| {
                v["seen"] = json!(true);
                v
            });
        let value = client.fetch_resource(&options).await.unwrap();
        assert_eq!(value["slug"], "about-us");
        assert_eq!(value["seen"], true);
    }

    #[tokio::test]
    async fn before_request_can_rewrite_the_url() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rewritten")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"ok": true}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let target = format!("{}/rewritten", server.url());
        let options = ResourceOptions::new("anything").before_request(move |_| target.clone());
        let value = client.fetch_resource(&options).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn missing_content_uses_fallback_or_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/wp-json/wp/v2/pages")
            .match_query(Matcher::UrlEncoded("slug".into(), "ghost".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .expect_at_least(2)
            .create_async()
            .await;

        let client = client_for(&server);
        let plain = ResourceOptions::new("ghost");
        assert!(client.fetch_resource(&plain).await.is_err());

        let with_fallback = ResourceOptions::new("ghost").before_save_failed(|| json!({"fallback": true}));
        let value = client.fetch_resource(&with_fallback).await.unwrap();
        assert_eq!(value["fallback"], true);
    }

    #[tokio::test]
    async fn execute_preserves_entry_order() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for slug in ["a", "b"] {
            let mock = server
                .mock("GET", "/wp-json/wp/v2/pages")
                .match_query(Matcher::UrlEncoded("slug".into(), slug.into()))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(json!([{"slug": slug}]).to_string())
                .create_async()
                .await;
            mocks.push(mock);
        }

        let client = client_for(&server);
        let descriptor = crate::hooks::build_async_data(
            &crate::types::LoaderRequest::List(vec!["a".into(), "b".into()]),
            crate::types::FetchHookKind::AsyncData,
        );
        let results = client.execute(&descriptor).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].value["slug"], "a");
        assert_eq!(results[1].value["slug"], "b");
        assert_eq!(results[0].element.data_name(), "a");
    }

    #[tokio::test]
    async fn fetch_meta_applies_title_template() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/wp-json/wp/v2/pages")
            .match_query(Matcher::UrlEncoded("slug".into(), "about-us".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "title": {"rendered": "About"},
                    "excerpt": {"rendered": "Who we are"},
                    "link": "https://cms.example.org/about-us"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let source = MetaSource { content_type: ContentType::Page, slug: "about-us".into() };
        let meta = client.fetch_meta(&source).await.unwrap();
        assert_eq!(meta.title.as_deref(), Some("About | Example"));
        assert_eq!(meta.description.as_deref(), Some("Who we are"));
        assert_eq!(meta.link.as_deref(), Some("https://cms.example.org/about-us"));
    }
}
