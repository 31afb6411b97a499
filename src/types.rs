use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of content addressed by a loader request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Page,
    Post,
    Menu,
    Meta,
}

impl Default for ContentType {
    fn default() -> Self { ContentType::Page }
}

/// Which lifecycle phase a fetch descriptor is meant for.
///
/// Only `AsyncData` is consumed inside this crate; the other kinds are
/// tags routed by the hosting runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchHookKind {
    Created,
    AsyncData,
    VoidAsyncData,
}

/// One content item to fetch, addressed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderRequestElement {
    pub slug: String,
    #[serde(default)]
    pub meta: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub embed: bool,
}

impl LoaderRequestElement {
    pub fn from_slug(slug: impl Into<String>) -> Self {
        Self { slug: slug.into(), meta: false, data_name: None, content_type: None, embed: false }
    }

    /// Name the fetched value is stored under. Falls back to the slug.
    pub fn data_name(&self) -> &str {
        self.data_name.as_deref().unwrap_or(&self.slug)
    }
}

/// Returns true iff the value is a JSON object carrying a `slug` key.
///
/// Total over all inputs; anything else (strings, numbers, arrays,
/// null) reports false rather than failing.
pub fn is_loader_request_element(value: &Value) -> bool {
    value.as_object().map(|o| o.contains_key("slug")).unwrap_or(false)
}

/// Item of a multi-element request: a bare slug or a structured element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoaderItem {
    Element(LoaderRequestElement),
    Slug(String),
}

impl LoaderItem {
    /// Normalize to a structured element; bare slugs get defaults.
    pub fn to_element(&self) -> LoaderRequestElement {
        match self {
            LoaderItem::Element(e) => e.clone(),
            LoaderItem::Slug(s) => LoaderRequestElement::from_slug(s.clone()),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            LoaderItem::Element(e) => &e.slug,
            LoaderItem::Slug(s) => s,
        }
    }
}

impl From<&str> for LoaderItem {
    fn from(s: &str) -> Self { LoaderItem::Slug(s.to_string()) }
}

impl From<LoaderRequestElement> for LoaderItem {
    fn from(e: LoaderRequestElement) -> Self { LoaderItem::Element(e) }
}

/// A loader request: one item (bare or structured) or an ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoaderRequest {
    Element(LoaderRequestElement),
    Slug(String),
    List(Vec<LoaderItem>),
}

impl LoaderRequest {
    /// Resolve a raw JSON value into the request union. Uses the
    /// `slug`-key guard to discriminate objects; anything that is not a
    /// string, a slug-bearing object, or a list of those is rejected.
    pub fn from_value(value: &Value) -> Option<LoaderRequest> {
        match value {
            Value::String(s) => Some(LoaderRequest::Slug(s.clone())),
            v if is_loader_request_element(v) => {
                serde_json::from_value(v.clone()).ok().map(LoaderRequest::Element)
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(LoaderItem::Slug(s.clone())),
                        v if is_loader_request_element(v) => {
                            out.push(LoaderItem::Element(serde_json::from_value(v.clone()).ok()?))
                        }
                        _ => return None,
                    }
                }
                Some(LoaderRequest::List(out))
            }
            _ => None,
        }
    }

    /// All requested items in order, normalized to structured elements.
    pub fn elements(&self) -> Vec<LoaderRequestElement> {
        match self {
            LoaderRequest::Slug(s) => vec![LoaderRequestElement::from_slug(s.clone())],
            LoaderRequest::Element(e) => vec![e.clone()],
            LoaderRequest::List(items) => items.iter().map(LoaderItem::to_element).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LoaderRequest::List(items) if items.is_empty())
    }
}

impl From<&str> for LoaderRequest {
    fn from(s: &str) -> Self { LoaderRequest::Slug(s.to_string()) }
}

impl From<String> for LoaderRequest {
    fn from(s: String) -> Self { LoaderRequest::Slug(s) }
}

impl From<LoaderRequestElement> for LoaderRequest {
    fn from(e: LoaderRequestElement) -> Self { LoaderRequest::Element(e) }
}

impl From<Vec<LoaderItem>> for LoaderRequest {
    fn from(items: Vec<LoaderItem>) -> Self { LoaderRequest::List(items) }
}

/// A request element paired with the value fetched for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedContent {
    pub element: LoaderRequestElement,
    pub value: Value,
}

/// The (type, slug) pair whose metadata backs the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaSource {
    pub content_type: ContentType,
    pub slug: String,
}

/// One normalized fetch, derived from a request element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchEntry {
    pub slug: String,
    pub data_name: String,
    pub content_type: ContentType,
    pub embed: bool,
}

/// Ordered fetch plan tagged with the lifecycle phase it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchDescriptor {
    pub hook: FetchHookKind,
    pub entries: Vec<FetchEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn guard_accepts_any_object_with_slug() {
        assert!(is_loader_request_element(&json!({"slug": "about-us"})));
        assert!(is_loader_request_element(&json!({"slug": 42})));
        assert!(is_loader_request_element(&json!({"slug": null, "embed": true})));
    }

    #[test]
    fn guard_rejects_non_objects_and_slugless_objects() {
        assert!(!is_loader_request_element(&json!("about-us")));
        assert!(!is_loader_request_element(&json!(7)));
        assert!(!is_loader_request_element(&json!(null)));
        assert!(!is_loader_request_element(&json!(["slug"])));
        assert!(!is_loader_request_element(&json!({"name": "about-us"})));
    }

    #[test]
    fn from_value_resolves_each_variant() {
        let slug = LoaderRequest::from_value(&json!("about-us")).unwrap();
        assert_eq!(slug, LoaderRequest::Slug("about-us".into()));

        let element = LoaderRequest::from_value(&json!({"slug": "news", "embed": true})).unwrap();
        match element {
            LoaderRequest::Element(e) => {
                assert_eq!(e.slug, "news");
                assert!(e.embed);
                assert!(!e.meta);
            }
            other => panic!("expected element, got {other:?}"),
        }

        let list = LoaderRequest::from_value(&json!(["a", {"slug": "b"}])).unwrap();
        match list {
            LoaderRequest::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].slug(), "a");
                assert_eq!(items[1].slug(), "b");
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn from_value_rejects_malformed_input() {
        assert!(LoaderRequest::from_value(&json!(3)).is_none());
        assert!(LoaderRequest::from_value(&json!({"name": "x"})).is_none());
        assert!(LoaderRequest::from_value(&json!(["ok", 9])).is_none());
    }

    #[test]
    fn elements_preserve_order_and_defaults() {
        let req = LoaderRequest::List(vec![
            LoaderItem::from("a"),
            LoaderItem::from(LoaderRequestElement {
                slug: "b".into(),
                meta: false,
                data_name: Some("section".into()),
                content_type: Some(ContentType::Post),
                embed: true,
            }),
        ]);
        let els = req.elements();
        assert_eq!(els.len(), 2);
        assert_eq!(els[0].slug, "a");
        assert_eq!(els[0].data_name(), "a");
        assert_eq!(els[1].data_name(), "section");
        assert_eq!(els[1].content_type, Some(ContentType::Post));
    }

    #[test]
    fn element_wire_format_uses_type_key() {
        let e: LoaderRequestElement =
            serde_json::from_value(json!({"slug": "team", "type": "post"})).unwrap();
        assert_eq!(e.content_type, Some(ContentType::Post));
        let back = serde_json::to_value(&e).unwrap();
        assert_eq!(back.get("type"), Some(&json!("post")));
    }
}
