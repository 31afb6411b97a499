use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::{ContentType, FetchEntry};

/// Slug for a resource fetch: fixed up front or produced at request time.
#[derive(Clone)]
pub enum SlugSource {
    Literal(String),
    Provider(Arc<dyn Fn() -> String + Send + Sync>),
}

impl SlugSource {
    pub fn resolve(&self) -> String {
        match self {
            SlugSource::Literal(s) => s.clone(),
            SlugSource::Provider(f) => f(),
        }
    }
}

impl fmt::Debug for SlugSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugSource::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            SlugSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl From<&str> for SlugSource {
    fn from(s: &str) -> Self { SlugSource::Literal(s.to_string()) }
}

impl From<String> for SlugSource {
    fn from(s: String) -> Self { SlugSource::Literal(s) }
}

pub type SaveHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type RequestHook = Arc<dyn Fn(String) -> String + Send + Sync>;
pub type SaveFailedHook = Arc<dyn Fn() -> Value + Send + Sync>;

/// Per-resource fetch configuration: slug, shaping parameters, and the
/// lifecycle hooks run around a fetch.
#[derive(Clone)]
pub struct ResourceOptions {
    pub slug: SlugSource,
    pub content_type: Option<ContentType>,
    pub embed: bool,
    pub fields: Vec<String>,
    pub per_page: Option<u32>,
    pub before_save: Option<SaveHook>,
    pub before_request: Option<RequestHook>,
    pub before_save_failed: Option<SaveFailedHook>,
    pub force_refetch: bool,
}

impl ResourceOptions {
    pub fn new(slug: impl Into<SlugSource>) -> Self {
        Self {
            slug: slug.into(),
            content_type: None,
            embed: false,
            fields: Vec::new(),
            per_page: None,
            before_save: None,
            before_request: None,
            before_save_failed: None,
            force_refetch: false,
        }
    }

    pub fn content_type(mut self, ct: ContentType) -> Self {
        self.content_type = Some(ct);
        self
    }

    pub fn embed(mut self, embed: bool) -> Self {
        self.embed = embed;
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn per_page(mut self, n: u32) -> Self {
        self.per_page = Some(n);
        self
    }

    pub fn force_refetch(mut self, force: bool) -> Self {
        self.force_refetch = force;
        self
    }

    pub fn before_save(mut self, hook: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.before_save = Some(Arc::new(hook));
        self
    }

    pub fn before_request(mut self, hook: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.before_request = Some(Arc::new(hook));
        self
    }

    pub fn before_save_failed(mut self, hook: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.before_save_failed = Some(Arc::new(hook));
        self
    }

    /// View of these options as a normalized fetch entry.
    pub fn to_entry(&self) -> FetchEntry {
        let slug = self.slug.resolve();
        FetchEntry {
            data_name: slug.clone(),
            slug,
            content_type: self.content_type.unwrap_or_default(),
            embed: self.embed,
        }
    }
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("slug", &self.slug)
            .field("content_type", &self.content_type)
            .field("embed", &self.embed)
            .field("fields", &self.fields)
            .field("per_page", &self.per_page)
            .field("force_refetch", &self.force_refetch)
            .finish_non_exhaustive()
    }
}

impl From<&FetchEntry> for ResourceOptions {
    fn from(entry: &FetchEntry) -> Self {
        ResourceOptions::new(entry.slug.clone())
            .content_type(entry.content_type)
            .embed(entry.embed)
    }
}
