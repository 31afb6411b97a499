use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mapping::entry_from_element;
use crate::types::{
    ContentType, FetchDescriptor, FetchHookKind, LoaderRequest, MetaSource,
};

/// Descriptor attached to a page to pull metadata for one (type, slug).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaMixin {
    pub source: MetaSource,
}

impl MetaMixin {
    pub fn new(content_type: ContentType, slug: impl Into<String>) -> Self {
        Self { source: MetaSource { content_type, slug: slug.into() } }
    }
}

/// Result of building an async-data hook: either just the fetch plan,
/// or the fetch plan plus metadata mixins. The two states are distinct
/// variants so consumers cannot conflate "no metadata requested" with
/// an empty mixin list. On the wire a `Plain` hook has no `mixins` key
/// at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AsyncDataHook {
    WithMeta {
        #[serde(rename = "asyncData")]
        async_data: FetchDescriptor,
        mixins: Vec<MetaMixin>,
    },
    Plain {
        #[serde(rename = "asyncData")]
        async_data: FetchDescriptor,
    },
}

impl AsyncDataHook {
    pub fn async_data(&self) -> &FetchDescriptor {
        match self {
            AsyncDataHook::Plain { async_data } => async_data,
            AsyncDataHook::WithMeta { async_data, .. } => async_data,
        }
    }

    pub fn mixins(&self) -> Option<&[MetaMixin]> {
        match self {
            AsyncDataHook::Plain { .. } => None,
            AsyncDataHook::WithMeta { mixins, .. } => Some(mixins),
        }
    }
}

/// Normalize a loader request into an ordered fetch plan for the given
/// lifecycle phase. Bare slugs become page fetches stored under their
/// own slug; list order is preserved.
pub fn build_async_data(request: &LoaderRequest, kind: FetchHookKind) -> FetchDescriptor {
    let entries = request.elements().iter().map(entry_from_element).collect();
    FetchDescriptor { hook: kind, entries }
}

/// Pick which item's metadata backs the current page.
///
/// Single requests name themselves; for a list the first element with
/// the `meta` flag wins, else the first item. An empty list has nothing
/// to pick from.
pub fn pick_meta_source(request: &LoaderRequest) -> Option<MetaSource> {
    let elements = request.elements();
    let chosen = elements.iter().find(|e| e.meta).or_else(|| elements.first())?;
    Some(MetaSource {
        content_type: chosen.content_type.unwrap_or_default(),
        slug: chosen.slug.clone(),
    })
}

/// Build the async-data hook for a request, optionally deriving page
/// metadata from the same request.
pub fn async_data(request: &LoaderRequest, set_meta: bool) -> AsyncDataHook {
    let descriptor = build_async_data(request, FetchHookKind::AsyncData);
    if set_meta {
        match pick_meta_source(request) {
            Some(source) => {
                let mixin = MetaMixin::new(source.content_type, source.slug);
                return AsyncDataHook::WithMeta { async_data: descriptor, mixins: vec![mixin] };
            }
            None => warn!("meta requested for an empty loader request; skipping mixin"),
        }
    }
    AsyncDataHook::Plain { async_data: descriptor }
}
