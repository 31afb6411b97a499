use crate::types::{ContentType, FetchEntry, FetchedContent, LoaderRequestElement};

pub fn kind_str(ct: ContentType) -> &'static str {
    match ct {
        ContentType::Page => "page",
        ContentType::Post => "post",
        ContentType::Menu => "menu",
        ContentType::Meta => "meta",
    }
}

/// REST route segment under the wp/v2 namespace for a content type.
/// Menus go through the extended menus route; meta is read off the
/// owning item rather than a dedicated collection.
pub fn rest_route(ct: ContentType) -> &'static str {
    match ct {
        ContentType::Page | ContentType::Meta => "pages",
        ContentType::Post => "posts",
        ContentType::Menu => "menus/v1/menus",
    }
}

pub fn entry_from_element(e: &LoaderRequestElement) -> FetchEntry {
    FetchEntry {
        slug: e.slug.clone(),
        data_name: e.data_name().to_string(),
        content_type: e.content_type.unwrap_or_default(),
        embed: e.embed,
    }
}

pub fn element_from_entry(entry: &FetchEntry) -> LoaderRequestElement {
    LoaderRequestElement {
        slug: entry.slug.clone(),
        meta: false,
        data_name: Some(entry.data_name.clone()),
        content_type: Some(entry.content_type),
        embed: entry.embed,
    }
}

pub fn fetched_from(element: LoaderRequestElement, value: serde_json::Value) -> FetchedContent {
    FetchedContent { element, value }
}

/// Cache key for one entry: `lang|kind|slug`.
pub fn cache_key(lang: &str, entry: &FetchEntry) -> String {
    format!("{}|{}|{}", lang, kind_str(entry.content_type), entry.slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_defaults_to_page_and_slug_name() {
        let e = LoaderRequestElement::from_slug("about-us");
        let entry = entry_from_element(&e);
        assert_eq!(entry.content_type, ContentType::Page);
        assert_eq!(entry.data_name, "about-us");
        assert!(!entry.embed);
    }

    #[test]
    fn cache_keys_separate_lang_and_kind() {
        let mut e = LoaderRequestElement::from_slug("news");
        e.content_type = Some(ContentType::Post);
        let entry = entry_from_element(&e);
        assert_eq!(cache_key("en", &entry), "en|post|news");
        assert_eq!(cache_key("de", &entry), "de|post|news");
    }
}
