use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Which menus to pull on startup. Mirrors the accepted config forms:
/// a bool, a single menu slug, or a list of slugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenusSelection {
    All(bool),
    One(String),
    Many(Vec<String>),
}

impl Default for MenusSelection {
    fn default() -> Self { MenusSelection::All(false) }
}

impl MenusSelection {
    /// Menu slugs to fetch; `None` means "all of them".
    pub fn slugs(&self) -> Option<Vec<String>> {
        match self {
            MenusSelection::All(_) => None,
            MenusSelection::One(slug) => Some(vec![slug.clone()]),
            MenusSelection::Many(slugs) => Some(slugs.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            MenusSelection::All(enabled) => *enabled,
            MenusSelection::One(_) => true,
            MenusSelection::Many(slugs) => !slugs.is_empty(),
        }
    }
}

/// Metadata rendering options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default)]
    pub title_template: Option<String>,
}

/// Configuration for the hosting plugin. The content store is not part
/// of this struct; it is handed to the entry point separately, so the
/// whole config stays safe to serialize and edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub url: String,
    pub lang: String,
    #[serde(default)]
    pub request_prefix: Option<String>,
    #[serde(default)]
    pub menus: MenusSelection,
    #[serde(default)]
    pub title_template: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

/// The subset of [`PluginConfig`] that may change after initial setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditablePluginConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub request_prefix: Option<String>,
    #[serde(default)]
    pub title_template: Option<String>,
    #[serde(default)]
    pub debug: Option<bool>,
}

impl PluginConfig {
    pub fn new(url: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            lang: lang.into(),
            request_prefix: None,
            menus: MenusSelection::default(),
            title_template: None,
            debug: false,
        }
    }

    /// Load from a TOML file, then let `PRESSWORK_*` env vars override.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let mut cfg: PluginConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config file: {}", path.display()))?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("PRESSWORK_URL") {
            if !url.trim().is_empty() { self.url = url; }
        }
        if let Ok(lang) = std::env::var("PRESSWORK_LANG") {
            if !lang.trim().is_empty() { self.lang = lang; }
        }
        if let Ok(prefix) = std::env::var("PRESSWORK_REQUEST_PREFIX") {
            if !prefix.trim().is_empty() { self.request_prefix = Some(prefix); }
        }
    }

    /// REST prefix between the base URL and the wp/v2 namespace.
    pub fn request_prefix(&self) -> &str {
        self.request_prefix.as_deref().unwrap_or("wp-json")
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.url).with_context(|| format!("invalid base URL: {}", self.url))
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        anyhow::ensure!(!self.lang.trim().is_empty(), "config lang must not be empty");
        Ok(())
    }

    /// Apply the editable subset onto this config.
    pub fn apply(&mut self, edit: EditablePluginConfig) {
        if let Some(url) = edit.url { self.url = url; }
        if let Some(lang) = edit.lang { self.lang = lang; }
        if let Some(prefix) = edit.request_prefix { self.request_prefix = Some(prefix); }
        if let Some(template) = edit.title_template { self.title_template = Some(template); }
        if let Some(debug) = edit.debug { self.debug = debug; }
    }

    pub fn meta_config(&self) -> MetaConfig {
        MetaConfig { title_template: self.title_template.clone() }
    }
}
