// ABOUTME: Configuration loader for the remote workspace and the local site layout
// ABOUTME: YAML file with defaults, overridden by environment variables

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "notion-sync.yaml";
pub const DEFAULT_API_BASE: &str = "https://api.notion.com";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notion: NotionSettings,
    #[serde(default)]
    pub site: SiteSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionSettings {
    #[serde(default)]
    pub token: String,
    /// When set, documents come from this database; otherwise from a workspace search.
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_version")]
    pub version: String,
}

impl Default for NotionSettings {
    fn default() -> Self {
        NotionSettings {
            token: String::new(),
            database_id: None,
            api_base: default_api_base(),
            version: default_api_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_posts_dir")]
    pub posts_dir: PathBuf,
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_image_url_prefix")]
    pub image_url_prefix: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        SiteSettings {
            posts_dir: default_posts_dir(),
            pages_dir: default_pages_dir(),
            images_dir: default_images_dir(),
            image_url_prefix: default_image_url_prefix(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.into()
}

fn default_posts_dir() -> PathBuf {
    PathBuf::from("hugo/content/posts")
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("hugo/content")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("hugo/static/images")
}

fn default_image_url_prefix() -> String {
    "/images".into()
}

/// Load configuration from YAML.
/// - An explicit `path` must exist.
/// - With no path, `notion-sync.yaml` is read if present, else defaults are used.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let (path, required) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };

    if !path.exists() {
        if required {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

impl Config {
    /// Apply `NOTION_TOKEN` and `NOTION_DATABASE_ID` over file values.
    pub fn apply_env(&mut self) {
        if let Ok(token) = env::var("NOTION_TOKEN") {
            if !token.trim().is_empty() {
                self.notion.token = token;
            }
        }
        if let Ok(db) = env::var("NOTION_DATABASE_ID") {
            if !db.trim().is_empty() {
                self.notion.database_id = Some(db);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.notion.api_base.trim().is_empty() {
            return Err(Error::Config("notion.api_base must be non-empty".into()));
        }
        if self.notion.version.trim().is_empty() {
            return Err(Error::Config("notion.version must be non-empty".into()));
        }
        if self.site.posts_dir.as_os_str().is_empty()
            || self.site.pages_dir.as_os_str().is_empty()
            || self.site.images_dir.as_os_str().is_empty()
        {
            return Err(Error::Config("site directories must be non-empty".into()));
        }
        if !self.site.image_url_prefix.starts_with('/') {
            return Err(Error::Config(
                "site.image_url_prefix must start with '/'".into(),
            ));
        }
        Ok(())
    }
}
