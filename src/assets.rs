// ABOUTME: Local image store with identifier-based deduplication
// ABOUTME: Downloads each asset once and rewrites Markdown image references

use crate::identity;
use crate::storage::{write_atomic, Paths};
use crate::{Error, Result};
use rayon::prelude::*;
use regex::Regex;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// A locally materialized asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub identifier: String,
    pub file_name: String,
    pub public_path: String,
    /// False on a dedup hit.
    pub downloaded: bool,
}

/// Result of rewriting the image references in one Markdown body.
#[derive(Debug, Default)]
pub struct InlineRewrite {
    pub markdown: String,
    pub assets: Vec<Asset>,
    /// References left pointing at their remote URL because the download failed.
    pub failures: Vec<Error>,
}

impl InlineRewrite {
    pub fn downloaded(&self) -> usize {
        self.assets.iter().filter(|a| a.downloaded).count()
    }
}

pub struct AssetStore {
    client: Client,
    paths: Paths,
}

impl AssetStore {
    pub fn new(paths: &Paths) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(AssetStore {
            client,
            paths: paths.clone(),
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.paths.images_dir
    }

    /// Return the local asset for `source_url`, downloading it only when no file with the
    /// same identifier exists yet, whichever document first brought it in.
    pub fn materialize(&self, source_url: &str, owning_slug: &str) -> Result<Asset> {
        let identifier = identity::resolve(source_url);

        if let Some(file_name) = self.find_existing(&identifier)? {
            debug!(%identifier, %file_name, "Reusing existing asset");
            return Ok(Asset {
                public_path: self.paths.public_image_path(&file_name),
                identifier,
                file_name,
                downloaded: false,
            });
        }

        let (bytes, content_type) = self.download(source_url)?;
        let file_name = format!(
            "{}-{}{}",
            owning_slug,
            identifier,
            extension_for(content_type.as_deref())
        );
        write_atomic(&self.images_dir().join(&file_name), &bytes)?;
        info!(%file_name, bytes = bytes.len(), "Downloaded asset");

        Ok(Asset {
            public_path: self.paths.public_image_path(&file_name),
            identifier,
            file_name,
            downloaded: true,
        })
    }

    /// First file (by name) matching `*-{identifier}.*`.
    fn find_existing(&self, identifier: &str) -> Result<Option<String>> {
        let dir = self.images_dir();
        if !dir.exists() {
            return Ok(None);
        }
        let needle = format!("-{}.", identifier);
        let mut matches: Vec<String> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.find(&needle).map(|pos| pos > 0).unwrap_or(false))
            .collect();
        matches.sort();
        Ok(matches.into_iter().next())
    }

    fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let download_err = |reason: String| Error::AssetDownload {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .map_err(|e| download_err(e.to_string()))?;
        Ok((bytes.to_vec(), content_type))
    }

    /// Download every remote image referenced in `markdown` and point the references at the
    /// local copies. Downloads run in parallel; substitution keeps the original order. A failed
    /// download leaves its reference untouched.
    pub fn rewrite_inline_images(&self, markdown: &str, owning_slug: &str) -> InlineRewrite {
        let refs: Vec<ImageRef> = image_pattern()
            .captures_iter(markdown)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let url = caps.get(2)?.as_str();
                if !is_remote(url) {
                    return None;
                }
                Some(ImageRef {
                    start: whole.start(),
                    end: whole.end(),
                    alt: caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
                    url,
                })
            })
            .collect();

        let resolved: Vec<Result<Asset>> = refs
            .par_iter()
            .map(|r| self.materialize(r.url, owning_slug))
            .collect();

        let mut out = InlineRewrite::default();
        let mut last = 0;
        for (r, result) in refs.iter().zip(resolved) {
            out.markdown.push_str(&markdown[last..r.start]);
            match result {
                Ok(asset) => {
                    out.markdown
                        .push_str(&format!("![{}]({})", r.alt, asset.public_path));
                    out.assets.push(asset);
                }
                Err(e) => {
                    warn!(url = %r.url, error = %e, "Keeping remote image reference");
                    out.markdown.push_str(&markdown[r.start..r.end]);
                    out.failures.push(e);
                }
            }
            last = r.end;
        }
        out.markdown.push_str(&markdown[last..]);
        out
    }
}

struct ImageRef<'a> {
    start: usize,
    end: usize,
    alt: &'a str,
    url: &'a str,
}

/// `![alt](target)`
pub(crate) fn image_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"))
}

pub(crate) fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let ct = content_type.unwrap_or_default().to_ascii_lowercase();
    if ct.contains("jpeg") || ct.contains("jpg") {
        ".jpg"
    } else if ct.contains("png") {
        ".png"
    } else if ct.contains("gif") {
        ".gif"
    } else if ct.contains("webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
