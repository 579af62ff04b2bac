// ABOUTME: Serializes a document's frontmatter and body into the local store
// ABOUTME: Routes posts and pages to their sub-stores by document type

use crate::assets::{image_pattern, is_remote};
use crate::model::{Frontmatter, RemoteDocument};
use crate::storage::{read_frontmatter, split_frontmatter, write_atomic, Paths};
use crate::Result;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub struct ContentWriter {
    paths: Paths,
}

impl ContentWriter {
    pub fn new(paths: &Paths) -> Self {
        ContentWriter {
            paths: paths.clone(),
        }
    }

    /// `{posts_dir}/{slug}.md` or `{pages_dir}/{slug}.md`.
    pub fn target_path(&self, doc: &RemoteDocument) -> PathBuf {
        let dir = if doc.is_page() {
            &self.paths.pages_dir
        } else {
            &self.paths.posts_dir
        };
        dir.join(format!("{}.md", doc.slug))
    }

    pub fn render(doc: &RemoteDocument, body: &str, cover: Option<String>) -> Result<String> {
        let frontmatter = Frontmatter::for_document(doc, cover);
        let yaml = serde_yaml::to_string(&frontmatter)?;
        Ok(format!("---\n{}---\n\n{}\n", yaml, body))
    }

    pub fn write(&self, doc: &RemoteDocument, body: &str, cover: Option<String>) -> Result<PathBuf> {
        let path = self.target_path(doc);
        let content = Self::render(doc, body, cover)?;
        write_atomic(&path, content.as_bytes())?;
        info!(path = %path.display(), "Wrote document");
        Ok(path)
    }

    /// Whether the file on disk already reflects this exact remote revision with every asset
    /// resolved locally and still present in the image store.
    pub fn is_current(&self, doc: &RemoteDocument) -> bool {
        let path = self.target_path(doc);
        let stored = match read_frontmatter(&path) {
            Ok(Some(fm)) => fm,
            _ => return false,
        };
        if stored.notion_id.as_deref() != Some(doc.id.as_str())
            || stored.notion_last_edited != Some(doc.last_edited_time)
        {
            return false;
        }
        match stored.image.as_deref() {
            Some(cover) if !self.local_image_exists(cover) => return false,
            None if doc.cover_url.is_some() => return false,
            _ => {}
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return false,
        };
        let body = split_frontmatter(&content).map(|(_, b)| b).unwrap_or("");
        image_pattern()
            .captures_iter(body)
            .filter_map(|caps| caps.get(2))
            .all(|m| !is_remote(m.as_str()) && self.local_image_exists(m.as_str()))
    }

    /// References outside the image prefix are not ours to check and count as present.
    fn local_image_exists(&self, public_path: &str) -> bool {
        let prefix = format!("{}/", self.paths.image_url_prefix);
        match public_path.strip_prefix(&prefix) {
            Some(name) => self.paths.images_dir.join(name).is_file(),
            None => true,
        }
    }
}
