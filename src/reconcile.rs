// ABOUTME: Removes local documents and images no longer referenced remotely
// ABOUTME: Driven by what the already-written files contain, not by an in-memory ledger

use crate::assets::has_image_extension;
use crate::model::{RemoteDocument, StoredFrontmatter};
use crate::storage::{read_frontmatter, split_frontmatter, Paths};
use crate::{Error, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct Reconciler {
    paths: Paths,
    local_image_ref: Regex,
}

impl Reconciler {
    pub fn new(paths: &Paths) -> Result<Self> {
        let pattern = format!(
            r"!\[[^\]]*\]\({}/([^)/]+)\)",
            regex::escape(&paths.image_url_prefix)
        );
        let local_image_ref = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("Invalid image URL prefix: {}", e)))?;
        Ok(Reconciler {
            paths: paths.clone(),
            local_image_ref,
        })
    }

    /// Delete every post whose stored slug is not among `current`. Pages are left alone, and
    /// files that can't be read or parsed are skipped rather than deleted.
    pub fn remove_stale_documents(&self, current: &[RemoteDocument]) -> Result<Vec<PathBuf>> {
        let current_slugs: HashSet<&str> = current.iter().map(|d| d.slug.as_str()).collect();
        let mut removed = Vec::new();

        for path in list_files(&self.paths.posts_dir, |p| {
            p.extension().map(|e| e == "md").unwrap_or(false)
        })? {
            let slug = match read_frontmatter(&path) {
                Ok(Some(fm)) => fm.slug.unwrap_or_default(),
                Ok(None) => {
                    debug!(path = %path.display(), "No frontmatter; leaving file");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable post; leaving file");
                    continue;
                }
            };

            if slug.is_empty() || current_slugs.contains(slug.as_str()) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), %slug, "Removed stale post");
                    removed.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale post"),
            }
        }

        Ok(removed)
    }

    /// Image file names referenced by the persisted files of `current` documents, through
    /// inline image syntax or the cover `image` field. A file that exists but can't be read
    /// or parsed is an error: its references are unknown.
    pub fn used_images(&self, current: &[RemoteDocument]) -> Result<HashSet<String>> {
        let prefix = format!("{}/", self.paths.image_url_prefix);
        let mut used = HashSet::new();

        for doc in current {
            let dir = if doc.is_page() {
                &self.paths.pages_dir
            } else {
                &self.paths.posts_dir
            };
            let path = dir.join(format!("{}.md", doc.slug));
            if !path.exists() {
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|e| {
                warn!(path = %path.display(), error = %e, "Failed to read document");
                e
            })?;
            used.extend(
                self.local_image_ref
                    .captures_iter(&content)
                    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string())),
            );

            if let Some((yaml, _)) = split_frontmatter(&content) {
                let fm: StoredFrontmatter = serde_yaml::from_str(yaml).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "Unparseable frontmatter");
                    e
                })?;
                if let Some(name) = fm.image.as_deref().and_then(|i| i.strip_prefix(&prefix)) {
                    used.insert(name.to_string());
                }
            }
        }

        Ok(used)
    }

    /// Delete image files that no current document references. A failed delete is logged and
    /// the pass continues. Nothing is deleted when the used set can't be fully built.
    pub fn remove_unused_assets(&self, current: &[RemoteDocument]) -> Result<Vec<PathBuf>> {
        let used = self.used_images(current)?;
        let existing: BTreeSet<PathBuf> =
            list_files(&self.paths.images_dir, has_image_extension)?
                .into_iter()
                .collect();

        let mut removed = Vec::new();
        for path in existing {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if used.contains(name) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(file = %name, "Removed unused image");
                    removed.push(path);
                }
                Err(e) => warn!(file = %name, error = %e, "Failed to remove image"),
            }
        }

        if removed.is_empty() {
            info!("No unused images to clean up");
        } else {
            info!(count = removed.len(), "Cleaned up unused images");
        }
        Ok(removed)
    }
}

fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && keep(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
