// ABOUTME: Local store layout with atomic writes
// ABOUTME: Handles the posts/pages/images directories and frontmatter parsing

use crate::config::SiteSettings;
use crate::model::StoredFrontmatter;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Paths {
    pub posts_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub images_dir: PathBuf,
    /// Public URL prefix under which `images_dir` is served, e.g. `/images`.
    pub image_url_prefix: String,
}

impl Paths {
    pub fn new(site: &SiteSettings) -> Self {
        Paths {
            posts_dir: site.posts_dir.clone(),
            pages_dir: site.pages_dir.clone(),
            images_dir: site.images_dir.clone(),
            image_url_prefix: site.image_url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Rooted layout used by tests and `--site-dir`: `<root>/content/posts`, `<root>/content`,
    /// `<root>/static/images`.
    pub fn under(root: &Path) -> Self {
        Paths {
            posts_dir: root.join("content").join("posts"),
            pages_dir: root.join("content"),
            images_dir: root.join("static").join("images"),
            image_url_prefix: "/images".into(),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.posts_dir, &self.pages_dir, &self.images_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn public_image_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.image_url_prefix, file_name)
    }
}

/// Write via a temp file in the target directory and rename into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    use rand::Rng;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let random: u32 = rand::thread_rng().gen();
    let tmp_path = parent.join(format!(".{:x}.part", random));

    fs::write(&tmp_path, content)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Split `---\n<yaml>\n---\n<body>` into its parts. `None` when there is no frontmatter.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    let end_pos = rest.find("\n---\n")?;
    Some((&rest[..end_pos], &rest[end_pos + 5..]))
}

pub fn read_frontmatter(md_path: &Path) -> Result<Option<StoredFrontmatter>> {
    if !md_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(md_path)?;
    match split_frontmatter(&content) {
        Some((yaml, _)) => Ok(Some(serde_yaml::from_str(yaml)?)),
        None => Ok(None),
    }
}
