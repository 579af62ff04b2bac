// ABOUTME: Typed domain models for remote documents and content blocks
// ABOUTME: Also defines the frontmatter schema persisted with each Markdown file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status. Anything other than "draft" (case-insensitive) counts as published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Published,
    Draft,
}

impl DocumentStatus {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("draft") {
            DocumentStatus::Draft
        } else {
            DocumentStatus::Published
        }
    }
}

/// Which local sub-store a document lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Post,
    Page,
}

impl DocumentKind {
    pub fn from_name(name: &str) -> Self {
        if name == "Page" {
            DocumentKind::Page
        } else {
            DocumentKind::Post
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Post => "Post",
            DocumentKind::Page => "Page",
        }
    }
}

/// Snapshot of one remote document, mapped from its property bag at fetch time.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub status: DocumentStatus,
    pub kind: DocumentKind,
    /// `YYYY-MM-DD` or a full timestamp, exactly as the remote supplied it.
    pub date: String,
    pub excerpt: String,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    pub cover_url: Option<String>,
}

impl RemoteDocument {
    pub fn is_published(&self) -> bool {
        self.status == DocumentStatus::Published
    }

    pub fn is_page(&self) -> bool {
        self.kind == DocumentKind::Page
    }
}

/// One inline span of formatted text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub text: String,
    pub link: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        RichText {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<RichText>),
    /// Level is always 1, 2 or 3.
    Heading { level: u8, text: Vec<RichText> },
    BulletedItem(Vec<RichText>),
    NumberedItem(Vec<RichText>),
    Code { language: String, text: Vec<RichText> },
    Image { url: String },
    Unsupported { kind: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub date: String,
    pub lastmod: String,
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub draft: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub notion_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_last_edited: Option<DateTime<Utc>>,
}

impl Frontmatter {
    pub fn for_document(doc: &RemoteDocument, cover: Option<String>) -> Self {
        Frontmatter {
            title: doc.title.clone(),
            date: doc.date.clone(),
            lastmod: doc.last_edited_time.format("%Y-%m-%d").to_string(),
            slug: doc.slug.clone(),
            tags: doc.tags.clone(),
            draft: !doc.is_published(),
            summary: doc.excerpt.clone(),
            description: doc.excerpt.clone(),
            notion_id: doc.id.clone(),
            kind: doc.kind.as_str().to_string(),
            image: cover,
            notion_last_edited: Some(doc.last_edited_time),
        }
    }
}

/// Lenient view of a frontmatter block already on disk. Every field is optional so that
/// hand-edited files still yield whatever keys they do carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredFrontmatter {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub notion_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub notion_last_edited: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub(crate) fn sample_document(slug: &str) -> RemoteDocument {
    RemoteDocument {
        id: format!("id-{}", slug),
        title: format!("Title {}", slug),
        slug: slug.to_string(),
        tags: vec!["rust".into()],
        status: DocumentStatus::Published,
        kind: DocumentKind::Post,
        date: "2025-01-02".into(),
        excerpt: "An excerpt".into(),
        created_time: "2025-01-02T08:00:00Z".parse().unwrap(),
        last_edited_time: "2025-03-04T09:30:00Z".parse().unwrap(),
        cover_url: None,
    }
}
