// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Maps remote, filesystem and per-document failures to exit codes

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status} on {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Failed to download asset {url}: {reason}")]
    AssetDownload { url: String, reason: String },

    #[error("Slug '{slug}' already used by {kept_id}; skipping {dropped_id}")]
    SlugCollision {
        slug: String,
        kept_id: String,
        dropped_id: String,
    },

    #[error("Document {id} has no slug and no title to derive one from")]
    MissingSlug { id: String },

    #[error("Document {id} has slug '{slug}', which is not a plain file name")]
    InvalidSlug { id: String, slug: String },
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Auth(_) => 3,
            Error::Network(_) => 4,
            Error::Api { .. } => 5,
            Error::Parse(_) => 6,
            Error::Yaml(_) => 7,
            Error::Filesystem(_) => 8,
            Error::AssetDownload { .. } => 9,
            Error::SlugCollision { .. } | Error::MissingSlug { .. } | Error::InvalidSlug { .. } => {
                10
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::Auth("test".into()).exit_code(), 3);
        assert_eq!(
            Error::Api {
                endpoint: "test".into(),
                status: 404,
                message: "not found".into()
            }
            .exit_code(),
            5
        );
        assert_eq!(
            Error::MissingSlug { id: "abc".into() }.exit_code(),
            Error::SlugCollision {
                slug: "a".into(),
                kept_id: "1".into(),
                dropped_id: "2".into()
            }
            .exit_code()
        );
    }

    #[test]
    fn test_slug_collision_message_names_both_documents() {
        let err = Error::SlugCollision {
            slug: "hello".into(),
            kept_id: "new".into(),
            dropped_id: "old".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("hello"));
        assert!(msg.contains("new"));
        assert!(msg.contains("old"));
    }
}
