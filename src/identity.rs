// ABOUTME: Derives stable short identifiers for assets behind signed, expiring URLs
// ABOUTME: Structural URL parsing first, hashing of the stable URL parts as fallback

use regex::Regex;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const IDENTIFIER_LEN: usize = 8;

/// Resolve the identifier for an asset URL. Signature and expiry churn in the query string
/// never changes the result.
pub fn resolve(source_url: &str) -> String {
    match Url::parse(source_url) {
        Ok(url) => hosted_file_id(&url)
            .or_else(|| object_storage_id(&url))
            .unwrap_or_else(|| stable_url_hash(source_url)),
        Err(_) => short_hash(source_url),
    }
}

/// `https://<host>/f/<file-id>/...`, with `f` as the first path segment.
fn hosted_file_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != "f" {
        return None;
    }
    prefix(segments.next()?)
}

/// `https://<bucket>.s3.<region>.amazonaws.com/<owner-id>/<file-id>/<name>?X-Amz-...`
fn object_storage_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if !(host.ends_with("amazonaws.com") && host.contains("s3")) {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.collect();

    // Skip the owner segment.
    if let Some(id) = segments.get(1).and_then(|s| prefix(s)) {
        return Some(id);
    }

    segments
        .iter()
        .find(|s| {
            s.chars().count() >= IDENTIFIER_LEN
                && s.chars().any(|c| c.is_alphabetic())
                && s.chars().any(|c| c.is_ascii_digit())
        })
        .and_then(|s| prefix(s))
}

fn stable_url_hash(source_url: &str) -> String {
    static EXPIRES_SEGMENT: OnceLock<Regex> = OnceLock::new();
    let re = EXPIRES_SEGMENT.get_or_init(|| Regex::new(r"/[^/]*expires[^/]*").expect("valid regex"));

    let without_query = source_url.split(['?', '#']).next().unwrap_or(source_url);
    let stable = re.replace_all(without_query, "");
    short_hash(&stable)
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..IDENTIFIER_LEN].to_string()
}

fn prefix(segment: &str) -> Option<String> {
    if segment.chars().count() < IDENTIFIER_LEN {
        return None;
    }
    Some(segment.chars().take(IDENTIFIER_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_file_url() {
        assert_eq!(
            resolve("https://file.example/f/ABCDEFGH12/img/name.png"),
            "ABCDEFGH"
        );
    }

    #[test]
    fn test_nested_f_segment_is_not_a_hosted_file() {
        let cat = resolve("https://cdn.x/a/f/photos-2024/cat.png");
        let dog = resolve("https://cdn.x/a/f/photos-2024/dog.png");
        assert_ne!(cat, "photos-2");
        assert_ne!(cat, dog);
    }

    #[test]
    fn test_hosted_file_ignores_signature() {
        let a = resolve("https://file.notion.so/f/f/3f2a9c1e-77aa/b1c2/pic.png?table=block&expirationTimestamp=1&signature=aaa");
        let b = resolve("https://file.notion.so/f/f/3f2a9c1e-77aa/b1c2/pic.png?table=block&expirationTimestamp=2&signature=bbb");
        assert_eq!(a, b);
        assert_eq!(a.len(), IDENTIFIER_LEN);
    }

    #[test]
    fn test_object_storage_uses_segment_after_owner() {
        let url = "https://prod-files-secure.s3.us-west-2.amazonaws.com/8f1d2e3c-owner/a1b2c3d4-e5f6-7890/photo.jpg?X-Amz-Expires=3600&X-Amz-Signature=abc";
        assert_eq!(resolve(url), "a1b2c3d4");
    }

    #[test]
    fn test_object_storage_scans_when_file_segment_short() {
        let url = "https://bucket.s3.amazonaws.com/owner/x/img9abcdefg/photo.jpg";
        assert_eq!(resolve(url), "img9abcd");
    }

    #[test]
    fn test_object_storage_resigned_query_is_stable() {
        let a = resolve("https://b.s3.eu-west-1.amazonaws.com/o/abcdef1234/p.png?X-Amz-Date=1&X-Amz-Signature=one");
        let b = resolve("https://b.s3.eu-west-1.amazonaws.com/o/abcdef1234/p.png?X-Amz-Date=2&X-Amz-Signature=two");
        assert_eq!(a, b);
        assert_eq!(a, "abcdef12");
    }

    #[test]
    fn test_fallback_hash_ignores_query_and_expiry_segments() {
        let a = resolve("https://images.example.com/pics/cat.png?sig=1");
        let b = resolve("https://images.example.com/pics/cat.png?sig=2");
        let c = resolve("https://images.example.com/expires=123/pics/cat.png");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), IDENTIFIER_LEN);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fallback_distinguishes_paths() {
        assert_ne!(
            resolve("https://images.example.com/pics/cat.png"),
            resolve("https://images.example.com/pics/dog.png")
        );
    }

    #[test]
    fn test_unparseable_url_hashes_whole_input() {
        let id = resolve("not a url?x=1");
        assert_eq!(id, short_hash("not a url?x=1"));
        assert_ne!(id, short_hash("not a url"));
    }
}
