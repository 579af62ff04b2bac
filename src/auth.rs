// ABOUTME: Integration token discovery with precedence chain
// ABOUTME: CLI flag → NOTION_TOKEN env var → config file

use crate::config::NotionSettings;
use crate::{Error, Result};

/// `settings` is expected to have had `Config::apply_env` applied already, so its token
/// carries the env-over-file precedence.
pub fn resolve_token(cli_token: Option<String>, settings: &NotionSettings) -> Result<String> {
    if let Some(token) = cli_token.filter(|t| !t.trim().is_empty()) {
        return Ok(token);
    }

    if !settings.token.trim().is_empty() {
        return Ok(settings.token.clone());
    }

    Err(Error::Auth(
        "No integration token found. Provide via --token, NOTION_TOKEN env var, or notion.token in the config file".into(),
    ))
}
