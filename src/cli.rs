// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notion-sync")]
#[command(about = "Mirror a Notion workspace into Hugo posts, pages and images", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to YAML config file (default: ./notion-sync.yaml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Integration token (overrides NOTION_TOKEN and config file)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Database to read documents from (overrides NOTION_DATABASE_ID and config file)
    #[arg(long, global = true)]
    pub database_id: Option<String>,

    /// Site root; uses <dir>/content/posts, <dir>/content and <dir>/static/images
    #[arg(long, global = true)]
    pub site_dir: Option<PathBuf>,

    /// Disable throttling (not recommended)
    #[arg(long, global = true)]
    pub no_throttle: bool,

    /// Throttle range in ms (min:max)
    #[arg(long, global = true, value_parser = parse_throttle_range)]
    pub throttle_ms: Option<(u64, u64)>,
}

fn parse_throttle_range(s: &str) -> Result<(u64, u64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Expected format: min:max".into());
    }

    let min = parts[0].parse().map_err(|_| "Invalid min value")?;
    let max = parts[1].parse().map_err(|_| "Invalid max value")?;

    if min > max {
        return Err("min must be <= max".into());
    }

    Ok((min, max))
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sync all documents (default)
    Sync {
        /// Regenerate every document, even unchanged ones
        #[arg(long)]
        force: bool,

        /// Remove images no longer referenced after syncing
        #[arg(long)]
        clean: bool,
    },

    /// Remove images no longer referenced by any current document
    Clean,

    /// List remote documents with their status and tags
    List,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Sync {
            force: false,
            clean: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_throttle_range_valid() {
        let result = parse_throttle_range("100:300").unwrap();
        assert_eq!(result, (100, 300));
    }

    #[test]
    fn test_parse_throttle_range_invalid() {
        assert!(parse_throttle_range("300:100").is_err());
        assert!(parse_throttle_range("abc:def").is_err());
        assert!(parse_throttle_range("100").is_err());
    }

    #[test]
    fn test_default_command_is_sync() {
        let cli = Cli::parse_from(["notion-sync"]);
        assert!(matches!(
            cli.command(),
            Commands::Sync {
                force: false,
                clean: false
            }
        ));
    }

    #[test]
    fn test_sync_flags() {
        let cli = Cli::parse_from(["notion-sync", "sync", "--force", "--clean", "--no-throttle"]);
        assert!(matches!(
            cli.command(),
            Commands::Sync {
                force: true,
                clean: true
            }
        ));
        assert!(cli.no_throttle);
    }
}
