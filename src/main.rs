// ABOUTME: CLI entrypoint for notion-sync command
// ABOUTME: Handles logging setup, error exit codes and command dispatch

use clap::Parser;
use notion_sync::{
    api::{NotionClient, RemoteSource},
    auth::resolve_token,
    cli::{Cli, Commands},
    config,
    storage::Paths,
    sync::{DocumentOutcome, SyncOptions, Syncer},
    Result,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notion_sync=info")),
        )
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run() {
        eprintln!("notion-sync: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let mut cfg = config::load(cli.config.as_deref())?;
    cfg.apply_env();
    if let Some(db) = cli.database_id.clone() {
        cfg.notion.database_id = Some(db);
    }
    cfg.validate()?;

    let token = resolve_token(cli.token.clone(), &cfg.notion)?;
    let mut client = NotionClient::new(token, &cfg.notion)?;
    if cli.no_throttle {
        client = client.disable_throttle();
    } else if let Some((min, max)) = cli.throttle_ms {
        client = client.with_throttle(min, max);
    }

    let paths = match &cli.site_dir {
        Some(dir) => Paths::under(dir),
        None => Paths::new(&cfg.site),
    };
    paths.ensure_dirs()?;

    match cli.command() {
        Commands::Sync { force, clean } => {
            let syncer = Syncer::new(&client, &paths)?;
            let report = syncer.sync(SyncOptions {
                force,
                clean_assets: clean,
            })?;

            for outcome in report.skipped() {
                if let DocumentOutcome::Skipped { title, error, .. } = outcome {
                    eprintln!("skipped '{}': {}", title, error);
                }
            }
            println!(
                "Synced {}/{} documents ({} written, {} unchanged, {} images downloaded)",
                report.succeeded(),
                report.total,
                report.written(),
                report.unchanged(),
                report.assets_downloaded()
            );
            if !report.removed_documents.is_empty() {
                println!("Removed {} stale posts", report.removed_documents.len());
            }
            if clean {
                println!("Removed {} unused images", report.removed_assets.len());
            }
            for error in &report.reconcile_errors {
                eprintln!("cleanup incomplete: {}", error);
            }
        }
        Commands::Clean => {
            let docs = client.list_documents()?;
            if docs.is_empty() {
                println!("No documents found; leaving images untouched");
                return Ok(());
            }
            let removed = Syncer::new(&client, &paths)?.cleanup_unused_assets(&docs)?;
            println!("Removed {} unused images", removed.len());
        }
        Commands::List => {
            for doc in client.list_documents()? {
                let status = if doc.is_published() { "published" } else { "draft" };
                let tags = if doc.tags.is_empty() {
                    "-".to_string()
                } else {
                    doc.tags.join(", ")
                };
                println!(
                    "{:<40} {:<10} {:<5} {:<30} {}",
                    doc.title,
                    status,
                    doc.kind.as_str(),
                    doc.slug,
                    tags
                );
            }
        }
    }

    Ok(())
}
