// ABOUTME: Core sync logic: fetch, convert, resolve assets, write, reconcile
// ABOUTME: Isolates failures per document and reports aggregate counts

use crate::{
    api::RemoteSource,
    assets::AssetStore,
    convert::blocks_to_markdown,
    model::RemoteDocument,
    reconcile::Reconciler,
    storage::Paths,
    writer::ContentWriter,
    Error, Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Regenerate documents even when the local file matches the remote revision.
    pub force: bool,
    /// Run the unused-image cleanup after writing.
    pub clean_assets: bool,
}

#[derive(Debug)]
pub enum DocumentOutcome {
    Written {
        slug: String,
        path: PathBuf,
        assets_downloaded: usize,
        /// Images left pointing at their remote URL, plus a failed cover.
        asset_failures: usize,
    },
    Unchanged {
        slug: String,
    },
    Skipped {
        id: String,
        title: String,
        error: Error,
    },
}

/// Summary of a completed run. A run that could not list documents returns `Err` instead.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub total: usize,
    pub outcomes: Vec<DocumentOutcome>,
    pub removed_documents: Vec<PathBuf>,
    pub removed_assets: Vec<PathBuf>,
    /// Reconciliation passes that failed. They leave files in place and never fail the run.
    pub reconcile_errors: Vec<Error>,
}

impl SyncReport {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Written { .. }))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Unchanged { .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Skipped { .. }))
    }

    pub fn assets_downloaded(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                DocumentOutcome::Written {
                    assets_downloaded, ..
                } => *assets_downloaded,
                _ => 0,
            })
            .sum()
    }

    /// Documents that are in the local store after this run.
    pub fn succeeded(&self) -> usize {
        self.written() + self.unchanged()
    }
}

pub struct Syncer<'a, S: RemoteSource> {
    source: &'a S,
    assets: AssetStore,
    writer: ContentWriter,
    reconciler: Reconciler,
}

impl<'a, S: RemoteSource> Syncer<'a, S> {
    pub fn new(source: &'a S, paths: &Paths) -> Result<Self> {
        Ok(Syncer {
            source,
            assets: AssetStore::new(paths)?,
            writer: ContentWriter::new(paths),
            reconciler: Reconciler::new(paths)?,
        })
    }

    pub fn sync(&self, options: SyncOptions) -> Result<SyncReport> {
        info!("Starting sync");
        let docs = self.source.list_documents()?;

        if docs.is_empty() {
            info!("No documents found");
            return Ok(SyncReport::default());
        }
        log_overview(&docs);

        let mut report = SyncReport {
            total: docs.len(),
            ..Default::default()
        };
        match self.reconciler.remove_stale_documents(&docs) {
            Ok(removed) => report.removed_documents = removed,
            Err(error) => {
                warn!(%error, "Stale document removal failed; leaving posts in place");
                report.reconcile_errors.push(error);
            }
        }

        let mut claims = claim_slugs(&docs);

        let pb = ProgressBar::new(docs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40}] {pos}/{len} docs")
                .expect("static progress template")
                .progress_chars("##-"),
        );

        for doc in &docs {
            let outcome = match claims.remove(doc.id.as_str()) {
                Some(Err(e)) => Err(e),
                _ => self.sync_document(doc, options.force),
            };
            let outcome = outcome.unwrap_or_else(|error| {
                warn!(id = %doc.id, title = %doc.title, %error, "Skipping document");
                DocumentOutcome::Skipped {
                    id: doc.id.clone(),
                    title: doc.title.clone(),
                    error,
                }
            });
            report.outcomes.push(outcome);
            pb.inc(1);
        }

        pb.finish_with_message(format!(
            "synced {} docs ({} written, {} unchanged)",
            report.total,
            report.written(),
            report.unchanged()
        ));
        info!(
            total = report.total,
            written = report.written(),
            unchanged = report.unchanged(),
            skipped = report.skipped().count(),
            "Sync complete"
        );

        if options.clean_assets {
            match self.cleanup_unused_assets(&docs) {
                Ok(removed) => report.removed_assets = removed,
                Err(error) => {
                    warn!(%error, "Image cleanup failed; leaving images in place");
                    report.reconcile_errors.push(error);
                }
            }
        }

        Ok(report)
    }

    /// fetch blocks → convert → cover → inline images → write
    pub fn sync_document(&self, doc: &RemoteDocument, force: bool) -> Result<DocumentOutcome> {
        check_slug(doc)?;
        if !force && self.writer.is_current(doc) {
            return Ok(DocumentOutcome::Unchanged {
                slug: doc.slug.clone(),
            });
        }

        let blocks = self.source.fetch_blocks(&doc.id)?;
        let markdown = blocks_to_markdown(&blocks);

        let mut assets_downloaded = 0;
        let mut asset_failures = 0;

        let cover = match &doc.cover_url {
            Some(url) => match self.assets.materialize(url, &doc.slug) {
                Ok(asset) => {
                    assets_downloaded += usize::from(asset.downloaded);
                    Some(asset.public_path)
                }
                Err(e) => {
                    warn!(slug = %doc.slug, error = %e, "Omitting cover image");
                    asset_failures += 1;
                    None
                }
            },
            None => None,
        };

        let rewrite = self.assets.rewrite_inline_images(&markdown, &doc.slug);
        assets_downloaded += rewrite.downloaded();
        asset_failures += rewrite.failures.len();

        let path = self.writer.write(doc, &rewrite.markdown, cover)?;

        Ok(DocumentOutcome::Written {
            slug: doc.slug.clone(),
            path,
            assets_downloaded,
            asset_failures,
        })
    }

    pub fn cleanup_unused_assets(&self, current: &[RemoteDocument]) -> Result<Vec<PathBuf>> {
        info!("Cleaning up unused images");
        self.reconciler.remove_unused_assets(current)
    }
}

fn log_overview(docs: &[RemoteDocument]) {
    let published = docs.iter().filter(|d| d.is_published()).count();
    info!(
        published,
        drafts = docs.len() - published,
        total = docs.len(),
        "Sync overview"
    );
}

/// Slugs become file names in the local store, so anything that could leave its directory is
/// rejected.
fn check_slug(doc: &RemoteDocument) -> Result<()> {
    let slug = doc.slug.as_str();
    if slug.is_empty() {
        return Err(Error::MissingSlug { id: doc.id.clone() });
    }
    if slug.starts_with('.') || slug.contains(['/', '\\', '\0']) || slug.contains("..") {
        return Err(Error::InvalidSlug {
            id: doc.id.clone(),
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Map each document id to whether it may use its slug. Earlier documents (most recently
/// edited) win a collision.
fn claim_slugs(docs: &[RemoteDocument]) -> HashMap<&str, std::result::Result<(), Error>> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut claims = HashMap::new();

    for doc in docs {
        let claim = if let Err(e) = check_slug(doc) {
            Err(e)
        } else if let Some(kept) = owners.get(doc.slug.as_str()) {
            Err(Error::SlugCollision {
                slug: doc.slug.clone(),
                kept_id: kept.to_string(),
                dropped_id: doc.id.clone(),
            })
        } else {
            owners.insert(doc.slug.as_str(), doc.id.as_str());
            Ok(())
        };
        claims.insert(doc.id.as_str(), claim);
    }

    claims
}
