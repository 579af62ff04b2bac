// ABOUTME: Public library API for mirroring a Notion workspace into a Hugo site
// ABOUTME: Re-exports core modules for external use

pub mod api;
pub mod assets;
pub mod auth;
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod identity;
pub mod model;
pub mod reconcile;
pub mod storage;
pub mod sync;
pub mod util;
pub mod writer;

pub use error::{Error, Result};
pub use model::{Block, DocumentKind, DocumentStatus, Frontmatter, RemoteDocument, RichText};
