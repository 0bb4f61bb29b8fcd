//! Historic weather archive
//!
//! This crate loads pre-scraped weather history files and resolves the
//! record matching a configured day/hour offset into the past. One
//! resolver instance is created per configured sensor group and owns its
//! cached sample for the process lifetime.

pub mod resolver;
pub mod series;

pub use resolver::*;
pub use series::*;

use thiserror::Error;

/// Where the external scraper that populates the history files fetches
/// from. Documentation only; nothing in this workspace performs network
/// I/O at runtime.
pub const SCRAPE_BASE_URL: &str =
    "https://www.timeanddate.com/scripts/cityajax.php?mode=historic&json=1";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read history file: {0}")]
    Io(#[from] std::io::Error),

    #[error("start date {date} not found in history file")]
    StartDateNotFound { date: String },

    #[error("malformed history document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid timestamp key {key:?}")]
    InvalidTimestamp { key: String },

    #[error("invalid record under {key:?}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("no sample resolved yet")]
    MissingSample,
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
