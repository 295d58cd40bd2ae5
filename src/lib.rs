//! # paperless-sorter
//!
//! Reorganizes a tree of keyword-tagged PDF documents into a date-bucketed
//! archive.
//!
//! ## What this crate does
//!
//! 1. **Read keywords** — pulls the `/Keywords` entry out of each PDF's
//!    document information dictionary.
//! 2. **Classify** — recognizes `Title - `, `Merchant - `, `vendor=`,
//!    `Date - ` and `date=` keywords and normalizes the date.
//! 3. **Plan** — maps the classification to `YYYY/MM/YYYY-MM-DD Title.pdf`,
//!    or to the `Unclassified` bucket when no date is known.
//! 4. **Place** — copies the file to a collision-free path and stamps the
//!    keyword date onto it.
//!
//! ## Quick example
//!
//! ```no_run
//! use paperless_sorter::{CancelToken, Extractor, RunEvent, RunRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::new();
//! let request = RunRequest::new("/scans/library", "/archive");
//!
//! let ctx = extractor.run(request, &CancelToken::new(), |event| {
//!     if let RunEvent::Progress(p) = event {
//!         println!("{:>5.1}%", p.fraction() * 100.0);
//!     }
//! })?;
//!
//! for path in &ctx.unclassified {
//!     println!("unclassified: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use thiserror::Error;

mod collision;
mod date;
mod destination;
mod keywords;
mod metadata;
mod pdf_utils;
mod pipeline;

pub use collision::resolve_collision;
pub use date::{normalize_date, DATE_FORMATS};
pub use destination::{plan_destination, DestinationPlan, PDF_EXTENSION};
pub use keywords::{parse_keywords, Classification};
pub use metadata::{KeywordSource, PdfKeywordReader};
pub use pipeline::{
    CancelToken, Extractor, FileError, FileStage, Placement, Progress, RunContext, RunEvent,
    RunRequest, RunStatus,
};

// ── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration for [`Extractor`].
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// When `true`, documents whose keywords cannot be read are copied into
    /// the unclassified bucket and reported as unclassified. When `false`
    /// they are skipped entirely and only show up as a [`FileError`].
    pub quarantine_unreadable: bool,

    /// When `true`, the keyword date is written onto each copied file's
    /// timestamps.
    pub preserve_dates: bool,

    /// Name of the bucket directory, directly under the destination root,
    /// that receives documents without a usable date.
    pub unclassified_dir: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            quarantine_unreadable: false,
            preserve_dates: true,
            unclassified_dir: "Unclassified".into(),
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The underlying lopdf parser returned an error.
    #[error("PDF parse error: {0}")]
    ParseError(#[from] lopdf::Error),

    /// A run is already in progress on this extractor.
    #[error("an extraction run is already in progress")]
    Busy,

    /// The source root is not a readable directory.
    #[error("source root is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
