use crate::collision::resolve_collision;
use crate::destination::{plan_destination, PDF_EXTENSION};
use crate::keywords::{parse_keywords, Classification};
use crate::metadata::{KeywordSource, PdfKeywordReader};
use crate::{ExtractError, ExtractorConfig, Result};
use chrono::{Local, NaiveDate, TimeZone};
use filetime::FileTime;
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

// ── Run inputs ────────────────────────────────────────────────────────────────

/// The source and destination roots picked for one run.
///
/// Either side may be `None` when the user declined to choose one; such a
/// request ends immediately with [`RunStatus::Declined`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
            destination: Some(destination.into()),
        }
    }
}

/// Cooperative cancellation flag, checked between files.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Run outputs ───────────────────────────────────────────────────────────────

/// Progress after a file, as `(index of that file, file count - 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    /// Completed fraction in `[0, 1]`. A single-file run reports `1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Step at which a single file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    ReadMetadata,
    CreateDirectory,
    Copy,
}

/// A per-file failure. The run carries on with the next file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub source: PathBuf,
    pub stage: FileStage,
    pub message: String,
}

impl FileError {
    fn new(source: &Path, stage: FileStage, err: impl Display) -> Self {
        Self {
            source: source.to_path_buf(),
            stage,
            message: err.to_string(),
        }
    }
}

/// A file that was copied into the destination tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub classification: Classification,

    /// Landed in the unclassified bucket.
    pub unclassified: bool,

    /// The keyword date was written onto the copy's timestamps. On Linux
    /// only the modification and access times are set; the creation time is
    /// left alone because the platform offers no way to change it.
    pub date_stamped: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No source or no destination was chosen; nothing was touched.
    #[default]
    Declined,
    Completed,
    /// Stopped between files by a [`CancelToken`].
    Cancelled,
}

/// Ordered stream of things that happen during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started { total: usize },
    Unclassified { source: PathBuf },
    Placed(Placement),
    Error(FileError),
    Progress(Progress),
    Done { status: RunStatus },
}

/// Everything one run produced. A fresh context is built at the start of
/// every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    pub source_root: Option<PathBuf>,
    pub destination_root: Option<PathBuf>,
    pub status: RunStatus,

    /// Number of PDFs found under the source root.
    pub total: usize,

    /// Number of files handled so far, whatever their outcome.
    pub processed: usize,

    /// Last progress reported.
    pub progress: Progress,

    /// Source paths of files routed to the unclassified bucket.
    pub unclassified: Vec<PathBuf>,

    pub placements: Vec<Placement>,
    pub errors: Vec<FileError>,
}

impl RunContext {
    /// Number of files that hit an error and were not placed. A quarantined
    /// file has an error but still counts as placed.
    pub fn skipped(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| !self.placements.iter().any(|p| p.source == e.source))
            .count()
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Drives classification runs from a source tree into a destination tree.
///
/// Only one run may be active per extractor; a second concurrent call gets
/// [`ExtractError::Busy`].
///
/// ```no_run
/// use paperless_sorter::{CancelToken, Extractor, RunRequest};
///
/// let extractor = Extractor::new();
/// let ctx = extractor
///     .run(RunRequest::new("library", "archive"), &CancelToken::new(), |_| {})
///     .unwrap();
/// println!("{} placed, {} unclassified", ctx.placements.len(), ctx.unclassified.len());
/// ```
pub struct Extractor<S = PdfKeywordReader> {
    source: S,
    config: ExtractorConfig,
    extracting: AtomicBool,
}

impl Extractor<PdfKeywordReader> {
    /// Extractor reading keywords from real PDFs with the default config.
    pub fn new() -> Self {
        Self::with_source(PdfKeywordReader)
    }
}

impl Default for Extractor<PdfKeywordReader> {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the busy flag when the run ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: KeywordSource> Extractor<S> {
    pub fn with_source(source: S) -> Self {
        Self::with_config(source, ExtractorConfig::default())
    }

    pub fn with_config(source: S, config: ExtractorConfig) -> Self {
        Self {
            source,
            config,
            extracting: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Returns `true` while a run is in progress.
    pub fn is_extracting(&self) -> bool {
        self.extracting.load(Ordering::Acquire)
    }

    fn claim(&self) -> Result<()> {
        self.extracting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ExtractError::Busy)
    }

    /// Run the pipeline on the calling thread, reporting each event to
    /// `on_event` as it happens.
    ///
    /// Per-file failures are recorded in the returned [`RunContext`] and never
    /// abort the run. The only errors are [`ExtractError::Busy`] and
    /// [`ExtractError::InvalidRoot`], both raised before any file is touched.
    pub fn run<F>(&self, request: RunRequest, cancel: &CancelToken, mut on_event: F) -> Result<RunContext>
    where
        F: FnMut(RunEvent),
    {
        self.claim()?;
        let _guard = BusyGuard(&self.extracting);
        self.drive(request, cancel, &mut on_event)
    }

    fn drive(
        &self,
        request: RunRequest,
        cancel: &CancelToken,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<RunContext> {
        let (Some(source_root), Some(destination_root)) = (request.source, request.destination)
        else {
            info!("run declined: source or destination not chosen");
            emit(RunEvent::Done {
                status: RunStatus::Declined,
            });
            return Ok(RunContext::default());
        };

        if !source_root.is_dir() {
            return Err(ExtractError::InvalidRoot(source_root));
        }

        let pdfs = collect_pdfs(&source_root);
        let total = pdfs.len();
        info!(
            source = %source_root.display(),
            destination = %destination_root.display(),
            total,
            "starting run"
        );

        let mut ctx = RunContext {
            source_root: Some(source_root),
            destination_root: Some(destination_root.clone()),
            status: RunStatus::Completed,
            total,
            ..Default::default()
        };
        emit(RunEvent::Started { total });

        for (index, path) in pdfs.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = ctx.processed, total, "run cancelled");
                ctx.status = RunStatus::Cancelled;
                break;
            }

            self.process_file(path, &destination_root, &mut ctx, emit);

            ctx.processed = index + 1;
            ctx.progress = Progress {
                current: index,
                total: total - 1,
            };
            emit(RunEvent::Progress(ctx.progress));
        }

        info!(
            placed = ctx.placements.len(),
            unclassified = ctx.unclassified.len(),
            errors = ctx.errors.len(),
            "run finished"
        );
        emit(RunEvent::Done { status: ctx.status });
        Ok(ctx)
    }

    fn process_file(
        &self,
        path: &Path,
        destination_root: &Path,
        ctx: &mut RunContext,
        emit: &mut dyn FnMut(RunEvent),
    ) {
        let keywords = match self.source.read_keywords(path) {
            Ok(keywords) => keywords,
            Err(e) => {
                record_error(ctx, emit, FileError::new(path, FileStage::ReadMetadata, e));
                if !self.config.quarantine_unreadable {
                    return;
                }
                Vec::new()
            }
        };

        let classification = parse_keywords(&keywords);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let plan = plan_destination(
            &classification,
            destination_root,
            &file_name,
            &self.config.unclassified_dir,
        );
        debug!(
            source = %path.display(),
            title = ?classification.title,
            date = ?classification.date,
            directory = %plan.directory.display(),
            "classified"
        );

        if plan.unclassified {
            ctx.unclassified.push(path.to_path_buf());
            emit(RunEvent::Unclassified {
                source: path.to_path_buf(),
            });
        }

        if let Err(e) = fs::create_dir_all(&plan.directory) {
            record_error(ctx, emit, FileError::new(path, FileStage::CreateDirectory, e));
            return;
        }

        let destination = resolve_collision(&plan.candidate_path());
        if let Err(e) = fs::copy(path, &destination) {
            record_error(ctx, emit, FileError::new(path, FileStage::Copy, e));
            return;
        }

        let date_stamped = match classification.date {
            Some(date) if self.config.preserve_dates => match stamp_date(&destination, date) {
                Ok(()) => true,
                Err(e) => {
                    debug!(destination = %destination.display(), error = %e, "could not set file date");
                    false
                }
            },
            _ => false,
        };

        let placement = Placement {
            source: path.to_path_buf(),
            destination,
            unclassified: plan.unclassified,
            classification,
            date_stamped,
        };
        ctx.placements.push(placement.clone());
        emit(RunEvent::Placed(placement));
    }
}

impl<S: KeywordSource + 'static> Extractor<S> {
    /// Run the pipeline on a background thread.
    ///
    /// The busy flag is claimed before the thread starts, so a second call
    /// while the first run is active fails immediately with
    /// [`ExtractError::Busy`]. Events arrive on the returned receiver in
    /// order; the channel closes after [`RunEvent::Done`].
    ///
    /// A source root that is not a directory ends the run before any event
    /// is sent: the channel closes without `Done` and the join handle yields
    /// [`ExtractError::InvalidRoot`].
    pub fn spawn(
        self: Arc<Self>,
        request: RunRequest,
        cancel: CancelToken,
    ) -> Result<(mpsc::Receiver<RunEvent>, JoinHandle<Result<RunContext>>)> {
        self.claim()?;
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let _guard = BusyGuard(&self.extracting);
            self.drive(request, &cancel, &mut |event: RunEvent| {
                // The receiver may have been dropped; the run still completes.
                let _ = tx.send(event);
            })
        });

        Ok((rx, handle))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn record_error(ctx: &mut RunContext, emit: &mut dyn FnMut(RunEvent), error: FileError) {
    warn!(
        source = %error.source.display(),
        stage = ?error.stage,
        error = %error.message,
        "skipping file"
    );
    ctx.errors.push(error.clone());
    emit(RunEvent::Error(error));
}

/// Every file under `root` whose extension is `pdf` in any case.
fn collect_pdfs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        // Follows symlinked files; directories and dangling links drop out.
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|e| e.eq_ignore_ascii_case(PDF_EXTENSION))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Set the file's times to local midnight on `date`.
fn stamp_date(path: &Path, date: NaiveDate) -> io::Result<()> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| io::Error::other("invalid midnight"))?;
    let local = midnight
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&midnight));
    let time = SystemTime::from(local);

    let stamp = FileTime::from_system_time(time);
    filetime::set_file_times(path, stamp, stamp)?;
    set_created(path, time)
}

#[cfg(any(target_os = "macos", windows))]
fn set_created(path: &Path, time: SystemTime) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    use std::os::macos::fs::FileTimesExt;
    #[cfg(windows)]
    use std::os::windows::fs::{FileTimesExt, OpenOptionsExt};

    // Copies keep the source's permissions, so a read-only copy must still
    // accept new times: ownership is enough on macOS, and Windows only needs
    // FILE_WRITE_ATTRIBUTES.
    let mut options = fs::OpenOptions::new();
    #[cfg(target_os = "macos")]
    options.read(true);
    #[cfg(windows)]
    options.access_mode(0x0100);

    let file = options.open(path)?;
    file.set_times(fs::FileTimes::new().set_created(time))
}

#[cfg(not(any(target_os = "macos", windows)))]
fn set_created(_path: &Path, _time: SystemTime) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_fraction() {
        assert_eq!(Progress { current: 0, total: 2 }.fraction(), 0.0);
        assert_eq!(Progress { current: 1, total: 2 }.fraction(), 0.5);
        assert_eq!(Progress { current: 2, total: 2 }.fraction(), 1.0);
        assert_eq!(Progress { current: 0, total: 0 }.fraction(), 1.0);
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn collects_pdfs_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("one.pdf"), b"").unwrap();
        fs::write(nested.join("two.PDF"), b"").unwrap();
        fs::write(nested.join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let mut found = collect_pdfs(dir.path());
        found.sort();
        assert_eq!(found, vec![nested.join("two.PDF"), dir.path().join("one.pdf")]);
    }

    #[cfg(unix)]
    #[test]
    fn collects_symlinked_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let real = elsewhere.path().join("real.pdf");
        fs::write(&real, b"").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link.pdf")).unwrap();
        std::os::unix::fs::symlink(elsewhere.path().join("gone.pdf"), dir.path().join("dangling.pdf"))
            .unwrap();

        assert_eq!(collect_pdfs(dir.path()), vec![dir.path().join("link.pdf")]);
    }

    #[test]
    fn skipped_excludes_quarantined_files() {
        let placed = PathBuf::from("/lib/quarantined.pdf");
        let ctx = RunContext {
            placements: vec![Placement {
                source: placed.clone(),
                destination: PathBuf::from("/out/Unclassified/quarantined.pdf"),
                classification: Classification::default(),
                unclassified: true,
                date_stamped: false,
            }],
            errors: vec![
                FileError::new(&placed, FileStage::ReadMetadata, "bad"),
                FileError::new(Path::new("/lib/lost.pdf"), FileStage::Copy, "bad"),
            ],
            ..Default::default()
        };
        assert_eq!(ctx.skipped(), 1);
    }

    #[test]
    fn stamp_sets_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pdf");
        fs::write(&path, b"x").unwrap();

        let date = NaiveDate::from_ymd_opt(2023, 3, 18).unwrap();
        stamp_date(&path, date).unwrap();

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        let local: chrono::DateTime<Local> = modified.into();
        assert_eq!(local.date_naive(), date);
    }

    #[test]
    fn run_event_json_shape() {
        let json = serde_json::to_value(RunEvent::Progress(Progress { current: 1, total: 2 })).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["current"], 1);

        let json = serde_json::to_value(RunEvent::Done {
            status: RunStatus::Completed,
        })
        .unwrap();
        assert_eq!(json["status"], "completed");
    }
}
