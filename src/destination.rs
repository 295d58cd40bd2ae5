use crate::keywords::Classification;
use chrono::Datelike;
use std::path::{Path, PathBuf};

/// File extension given to every placed document.
pub const PDF_EXTENSION: &str = "pdf";

// ── DestinationPlan ───────────────────────────────────────────────────────────

/// Where a classified document should land, before collision resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    /// Bucket directory under the destination root.
    pub directory: PathBuf,

    /// File name without directory; may or may not already end in `.pdf`.
    pub file_base_name: String,

    /// `true` when the document had no usable date and goes to the
    /// unclassified bucket.
    pub unclassified: bool,
}

impl DestinationPlan {
    /// The candidate file path: `directory/file_base_name.pdf`.
    ///
    /// The `.pdf` extension is appended only if the base name does not
    /// already carry it (in any case).
    pub fn candidate_path(&self) -> PathBuf {
        let has_pdf_ext = Path::new(&self.file_base_name)
            .extension()
            .map(|e| e.eq_ignore_ascii_case(PDF_EXTENSION))
            .unwrap_or(false);

        if has_pdf_ext {
            self.directory.join(&self.file_base_name)
        } else {
            self.directory
                .join(format!("{}.{}", self.file_base_name, PDF_EXTENSION))
        }
    }
}

// ── Planning ──────────────────────────────────────────────────────────────────

/// Compute the bucket and file name for a classified document.
///
/// - title and date: `root/YYYY/MM`, named `YYYY-MM-DD <title>`
/// - date only: `root/YYYY/MM`, keeping the source file name
/// - no date: `root/<unclassified_dir>`, named by the title if there is one,
///   otherwise the source file name
///
/// Slashes in the title or source name are replaced with spaces so the name
/// stays a single path component. A title that is blank after that counts as
/// no title.
///
/// ```
/// use chrono::NaiveDate;
/// use paperless_sorter::{plan_destination, Classification};
/// use std::path::Path;
///
/// let c = Classification {
///     title: Some("Acme/Corp".into()),
///     date: NaiveDate::from_ymd_opt(2023, 3, 18),
/// };
/// let plan = plan_destination(&c, Path::new("/out"), "scan.pdf", "Unclassified");
/// assert_eq!(plan.directory, Path::new("/out/2023/03"));
/// assert_eq!(plan.file_base_name, "2023-03-18 Acme Corp");
/// ```
pub fn plan_destination(
    classification: &Classification,
    root: &Path,
    source_file_name: &str,
    unclassified_dir: &str,
) -> DestinationPlan {
    let title = classification
        .title
        .as_deref()
        .map(sanitize)
        .filter(|t| !t.trim().is_empty());

    match (title, classification.date) {
        (Some(title), Some(date)) => DestinationPlan {
            directory: date_bucket(root, date),
            file_base_name: format!("{} {}", date.format("%Y-%m-%d"), title),
            unclassified: false,
        },
        (None, Some(date)) => DestinationPlan {
            directory: date_bucket(root, date),
            file_base_name: sanitize(source_file_name),
            unclassified: false,
        },
        (title, None) => DestinationPlan {
            directory: root.join(unclassified_dir),
            file_base_name: title.unwrap_or_else(|| source_file_name.to_owned()),
            unclassified: true,
        },
    }
}

fn date_bucket(root: &Path, date: chrono::NaiveDate) -> PathBuf {
    root.join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
}

fn sanitize(name: &str) -> String {
    name.replace('/', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dated(title: Option<&str>) -> Classification {
        Classification {
            title: title.map(str::to_owned),
            date: NaiveDate::from_ymd_opt(2023, 3, 18),
        }
    }

    #[test]
    fn title_and_date_bucket() {
        let plan = plan_destination(&dated(Some("Acme/Corp")), Path::new("/out"), "a.pdf", "Unclassified");
        assert_eq!(plan.directory, Path::new("/out/2023/03"));
        assert_eq!(plan.file_base_name, "2023-03-18 Acme Corp");
        assert!(!plan.unclassified);
        assert_eq!(
            plan.candidate_path(),
            Path::new("/out/2023/03/2023-03-18 Acme Corp.pdf")
        );
    }

    #[test]
    fn date_only_keeps_source_name() {
        let plan = plan_destination(&dated(None), Path::new("/out"), "Scan 12.PDF", "Unclassified");
        assert_eq!(plan.directory, Path::new("/out/2023/03"));
        assert_eq!(plan.file_base_name, "Scan 12.PDF");
        assert_eq!(plan.candidate_path(), Path::new("/out/2023/03/Scan 12.PDF"));
    }

    #[test]
    fn missing_date_goes_to_unclassified() {
        let c = Classification {
            title: Some("Acme".into()),
            date: None,
        };
        let plan = plan_destination(&c, Path::new("/out"), "a.pdf", "Unclassified");
        assert_eq!(plan.directory, Path::new("/out/Unclassified"));
        assert_eq!(plan.file_base_name, "Acme");
        assert!(plan.unclassified);

        let c = Classification {
            title: Some("A/B".into()),
            date: None,
        };
        let plan = plan_destination(&c, Path::new("/out"), "a.pdf", "Unclassified");
        assert_eq!(plan.file_base_name, "A B");

        let plan = plan_destination(&Classification::default(), Path::new("/out"), "a.pdf", "Inbox");
        assert_eq!(plan.candidate_path(), Path::new("/out/Inbox/a.pdf"));
    }

    #[test]
    fn blank_title_falls_back_to_source_name() {
        let c = Classification {
            title: Some(String::new()),
            date: None,
        };
        let plan = plan_destination(&c, Path::new("/out"), "scan.pdf", "Unclassified");
        assert_eq!(plan.candidate_path(), Path::new("/out/Unclassified/scan.pdf"));

        let plan = plan_destination(&dated(Some(" / ")), Path::new("/out"), "scan.pdf", "Unclassified");
        assert_eq!(plan.candidate_path(), Path::new("/out/2023/03/scan.pdf"));
    }

    #[test]
    fn early_years_are_zero_padded() {
        let c = Classification {
            title: None,
            date: NaiveDate::from_ymd_opt(987, 1, 2),
        };
        let plan = plan_destination(&c, Path::new("/out"), "old.pdf", "Unclassified");
        assert_eq!(plan.directory, Path::new("/out/0987/01"));
    }

    #[test]
    fn dotted_title_still_gets_pdf_extension() {
        let plan = plan_destination(&dated(Some("Acme Inc.")), Path::new("/out"), "a.pdf", "Unclassified");
        assert_eq!(
            plan.candidate_path(),
            Path::new("/out/2023/03/2023-03-18 Acme Inc..pdf")
        );
    }
}
