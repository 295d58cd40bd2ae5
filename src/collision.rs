use crate::destination::PDF_EXTENSION;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns `true` if anything, including a dangling symlink, occupies `path`.
fn is_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Return a path in the same directory as `candidate` that does not exist.
///
/// If `candidate` is free it is returned unchanged. Otherwise `" - 1"`,
/// `" - 2"`, … is inserted before the extension until a free name is found.
/// The search is sequential and makes no attempt to guard against another
/// writer creating the same name between this call and the copy.
pub fn resolve_collision(candidate: &Path) -> PathBuf {
    if !is_taken(candidate) {
        return candidate.to_path_buf();
    }

    let stem = candidate
        .file_stem()
        .unwrap_or_else(|| OsStr::new(""))
        .to_string_lossy();
    let extension = candidate
        .extension()
        .map(|e| e.to_string_lossy())
        .unwrap_or_else(|| PDF_EXTENSION.into());

    (1u64..)
        .map(|n| candidate.with_file_name(format!("{stem} - {n}.{extension}")))
        .find(|path| !is_taken(path))
        .unwrap_or_else(|| candidate.to_path_buf())
}
