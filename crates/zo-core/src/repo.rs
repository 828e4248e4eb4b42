//! Matching PDF files in the repository to citation keys.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::CoreError;

/// Derive a citation key from a file name.
///
/// `[Smith2020]notes.pdf` -> `Smith2020`. Without a bracketed part the key is
/// the file stem: `article.pdf` -> `article`.
pub fn filename_to_key(file_name: &str) -> String {
    static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

    if let Some(caps) = BRACKET_RE.captures(file_name) {
        return caps[1].to_string();
    }
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Every regular file under `root`, in file-name order.
///
/// A missing or unreadable root is an error; unreadable entries below it are
/// logged and skipped.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => {
                return Err(CoreError::Walk {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// All PDF files under `root`.
pub fn find_pdfs(root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    Ok(walk_files(root)?.into_iter().filter(|p| is_pdf(p)).collect())
}

/// Citation keys of all PDFs under `root`.
pub fn pdf_keys(root: &Path) -> Result<BTreeSet<String>, CoreError> {
    Ok(find_pdfs(root)?
        .iter()
        .map(|p| filename_to_key(&file_name(p)))
        .collect())
}

/// Locate the PDF for `key`.
///
/// Prefers a file whose derived key equals `key`, then any PDF whose name
/// contains `key`. When several files qualify, which one is returned is not
/// part of the contract.
pub fn find_pdf_for_key(root: &Path, key: &str) -> Result<Option<PathBuf>, CoreError> {
    let pdfs = find_pdfs(root)?;

    let exact = pdfs
        .iter()
        .find(|p| filename_to_key(&file_name(p)) == key);
    let found = exact.or_else(|| pdfs.iter().find(|p| file_name(p).contains(key)));

    Ok(found.map(|p| std::path::absolute(p).unwrap_or_else(|_| p.clone())))
}
