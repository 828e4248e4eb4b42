//! Extraction of cited keys from a LaTeX project.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::CoreError;
use crate::repo::walk_files;

/// Citation commands whose brace argument lists bibliography keys.
pub const CITE_COMMANDS: &[&str] = &["cite", "fullcite"];

/// `\cite{a,b}`, `\fullcite{a}`, with up to two `[...]` optional arguments.
static CITE_RE: Lazy<Regex> = Lazy::new(|| {
    let names = CITE_COMMANDS.join("|");
    Regex::new(&format!(r"\\({names})(?:\[[^\]]*\]){{0,2}}\{{([^}}]*)\}}")).unwrap()
});

/// A citation command with nothing between its braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyCitation {
    pub path: PathBuf,
    pub command: String,
}

/// Keys and anomalies found in one piece of LaTeX source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCitations {
    pub keys: BTreeSet<String>,
    /// Names of the commands that were invoked with an empty argument.
    pub empty_commands: Vec<String>,
}

/// Result of scanning a whole project directory.
#[derive(Debug, Clone, Default)]
pub struct CitationScan {
    pub keys: BTreeSet<String>,
    pub empty_citations: Vec<EmptyCitation>,
    pub files: Vec<PathBuf>,
}

/// Scan LaTeX source text.
///
/// Every line is trimmed and the lines are joined without separators, so a
/// command broken across lines is matched as if it had been written on one.
pub fn scan_source(text: &str) -> SourceCitations {
    let joined: String = text.lines().map(str::trim).collect();
    let mut found = SourceCitations::default();

    for caps in CITE_RE.captures_iter(&joined) {
        let args = caps[2].trim();
        if args.is_empty() {
            found.empty_commands.push(caps[1].to_string());
            continue;
        }
        found.keys.extend(
            args.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        );
    }

    found
}

fn is_tex_source(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'));
    !hidden && path.extension().is_some_and(|e| e == "tex")
}

/// Collect the keys cited anywhere in the `.tex` files below `root`.
///
/// Hidden files are skipped. Empty citations are logged and reported but never
/// abort the scan.
pub fn scan_project(root: &Path) -> Result<CitationScan, CoreError> {
    let mut scan = CitationScan::default();

    for path in walk_files(root)?.into_iter().filter(|p| is_tex_source(p)) {
        let bytes = std::fs::read(&path).map_err(|e| CoreError::io(&path, e))?;
        let found = scan_source(&String::from_utf8_lossy(&bytes));
        tracing::debug!(path = %path.display(), keys = found.keys.len(), "scanned LaTeX source");

        for command in found.empty_commands {
            tracing::warn!(path = %path.display(), command = %command, "empty citation encountered");
            scan.empty_citations.push(EmptyCitation {
                path: path.clone(),
                command,
            });
        }
        scan.keys.extend(found.keys);
        scan.files.push(path);
    }

    Ok(scan)
}
