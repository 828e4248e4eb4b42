//! Full-text search through the repository's PDFs via external tools.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::CoreError;
use crate::repo::find_pdfs;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("IO error talking to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// What the line filter made of one PDF's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The matching lines, as printed by the filter.
    Match(String),
    NoMatch,
}

/// Trait for the text-extraction + line-filter step applied to each PDF.
pub trait GrepBackend {
    fn grep_pdf(&self, pdf: &Path) -> Result<FilterOutcome, ToolError>;
}

/// `pdftotext <pdf> - | grep <args...>`.
#[derive(Debug, Clone)]
pub struct PdfToTextGrep {
    pub extractor: String,
    pub filter: String,
    pub filter_args: Vec<String>,
}

impl PdfToTextGrep {
    pub fn new(
        extractor: impl Into<String>,
        filter: impl Into<String>,
        filter_args: Vec<String>,
    ) -> Self {
        Self {
            extractor: extractor.into(),
            filter: filter.into(),
            filter_args,
        }
    }
}

impl GrepBackend for PdfToTextGrep {
    fn grep_pdf(&self, pdf: &Path) -> Result<FilterOutcome, ToolError> {
        let mut extractor = Command::new(&self.extractor)
            .arg(pdf)
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.extractor.clone(),
                source,
            })?;

        let text = extractor.stdout.take().map(Stdio::from).unwrap_or(Stdio::null());

        let filter = Command::new(&self.filter)
            .args(&self.filter_args)
            .stdin(text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let filter = match filter {
            Ok(child) => child,
            Err(source) => {
                let _ = extractor.kill();
                let _ = extractor.wait();
                return Err(ToolError::Spawn {
                    program: self.filter.clone(),
                    source,
                });
            }
        };

        let filtered = filter.wait_with_output().map_err(|source| ToolError::Io {
            program: self.filter.clone(),
            source,
        })?;
        // Extractor stderr is not captured; only its exit status counts.
        let extracted = extractor.wait().map_err(|source| ToolError::Io {
            program: self.extractor.clone(),
            source,
        })?;

        // A filter that stops reading early (`-q`, `-l`, `-m N`) breaks the
        // extractor's pipe, so a match stands regardless of the extractor.
        if filtered.status.code() == Some(0) {
            return Ok(FilterOutcome::Match(
                String::from_utf8_lossy(&filtered.stdout).into_owned(),
            ));
        }

        if !extracted.success() && !killed_by_broken_pipe(&extracted) {
            return Err(ToolError::Failed {
                program: self.extractor.clone(),
                status: extracted,
                stderr: String::new(),
            });
        }

        match filtered.status.code() {
            Some(1) => Ok(FilterOutcome::NoMatch),
            _ => Err(ToolError::Failed {
                program: self.filter.clone(),
                status: filtered.status,
                stderr: String::from_utf8_lossy(&filtered.stderr).trim().to_string(),
            }),
        }
    }
}

#[cfg(unix)]
fn killed_by_broken_pipe(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    const SIGPIPE: i32 = 13;
    status.signal() == Some(SIGPIPE)
}

#[cfg(not(unix))]
fn killed_by_broken_pipe(_status: &ExitStatus) -> bool {
    false
}

/// Per-file results of a repository-wide grep.
#[derive(Debug, Default)]
pub struct GrepReport {
    pub matches: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, ToolError)>,
    pub scanned: usize,
}

/// Run `backend` over every PDF under `root`.
///
/// A tool failure on one file is recorded and the scan moves on.
pub fn grep_repository(root: &Path, backend: &dyn GrepBackend) -> Result<GrepReport, CoreError> {
    let mut report = GrepReport::default();

    for pdf in find_pdfs(root)? {
        report.scanned += 1;
        match backend.grep_pdf(&pdf) {
            Ok(FilterOutcome::Match(_)) => report.matches.push(pdf),
            Ok(FilterOutcome::NoMatch) => {}
            Err(e) => {
                tracing::warn!(path = %pdf.display(), error = %e, "grep failed for file");
                report.failures.push((pdf, e));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Matches files whose content contains a needle; errors on "broken" files.
    struct FakeBackend(&'static str);

    impl GrepBackend for FakeBackend {
        fn grep_pdf(&self, pdf: &Path) -> Result<FilterOutcome, ToolError> {
            let text = fs::read_to_string(pdf).unwrap();
            if text == "broken" {
                return Err(ToolError::Spawn {
                    program: "fake".into(),
                    source: std::io::Error::other("boom"),
                });
            }
            Ok(if text.contains(self.0) {
                FilterOutcome::Match(text)
            } else {
                FilterOutcome::NoMatch
            })
        }
    }

    #[test]
    fn test_grep_repository_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), "neural nets").unwrap();
        fs::write(dir.path().join("b.pdf"), "broken").unwrap();
        fs::write(dir.path().join("c.pdf"), "more neural things").unwrap();
        fs::write(dir.path().join("d.pdf"), "nothing").unwrap();
        fs::write(dir.path().join("neural.txt"), "neural").unwrap();

        let report = grep_repository(dir.path(), &FakeBackend("neural")).unwrap();
        assert_eq!(report.scanned, 4);
        assert_eq!(report.matches.len(), 2);
        assert!(report.matches[0].ends_with("a.pdf"));
        assert!(report.matches[1].ends_with("c.pdf"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].0.ends_with("b.pdf"));
    }

    #[cfg(unix)]
    fn tool_available(name: &str) -> bool {
        Command::new(name)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_distinguishes_match_from_no_match() {
        if !tool_available("grep") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        fs::write(&pdf, "line one\nattention is all you need\n").unwrap();

        // `cat <file> -` stands in for `pdftotext <file> -`.
        let hit = PdfToTextGrep::new("cat", "grep", vec!["-i".into(), "ATTENTION".into()]);
        assert_eq!(
            hit.grep_pdf(&pdf).unwrap(),
            FilterOutcome::Match("attention is all you need\n".into())
        );

        let miss = PdfToTextGrep::new("cat", "grep", vec!["transformer".into()]);
        assert_eq!(miss.grep_pdf(&pdf).unwrap(), FilterOutcome::NoMatch);
    }

    #[cfg(unix)]
    #[test]
    fn test_quiet_filter_match_survives_broken_pipe() {
        if !tool_available("grep") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("long.pdf");
        let mut text = String::from("needle here\n");
        for i in 0..200_000 {
            text.push_str(&format!("filler line number {i}\n"));
        }
        fs::write(&pdf, text).unwrap();

        // `grep -q` exits on the first line and leaves `cat` writing to a closed pipe.
        let quiet = PdfToTextGrep::new("cat", "grep", vec!["-q".into(), "needle".into()]);
        assert!(matches!(quiet.grep_pdf(&pdf), Ok(FilterOutcome::Match(_))));

        let first_only =
            PdfToTextGrep::new("cat", "grep", vec!["-m".into(), "1".into(), "needle".into()]);
        assert_eq!(
            first_only.grep_pdf(&pdf).unwrap(),
            FilterOutcome::Match("needle here\n".into())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_reports_tool_failures() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        fs::write(&pdf, "text").unwrap();

        let missing = PdfToTextGrep::new("zo-no-such-extractor", "grep", vec!["x".into()]);
        assert!(matches!(
            missing.grep_pdf(&pdf),
            Err(ToolError::Spawn { .. })
        ));

        if tool_available("grep") {
            let failing = PdfToTextGrep::new("cat", "grep", vec!["--no-such-flag".into()]);
            assert!(matches!(
                failing.grep_pdf(&pdf),
                Err(ToolError::Failed { .. })
            ));
        }
    }
}
