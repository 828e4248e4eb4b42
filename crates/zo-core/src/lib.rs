use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod config_file;
pub mod grep;
pub mod latex;
pub mod launch;
pub mod notes;
pub mod reconcile;
pub mod repo;
pub mod report;
pub mod search;
pub mod status;

// Re-export for convenience
pub use grep::{FilterOutcome, GrepBackend, GrepReport, PdfToTextGrep, ToolError, grep_repository};
pub use latex::{CitationScan, EmptyCitation, scan_project, scan_source};
pub use launch::{EditorChoice, default_opener};
pub use reconcile::{MakeOutcome, make, required_keys};
pub use repo::{filename_to_key, find_pdf_for_key, find_pdfs};
pub use report::{Section, render_report, render_section};
pub use zo_bib::{BibError, Bibliography};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Bib(#[from] BibError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("no PDF matching '{0}' in the repository")]
    PdfNotFound(String),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl CoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Name of the bibliography file inside the repository.
pub const DEFAULT_BIB_FILE: &str = "refs.bib";
/// Extension of note files.
pub const DEFAULT_NOTE_FORMAT: &str = "md";

/// Fully resolved settings passed to every operation.
///
/// Built from the config file, the environment and CLI flags by the binary;
/// nothing in this crate reads process-wide state on its own.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the paper repository (PDFs, notes and the bibliography).
    pub repo_root: PathBuf,
    pub bib_file: String,
    pub note_format: String,
    pub pdftotext: String,
    pub grep: String,
    pub opener: String,
    pub gui_editor: Option<String>,
    pub editor: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            bib_file: DEFAULT_BIB_FILE.to_string(),
            note_format: DEFAULT_NOTE_FORMAT.to_string(),
            pdftotext: "pdftotext".to_string(),
            grep: "grep".to_string(),
            opener: default_opener().to_string(),
            gui_editor: None,
            editor: None,
        }
    }
}

impl Settings {
    /// Resolve settings: environment > config file > defaults.
    ///
    /// `env` is consulted for `ZO_REFREPO`, `GUI_EDITOR` and `EDITOR`.
    /// Empty values count as unset.
    pub fn resolve(
        file: &config_file::ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();
        let repository = file.repository.clone().unwrap_or_default();
        let tools = file.tools.clone().unwrap_or_default();
        let editor = file.editor.clone().unwrap_or_default();

        Self {
            repo_root: env("ZO_REFREPO")
                .or(repository.root)
                .map(PathBuf::from)
                .unwrap_or(defaults.repo_root),
            bib_file: repository.bib_file.unwrap_or(defaults.bib_file),
            note_format: repository.note_format.unwrap_or(defaults.note_format),
            pdftotext: tools.pdftotext.unwrap_or(defaults.pdftotext),
            grep: tools.grep.unwrap_or(defaults.grep),
            opener: tools.opener.unwrap_or(defaults.opener),
            gui_editor: env("GUI_EDITOR").or(editor.gui),
            editor: env("EDITOR").or(editor.terminal),
        }
    }

    /// The repository bibliography, `<repo_root>/<bib_file>`.
    pub fn bib_path(&self) -> PathBuf {
        self.repo_root.join(&self.bib_file)
    }
}

/// `$HOME/refs`, or `./refs` when no home directory is known.
pub fn default_repo_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refs")
}
