//! Handing files to the user's viewer and editor.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::grep::ToolError;
use crate::repo::find_pdf_for_key;
use crate::{CoreError, Settings};

/// The platform's "open with default application" command.
pub fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// How a note file gets opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorChoice {
    /// Started in the background; `zo` returns immediately.
    Gui(String),
    /// Runs in the current terminal; `zo` waits for it.
    Terminal(String),
    /// Falls back to the system opener.
    Opener(String),
}

impl EditorChoice {
    /// A GUI editor wins over a terminal editor; the opener is the fallback.
    pub fn resolve(settings: &Settings) -> Self {
        if let Some(gui) = &settings.gui_editor {
            EditorChoice::Gui(gui.clone())
        } else if let Some(editor) = &settings.editor {
            EditorChoice::Terminal(editor.clone())
        } else {
            EditorChoice::Opener(settings.opener.clone())
        }
    }

    pub fn command_line(&self) -> &str {
        match self {
            EditorChoice::Gui(c) | EditorChoice::Terminal(c) | EditorChoice::Opener(c) => c,
        }
    }

    pub fn open(&self, path: &Path) -> Result<(), ToolError> {
        match self {
            EditorChoice::Gui(c) => spawn_detached(c, path),
            EditorChoice::Terminal(c) | EditorChoice::Opener(c) => run_foreground(c, path),
        }
    }
}

/// Build a command from a possibly multi-word command line plus a file.
fn command_for(command_line: &str, path: &Path) -> Result<(String, Command), ToolError> {
    let mut words = command_line.split_whitespace();
    let program = words.next().ok_or_else(|| ToolError::Spawn {
        program: command_line.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;
    let mut command = Command::new(program);
    command.args(words).arg(path);
    Ok((program.to_string(), command))
}

fn spawn_detached(command_line: &str, path: &Path) -> Result<(), ToolError> {
    let (program, mut command) = command_for(command_line, path)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ToolError::Spawn { program, source })?;
    Ok(())
}

fn run_foreground(command_line: &str, path: &Path) -> Result<(), ToolError> {
    let (program, mut command) = command_for(command_line, path)?;
    let status = command.status().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !status.success() {
        return Err(ToolError::Failed {
            program,
            status,
            stderr: String::new(),
        });
    }
    Ok(())
}

/// Open the PDF for `key` in the background with the configured opener.
pub fn open_pdf(settings: &Settings, key: &str) -> Result<PathBuf, CoreError> {
    let pdf = find_pdf_for_key(&settings.repo_root, key)?
        .ok_or_else(|| CoreError::PdfNotFound(key.to_string()))?;
    tracing::debug!(pdf = %pdf.display(), opener = %settings.opener, "opening PDF");
    spawn_detached(&settings.opener, &pdf)?;
    Ok(pdf)
}
