use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub repository: Option<RepositoryConfig>,
    pub tools: Option<ToolsConfig>,
    pub editor: Option<EditorConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub root: Option<String>,
    pub bib_file: Option<String>,
    pub note_format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub pdftotext: Option<String>,
    pub grep: Option<String>,
    pub opener: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    pub gui: Option<String>,
    pub terminal: Option<String>,
}

/// Platform config directory path: `<config_dir>/zo/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("zo").join("config.toml"))
}

/// Load config by cascading CWD `.zo.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".zo.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        repository: Some(RepositoryConfig {
            root: overlay
                .repository
                .as_ref()
                .and_then(|r| r.root.clone())
                .or_else(|| base.repository.as_ref().and_then(|r| r.root.clone())),
            bib_file: overlay
                .repository
                .as_ref()
                .and_then(|r| r.bib_file.clone())
                .or_else(|| base.repository.as_ref().and_then(|r| r.bib_file.clone())),
            note_format: overlay
                .repository
                .as_ref()
                .and_then(|r| r.note_format.clone())
                .or_else(|| {
                    base.repository
                        .as_ref()
                        .and_then(|r| r.note_format.clone())
                }),
        }),
        tools: Some(ToolsConfig {
            pdftotext: overlay
                .tools
                .as_ref()
                .and_then(|t| t.pdftotext.clone())
                .or_else(|| base.tools.as_ref().and_then(|t| t.pdftotext.clone())),
            grep: overlay
                .tools
                .as_ref()
                .and_then(|t| t.grep.clone())
                .or_else(|| base.tools.as_ref().and_then(|t| t.grep.clone())),
            opener: overlay
                .tools
                .as_ref()
                .and_then(|t| t.opener.clone())
                .or_else(|| base.tools.as_ref().and_then(|t| t.opener.clone())),
        }),
        editor: Some(EditorConfig {
            gui: overlay
                .editor
                .as_ref()
                .and_then(|e| e.gui.clone())
                .or_else(|| base.editor.as_ref().and_then(|e| e.gui.clone())),
            terminal: overlay
                .editor
                .as_ref()
                .and_then(|e| e.terminal.clone())
                .or_else(|| base.editor.as_ref().and_then(|e| e.terminal.clone())),
        }),
    }
}
