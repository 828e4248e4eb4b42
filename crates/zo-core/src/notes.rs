use std::path::PathBuf;

use zo_bib::read_bibliography;

use crate::launch::EditorChoice;
use crate::{CoreError, Settings};

/// Bibliography fields copied into a fresh note.
pub const NOTE_FIELDS: &[&str] = &["title", "author", "year"];

/// `<repo_root>/<key>_noted.<note_format>`.
pub fn note_path(settings: &Settings, key: &str) -> PathBuf {
    settings
        .repo_root
        .join(format!("{key}_noted.{}", settings.note_format))
}

/// Fill the note template. Missing fields render as empty strings.
pub fn render_note(key: &str, title: &str, author: &str, year: &str) -> String {
    format!(
        "# Notes about {key}\n\
         title: {title}\n\
         author: {author}\n\
         year: {year}\n\
         \n\
         ## Summary\n\
         \n\
         \n\
         ## Comments\n\
         \n\
         \n\
         ## Related Work\n\
         \n"
    )
}

/// Make sure the note for `key` exists, creating it from the bibliography if
/// needed. Existing notes are never rewritten. Returns the path and whether the
/// file was created.
pub fn ensure_note(settings: &Settings, key: &str) -> Result<(PathBuf, bool), CoreError> {
    let path = note_path(settings, key);
    if path.exists() {
        return Ok((path, false));
    }

    let bib_path = settings.bib_path();
    let fields = if bib_path.exists() {
        read_bibliography(&bib_path)?.lookup_many(key, NOTE_FIELDS)
    } else {
        tracing::warn!(bib = %bib_path.display(), "repository bibliography not found, note fields left empty");
        Default::default()
    };
    let field = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();

    let content = render_note(key, field("title"), field("author"), field("year"));
    std::fs::write(&path, content).map_err(|e| CoreError::io(&path, e))?;
    tracing::info!(note = %path.display(), "created note");
    Ok((path, true))
}

/// Create the note if needed and open it in the resolved editor.
pub fn edit_note(settings: &Settings, key: &str) -> Result<PathBuf, CoreError> {
    let (path, _) = ensure_note(settings, key)?;
    EditorChoice::resolve(settings).open(&path)?;
    Ok(path)
}
