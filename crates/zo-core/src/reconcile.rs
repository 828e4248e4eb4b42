//! `make`: bring a project's bibliography in line with what its LaTeX cites.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use zo_bib::{read_keys_and_macros_or_empty, split_bibliography_file};

use crate::latex::{EmptyCitation, scan_project};
use crate::report::Section;
use crate::CoreError;

/// Keys cited but not yet present locally.
pub fn required_keys(cited: &BTreeSet<String>, local: &BTreeSet<String>) -> BTreeSet<String> {
    cited.difference(local).cloned().collect()
}

#[derive(Debug, Clone, Default)]
pub struct MakeOutcome {
    pub cited: BTreeSet<String>,
    pub required: BTreeSet<String>,
    /// Keys whose entries were appended to the child bibliography.
    pub added: BTreeSet<String>,
    /// Required keys the parent bibliography does not have.
    pub missing: BTreeSet<String>,
    /// `@string` macros copied along with the added entries.
    pub macros: BTreeSet<String>,
    pub empty_citations: Vec<EmptyCitation>,
    pub appended_bytes: usize,
}

impl MakeOutcome {
    pub fn sections(&self) -> Vec<Section> {
        vec![
            Section::new(
                "The following refs were added to the local refs.bib:",
                self.added.iter().cloned(),
            ),
            Section::new(
                "Refs not in parent and NOT added to the local refs.bib:",
                self.missing.iter().cloned(),
            ),
        ]
    }
}

/// Append the parent entries that `project` cites to `child`.
///
/// Keys already in `child` are never touched, so running this twice without
/// new citations leaves `child` unchanged. A missing `child` starts out empty
/// and is created on first append.
pub fn make(project: &Path, parent: &Path, child: &Path) -> Result<MakeOutcome, CoreError> {
    let scan = scan_project(project)?;
    let (local, local_macros) = read_keys_and_macros_or_empty(child)?;
    let required = required_keys(&scan.keys, &local);

    let mut outcome = MakeOutcome {
        cited: scan.keys,
        empty_citations: scan.empty_citations,
        ..Default::default()
    };

    if required.is_empty() {
        tracing::debug!(child = %child.display(), "child bibliography already complete");
        outcome.required = required;
        return Ok(outcome);
    }

    let split = split_bibliography_file(parent, &required, &local_macros)?;
    if !split.text.is_empty() {
        append_entries(child, &split.text)?;
    }

    outcome.appended_bytes = split.text.len();
    outcome.added = split.added;
    outcome.missing = split.missing;
    outcome.macros = split.macros;
    outcome.required = required;
    Ok(outcome)
}

fn append_entries(child: &Path, text: &str) -> Result<(), CoreError> {
    let needs_newline = std::fs::read(child)
        .map(|existing| !existing.is_empty() && !existing.ends_with(b"\n"))
        .unwrap_or(false);

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(child)
        .map_err(|e| CoreError::io(child, e))?;
    if needs_newline {
        file.write_all(b"\n").map_err(|e| CoreError::io(child, e))?;
    }
    file.write_all(text.as_bytes())
        .map_err(|e| CoreError::io(child, e))?;

    tracing::info!(child = %child.display(), bytes = text.len(), "appended bibliography entries");
    Ok(())
}
