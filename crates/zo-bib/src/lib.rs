use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod raw;

pub use raw::{
    KeyMismatch, RawBlock, SplitOutcome, check_consistency, defined_macros, parse_raw_blocks,
    referenced_macros, split_bibliography, split_bibliography_file, split_bibliography_with_macros,
};

#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed BibTeX in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// A single parsed bibliography entry.
///
/// Field names are lower-case; values are flattened to plain text with
/// newlines, tabs and carriage returns removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// The parsed (field-mapping) view of a `.bib` file.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: BTreeMap<String, BibEntry>,
}

impl Bibliography {
    /// Parse BibTeX source. Any syntax error fails the whole parse; no partial
    /// bibliography is ever returned.
    pub fn parse(content: &str) -> Result<Self, BibError> {
        Self::parse_with_origin(content, Path::new("<memory>"))
    }

    fn parse_with_origin(content: &str, origin: &Path) -> Result<Self, BibError> {
        let parsed = biblatex::Bibliography::parse(content).map_err(|e| BibError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        let entries = parsed
            .iter()
            .map(|entry| {
                let fields = entry
                    .fields
                    .iter()
                    .map(|(name, chunks)| {
                        (name.to_lowercase(), sanitize(&chunks_to_string(chunks)))
                    })
                    .collect();
                (
                    entry.key.clone(),
                    BibEntry {
                        key: entry.key.clone(),
                        fields,
                    },
                )
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.values()
    }

    /// All citation keys (nicknames) in the bibliography.
    pub fn keys(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Single-field lookup. An unknown key or an absent field is `None`.
    pub fn lookup(&self, key: &str, field: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(|e| e.get(field))
            .map(str::to_string)
    }

    /// Batch lookup for one entry. Every requested field is present in the
    /// result; fields the entry lacks (or an unknown key) map to `""` so that
    /// templates never fail on missing data.
    pub fn lookup_many(&self, key: &str, fields: &[&str]) -> BTreeMap<String, String> {
        let entry = self.entries.get(key);
        fields
            .iter()
            .map(|field| {
                let value = entry
                    .and_then(|e| e.get(field))
                    .unwrap_or_default()
                    .to_string();
                (field.to_string(), value)
            })
            .collect()
    }

    /// `key -> value` for every entry that has `field`.
    pub fn lookup_all(&self, field: &str) -> BTreeMap<String, String> {
        self.entries
            .values()
            .filter_map(|e| e.get(field).map(|v| (e.key.clone(), v.to_string())))
            .collect()
    }

    pub fn titles(&self) -> BTreeMap<String, String> {
        self.lookup_all("title")
    }
}

/// Read and parse a `.bib` file.
pub fn read_bibliography(path: &Path) -> Result<Bibliography, BibError> {
    let content = std::fs::read_to_string(path).map_err(|source| BibError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bib = Bibliography::parse_with_origin(&content, path)?;
    tracing::debug!(path = %path.display(), entries = bib.len(), "parsed bibliography");
    Ok(bib)
}

/// Read a `.bib` file once and return both its parsed and raw views.
pub fn read_with_raw_blocks(path: &Path) -> Result<(Bibliography, Vec<RawBlock>), BibError> {
    let content = std::fs::read_to_string(path).map_err(|source| BibError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bib = Bibliography::parse_with_origin(&content, path)?;
    Ok((bib, parse_raw_blocks(&content)))
}

/// Entry keys and `@string` macro names of a bibliography that may not exist
/// yet. A missing file has neither; a malformed one is still an error.
pub fn read_keys_and_macros_or_empty(
    path: &Path,
) -> Result<(BTreeSet<String>, BTreeSet<String>), BibError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "bibliography absent, treating as empty");
        return Ok((BTreeSet::new(), BTreeSet::new()));
    }
    let (bib, blocks) = read_with_raw_blocks(path)?;
    Ok((bib.keys(), defined_macros(&blocks)))
}

/// Strip newlines, tabs and carriage returns.
pub fn sanitize(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\n' | '\t' | '\r')).collect()
}

/// Convert biblatex chunks to a plain string.
fn chunks_to_string(chunks: &[biblatex::Spanned<biblatex::Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            biblatex::Chunk::Normal(s) => s.as_str(),
            biblatex::Chunk::Verbatim(s) => s.as_str(),
            biblatex::Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}
