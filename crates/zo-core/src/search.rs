use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use zo_bib::{Bibliography, read_bibliography};

use crate::repo::{filename_to_key, walk_files};
use crate::report::Section;
use crate::{CoreError, Settings};

/// Bibliography fields searched besides file names.
pub const SEARCH_FIELDS: &[&str] = &["author", "title"];

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub keys: BTreeSet<String>,
    pub titles: BTreeMap<String, String>,
}

impl SearchResults {
    /// `[key] title` for every hit that has a bibliography title.
    pub fn lines(&self) -> Vec<String> {
        self.keys
            .iter()
            .filter_map(|k| self.titles.get(k).map(|t| format!("[{k}] {t}")))
            .collect()
    }

    pub fn section(&self) -> Section {
        Section::new("Search results:", self.lines())
    }
}

pub fn compile_pattern(pattern: &str) -> Result<Regex, CoreError> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Keys of the files under `root` whose name matches.
pub fn search_filenames(root: &Path, pattern: &Regex) -> Result<BTreeSet<String>, CoreError> {
    Ok(walk_files(root)?
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|name| pattern.is_match(name))
        .map(|name| filename_to_key(&name))
        .collect())
}

/// Keys of the entries whose `field` matches.
pub fn search_field(bib: &Bibliography, field: &str, pattern: &Regex) -> BTreeSet<String> {
    bib.lookup_all(field)
        .into_iter()
        .filter(|(_, value)| pattern.is_match(value))
        .map(|(key, _)| key)
        .collect()
}

/// Case-insensitive search over file names, authors and titles.
pub fn search(settings: &Settings, pattern: &str) -> Result<SearchResults, CoreError> {
    let pattern = compile_pattern(pattern)?;
    let bib = read_bibliography(&settings.bib_path())?;

    let mut keys = search_filenames(&settings.repo_root, &pattern)?;
    for field in SEARCH_FIELDS {
        keys.extend(search_field(&bib, field, &pattern));
    }
    tracing::debug!(hits = keys.len(), "search complete");

    Ok(SearchResults {
        keys,
        titles: bib.titles(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIB: &str = "@article{Smith2020,\n  title = {Deep Learning for Cats},\n  author = {Smith, John},\n}\n\
                       @book{knuth1984,\n  title = {The TeXbook},\n  author = {Knuth, Donald},\n}\n";

    #[test]
    fn test_author_match_is_case_insensitive() {
        let bib = Bibliography::parse(BIB).unwrap();
        let hits = search_field(&bib, "author", &compile_pattern("smith").unwrap());
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["Smith2020"]);
    }

    #[test]
    fn test_title_match() {
        let bib = Bibliography::parse(BIB).unwrap();
        let hits = search_field(&bib, "title", &compile_pattern("texBOOK").unwrap());
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["knuth1984"]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(compile_pattern("(unclosed"), Err(CoreError::Pattern(_))));
    }

    #[test]
    fn test_lines_skip_untitled_hits() {
        let results = SearchResults {
            keys: ["a".to_string(), "b".to_string()].into(),
            titles: [("a".to_string(), "Alpha".to_string())].into(),
        };
        assert_eq!(results.lines(), vec!["[a] Alpha"]);
    }
}
