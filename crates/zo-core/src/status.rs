//! Cross-reference of repository PDFs against the repository bibliography.

use std::collections::{BTreeMap, BTreeSet};

use zo_bib::{KeyMismatch, check_consistency, read_with_raw_blocks};

use crate::repo::pdf_keys;
use crate::report::Section;
use crate::{CoreError, Settings};

#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    /// Keys with both a PDF and a titled bibliography entry, mapped to the title.
    pub ready: BTreeMap<String, String>,
    pub files_without_entries: BTreeSet<String>,
    pub entries_without_files: BTreeSet<String>,
    /// Disagreement between the parsed and raw views of the bibliography.
    pub mismatch: KeyMismatch,
}

impl StatusReport {
    /// Compute the report from the two key sets and the title map.
    pub fn from_keys(
        files: &BTreeSet<String>,
        refs: &BTreeSet<String>,
        titles: &BTreeMap<String, String>,
    ) -> Self {
        let ready = files
            .intersection(refs)
            .filter_map(|k| titles.get(k).map(|t| (k.clone(), t.clone())))
            .collect();
        Self {
            ready,
            files_without_entries: files.difference(refs).cloned().collect(),
            entries_without_files: refs.difference(files).cloned().collect(),
            mismatch: KeyMismatch::default(),
        }
    }

    pub fn sections(&self) -> Vec<Section> {
        vec![
            Section::new(
                "Files that are good to go:",
                self.ready.iter().map(|(k, t)| format!("[{k}] {t}")),
            ),
            Section::new(
                "Files missing .bib entries:",
                self.files_without_entries.iter().cloned(),
            ),
            Section::new(
                ".bib entries missing files:",
                self.entries_without_files.iter().cloned(),
            ),
            Section::new(
                "Entries the BibTeX parser did not see:",
                self.mismatch.only_raw.iter().cloned(),
            ),
            Section::new(
                "Entries without a raw block:",
                self.mismatch.only_parsed.iter().cloned(),
            ),
        ]
    }
}

pub fn status(settings: &Settings) -> Result<StatusReport, CoreError> {
    let files = pdf_keys(&settings.repo_root)?;
    let (bib, blocks) = read_with_raw_blocks(&settings.bib_path())?;
    let refs = bib.keys();

    let mut report = StatusReport::from_keys(&files, &refs, &bib.titles());
    report.mismatch = check_consistency(&refs, &blocks);
    if !report.mismatch.is_empty() {
        tracing::warn!(
            only_parsed = report.mismatch.only_parsed.len(),
            only_raw = report.mismatch.only_raw.len(),
            "parsed and raw bibliography views disagree"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::render_report;

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_from_keys_partitions() {
        let titles: BTreeMap<_, _> = [("a".to_string(), "Alpha".to_string())].into();
        let report = StatusReport::from_keys(&set(&["a", "b", "x"]), &set(&["a", "b", "c"]), &titles);

        // "b" has no title and is left out of the ready list.
        assert_eq!(report.ready.len(), 1);
        assert_eq!(report.files_without_entries, set(&["x"]));
        assert_eq!(report.entries_without_files, set(&["c"]));
    }

    #[test]
    fn test_consistency_sections() {
        let mut report = StatusReport::default();
        report.mismatch.only_raw = set(&["unparsed"]);
        report.mismatch.only_parsed = set(&["blockless"]);
        assert_eq!(
            render_report(&report.sections()),
            "Entries the BibTeX parser did not see:\n\
             ======================================\n\
             1. unparsed\n\
             \n\
             Entries without a raw block:\n\
             ============================\n\
             1. blockless\n"
        );
    }

    #[test]
    fn test_sections_render() {
        let titles: BTreeMap<_, _> = [("a".to_string(), "Alpha".to_string())].into();
        let report = StatusReport::from_keys(&set(&["a"]), &set(&["a"]), &titles);
        assert_eq!(
            render_report(&report.sections()),
            "Files that are good to go:\n==========================\n1. [a] Alpha\n"
        );
    }
}
