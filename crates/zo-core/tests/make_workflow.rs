//! End-to-end runs of `make`, `status` and `search` against a throwaway
//! repository and LaTeX project.

use std::fs;
use std::path::Path;

use zo_core::status::status;
use zo_core::search::search;
use zo_core::{Settings, make, render_report};

const PARENT: &str = r#"@article{Smith2020,
  title = {Deep Learning for Cats},
  author = {Smith, John},
  year = {2020},
}

@inproceedings{lee2018,
  title     = {Graphs All the Way Down},
  author    = {Lee, Ann},
  year      = {2018},
}

@book{knuth1984,
  title = {The TeXbook},
  author = {Knuth, Donald},
  year = {1984},
}
"#;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn keys(set: &std::collections::BTreeSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}

#[test]
fn make_appends_needed_entries_and_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("repo/refs.bib");
    let project = dir.path().join("paper");
    let child = project.join("refs.bib");
    write(&parent, PARENT);
    write(
        &project.join("main.tex"),
        "We build on \\cite{Smith2020,\n  lee2018} and \\cite{ghost2021}.\n\\cite{}\n",
    );

    let outcome = make(&project, &parent, &child).unwrap();
    assert_eq!(keys(&outcome.added), vec!["Smith2020", "lee2018"]);
    assert_eq!(keys(&outcome.missing), vec!["ghost2021"]);
    assert_eq!(outcome.empty_citations.len(), 1);

    let written = fs::read_to_string(&child).unwrap();
    assert!(written.contains("  title     = {Graphs All the Way Down},\n"));
    assert!(!written.contains("knuth1984"));

    let report = render_report(&outcome.sections());
    assert!(report.starts_with("The following refs were added to the local refs.bib:\n"));
    assert!(report.contains("\n1. ghost2021\n"));
}

#[test]
fn make_twice_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("parent.bib");
    let project = dir.path().join("paper");
    let child = project.join("refs.bib");
    write(&parent, PARENT);
    write(&project.join("main.tex"), r"\cite{knuth1984}");

    make(&project, &parent, &child).unwrap();
    let first = fs::read(&child).unwrap();

    let second = make(&project, &parent, &child).unwrap();
    assert!(second.required.is_empty());
    assert!(second.added.is_empty());
    assert_eq!(second.appended_bytes, 0);
    assert_eq!(fs::read(&child).unwrap(), first);
}

#[test]
fn make_only_adds_new_citations() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("parent.bib");
    let project = dir.path().join("paper");
    let child = project.join("refs.bib");
    write(&parent, PARENT);
    write(&project.join("main.tex"), r"\cite{knuth1984}");
    make(&project, &parent, &child).unwrap();

    write(&project.join("sections/more.tex"), r"\fullcite{lee2018} \cite{knuth1984}");
    let outcome = make(&project, &parent, &child).unwrap();
    assert_eq!(keys(&outcome.required), vec!["lee2018"]);

    let written = fs::read_to_string(&child).unwrap();
    assert_eq!(written.matches("@book{knuth1984,").count(), 1);
    assert_eq!(written.matches("@inproceedings{lee2018,").count(), 1);
}

#[test]
fn make_with_malformed_child_fails() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("parent.bib");
    let project = dir.path().join("paper");
    let child = project.join("refs.bib");
    write(&parent, PARENT);
    write(&project.join("main.tex"), r"\cite{knuth1984}");
    write(&child, "@article{broken,\n  title = {never closed\n");

    assert!(make(&project, &parent, &child).is_err());
    assert_eq!(
        fs::read_to_string(&child).unwrap(),
        "@article{broken,\n  title = {never closed\n"
    );
}

const PARENT_WITH_MACROS: &str = r#"@string{ml = "Machine Learning"}

@string{jml = "Journal of " # ml}

@article{a1,
  title = {First},
  journal = jml,
}

@article{a2,
  title = {Second},
  journal = jml,
}
"#;

#[test]
fn make_copies_string_macros_and_stays_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("parent.bib");
    let project = dir.path().join("paper");
    let child = project.join("refs.bib");
    write(&parent, PARENT_WITH_MACROS);
    write(&project.join("main.tex"), r"\cite{a1}");

    let first = make(&project, &parent, &child).unwrap();
    assert_eq!(keys(&first.added), vec!["a1"]);
    assert_eq!(keys(&first.macros), vec!["jml", "ml"]);

    let second = make(&project, &parent, &child).unwrap();
    assert!(second.required.is_empty());

    write(&project.join("more.tex"), r"\cite{a2}");
    let third = make(&project, &parent, &child).unwrap();
    assert_eq!(keys(&third.added), vec!["a2"]);
    assert!(third.macros.is_empty());

    let written = fs::read_to_string(&child).unwrap();
    assert_eq!(written.matches("@string{jml").count(), 1);
    assert_eq!(written.matches("@string{ml").count(), 1);
    assert!(make(&project, &parent, &child).unwrap().required.is_empty());
}

fn repository() -> (tempfile::TempDir, Settings) {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("refs.bib"), PARENT);
    write(&dir.path().join("2020/[Smith2020] cats.pdf"), "");
    write(&dir.path().join("lee2018.pdf"), "");
    write(&dir.path().join("unfiled.pdf"), "");
    let settings = Settings {
        repo_root: dir.path().to_path_buf(),
        ..Settings::default()
    };
    (dir, settings)
}

#[test]
fn status_cross_references_pdfs_and_entries() {
    let (_dir, settings) = repository();
    let report = status(&settings).unwrap();

    assert_eq!(
        report.ready.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["Smith2020", "lee2018"]
    );
    assert_eq!(keys(&report.files_without_entries), vec!["unfiled"]);
    assert_eq!(keys(&report.entries_without_files), vec!["knuth1984"]);
    assert!(report.mismatch.is_empty());
}

#[test]
fn search_matches_author_case_insensitively() {
    let (_dir, settings) = repository();
    let results = search(&settings, "smith").unwrap();
    assert_eq!(results.lines(), vec!["[Smith2020] Deep Learning for Cats"]);
}

#[test]
fn search_matches_file_names() {
    let (_dir, settings) = repository();
    let results = search(&settings, "^LEE").unwrap();
    assert!(results.keys.contains("lee2018"));
}
