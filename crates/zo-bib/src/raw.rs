//! Raw, line-oriented view of a `.bib` file.
//!
//! The parsed view in the crate root loses the author's formatting. Here each
//! entry is kept as the exact text it was written with, so that entries can be
//! copied from one bibliography into another unchanged.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::BibError;

/// Entry types that never carry a citation key.
const NON_CITABLE: &[&str] = &["string", "preamble", "comment"];

/// One `@type{key, ...}` block as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Lower-cased entry type (`article`, `book`, `string`, ...).
    pub entry_type: String,
    /// Text between the first `{` and the following `,` of the header line.
    pub key: Option<String>,
    /// Header line plus body lines up to the next block. `#` lines and
    /// trailing blank lines are dropped; always ends with a newline.
    pub text: String,
}

impl RawBlock {
    pub fn is_citable(&self) -> bool {
        !NON_CITABLE.contains(&self.entry_type.as_str())
    }

    /// Lower-cased name defined by an `@string{name = ...}` block.
    pub fn macro_name(&self) -> Option<String> {
        if self.entry_type != "string" {
            return None;
        }
        let (_, rest) = self.text.split_once(['{', '('])?;
        let (name, _) = rest.split_once('=')?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_lowercase())
    }

    /// `\r\n` when the header line uses it, `\n` otherwise.
    pub fn line_ending(&self) -> &'static str {
        line_ending_of(&self.text)
    }
}

fn line_ending_of(text: &str) -> &'static str {
    match text.split_inclusive('\n').next() {
        Some(first) if first.ends_with("\r\n") => "\r\n",
        _ => "\n",
    }
}

/// Bare macro names used in the field values of a block.
///
/// Braced and quoted text is skipped; a name counts only where a value may
/// start, after `=` or a `#` concatenation.
pub fn referenced_macros(text: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let Some((_, body)) = text.split_once(['{', '(']) else {
        return names;
    };

    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut expect_value = false;
    let mut chars = body.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                depth += 1;
                expect_value = false;
            }
            '}' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '"' => {
                in_quotes = !in_quotes;
                expect_value = false;
            }
            _ if in_quotes || c.is_whitespace() => {}
            '=' | '#' => expect_value = true,
            c if expect_value && c.is_alphabetic() => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || "_-:.+/'".contains(next)) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                names.insert(body[start..end].to_lowercase());
                expect_value = false;
            }
            _ => expect_value = false,
        }
    }

    names
}

/// Result of extracting a subset of entries from a parent bibliography.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Concatenated blocks, each terminated by one blank line.
    pub text: String,
    pub added: BTreeSet<String>,
    /// Requested keys with no block in the parent.
    pub missing: BTreeSet<String>,
    /// `@string` macros copied ahead of the entries that use them.
    pub macros: BTreeSet<String>,
}

/// Keys on which the parsed and raw views of one file disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMismatch {
    pub only_parsed: BTreeSet<String>,
    pub only_raw: BTreeSet<String>,
}

impl KeyMismatch {
    pub fn is_empty(&self) -> bool {
        self.only_parsed.is_empty() && self.only_raw.is_empty()
    }
}

fn is_block_start(line: &str) -> bool {
    line.trim_start().starts_with('@')
}

fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Parse an `@type{key,` header line into its type and key.
fn parse_header(line: &str) -> (String, Option<String>) {
    static TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@\s*([A-Za-z]*)").unwrap());

    let entry_type = TYPE_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    let key = line.split_once('{').and_then(|(_, rest)| {
        let key = rest.split(',').next().unwrap_or_default().trim();
        (!key.is_empty()).then(|| key.to_string())
    });

    (entry_type, key)
}

fn finish_block(lines: &mut Vec<&str>) -> String {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let mut text = lines.concat();
    if !text.ends_with('\n') {
        text.push_str(line_ending_of(&text));
    }
    text
}

/// Split bibliography text into raw blocks, in file order.
///
/// Text before the first `@` line is ignored.
pub fn parse_raw_blocks(content: &str) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut lines = content.split_inclusive('\n').peekable();

    while let Some(line) = lines.next() {
        if !is_block_start(line) {
            continue;
        }
        let (entry_type, key) = parse_header(line);
        let mut body = vec![line];
        while let Some(next) = lines.next_if(|l| !is_block_start(l)) {
            if !is_comment_line(next) {
                body.push(next);
            }
        }
        blocks.push(RawBlock {
            entry_type,
            key,
            text: finish_block(&mut body),
        });
    }

    blocks
}

/// Extract the blocks for `required` from a parent bibliography.
///
/// The first block for each key wins; later duplicates are ignored. The input
/// set is left untouched and `added`/`missing` partition it exactly.
pub fn split_bibliography(parent: &str, required: &BTreeSet<String>) -> SplitOutcome {
    split_bibliography_with_macros(parent, required, &BTreeSet::new())
}

/// Like [`split_bibliography`], but also copies the parent's `@string`
/// definitions the extracted entries depend on, ahead of those entries.
/// Macros named in `known_macros` are already defined by the destination and
/// are not copied again.
pub fn split_bibliography_with_macros(
    parent: &str,
    required: &BTreeSet<String>,
    known_macros: &BTreeSet<String>,
) -> SplitOutcome {
    let blocks = parse_raw_blocks(parent);
    let mut outcome = SplitOutcome::default();
    let mut entries = String::new();
    let mut wanted = BTreeSet::new();

    for block in &blocks {
        let Some(key) = &block.key else { continue };
        if !block.is_citable() || !required.contains(key) || outcome.added.contains(key) {
            continue;
        }
        entries.push_str(&block.text);
        entries.push_str(block.line_ending());
        wanted.extend(referenced_macros(&block.text));
        outcome.added.insert(key.clone());
    }

    let definitions: Vec<(String, &RawBlock)> = blocks
        .iter()
        .filter_map(|b| b.macro_name().map(|name| (name, b)))
        .collect();

    // Macros may be defined in terms of other macros.
    loop {
        let before = wanted.len();
        for (name, block) in &definitions {
            if wanted.contains(name) {
                let nested = referenced_macros(&block.text);
                wanted.extend(nested);
            }
        }
        if wanted.len() == before {
            break;
        }
    }

    for (name, block) in &definitions {
        if !wanted.contains(name) || known_macros.contains(name) || outcome.macros.contains(name)
        {
            continue;
        }
        outcome.text.push_str(&block.text);
        outcome.text.push_str(block.line_ending());
        outcome.macros.insert(name.clone());
    }
    outcome.text.push_str(&entries);

    outcome.missing = required.difference(&outcome.added).cloned().collect();
    outcome
}

pub fn split_bibliography_file(
    parent: &Path,
    required: &BTreeSet<String>,
    known_macros: &BTreeSet<String>,
) -> Result<SplitOutcome, BibError> {
    let content = std::fs::read_to_string(parent).map_err(|source| BibError::Io {
        path: parent.to_path_buf(),
        source,
    })?;
    let outcome = split_bibliography_with_macros(&content, required, known_macros);
    tracing::debug!(
        parent = %parent.display(),
        added = outcome.added.len(),
        missing = outcome.missing.len(),
        macros = outcome.macros.len(),
        "split bibliography"
    );
    Ok(outcome)
}

/// Names of the `@string` macros a set of raw blocks defines.
pub fn defined_macros(blocks: &[RawBlock]) -> BTreeSet<String> {
    blocks.iter().filter_map(RawBlock::macro_name).collect()
}

/// Compare the parsed key set of a file with the keys of its raw blocks.
pub fn check_consistency(parsed: &BTreeSet<String>, blocks: &[RawBlock]) -> KeyMismatch {
    let raw: BTreeSet<String> = blocks
        .iter()
        .filter(|b| b.is_citable())
        .filter_map(|b| b.key.clone())
        .collect();

    KeyMismatch {
        only_parsed: parsed.difference(&raw).cloned().collect(),
        only_raw: raw.difference(parsed).cloned().collect(),
    }
}
