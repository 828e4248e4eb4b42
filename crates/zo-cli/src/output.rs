use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use zo_core::{Section, render_report};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print report sections. Without color this is exactly [`render_report`].
pub fn print_sections(
    w: &mut dyn Write,
    sections: &[Section],
    color: ColorMode,
) -> std::io::Result<()> {
    if !color.enabled() {
        return write!(w, "{}", render_report(sections));
    }

    let mut first = true;
    for section in sections.iter().filter(|s| !s.is_empty()) {
        if !first {
            writeln!(w)?;
        }
        first = false;
        writeln!(w, "{}", section.header.bold())?;
        writeln!(w, "{}", section.underline().dimmed())?;
        for line in section.numbered_items() {
            writeln!(w, "{}", line)?;
        }
    }
    Ok(())
}

/// One matching PDF path per line.
pub fn print_grep_match(w: &mut dyn Write, path: &Path, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", path.display().green())
    } else {
        writeln!(w, "{}", path.display())
    }
}
