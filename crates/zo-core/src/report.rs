//! Plain-text rendering of enumerated report sections.

/// A titled list of items, kept in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: String,
    pub items: Vec<String>,
}

impl Section {
    pub fn new<I, S>(header: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
        items.sort();
        Self {
            header: header.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `=` characters matching the header's width.
    pub fn underline(&self) -> String {
        "=".repeat(self.header.chars().count())
    }

    /// Numbered item lines, `1. first`, `2. second`, ...
    pub fn numbered_items(&self) -> impl Iterator<Item = String> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, item))
    }

    /// Header, underline and numbered items. An empty section renders as "".
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = format!("{}\n{}\n", self.header, self.underline());
        for line in self.numbered_items() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

pub fn render_section<I, S>(items: I, header: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Section::new(header, items).render()
}

/// Render the non-empty sections, separated by one blank line.
pub fn render_report(sections: &[Section]) -> String {
    sections
        .iter()
        .filter(|s| !s.is_empty())
        .map(Section::render)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sorted_and_numbered() {
        let out = render_section(["b", "c", "a"], "Keys:");
        assert_eq!(out, "Keys:\n=====\n1. a\n2. b\n3. c\n");
    }

    #[test]
    fn test_empty_section_is_exactly_empty() {
        let out = render_section(Vec::<String>::new(), "Nothing here:");
        assert_eq!(out.as_bytes(), b"");
    }

    #[test]
    fn test_underline_counts_chars_not_bytes() {
        let section = Section::new("Référence", ["x"]);
        assert_eq!(section.underline(), "=========");
    }

    #[test]
    fn test_report_skips_empty_sections() {
        let sections = vec![
            Section::new("First:", ["1"]),
            Section::new("Skipped:", Vec::<String>::new()),
            Section::new("Last:", ["2"]),
        ];
        assert_eq!(
            render_report(&sections),
            "First:\n======\n1. 1\n\nLast:\n=====\n1. 2\n"
        );
    }

    #[test]
    fn test_report_all_empty() {
        let sections = vec![Section::new("A:", Vec::<String>::new())];
        assert_eq!(render_report(&sections), "");
    }
}
