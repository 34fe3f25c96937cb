use crate::application::render::types::TocEntry;

use super::{escape_attribute, escape_text, rewrite::HeadingInfo};

/// Which headings make up the table of contents, and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TocPlan {
    /// Index of the heading the rendered list is placed after, if any.
    pub(crate) insert_after: Option<usize>,
    pub(crate) entries: Vec<TocEntry>,
}

impl TocPlan {
    /// With a "Table of contents" style heading present, the list covers the
    /// headings after that heading's own section. Otherwise every heading is
    /// listed. Headings deeper than `max_depth` are left out.
    pub(crate) fn build(headings: &[HeadingInfo], max_depth: u8) -> Self {
        let insert_after = headings.iter().position(is_toc_heading);

        let candidates: Vec<&HeadingInfo> = match insert_after {
            Some(index) => {
                let opening_level = headings[index].level;
                headings[index + 1..]
                    .iter()
                    .skip_while(|heading| heading.level > opening_level)
                    .collect()
            }
            None => headings.iter().collect(),
        };

        let flat = candidates
            .into_iter()
            .filter(|heading| heading.level <= max_depth && !heading.text.is_empty());

        Self {
            insert_after,
            entries: nest(flat),
        }
    }

    pub(crate) fn to_html(&self) -> String {
        let mut html = String::new();
        render_list(&self.entries, &mut html);
        html
    }
}

/// `toc`, or `content`/`contents` optionally preceded by `table of `, where
/// the inner separators may be spaces or hyphens. Case-insensitive.
fn is_toc_heading(heading: &HeadingInfo) -> bool {
    let text = heading.text.trim().to_lowercase();
    if text == "toc" {
        return true;
    }
    let rest = strip_word(&text, "table")
        .and_then(|rest| strip_word(rest, "of"))
        .unwrap_or(&text);
    matches!(rest, "content" | "contents")
}

fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    text.strip_prefix(word)?.strip_prefix([' ', '-'])
}

/// Nest a flat heading sequence by level. A heading becomes a child of the
/// closest preceding heading with a lower level.
fn nest<'a>(headings: impl Iterator<Item = &'a HeadingInfo>) -> Vec<TocEntry> {
    let mut roots: Vec<TocEntry> = Vec::new();
    let mut stack: Vec<TocEntry> = Vec::new();

    for heading in headings {
        while stack.last().is_some_and(|open| open.level >= heading.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(TocEntry {
            level: heading.level,
            anchor: heading.anchor.clone(),
            text: heading.text.clone(),
            children: Vec::new(),
        });
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn close_top(stack: &mut Vec<TocEntry>, roots: &mut Vec<TocEntry>) {
    if let Some(entry) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(entry),
            None => roots.push(entry),
        }
    }
}

fn render_list(entries: &[TocEntry], html: &mut String) {
    if entries.is_empty() {
        return;
    }
    html.push_str("<ul class=\"toc\">");
    for entry in entries {
        html.push_str("<li><a href=\"#");
        html.push_str(&escape_attribute(&entry.anchor));
        html.push_str("\">");
        html.push_str(&escape_text(&entry.text));
        html.push_str("</a>");
        render_list(&entry.children, html);
        html.push_str("</li>");
    }
    html.push_str("</ul>");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, text: &str) -> HeadingInfo {
        HeadingInfo {
            level,
            anchor: text.to_lowercase().replace(' ', "-"),
            text: text.to_string(),
        }
    }

    #[test]
    fn nests_entries_by_level() {
        let headings = [
            heading(2, "One"),
            heading(3, "One A"),
            heading(3, "One B"),
            heading(2, "Two"),
            heading(4, "Too deep"),
        ];

        let plan = TocPlan::build(&headings, 3);

        assert_eq!(plan.insert_after, None);
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].children.len(), 2);
        assert_eq!(plan.entries[0].children[1].anchor, "one-b");
        assert!(plan.entries[1].children.is_empty());
    }

    #[test]
    fn toc_heading_marks_insertion_point_and_is_excluded() {
        let headings = [
            heading(1, "Title"),
            heading(2, "Table of Contents"),
            heading(3, "Inside toc section"),
            heading(2, "Usage"),
            heading(3, "Flags"),
        ];

        let plan = TocPlan::build(&headings, 3);

        assert_eq!(plan.insert_after, Some(1));
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].text, "Usage");
        assert_eq!(plan.entries[0].children[0].text, "Flags");
        assert_eq!(
            plan.to_html(),
            "<ul class=\"toc\"><li><a href=\"#usage\">Usage</a><ul class=\"toc\"><li><a href=\"#flags\">Flags</a></li></ul></li></ul>"
        );
    }

    #[test]
    fn recognises_contents_heading_spellings() {
        for text in [
            "TOC",
            "Content",
            "Contents",
            "Table of content",
            "Table-of-contents",
            "table of-Contents",
        ] {
            assert!(is_toc_heading(&heading(2, text)), "{text}");
        }
        for text in ["Table contents", "Of contents", "Contents page", "tocs"] {
            assert!(!is_toc_heading(&heading(2, text)), "{text}");
        }
    }

    #[test]
    fn earlier_deeper_heading_stays_a_root() {
        let headings = [heading(3, "Deep first"), heading(2, "Shallow")];
        let plan = TocPlan::build(&headings, 6);

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].level, 3);
    }
}
