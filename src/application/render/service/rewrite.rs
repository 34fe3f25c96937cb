use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::{html::ClassStyle, parsing::SyntaxSet};

use crate::{application::render::types::RenderError, domain::slug::AnchorSlugger};

use super::{escape_attribute, highlight, images::ImageInliner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeadingInfo {
    pub(crate) level: u8,
    pub(crate) anchor: String,
    pub(crate) text: String,
}

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) headings: Vec<HeadingInfo>,
}

/// Walk the AST in document order: record headings with unique anchors,
/// replace fenced code with highlighted HTML and rewrite images.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: ClassStyle,
    images: &ImageInliner<'_>,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker {
        syntax_set,
        class_style,
        images,
        slugger: AnchorSlugger::new(),
        outcome: RewriteOutcome::default(),
    };
    walker.visit(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'a, 'i> {
    syntax_set: &'a SyntaxSet,
    class_style: ClassStyle,
    images: &'a ImageInliner<'i>,
    slugger: AnchorSlugger,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_, '_> {
    fn visit(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        let kind = NodeKind::of(node);
        match kind {
            NodeKind::Heading(level) => {
                let text = normalise_whitespace(&collect_inline_text(node));
                let anchor = self.slugger.anchor_for(&text);
                self.outcome.headings.push(HeadingInfo {
                    level,
                    anchor,
                    text,
                });
            }
            NodeKind::CodeBlock { info, literal } => {
                let mut segments = info.split_whitespace();
                let language = segments.next();
                let meta = segments.collect::<Vec<_>>().join(" ");
                let html = highlight::highlight_code(
                    language,
                    Some(meta.as_str()),
                    &literal,
                    self.syntax_set,
                    self.class_style,
                )?;
                self.outcome.contains_code = true;
                node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal: html,
                });
                return Ok(());
            }
            NodeKind::Image { url, title } => {
                self.rewrite_image(node, &url, &title);
                return Ok(());
            }
            NodeKind::Other => {}
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit(next)?;
            child = next.next_sibling();
        }
        Ok(())
    }

    fn rewrite_image(&self, node: &AstNode<'_>, url: &str, title: &str) {
        let alt = normalise_whitespace(&collect_inline_text(node));
        let src = self.images.inline(url).unwrap_or_else(|| url.to_string());

        let mut html = format!(
            "<img src=\"{}\" alt=\"{}\"",
            escape_attribute(&src),
            escape_attribute(&alt)
        );
        if !title.is_empty() {
            html.push_str(&format!(" title=\"{}\"", escape_attribute(title)));
        }
        html.push_str(" />");

        node.data.borrow_mut().value = NodeValue::HtmlInline(html);
        while let Some(child) = node.first_child() {
            child.detach();
        }
    }
}

enum NodeKind {
    Heading(u8),
    CodeBlock { info: String, literal: String },
    Image { url: String, title: String },
    Other,
}

impl NodeKind {
    fn of(node: &AstNode<'_>) -> Self {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Heading(heading) => Self::Heading(heading.level),
            NodeValue::CodeBlock(block) if block.fenced => Self::CodeBlock {
                info: block.info.trim().to_string(),
                literal: block.literal.clone(),
            },
            NodeValue::Image(link) => Self::Image {
                url: link.url.clone(),
                title: link.title.clone(),
            },
            _ => Self::Other,
        }
    }
}

fn normalise_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        match &node.data.borrow().value {
            NodeValue::Text(text) => buffer.push_str(text),
            NodeValue::Code(code) => buffer.push_str(&code.literal),
            NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
            _ => {}
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html, parse_document};

    use super::*;
    use crate::application::render::service::config::default_options;

    const STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

    fn rewrite(markdown: &str) -> (RewriteOutcome, String) {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let inliner = ImageInliner::new(None, 0, "test");

        let outcome = rewrite_ast(root, &syntax_set, STYLE, &inliner).expect("rewrite");
        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        (outcome, html)
    }

    #[test]
    fn collects_headings_with_unique_anchors() {
        let (outcome, _) = rewrite("# Intro\n\n## Setup `cargo`\n\n## Intro\n");

        let anchors: Vec<_> = outcome.headings.iter().map(|h| h.anchor.as_str()).collect();
        assert_eq!(anchors, ["intro", "setup-cargo", "intro-1"]);
        assert_eq!(outcome.headings[1].text, "Setup cargo");
        assert_eq!(outcome.headings[1].level, 2);
    }

    #[test]
    fn highlights_fenced_code() {
        let (outcome, html) = rewrite("```rust title=\"main.rs\"\nfn main() {}\n```\n");

        assert!(outcome.contains_code);
        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("data-meta=\"title=&quot;main.rs&quot;\""));
    }

    #[test]
    fn rewrites_images_keeping_alt_and_title() {
        let (_, html) = rewrite("![A *small* cat](https://example.com/cat.png \"Cat\")\n");

        assert!(html.contains(
            "<img src=\"https://example.com/cat.png\" alt=\"A small cat\" title=\"Cat\" />"
        ));
    }
}
