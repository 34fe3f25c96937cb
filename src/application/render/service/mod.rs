mod config;
mod highlight;
mod images;
mod mdx;
mod postprocess;
mod rewrite;
mod toc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::Lazy;
use syntect::{dumps::from_uncompressed_data, html::ClassStyle, parsing::SyntaxSet};
use tracing::{debug, warn};

use crate::application::render::types::{RenderError, RenderOutput, RenderRequest, RenderService};

use config::{build_sanitizer, default_options};
use images::ImageInliner;
use postprocess::{ProcessedHtml, post_process};
use rewrite::{RewriteOutcome, rewrite_ast};
use toc::TocPlan;

pub const DEFAULT_TOC_MAX_DEPTH: u8 = 3;
pub const DEFAULT_INLINE_IMAGE_MAX_BYTES: u64 = 2 * 1024 * 1024;

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(|| {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    match from_uncompressed_data(syntax_bytes) {
        Ok(syntax_set) => syntax_set,
        Err(err) => {
            warn!(
                target = "application::render",
                error = %err,
                "Bundled syntax pack unreadable; using syntect defaults"
            );
            SyntaxSet::load_defaults_newlines()
        }
    }
});

/// CSS for the `syntax-` classes emitted by the highlighter.
pub fn highlight_stylesheet() -> &'static str {
    include_str!(env!("SYNTAX_CSS_FILE"))
}

/// Tunables for the rendering pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    /// Deepest heading level listed in the table of contents.
    pub toc_max_depth: u8,
    /// Images larger than this stay as references instead of `data:` URLs.
    pub inline_image_max_bytes: u64,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            toc_max_depth: DEFAULT_TOC_MAX_DEPTH,
            inline_image_max_bytes: DEFAULT_INLINE_IMAGE_MAX_BYTES,
        }
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            toc_max_depth: settings.toc_max_depth,
            inline_image_max_bytes: settings.inline_image_max_bytes,
        }
    }
}

/// Comrak-based pipeline: MDX shims, GFM parsing, Syntect highlighting, image
/// inlining, Ammonia sanitisation and lol_html post-processing.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
    config: RenderPipelineConfig,
}

impl ComrakRenderService {
    pub fn new(config: RenderPipelineConfig) -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
            config,
        }
    }

    pub fn config(&self) -> &RenderPipelineConfig {
        &self.config
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new(RenderPipelineConfig::default())
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let markdown = mdx::strip_esm(&request.markdown);

        let arena = Arena::new();
        let root = parse_document(&arena, &markdown, &self.options);

        let images = ImageInliner::new(
            request.base_dir.as_deref(),
            self.config.inline_image_max_bytes,
            &request.slug,
        );
        let RewriteOutcome {
            contains_code,
            headings,
        } = rewrite_ast(root, &SYNTAX_SET, CLASS_STYLE, &images)?;

        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = self.sanitizer.clean(&rendered_html).to_string();

        let toc = TocPlan::build(&headings, self.config.toc_max_depth);
        let ProcessedHtml {
            html,
            content_metrics,
        } = post_process(&sanitized_html, &headings, &toc)?;

        debug!(
            target = "application::render",
            slug = %request.slug,
            headings = headings.len(),
            words = content_metrics.word_count,
            "Rendered entry body"
        );

        Ok(RenderOutput {
            html,
            toc: toc.entries,
            contains_code: contains_code || content_metrics.code_blocks_count > 0,
            content_metrics,
        })
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub(crate) fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
