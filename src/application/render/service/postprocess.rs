use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str, text};

use crate::application::render::types::{ContentMetrics, RenderError};

use super::{config::HEADING_MARKER, escape_attribute, rewrite::HeadingInfo, toc::TocPlan};

const MARKED_HEADINGS: &str = "h1[data-sourcepos], h2[data-sourcepos], h3[data-sourcepos], \
    h4[data-sourcepos], h5[data-sourcepos], h6[data-sourcepos]";

const WORDS_PER_MINUTE: f32 = 225.0;

pub(crate) struct ProcessedHtml {
    pub(crate) html: String,
    pub(crate) content_metrics: ContentMetrics,
}

#[derive(Default, Clone)]
struct MetricsState {
    words: u32,
    internal_links: u32,
    external_links: u32,
    images: u32,
    images_missing_alt: u32,
    code_blocks: u32,
}

#[derive(Default)]
struct HeadingCursor {
    next: usize,
}

/// Single streaming pass over sanitised HTML: assigns heading ids, wraps
/// headings in an anchor group, places the TOC and gathers metrics.
///
/// Only headings carrying the comrak source-position marker are matched to
/// the AST headings, in order. HTML headings written inline in the source
/// have no marker and are left alone.
pub(crate) fn post_process(
    html: &str,
    headings: &[HeadingInfo],
    toc: &TocPlan,
) -> Result<ProcessedHtml, RenderError> {
    let headings = Rc::new(headings.to_vec());
    let toc_html = Rc::new(toc.to_html());
    let toc_index = toc.insert_after;
    let cursor = Rc::new(RefCell::new(HeadingCursor::default()));
    let state = Rc::new(RefCell::new(MetricsState::default()));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(MARKED_HEADINGS, {
                    let headings = Rc::clone(&headings);
                    let toc_html = Rc::clone(&toc_html);
                    let cursor = Rc::clone(&cursor);
                    move |el| {
                        el.remove_attribute(HEADING_MARKER);
                        let mut cursor = cursor.borrow_mut();
                        let Some(info) = headings.get(cursor.next) else {
                            return Ok(());
                        };
                        let level = el
                            .tag_name()
                            .strip_prefix('h')
                            .and_then(|value| value.parse::<u8>().ok());
                        if level != Some(info.level) {
                            return Ok(());
                        }
                        let index = cursor.next;
                        cursor.next += 1;

                        el.set_attribute("id", &info.anchor)?;
                        el.before(&anchor_group_open(info), ContentType::Html);
                        el.after("</div>", ContentType::Html);
                        if toc_index == Some(index) && !toc_html.is_empty() {
                            el.after(&toc_html, ContentType::Html);
                        }
                        Ok(())
                    }
                }),
                element!("img", {
                    let state = Rc::clone(&state);
                    move |el| {
                        {
                            let mut state = state.borrow_mut();
                            state.images = state.images.saturating_add(1);
                            let alt = el.get_attribute("alt").unwrap_or_default();
                            if alt.trim().is_empty() {
                                state.images_missing_alt =
                                    state.images_missing_alt.saturating_add(1);
                            }
                        }
                        if el.get_attribute("loading").is_none() {
                            el.set_attribute("loading", "lazy")?;
                        }
                        if el.get_attribute("decoding").is_none() {
                            el.set_attribute("decoding", "async")?;
                        }
                        Ok(())
                    }
                }),
                element!("a[href]", {
                    let state = Rc::clone(&state);
                    move |el| {
                        let href = el.get_attribute("href").unwrap_or_default();
                        match classify_link(&href) {
                            LinkKind::External => {
                                {
                                    let mut state = state.borrow_mut();
                                    state.external_links = state.external_links.saturating_add(1);
                                }
                                let rel =
                                    merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                                el.set_attribute("rel", &rel)?;
                            }
                            LinkKind::Internal => {
                                let mut state = state.borrow_mut();
                                state.internal_links = state.internal_links.saturating_add(1);
                            }
                            LinkKind::Anchor | LinkKind::Other => {}
                        }
                        Ok(())
                    }
                }),
                element!("pre", {
                    let state = Rc::clone(&state);
                    move |_el| {
                        let mut state = state.borrow_mut();
                        state.code_blocks = state.code_blocks.saturating_add(1);
                        Ok(())
                    }
                }),
                text!("*", {
                    let state = Rc::clone(&state);
                    move |chunk| {
                        let words = chunk.as_str().split_whitespace().count() as u32;
                        if words > 0 {
                            let mut state = state.borrow_mut();
                            state.words = state.words.saturating_add(words);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let state = state.borrow().clone();
    Ok(ProcessedHtml {
        html: rewritten,
        content_metrics: build_content_metrics(&state),
    })
}

fn anchor_group_open(info: &HeadingInfo) -> String {
    let anchor = escape_attribute(&info.anchor);
    let label = escape_attribute(&format!("Section titled: {}", info.text));
    format!(
        "<div class=\"heading-group\"><a class=\"heading-anchor\" href=\"#{anchor}\" aria-label=\"{label}\"><span aria-hidden=\"true\">#</span></a>"
    )
}

fn build_content_metrics(state: &MetricsState) -> ContentMetrics {
    let reading_time_minutes = if state.words == 0 {
        0
    } else {
        ((state.words as f32 / WORDS_PER_MINUTE).ceil() as u32).max(1)
    };

    ContentMetrics {
        word_count: state.words,
        reading_time_minutes,
        internal_links_count: state.internal_links,
        external_links_count: state.external_links,
        images_count: state.images,
        images_missing_alt: state.images_missing_alt,
        code_blocks_count: state.code_blocks,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Internal,
    External,
    Anchor,
    Other,
}

fn classify_link(href: &str) -> LinkKind {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        LinkKind::Anchor
    } else if href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//")
    {
        LinkKind::External
    } else if href.starts_with('/') || !href.contains(':') {
        LinkKind::Internal
    } else {
        LinkKind::Other
    }
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    tokens.extend(required.iter().map(|token| token.to_string()));
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, anchor: &str, text: &str) -> HeadingInfo {
        HeadingInfo {
            level,
            anchor: anchor.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn wraps_headings_and_sets_ids() {
        let headings = [heading(2, "setup", "Setup & run")];
        let toc = TocPlan::build(&headings, 3);

        let processed = post_process(
            "<h2 data-sourcepos=\"1:1-1:14\">Setup &amp; run</h2><p>Go.</p>",
            &headings,
            &toc,
        )
        .expect("post process");

        assert_eq!(
            processed.html,
            "<div class=\"heading-group\"><a class=\"heading-anchor\" href=\"#setup\" aria-label=\"Section titled: Setup &amp; run\"><span aria-hidden=\"true\">#</span></a><h2 id=\"setup\">Setup &amp; run</h2></div><p>Go.</p>"
        );
    }

    #[test]
    fn inline_html_headings_do_not_shift_anchors() {
        let headings = [heading(2, "real", "Real")];
        let toc = TocPlan::build(&headings, 3);

        let processed = post_process(
            "<h4>Raw</h4><h2>Raw too</h2><h2 data-sourcepos=\"3:1-3:7\">Real</h2>",
            &headings,
            &toc,
        )
        .expect("post process");

        assert!(
            processed
                .html
                .starts_with("<h4>Raw</h4><h2>Raw too</h2><div class=\"heading-group\">")
        );
        assert!(processed.html.contains("<h2 id=\"real\">Real</h2>"));
        assert_eq!(processed.html.matches("heading-group").count(), 1);
    }

    #[test]
    fn inserts_toc_after_contents_heading() {
        let headings = [heading(2, "contents", "Contents"), heading(2, "usage", "Usage")];
        let toc = TocPlan::build(&headings, 3);

        let processed = post_process(
            "<h2 data-sourcepos=\"1:1-1:11\">Contents</h2><h2 data-sourcepos=\"3:1-3:8\">Usage</h2>",
            &headings,
            &toc,
        )
        .expect("post process");

        assert!(processed.html.contains(
            "<h2 id=\"contents\">Contents</h2></div><ul class=\"toc\"><li><a href=\"#usage\">Usage</a></li></ul>"
        ));
    }

    #[test]
    fn gathers_content_metrics() {
        let html = "<p>One two three <a href=\"https://example.com\">four</a> \
            <a href=\"/about\">five</a> <a href=\"#x\">six</a></p>\
            <img src=\"a.png\" alt=\"\"><pre><code>let x = 1;</code></pre>";

        let processed = post_process(html, &[], &TocPlan::build(&[], 3)).expect("post process");
        let metrics = processed.content_metrics;

        assert_eq!(metrics.external_links_count, 1);
        assert_eq!(metrics.internal_links_count, 1);
        assert_eq!(metrics.images_count, 1);
        assert_eq!(metrics.images_missing_alt, 1);
        assert_eq!(metrics.code_blocks_count, 1);
        assert_eq!(metrics.word_count, 10);
        assert_eq!(metrics.reading_time_minutes, 1);
        assert!(processed.html.contains("rel=\"noopener noreferrer\""));
        assert!(processed.html.contains("loading=\"lazy\""));
    }
}
