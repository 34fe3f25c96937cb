//! Markdown/MDX rendering.
//!
//! The pipeline is pure: it accepts an entry body, produces deterministic
//! sanitised HTML plus a table of contents, and surfaces structured errors.
//! Reading files and caching results happen in the caller.

mod service;
mod types;

pub use service::{
    ComrakRenderService, DEFAULT_INLINE_IMAGE_MAX_BYTES, DEFAULT_TOC_MAX_DEPTH,
    RenderPipelineConfig, highlight_stylesheet,
};
pub use types::{ContentMetrics, RenderError, RenderOutput, RenderRequest, RenderService, TocEntry};
