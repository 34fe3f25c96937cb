//! Content pipeline for a personal portfolio and blog.
//!
//! Entries live on disk as one directory per entry holding an MDX file with
//! YAML frontmatter. [`application::content::ContentService`] lists their
//! metadata newest first and compiles single entries to sanitized HTML.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
