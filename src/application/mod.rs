//! Application services: the content pipeline and its renderer.

pub mod content;
pub mod error;
pub mod render;
