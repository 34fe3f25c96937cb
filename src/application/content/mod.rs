//! Content pipeline: discovery, loading and the collection service.

pub mod discovery;
mod error;
pub mod loader;
mod service;

use serde::{Deserialize, Serialize};

use crate::{application::render::RenderOutput, domain::entities::EntryMeta};

pub use error::ContentError;
pub use service::{ContentService, ContentSettings};

/// A fully compiled entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub meta: EntryMeta,
    pub body: RenderOutput,
}
