//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod frontmatter;
pub mod open_graph;
pub mod slug;
