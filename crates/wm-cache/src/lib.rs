//! WM Render Caches
//!
//! Memoization for rendered content, scoped to renderables (pages and
//! cards) and invalidated per project.
//!
//! # Tiers
//!
//! - raw content: renderable → stored text, for content without directives
//! - expanded content: renderable → macro-expanded text
//! - chart artifacts: (renderable, chart type, position) → rendered artifact
//!
//! # Invalidation
//!
//! Every entry is keyed by its project's current generation. A content
//! event anywhere in a project bumps the generation, so entries written
//! before it are never read again, and bulk-deletes them from all tiers.
//! Writers pass the [`Generation`] they read the source content at; a
//! write computed from content that has since changed is dropped.
//!
//! ```text
//! render ──► RenderCaches::expanded_content(id) ──miss──► generation ──► read, expand ──► store_expanded_content
//!                         ▲
//! ContentEvent ──► on_content_event ──► generation += 1, purge project
//! ```

#![warn(unreachable_pub)]

mod caches;
mod config;
mod key;

pub use caches::{CacheStats, ChartArtifact, Generation, RenderCaches};
pub use config::CacheConfig;
pub use key::{ChartSlot, ContentEvent, ContentEventKind, ProjectId, RenderableId, RenderableKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
