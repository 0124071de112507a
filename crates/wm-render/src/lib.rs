//! WM Render
//!
//! Expands macro directives embedded in pages and cards, and renders
//! chart directives in two phases (image link now, artifact on request).
//!
//! # Core Concepts
//!
//! - [`Document`]: directive scan of a text (inline `{{ }}` and block `{% %}`)
//! - [`MacroRegistry`]: directive name → [`MacroHandler`], with scoped overlays
//! - [`extract`]: the Nth occurrence of a directive, resolved and validated
//! - [`render_document`] / [`execute`]: expansion with per-directive failure isolation
//! - [`ChartPipeline`]: artifact phase of chart rendering
//! - [`ContentRenderer`]: cached rendering of stored pages and cards
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wm_render::{
//!     builtin_registry, render_document, MemoryWorld, Project, RenderContext, Services,
//! };
//! use wm_cache::RenderableId;
//! use wm_query::SelectParser;
//!
//! let world = Arc::new(MemoryWorld::new());
//! world.add_project(Project::new("demo", "Demo"));
//! let services = Services::new(world.clone(), world, Arc::new(SelectParser));
//!
//! let ctx = RenderContext::new(
//!     Project::new("demo", "Demo"),
//!     RenderableId::page("demo", "Home"),
//!     builtin_registry(),
//!     services,
//! );
//! let out = render_document("Project: {{ project }}", &ctx);
//! assert_eq!(out.content, "Project: demo");
//! ```

#![warn(unreachable_pub)]

mod backend;
mod chart;
mod config;
mod context;
mod directive;
mod error;
mod execute;
mod extract;
mod handler;
mod invocation;
mod markup;
mod memory;
mod model;
mod registry;
mod renderer;
mod services;

pub mod macros;

pub use backend::JsonChartBackend;
pub use chart::{
    chart_options, select_query, ChartMacro, ChartPipeline, ChartSeries, ChartSpecification,
};
pub use config::{RenderConfig, RenderSettings};
pub use context::{RenderContext, RenderEnv};
pub use directive::{
    parse_params, Body, Directive, DirectiveForm, Document, MarkupError, Node,
};
pub use error::{ConfigError, ErrorKind, ProcessingError, Reason};
pub use execute::{execute, render_document, render_parsed, ChartRef, ExpandedDocument};
pub use extract::extract;
pub use handler::{MacroHandler, MacroKind, MacroOutput};
pub use invocation::MacroInvocation;
pub use macros::builtin_registry;
pub use markup::escape_html;
pub use memory::{MemoryWorld, WorldError};
pub use model::{CardContext, CardScope, PlvValue, Project, Renderable};
pub use registry::{MacroRegistry, Overlay};
pub use renderer::{ContentRenderer, ContentSource, RenderError, RenderedContent};
pub use services::{
    BackendError, ChartBackend, ContentStore, LookupError, ProjectLookup, Services,
    VariableResolver,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
