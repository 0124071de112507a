//! WM Query
//!
//! The slice of the card query language that chart macros depend on.
//!
//! # Core Concepts
//!
//! - [`AbstractQuery`]: parsed structure of a `SELECT` query
//! - [`QueryParser`]: collaborator turning query text into an [`AbstractQuery`];
//!   [`SelectParser`] is the bundled implementation
//! - [`PropertySelection`]: validated "one property, one aggregate" shape
//!   expected by charts
//!
//! # Example
//!
//! ```rust
//! use wm_query::{AggregateFunction, AllowedAggregates, PropertySelection, QueryParser, SelectParser};
//!
//! let query = SelectParser.parse("SELECT Feature, Count(*)").unwrap();
//! let selection = PropertySelection::from_query(&query, &AllowedAggregates::All).unwrap();
//! assert_eq!(selection.property(), "feature");
//! assert_eq!(selection.aggregate(), AggregateFunction::Count);
//! ```

#![warn(unreachable_pub)]

mod ast;
mod error;
mod parser;
mod selection;

pub use ast::{AbstractQuery, AggregateFunction, BuiltInColumn, Column};
pub use error::QueryError;
pub use parser::SelectParser;
pub use selection::{AllowedAggregates, PropertySelection};

/// Turns query text into its abstract structure
///
/// Storage-backed implementations live outside this workspace; charts only
/// need the structure, never the results.
pub trait QueryParser: Send + Sync {
    /// Parse query text
    ///
    /// # Errors
    /// [`QueryError::Syntax`] when the text is not a query.
    fn parse(&self, text: &str) -> Result<AbstractQuery, QueryError>;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
