//! WM Parameter Schemas
//!
//! Declarative description of the parameters a macro accepts.
//!
//! # Core Concepts
//!
//! - [`ParameterDefinition`]: a single leaf parameter (required flag, allowed
//!   values, initial value, input widget type)
//! - [`PairParameterDefinition`]: two leaves that must be supplied together
//! - [`GroupedParameterDefinition`]: an ordered group of leaves (e.g. chart styling)
//! - [`ParamDefinitionSection`]: an ordered mix of the above, flattened with
//!   [`ParamDefinitionSection::all_param_defs`]
//!
//! # Example
//!
//! ```rust
//! use wm_params::{ParamDefinitionSection, ParameterDefinition, PairParameterDefinition};
//!
//! let section = ParamDefinitionSection::new()
//!     .with(ParameterDefinition::required("data"))
//!     .with(PairParameterDefinition::new(
//!         ParameterDefinition::optional("aggregate-type"),
//!         ParameterDefinition::optional("aggregate-property"),
//!     ));
//!
//! let names: Vec<_> = section.all_param_defs().iter().map(|d| d.name()).collect();
//! assert_eq!(names, ["data", "aggregate-type", "aggregate-property"]);
//! ```

#![warn(unreachable_pub)]

mod definition;
mod error;
mod validate;

pub use definition::{
    GroupedParameterDefinition, InputType, PairParameterDefinition, ParamDef,
    ParamDefinitionSection, ParameterDefinition,
};
pub use error::ParamError;
pub use validate::{is_blank, scalar_text};

/// Parameter values keyed by parameter name, in the order they were written
pub type ParamMap = indexmap::IndexMap<String, serde_yaml::Value>;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
