//! Macro handler interface

use crate::chart::ChartMacro;
use crate::context::RenderContext;
use crate::error::ProcessingError;
use crate::invocation::MacroInvocation;
use crate::markup;
use wm_params::{ParamDefinitionSection, ParamMap};

/// How a macro participates in rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MacroKind {
    /// Expands in place to text or HTML
    #[default]
    Inline,
    /// Expands to an image link; the artifact is produced later
    Chart,
    /// Block directive wrapping other content
    Container,
}

/// Output of one macro
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroOutput {
    /// Ready-made HTML fragment
    Html(String),
    /// Plain text, escaped on output
    Text(String),
    /// Image placeholder for a chart artifact
    Chart {
        /// Chart directive name
        chart_type: String,
        /// Per-type position in the document
        position: usize,
        /// Artifact URL
        url: String,
    },
}

impl MacroOutput {
    /// Markup inserted into the document
    #[must_use]
    pub fn into_markup(self) -> String {
        match self {
            Self::Html(html) => html,
            Self::Text(text) => markup::escape_html(&text),
            Self::Chart {
                chart_type,
                position,
                url,
            } => markup::chart_image(&url, &chart_type, position),
        }
    }
}

/// Implementation of one macro
///
/// Implementations are stateless and shared between concurrent renders.
pub trait MacroHandler: Send + Sync {
    /// Directive name handled
    fn name(&self) -> &str;

    /// Role in rendering
    fn kind(&self) -> MacroKind {
        MacroKind::Inline
    }

    /// Accepted parameters
    fn schema(&self) -> &ParamDefinitionSection;

    /// Check a fully-resolved parameter map
    ///
    /// # Errors
    /// [`ProcessingError`] describing the first schema violation.
    fn validate(&self, params: &ParamMap) -> Result<(), ProcessingError> {
        self.schema()
            .validate(params)
            .map_err(|e| ProcessingError::from_param_error(self.name(), &e))
    }

    /// Produce output for a resolved invocation
    ///
    /// # Errors
    /// [`ProcessingError`] when the macro cannot render.
    fn render(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError>;

    /// Chart behaviour, for chart macros
    fn as_chart(&self) -> Option<&dyn ChartMacro> {
        None
    }
}

impl std::fmt::Debug for dyn MacroHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroHandler")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
