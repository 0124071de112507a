//! Error types for macro processing
//!
//! Every per-directive failure is a [`ProcessingError`]. Its message is
//! built from a [`Reason`] so the same error can be shown as plain text
//! (logs, `Display`) or as HTML with the offending names emphasised.

use std::fmt;
use std::path::PathBuf;
use wm_params::ParamError;
use wm_query::QueryError;

/// Suffix appended to every missing-parameter reason
const MARKUP_HINT: &str =
    "Please check the syntax of this macro. The macro markup has to be valid YAML syntax.";

/// Classification of a processing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown directive, missing occurrence or missing document
    NotFound,
    /// Missing or disallowed parameter, malformed markup
    Validation,
    /// Unknown project or project variable, denied cross-project access
    Resolution,
    /// Chart query of the wrong shape
    QueryShape,
    /// Chart backend failure
    Generation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Resolution => "resolution",
            Self::QueryShape => "query_shape",
            Self::Generation => "generation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Em(String),
}

/// Human-readable failure reason with emphasised fragments
///
/// ```rust
/// use wm_render::Reason;
///
/// let reason = Reason::new().text("Parameter ").em("data").text(" is required");
/// assert_eq!(reason.plain(), "Parameter data is required");
/// assert_eq!(reason.html(), "Parameter <b>data</b> is required");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reason {
    segments: Vec<Segment>,
}

impl Reason {
    /// Create empty reason
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append plain text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Text(text.into()));
        self
    }

    /// Append emphasised text
    #[must_use]
    pub fn em(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Em(text.into()));
        self
    }

    /// Reason without markup
    #[must_use]
    pub fn plain(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) | Segment::Em(t) => t.as_str(),
            })
            .collect()
    }

    /// Reason as an HTML fragment, emphasis in `<b>`
    #[must_use]
    pub fn html(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(&crate::markup::escape_html(t)),
                Segment::Em(t) => {
                    out.push_str("<b>");
                    out.push_str(&crate::markup::escape_html(t));
                    out.push_str("</b>");
                }
            }
        }
        out
    }
}

impl From<&str> for Reason {
    fn from(text: &str) -> Self {
        Self::new().text(text)
    }
}

impl From<String> for Reason {
    fn from(text: String) -> Self {
        Self::new().text(text)
    }
}

/// Failure to process one macro directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingError {
    kind: ErrorKind,
    macro_name: String,
    reason: Reason,
    fatal: bool,
}

impl ProcessingError {
    /// Create error of the given kind
    #[must_use]
    pub fn new(kind: ErrorKind, macro_name: impl Into<String>, reason: impl Into<Reason>) -> Self {
        Self {
            kind,
            macro_name: macro_name.into(),
            reason: reason.into(),
            fatal: false,
        }
    }

    /// Create not-found error
    #[must_use]
    pub fn not_found(macro_name: impl Into<String>, reason: impl Into<Reason>) -> Self {
        Self::new(ErrorKind::NotFound, macro_name, reason)
    }

    /// Create validation error
    #[must_use]
    pub fn validation(macro_name: impl Into<String>, reason: impl Into<Reason>) -> Self {
        Self::new(ErrorKind::Validation, macro_name, reason)
    }

    /// Create resolution error
    #[must_use]
    pub fn resolution(macro_name: impl Into<String>, reason: impl Into<Reason>) -> Self {
        Self::new(ErrorKind::Resolution, macro_name, reason)
    }

    /// Create chart generation error
    #[must_use]
    pub fn generation(macro_name: impl Into<String>, reason: impl Into<Reason>) -> Self {
        Self::new(ErrorKind::Generation, macro_name, reason)
    }

    /// Unknown directive name
    #[must_use]
    pub fn unknown_macro(macro_name: &str) -> Self {
        Self::not_found(macro_name, Reason::new().text("No such macro: ").em(macro_name))
    }

    /// Source text of the document could not be read
    ///
    /// The only fatal error: it aborts the whole extraction call.
    #[must_use]
    pub fn missing_document(macro_name: impl Into<String>, document: impl fmt::Display) -> Self {
        let mut err = Self::not_found(
            macro_name,
            Reason::new()
                .text("Content of ")
                .em(document.to_string())
                .text(" is not available"),
        );
        err.fatal = true;
        err
    }

    /// Parameter validation failure
    #[must_use]
    pub fn from_param_error(macro_name: impl Into<String>, err: &ParamError) -> Self {
        let reason = match err {
            ParamError::Missing { name } => Reason::new()
                .text("Parameter ")
                .em(name)
                .text(" is required. ")
                .text(MARKUP_HINT),
            ParamError::NotAllowed {
                name,
                value,
                allowed,
            } => Reason::new()
                .em(value)
                .text(" is not a valid value for ")
                .em(name)
                .text(format!(", which is restricted to {}", allowed.join(", "))),
            ParamError::IncompletePair { first, second } => Reason::new()
                .text("Parameters ")
                .em(first)
                .text(" and ")
                .em(second)
                .text(" must be used together"),
        };
        Self::validation(macro_name, reason)
    }

    /// Query parse or shape failure for the named parameter
    #[must_use]
    pub fn from_query_error(macro_name: impl Into<String>, parameter: &str, err: &QueryError) -> Self {
        let kind = if err.is_shape_error() {
            ErrorKind::QueryShape
        } else {
            ErrorKind::Validation
        };
        let reason = Reason::new()
            .text("Parameter ")
            .em(parameter)
            .text(format!(": {err}"));
        Self::new(kind, macro_name, reason)
    }

    /// Error classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Name of the failing macro
    #[inline]
    #[must_use]
    pub fn macro_name(&self) -> &str {
        &self.macro_name
    }

    /// Failure reason
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    /// Whether the failure aborts the whole document render
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// User-visible message with emphasis markup
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            "Error in {} macro: {}",
            crate::markup::escape_html(&self.macro_name),
            terminated(self.reason.html())
        )
    }
}

fn terminated(mut message: String) -> String {
    if !message.ends_with('.') {
        message.push('.');
    }
    message
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error in {} macro: {}",
            self.macro_name,
            terminated(self.reason.plain())
        )
    }
}

impl std::error::Error for ProcessingError {}

/// Errors loading [`RenderConfig`](crate::RenderConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for the config schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_message() {
        let err = ProcessingError::from_param_error("pie-chart", &ParamError::missing("data"));
        assert_eq!(
            err.to_string(),
            "Error in pie-chart macro: Parameter data is required. Please check the syntax \
             of this macro. The macro markup has to be valid YAML syntax."
        );
        assert!(err.to_html().contains("Parameter <b>data</b> is required"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn period_is_appended_once() {
        let err = ProcessingError::resolution("project", "Project foo does not exist");
        assert_eq!(
            err.to_string(),
            "Error in project macro: Project foo does not exist."
        );
    }

    #[test]
    fn html_is_escaped() {
        let err = ProcessingError::validation("x", Reason::new().em("<script>"));
        assert_eq!(err.to_html(), "Error in x macro: <b>&lt;script&gt;</b>.");
    }

    #[test]
    fn query_shape_errors_are_classified() {
        let shape =
            ProcessingError::from_query_error("pie-chart", "data", &QueryError::AsOfNotSupported);
        assert_eq!(shape.kind(), ErrorKind::QueryShape);

        let syntax =
            ProcessingError::from_query_error("pie-chart", "data", &QueryError::syntax("oops"));
        assert_eq!(syntax.kind(), ErrorKind::Validation);
    }

    #[test]
    fn only_missing_document_is_fatal() {
        assert!(ProcessingError::missing_document("pie-chart", "demo/wiki/Home").is_fatal());
        assert!(!ProcessingError::unknown_macro("nope").is_fatal());
    }
}
