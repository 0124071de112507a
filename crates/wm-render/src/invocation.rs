//! Resolved macro invocation

use crate::error::Reason;
use crate::model::{CardContext, Project};
use serde_yaml::Value;
use std::ops::Range;
use wm_cache::{ProjectId, RenderableId};
use wm_params::{is_blank, scalar_text, ParamMap};

/// One directive occurrence, resolved and validated, ready to execute
///
/// Created per extraction and dropped after execution.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroInvocation {
    /// Directive name
    pub name: String,
    /// Parameters as written
    pub raw_params: ParamMap,
    /// Parameters after substitution, validation and defaulting
    pub params: ParamMap,
    /// Project the macro reads from
    pub project: Project,
    /// Project issuing the render
    pub host_project: ProjectId,
    /// Card `THIS CARD` resolved to
    pub this_card: Option<CardContext>,
    /// Renderable holding the directive
    pub source: RenderableId,
    /// 1-based occurrence among directives of the same name
    pub occurrence: usize,
    /// Block body: raw text after extraction, expanded text during a
    /// document render
    pub body: Option<String>,
    /// Byte range of the directive in the source text
    pub span: Range<usize>,
    /// Set when rendering must wait until the card exists
    pub deferred: Option<Reason>,
}

impl MacroInvocation {
    /// Resolved parameter value, blank values treated as absent
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).filter(|v| !is_blank(v))
    }

    /// Resolved scalar parameter as text
    #[must_use]
    pub fn param_text(&self, name: &str) -> Option<String> {
        self.param(name).and_then(scalar_text)
    }

    /// Whether the macro reads from a project other than the host
    #[inline]
    #[must_use]
    pub fn is_cross_project(&self) -> bool {
        self.project.identifier != self.host_project
    }
}
