//! Macro execution and document expansion
//!
//! Every directive of a document is expanded in order. A failing
//! directive becomes an inline error marker at its own position; the
//! rest of the document renders normally, and per-name positions count
//! every occurrence, failed or not, so chart links stay stable.

use crate::context::RenderContext;
use crate::directive::{Directive, Document, Node};
use crate::error::ProcessingError;
use crate::extract::resolve;
use crate::handler::MacroOutput;
use crate::invocation::MacroInvocation;
use crate::markup;
use std::collections::HashMap;

/// Chart image link emitted during expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRef {
    /// Chart directive name
    pub chart_type: String,
    /// Per-type position
    pub position: usize,
    /// Artifact URL
    pub url: String,
}

/// Result of expanding one document
#[derive(Debug, Clone, Default)]
pub struct ExpandedDocument {
    /// Text with every directive replaced by its output
    pub content: String,
    /// Chart links, in document order
    pub charts: Vec<ChartRef>,
    /// Whether any macro read from another project
    pub cross_project: bool,
    /// Per-directive failures, in document order
    pub errors: Vec<ProcessingError>,
}

/// Execute a resolved invocation
///
/// Deferred invocations produce their notice instead of running.
///
/// # Errors
/// [`ProcessingError`] when no handler is bound or the handler fails.
pub fn execute(
    invocation: &MacroInvocation,
    ctx: &RenderContext,
) -> Result<MacroOutput, ProcessingError> {
    if let Some(notice) = &invocation.deferred {
        return Ok(MacroOutput::Html(markup::deferred_notice(
            &invocation.name,
            &notice.html(),
        )));
    }
    let handler = ctx.registry().lookup(&invocation.name)?;
    handler.render(invocation, ctx)
}

/// Expand every directive in `text`
#[tracing::instrument(skip_all, fields(renderable = %ctx.renderable()))]
pub fn render_document(text: &str, ctx: &RenderContext) -> ExpandedDocument {
    let document = Document::parse(text);
    render_parsed(&document, ctx)
}

/// Expand an already-scanned document
#[must_use]
pub fn render_parsed(document: &Document<'_>, ctx: &RenderContext) -> ExpandedDocument {
    let mut expander = Expander {
        text: document.text(),
        ctx,
        counters: HashMap::new(),
        out: ExpandedDocument::default(),
    };
    let content = expander.nodes(document.nodes());
    let mut out = expander.out;
    out.content = content;
    tracing::debug!(
        charts = out.charts.len(),
        errors = out.errors.len(),
        "document expanded"
    );
    out
}

struct Expander<'a> {
    text: &'a str,
    ctx: &'a RenderContext,
    counters: HashMap<String, usize>,
    out: ExpandedDocument,
}

impl Expander<'_> {
    fn nodes(&mut self, nodes: &[Node]) -> String {
        let mut content = String::new();
        for node in nodes {
            match node {
                Node::Text(range) => content.push_str(&self.text[range.clone()]),
                Node::Directive(directive) => content.push_str(&self.directive(directive)),
            }
        }
        content
    }

    fn directive(&mut self, directive: &Directive) -> String {
        let occurrence = {
            let counter = self.counters.entry(directive.name.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let body = directive.body.as_ref().map(|b| self.nodes(&b.nodes));

        let result = resolve(directive, occurrence, body.clone(), self.ctx).and_then(|invocation| {
            let output = execute(&invocation, self.ctx)?;
            Ok((invocation, output))
        });

        match result {
            Ok((invocation, output)) => {
                self.out.cross_project |= invocation.is_cross_project();
                if let MacroOutput::Chart {
                    chart_type,
                    position,
                    url,
                } = &output
                {
                    self.out.charts.push(ChartRef {
                        chart_type: chart_type.clone(),
                        position: *position,
                        url: url.clone(),
                    });
                }
                output.into_markup()
            }
            Err(err) => {
                tracing::warn!(
                    macro_name = %directive.name,
                    occurrence,
                    kind = %err.kind(),
                    error = %err,
                    "macro failed"
                );
                let mut marker = markup::error_marker(&err);
                self.out.errors.push(err);
                // keep the content of a failed container visible
                if let Some(body) = body {
                    marker.push_str(&body);
                }
                marker
            }
        }
    }
}
