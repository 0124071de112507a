//! Layout container

use crate::context::RenderContext;
use crate::error::ProcessingError;
use crate::handler::{MacroHandler, MacroKind, MacroOutput};
use crate::invocation::MacroInvocation;
use crate::markup::escape_html;
use wm_params::{ParamDefinitionSection, ParameterDefinition};

/// `{% panel title: ... %} ... {% panel %}`: wraps its body in a box
#[derive(Debug)]
pub struct PanelMacro {
    schema: ParamDefinitionSection,
}

impl PanelMacro {
    /// Create handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: ParamDefinitionSection::new().with(ParameterDefinition::optional("title")),
        }
    }
}

impl Default for PanelMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroHandler for PanelMacro {
    fn name(&self) -> &str {
        "panel"
    }

    fn kind(&self) -> MacroKind {
        MacroKind::Container
    }

    fn schema(&self) -> &ParamDefinitionSection {
        &self.schema
    }

    fn render(
        &self,
        invocation: &MacroInvocation,
        _ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError> {
        let mut html = String::from("<div class=\"panel\">");
        if let Some(title) = invocation.param_text("title") {
            html.push_str(&format!("<h3>{}</h3>", escape_html(title.trim())));
        }
        html.push_str(invocation.body.as_deref().unwrap_or_default());
        html.push_str("</div>");
        Ok(MacroOutput::Html(html))
    }
}
