//! Project information macros

use crate::context::RenderContext;
use crate::error::{ProcessingError, Reason};
use crate::handler::{MacroHandler, MacroOutput};
use crate::invocation::MacroInvocation;
use wm_params::{ParamDefinitionSection, ParamError, ParameterDefinition};

/// `{{ project }}`: identifier of the target project
#[derive(Debug)]
pub struct ProjectMacro {
    schema: ParamDefinitionSection,
}

impl ProjectMacro {
    /// Create handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: ParamDefinitionSection::new(),
        }
    }
}

impl Default for ProjectMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroHandler for ProjectMacro {
    fn name(&self) -> &str {
        "project"
    }

    fn schema(&self) -> &ParamDefinitionSection {
        &self.schema
    }

    fn render(
        &self,
        invocation: &MacroInvocation,
        _ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError> {
        Ok(MacroOutput::Text(
            invocation.project.identifier.as_str().to_string(),
        ))
    }
}

/// `{{ project-variable name: ... }}`: display value of a project variable
#[derive(Debug)]
pub struct ProjectVariableMacro {
    schema: ParamDefinitionSection,
}

impl ProjectVariableMacro {
    /// Create handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: ParamDefinitionSection::new().with(ParameterDefinition::required("name")),
        }
    }
}

impl Default for ProjectVariableMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroHandler for ProjectVariableMacro {
    fn name(&self) -> &str {
        "project-variable"
    }

    fn schema(&self) -> &ParamDefinitionSection {
        &self.schema
    }

    fn render(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError> {
        let name = invocation.param_text("name").ok_or_else(|| {
            ProcessingError::from_param_error(self.name(), &ParamError::missing("name"))
        })?;
        let value = ctx
            .services()
            .variables
            .resolve_plv(&invocation.project.identifier, name.trim())
            .ok_or_else(|| {
                ProcessingError::resolution(
                    self.name(),
                    Reason::new()
                        .text("Project variable ")
                        .em(name.trim())
                        .text(" does not exist"),
                )
            })?;
        Ok(MacroOutput::Text(value.display_value()))
    }
}
