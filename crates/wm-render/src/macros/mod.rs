//! Built-in macros
//!
//! - `project`, `project-variable`: project information
//! - `pie-chart`, `ratio-bar-chart`, `stacked-bar-chart`: charts
//! - `panel`: block container

mod charts;
mod panel;
mod project;

pub use charts::{PieChartMacro, RatioBarChartMacro, StackedBarChartMacro};
pub use panel::PanelMacro;
pub use project::{ProjectMacro, ProjectVariableMacro};

use crate::registry::MacroRegistry;

/// Registry holding every built-in macro
#[must_use]
pub fn builtin_registry() -> MacroRegistry {
    let mut registry = MacroRegistry::new();
    registry.register(ProjectMacro::new());
    registry.register(ProjectVariableMacro::new());
    registry.register(PieChartMacro::new());
    registry.register(RatioBarChartMacro::new());
    registry.register(StackedBarChartMacro::new());
    registry.register(PanelMacro::new());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        assert_eq!(
            builtin_registry().names(),
            [
                "panel",
                "pie-chart",
                "project",
                "project-variable",
                "ratio-bar-chart",
                "stacked-bar-chart",
            ]
        );
    }
}
