//! Chart macros
//!
//! In the HTML phase each chart validates its queries and renders an
//! image link; the artifact phase turns the same invocation into a
//! [`ChartSpecification`] for the backend.

use crate::chart::{chart_options, select_query, ChartMacro, ChartSeries, ChartSpecification};
use crate::context::RenderContext;
use crate::error::{ProcessingError, Reason};
use crate::handler::{MacroHandler, MacroKind, MacroOutput};
use crate::invocation::MacroInvocation;
use serde_yaml::Value;
use wm_params::{
    scalar_text, GroupedParameterDefinition, InputType, PairParameterDefinition,
    ParamDefinitionSection, ParameterDefinition,
};
use wm_query::{AggregateFunction, AllowedAggregates, Column, QueryError};

fn chart_size() -> ParameterDefinition {
    ParameterDefinition::optional("chart-size")
        .with_values(["small", "medium", "large"])
        .with_initial("medium")
}

fn legend_position() -> ParameterDefinition {
    ParameterDefinition::optional("legend-position")
        .with_values(["right", "bottom"])
        .with_initial("right")
}

fn query(name: &str) -> ParameterDefinition {
    ParameterDefinition::required(name).with_type(InputType::Query)
}

fn link(invocation: &MacroInvocation, ctx: &RenderContext) -> MacroOutput {
    MacroOutput::Chart {
        chart_type: invocation.name.clone(),
        position: invocation.occurrence,
        url: ctx.chart_url(&invocation.name, invocation.occurrence),
    }
}

fn specification(
    invocation: &MacroInvocation,
    series: Vec<ChartSeries>,
    consumed: &[&str],
) -> ChartSpecification {
    ChartSpecification {
        chart_type: invocation.name.clone(),
        project: invocation.project.identifier.clone(),
        content_provider: invocation.source.clone(),
        position: invocation.occurrence,
        series,
        options: chart_options(invocation, consumed),
    }
}

/// `pie-chart`: one property/aggregate query drawn as slices
#[derive(Debug)]
pub struct PieChartMacro {
    schema: ParamDefinitionSection,
}

impl PieChartMacro {
    /// Create handler
    #[must_use]
    pub fn new() -> Self {
        let styling = GroupedParameterDefinition::new(
            "Styling",
            vec![
                chart_size(),
                ParameterDefinition::optional("label-type")
                    .with_values(["percentage", "whole-number"])
                    .with_initial("percentage"),
                legend_position(),
            ],
        );
        Self {
            schema: ParamDefinitionSection::new()
                .with(query("data"))
                .with(styling),
        }
    }
}

impl Default for PieChartMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartMacro for PieChartMacro {
    fn chart_spec(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<ChartSpecification, ProcessingError> {
        let data = select_query(
            invocation,
            ctx,
            "data",
            invocation.param_text("data"),
            &AllowedAggregates::All,
        )?;
        Ok(specification(invocation, vec![data], &["data"]))
    }
}

impl MacroHandler for PieChartMacro {
    fn name(&self) -> &str {
        "pie-chart"
    }

    fn kind(&self) -> MacroKind {
        MacroKind::Chart
    }

    fn schema(&self) -> &ParamDefinitionSection {
        &self.schema
    }

    fn render(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError> {
        self.chart_spec(invocation, ctx)?;
        Ok(link(invocation, ctx))
    }

    fn as_chart(&self) -> Option<&dyn ChartMacro> {
        Some(self)
    }
}

/// `ratio-bar-chart`: totals per property value, against a restricted subset
#[derive(Debug)]
pub struct RatioBarChartMacro {
    schema: ParamDefinitionSection,
}

impl RatioBarChartMacro {
    /// Create handler
    #[must_use]
    pub fn new() -> Self {
        let styling = GroupedParameterDefinition::new(
            "Styling",
            vec![
                chart_size(),
                ParameterDefinition::optional("color").with_type(InputType::Color),
            ],
        );
        Self {
            schema: ParamDefinitionSection::new()
                .with(query("totals"))
                .with(ParameterDefinition::required("restrict-ratio-with"))
                .with(styling),
        }
    }
}

impl Default for RatioBarChartMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartMacro for RatioBarChartMacro {
    fn chart_spec(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<ChartSpecification, ProcessingError> {
        let totals = select_query(
            invocation,
            ctx,
            "totals",
            invocation.param_text("totals"),
            &AllowedAggregates::only([AggregateFunction::Sum, AggregateFunction::Count]),
        )?;
        Ok(specification(invocation, vec![totals], &["totals"]))
    }
}

impl MacroHandler for RatioBarChartMacro {
    fn name(&self) -> &str {
        "ratio-bar-chart"
    }

    fn kind(&self) -> MacroKind {
        MacroKind::Chart
    }

    fn schema(&self) -> &ParamDefinitionSection {
        &self.schema
    }

    fn render(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError> {
        self.chart_spec(invocation, ctx)?;
        Ok(link(invocation, ctx))
    }

    fn as_chart(&self) -> Option<&dyn ChartMacro> {
        Some(self)
    }
}

/// `stacked-bar-chart`: several series over shared labels
#[derive(Debug)]
pub struct StackedBarChartMacro {
    schema: ParamDefinitionSection,
}

impl StackedBarChartMacro {
    /// Create handler
    #[must_use]
    pub fn new() -> Self {
        let styling =
            GroupedParameterDefinition::new("Styling", vec![chart_size(), legend_position()]);
        Self {
            schema: ParamDefinitionSection::new()
                .with(query("labels"))
                .with(ParameterDefinition::required("series").with_type(InputType::List))
                .with(PairParameterDefinition::new(
                    ParameterDefinition::optional("x-label-start"),
                    ParameterDefinition::optional("x-label-end"),
                ))
                .with(styling),
        }
    }

    /// Check the `labels` query: it must parse, select a property first
    /// and carry no `AS OF`
    fn check_labels(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<(), ProcessingError> {
        let text = invocation.param_text("labels").ok_or_else(|| {
            ProcessingError::from_param_error(self.name(), &wm_params::ParamError::missing("labels"))
        })?;
        ctx.services()
            .queries
            .parse(&text)
            .and_then(|query| {
                if query.as_of.is_some() {
                    return Err(QueryError::AsOfNotSupported);
                }
                match query.columns.first() {
                    Some(Column::Property { .. }) => Ok(()),
                    Some(other) => Err(QueryError::NotAProperty(other.to_string())),
                    None => Err(QueryError::IncorrectColumnCount { found: 0 }),
                }
            })
            .map_err(|e| ProcessingError::from_query_error(self.name(), "labels", &e))
    }

    fn series(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<Vec<ChartSeries>, ProcessingError> {
        let Some(Value::Sequence(entries)) = invocation.param("series") else {
            return Err(ProcessingError::validation(
                self.name(),
                Reason::new()
                    .text("Parameter ")
                    .em("series")
                    .text(" must be a list"),
            ));
        };

        entries
            .iter()
            .map(|entry| {
                let Value::Mapping(fields) = entry else {
                    return Err(ProcessingError::validation(
                        self.name(),
                        Reason::new()
                            .text("Each entry of ")
                            .em("series")
                            .text(" must have a data query"),
                    ));
                };
                let field = |key: &str| fields.get(key).and_then(scalar_text);
                let mut series = select_query(
                    invocation,
                    ctx,
                    "data",
                    field("data"),
                    &AllowedAggregates::All,
                )?;
                series.label = field("label");
                series.color = field("color");
                Ok(series)
            })
            .collect()
    }
}

impl Default for StackedBarChartMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartMacro for StackedBarChartMacro {
    fn chart_spec(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<ChartSpecification, ProcessingError> {
        self.check_labels(invocation, ctx)?;
        let series = self.series(invocation, ctx)?;
        Ok(specification(invocation, series, &["series"]))
    }
}

impl MacroHandler for StackedBarChartMacro {
    fn name(&self) -> &str {
        "stacked-bar-chart"
    }

    fn kind(&self) -> MacroKind {
        MacroKind::Chart
    }

    fn schema(&self) -> &ParamDefinitionSection {
        &self.schema
    }

    fn render(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<MacroOutput, ProcessingError> {
        self.chart_spec(invocation, ctx)?;
        Ok(link(invocation, ctx))
    }

    fn as_chart(&self) -> Option<&dyn ChartMacro> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pie_chart_schema_order() {
        let names: Vec<_> = PieChartMacro::new()
            .schema()
            .all_param_defs()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["data", "chart-size", "label-type", "legend-position"]);
    }

    #[test]
    fn styling_choices_are_dropdowns() {
        let chart = PieChartMacro::new();
        let defs = chart.schema().all_param_defs();
        let types: Vec<_> = defs.iter().map(|d| d.input_type()).collect();
        assert_eq!(
            types,
            [
                InputType::Query,
                InputType::Dropdown,
                InputType::Dropdown,
                InputType::Dropdown
            ]
        );
    }

    #[test]
    fn stacked_bar_requires_both_axis_labels() {
        let chart = StackedBarChartMacro::new();
        let mut params = wm_params::ParamMap::new();
        params.insert("labels".into(), Value::String("SELECT Iteration".into()));
        params.insert(
            "series".into(),
            serde_yaml::from_str("[{data: 'SELECT Iteration, SUM(Size)'}]").unwrap(),
        );
        params.insert("x-label-start".into(), Value::String("1".into()));
        let err = chart.validate(&params).unwrap_err();
        assert!(err.to_string().contains("must be used together"));
    }
}
