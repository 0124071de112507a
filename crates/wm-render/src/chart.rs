//! Two-phase chart rendering
//!
//! Chart directives are rendered twice:
//! - during HTML generation, as an image link carrying the chart type and
//!   its per-type position in the document
//! - when the image is requested, by re-extracting the directive at that
//!   position from the renderable's current content and handing its
//!   [`ChartSpecification`] to the [`ChartBackend`]
//!
//! ```text
//! render ──► {{ pie-chart }} ──► <img src=".../charts/pie-chart/1">
//!
//! GET .../charts/pie-chart/1 ──► cache ──miss──► extract(text, "pie-chart", 1)
//!                                                   │
//!                                    ChartMacro::chart_spec ──► ChartBackend::render
//!                                                   │
//!                            store if target project == host ◄──┘
//! ```

use crate::context::{RenderContext, RenderEnv};
use crate::error::{ProcessingError, Reason};
use crate::extract::extract;
use crate::invocation::MacroInvocation;
use crate::renderer::RenderError;
use crate::services::{ChartBackend, ContentStore};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::sync::Arc;
use wm_cache::{ChartArtifact, ProjectId, RenderCaches, RenderableId};
use wm_query::{AllowedAggregates, PropertySelection};

/// One data series of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// Legend label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Series colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Query text, after substitution
    pub query: String,
    /// Validated property/aggregate shape of the query
    pub selection: PropertySelection,
}

/// Everything a backend needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpecification {
    /// Chart directive name
    pub chart_type: String,
    /// Project the data comes from
    pub project: ProjectId,
    /// Renderable holding the directive
    pub content_provider: RenderableId,
    /// Per-type position in the renderable
    pub position: usize,
    /// Data series
    pub series: Vec<ChartSeries>,
    /// Remaining resolved parameters (styling, labels, ...)
    pub options: IndexMap<String, Value>,
}

/// Chart behaviour of a macro handler
pub trait ChartMacro: Send + Sync {
    /// Build the chart specification for a resolved invocation
    ///
    /// # Errors
    /// [`ProcessingError`] when a query is malformed or of the wrong shape.
    fn chart_spec(
        &self,
        invocation: &MacroInvocation,
        ctx: &RenderContext,
    ) -> Result<ChartSpecification, ProcessingError>;
}

/// Parse a query parameter and validate it as a property selection
///
/// # Errors
/// `Validation` when the parameter is missing or does not parse,
/// `QueryShape` when the query has the wrong shape.
pub fn select_query(
    invocation: &MacroInvocation,
    ctx: &RenderContext,
    parameter: &str,
    text: Option<String>,
    allowed: &AllowedAggregates,
) -> Result<ChartSeries, ProcessingError> {
    let query = text.ok_or_else(|| {
        ProcessingError::from_param_error(&invocation.name, &wm_params::ParamError::missing(parameter))
    })?;
    let selection = ctx
        .services()
        .queries
        .parse(&query)
        .and_then(|parsed| PropertySelection::from_query(&parsed, allowed))
        .map_err(|e| ProcessingError::from_query_error(&invocation.name, parameter, &e))?;
    Ok(ChartSeries {
        label: None,
        color: None,
        query,
        selection,
    })
}

/// Resolved parameters not consumed as series
#[must_use]
pub fn chart_options(invocation: &MacroInvocation, consumed: &[&str]) -> IndexMap<String, Value> {
    invocation
        .params
        .iter()
        .filter(|(k, _)| k.as_str() != "project" && !consumed.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Artifact phase of chart rendering
pub struct ChartPipeline {
    env: RenderEnv,
    store: Arc<dyn ContentStore>,
    backend: Arc<dyn ChartBackend>,
    caches: Arc<RenderCaches>,
}

impl ChartPipeline {
    /// Create pipeline
    #[must_use]
    pub fn new(
        env: RenderEnv,
        store: Arc<dyn ContentStore>,
        backend: Arc<dyn ChartBackend>,
        caches: Arc<RenderCaches>,
    ) -> Self {
        Self {
            env,
            store,
            backend,
            caches,
        }
    }

    /// Produce the artifact for the chart at `position` among the
    /// `chart_type` directives of `renderable`
    ///
    /// Served from the chart cache when possible. Freshly generated
    /// artifacts are cached only when the chart reads from the host
    /// project, and only if no content event reached that project while
    /// the chart was being generated.
    ///
    /// # Errors
    /// [`RenderError`] when the renderable is unknown, its content is
    /// missing, or the directive fails to resolve or generate.
    #[tracing::instrument(skip(self), fields(renderable = %renderable))]
    pub async fn generate(
        &self,
        renderable: &RenderableId,
        chart_type: &str,
        position: usize,
    ) -> Result<ChartArtifact, RenderError> {
        if let Some(hit) = self.caches.chart(renderable, chart_type, position).await {
            tracing::debug!("chart served from cache");
            return Ok(hit);
        }

        let read_at = self.caches.generation(renderable.project());
        let stored = self
            .store
            .renderable(renderable)
            .ok_or_else(|| RenderError::NoSuchRenderable(renderable.clone()))?;
        let ctx = self.env.context_for(&stored)?;
        let invocation = extract(stored.content.as_deref(), chart_type, position, &ctx)?;

        let handler = ctx.registry().lookup(chart_type)?;
        let chart = handler.as_chart().ok_or_else(|| {
            ProcessingError::not_found(chart_type, Reason::new().em(chart_type).text(" is not a chart"))
        })?;
        if let Some(notice) = invocation.deferred {
            return Err(ProcessingError::resolution(chart_type, notice).into());
        }

        let spec = chart.chart_spec(&invocation, &ctx)?;
        let artifact = self.backend.render(chart_type, &spec).await.map_err(|e| {
            tracing::error!(error = %e, "chart backend failed");
            ProcessingError::generation(chart_type, e.to_string())
        })?;

        if invocation.is_cross_project() {
            tracing::debug!(project = %invocation.project.identifier, "cross-project chart not cached");
        } else {
            self.caches
                .store_chart(renderable, chart_type, position, read_at, artifact.clone())
                .await;
        }
        Ok(artifact)
    }
}

impl std::fmt::Debug for ChartPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartPipeline")
            .field("env", &self.env)
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}
