//! Collaborator interfaces consumed by the renderer
//!
//! Storage, project lookup and pixel rendering live outside this crate.
//! [`MemoryWorld`](crate::MemoryWorld) and
//! [`JsonChartBackend`](crate::JsonChartBackend) are reference
//! implementations used by the CLI and tests.

use crate::chart::ChartSpecification;
use crate::model::{PlvValue, Project, Renderable};
use async_trait::async_trait;
use std::sync::Arc;
use wm_cache::{ChartArtifact, ProjectId, RenderableId};
use wm_query::QueryParser;

/// Why a project could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No project with that identifier
    #[error("project {0} does not exist")]
    NotFound(String),

    /// Project exists but the current user may not read it
    #[error("access to project {0} is denied")]
    Denied(String),
}

/// Resolves project identifiers
pub trait ProjectLookup: Send + Sync {
    /// Find a project by identifier
    ///
    /// # Errors
    /// [`LookupError`] when the project is unknown or not readable.
    fn resolve_project(&self, identifier: &str) -> Result<Project, LookupError>;
}

/// Resolves project variables
pub trait VariableResolver: Send + Sync {
    /// Value of the named variable in a project, `None` if undeclared
    fn resolve_plv(&self, project: &ProjectId, name: &str) -> Option<PlvValue>;
}

/// Reads stored pages and cards
pub trait ContentStore: Send + Sync {
    /// Stored renderable, `None` if it does not exist
    fn renderable(&self, id: &RenderableId) -> Option<Renderable>;
}

/// Chart backend failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// Description
    pub message: String,
}

impl BackendError {
    /// Create backend error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns a chart specification into an artifact
#[async_trait]
pub trait ChartBackend: Send + Sync {
    /// Render one chart
    ///
    /// # Errors
    /// [`BackendError`] when the artifact cannot be produced.
    async fn render(
        &self,
        chart_type: &str,
        spec: &ChartSpecification,
    ) -> Result<ChartArtifact, BackendError>;
}

/// Lookup services shared by every render
#[derive(Clone)]
pub struct Services {
    /// Project lookup
    pub projects: Arc<dyn ProjectLookup>,
    /// Project variable resolution
    pub variables: Arc<dyn VariableResolver>,
    /// Query parsing for chart data parameters
    pub queries: Arc<dyn QueryParser>,
}

impl Services {
    /// Create from individual services
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectLookup>,
        variables: Arc<dyn VariableResolver>,
        queries: Arc<dyn QueryParser>,
    ) -> Self {
        Self {
            projects,
            variables,
            queries,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
