//! Identities used to scope cache entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Project identifier (e.g. `wiki_demo`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create from identifier
    #[inline]
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Kind of content that can carry directives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderableKind {
    /// Wiki page, keyed by name
    Page,
    /// Card, keyed by number
    Card,
}

/// Identity of a page or card; the unit of cache scoping
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderableId {
    project: ProjectId,
    kind: RenderableKind,
    key: String,
}

impl RenderableId {
    /// Identify a wiki page by name
    #[must_use]
    pub fn page(project: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            kind: RenderableKind::Page,
            key: name.into(),
        }
    }

    /// Identify a card by number
    #[must_use]
    pub fn card(project: impl Into<ProjectId>, number: u64) -> Self {
        Self {
            project: project.into(),
            kind: RenderableKind::Card,
            key: number.to_string(),
        }
    }

    /// Owning project
    #[inline]
    #[must_use]
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Page or card
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RenderableKind {
        self.kind
    }

    /// Page name or card number
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for RenderableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RenderableKind::Page => write!(f, "{}/wiki/{}", self.project, self.key),
            RenderableKind::Card => write!(f, "{}/cards/{}", self.project, self.key),
        }
    }
}

/// Chart sub-key: chart type and its per-type position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartSlot {
    /// Chart directive name, e.g. `pie-chart`
    pub chart_type: String,
    /// 1-based occurrence among charts of the same type
    pub position: usize,
}

impl ChartSlot {
    /// Create slot
    #[inline]
    #[must_use]
    pub fn new(chart_type: impl Into<String>, position: usize) -> Self {
        Self {
            chart_type: chart_type.into(),
            position,
        }
    }
}

/// What happened to a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEventKind {
    /// New page or card
    Created,
    /// Existing page or card edited
    Updated,
    /// Page or card removed
    Deleted,
}

/// Content mutation in a project
///
/// Any event invalidates the whole project: aggregates shown by one
/// renderable depend on the content of others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEvent {
    /// Affected renderable
    pub renderable: RenderableId,
    /// Kind of mutation
    pub kind: ContentEventKind,
}

impl ContentEvent {
    /// Content created
    #[inline]
    #[must_use]
    pub fn created(renderable: RenderableId) -> Self {
        Self {
            renderable,
            kind: ContentEventKind::Created,
        }
    }

    /// Content updated
    #[inline]
    #[must_use]
    pub fn updated(renderable: RenderableId) -> Self {
        Self {
            renderable,
            kind: ContentEventKind::Updated,
        }
    }

    /// Content deleted
    #[inline]
    #[must_use]
    pub fn deleted(renderable: RenderableId) -> Self {
        Self {
            renderable,
            kind: ContentEventKind::Deleted,
        }
    }

    /// Project whose caches the event invalidates
    #[inline]
    #[must_use]
    pub fn project(&self) -> &ProjectId {
        self.renderable.project()
    }
}
