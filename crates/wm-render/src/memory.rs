//! In-memory projects and content
//!
//! Reference implementation of the lookup and storage collaborators,
//! loadable from a YAML world file:
//!
//! ```yaml
//! projects:
//!   - identifier: demo
//!     name: Demo
//!     variables:
//!       current release: { text: R1 }
//!     pages:
//!       Home: "{{ project }}"
//!     cards:
//!       - number: 1
//!         name: Checkout
//!         properties: { Status: Open }
//!         description: "{{ pie-chart data: SELECT Status, COUNT(*) }}"
//! ```
//!
//! Mutations return the [`ContentEvent`] the caller forwards to the
//! renderer for invalidation.

use crate::model::{CardContext, PlvValue, Project, Renderable};
use crate::services::{ContentStore, LookupError, ProjectLookup, VariableResolver};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use wm_cache::{ContentEvent, ProjectId, RenderableId, RenderableKind};

/// Errors loading a world file
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// File unreadable
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Not a valid world description
    #[error("invalid world file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct WorldFile {
    #[serde(default)]
    projects: Vec<ProjectFile>,
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    identifier: ProjectId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    denied: bool,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    variables: IndexMap<String, PlvValue>,
    #[serde(default)]
    pages: IndexMap<String, Option<String>>,
    #[serde(default)]
    cards: Vec<CardFile>,
}

#[derive(Debug, Deserialize)]
struct CardFile {
    number: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    properties: IndexMap<String, String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredCard {
    card: CardContext,
    description: Option<String>,
}

#[derive(Debug, Clone)]
struct ProjectData {
    project: Project,
    denied: bool,
    pages: IndexMap<String, Option<String>>,
    cards: IndexMap<u64, StoredCard>,
}

impl ProjectData {
    fn new(project: Project) -> Self {
        Self {
            project,
            denied: false,
            pages: IndexMap::new(),
            cards: IndexMap::new(),
        }
    }
}

/// Projects, pages and cards held in memory
#[derive(Debug, Default)]
pub struct MemoryWorld {
    projects: RwLock<IndexMap<ProjectId, ProjectData>>,
}

impl MemoryWorld {
    /// Create empty world
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML world description
    ///
    /// # Errors
    /// [`WorldError::Yaml`] when the text does not describe a world.
    pub fn from_yaml_str(text: &str) -> Result<Self, WorldError> {
        let file: WorldFile = serde_yaml::from_str(text)?;
        let world = Self::new();
        {
            let mut projects = world.projects.write();
            for p in file.projects {
                let project = Project {
                    identifier: p.identifier.clone(),
                    name: p.name,
                    variables: p.variables,
                };
                let cards = p
                    .cards
                    .into_iter()
                    .map(|c| {
                        let card = CardContext {
                            number: c.number,
                            name: c.name,
                            project: p.identifier.clone(),
                            properties: c.properties,
                        };
                        (
                            c.number,
                            StoredCard {
                                card,
                                description: c.description,
                            },
                        )
                    })
                    .collect();
                projects.insert(
                    p.identifier,
                    ProjectData {
                        project,
                        denied: p.denied,
                        pages: p.pages,
                        cards,
                    },
                );
            }
        }
        Ok(world)
    }

    /// Read a YAML world file
    ///
    /// # Errors
    /// [`WorldError`] when the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Add or replace a project, keeping its content
    pub fn add_project(&self, project: Project) {
        let mut projects = self.projects.write();
        match projects.get_mut(&project.identifier) {
            Some(data) => data.project = project,
            None => {
                projects.insert(project.identifier.clone(), ProjectData::new(project));
            }
        }
    }

    /// Make a project unreadable to lookups
    pub fn deny(&self, project: &ProjectId) {
        if let Some(data) = self.projects.write().get_mut(project) {
            data.denied = true;
        }
    }

    /// Set a project variable
    pub fn set_variable(&self, project: &ProjectId, name: impl Into<String>, value: PlvValue) {
        if let Some(data) = self.projects.write().get_mut(project) {
            data.project.variables.insert(name.into(), value);
        }
    }

    /// Create or update a page; `None` content marks it unreadable
    ///
    /// Creates the project when missing.
    pub fn put_page(
        &self,
        project: &ProjectId,
        name: impl Into<String>,
        content: Option<String>,
    ) -> ContentEvent {
        let name = name.into();
        let mut projects = self.projects.write();
        let data = projects
            .entry(project.clone())
            .or_insert_with(|| ProjectData::new(Project::new(project.clone(), project.as_str())));
        let existed = data.pages.insert(name.clone(), content).is_some();
        let id = RenderableId::page(project.clone(), name);
        if existed {
            ContentEvent::updated(id)
        } else {
            ContentEvent::created(id)
        }
    }

    /// Create or update a card
    ///
    /// Creates the project when missing.
    pub fn put_card(&self, card: CardContext, description: Option<String>) -> ContentEvent {
        let project = card.project.clone();
        let number = card.number;
        let mut projects = self.projects.write();
        let data = projects
            .entry(project.clone())
            .or_insert_with(|| ProjectData::new(Project::new(project.clone(), project.as_str())));
        let existed = data
            .cards
            .insert(number, StoredCard { card, description })
            .is_some();
        let id = RenderableId::card(project, number);
        if existed {
            ContentEvent::updated(id)
        } else {
            ContentEvent::created(id)
        }
    }

    /// Remove a page or card
    pub fn delete(&self, id: &RenderableId) -> Option<ContentEvent> {
        let mut projects = self.projects.write();
        let data = projects.get_mut(id.project())?;
        let removed = match id.kind() {
            RenderableKind::Page => data.pages.shift_remove(id.key()).is_some(),
            RenderableKind::Card => id
                .key()
                .parse::<u64>()
                .ok()
                .and_then(|n| data.cards.shift_remove(&n))
                .is_some(),
        };
        removed.then(|| ContentEvent::deleted(id.clone()))
    }

    /// Every renderable, in insertion order
    #[must_use]
    pub fn renderables(&self) -> Vec<RenderableId> {
        let projects = self.projects.read();
        projects
            .iter()
            .flat_map(|(id, data)| {
                let pages = data
                    .pages
                    .keys()
                    .map(move |name| RenderableId::page(id.clone(), name.clone()));
                let cards = data
                    .cards
                    .keys()
                    .map(move |n| RenderableId::card(id.clone(), *n));
                pages.chain(cards).collect::<Vec<_>>()
            })
            .collect()
    }
}

impl ProjectLookup for MemoryWorld {
    fn resolve_project(&self, identifier: &str) -> Result<Project, LookupError> {
        let projects = self.projects.read();
        let data = projects
            .get(&ProjectId::new(identifier))
            .ok_or_else(|| LookupError::NotFound(identifier.to_string()))?;
        if data.denied {
            return Err(LookupError::Denied(identifier.to_string()));
        }
        Ok(data.project.clone())
    }
}

impl VariableResolver for MemoryWorld {
    fn resolve_plv(&self, project: &ProjectId, name: &str) -> Option<PlvValue> {
        self.projects
            .read()
            .get(project)
            .and_then(|data| data.project.variable(name).cloned())
    }
}

impl ContentStore for MemoryWorld {
    fn renderable(&self, id: &RenderableId) -> Option<Renderable> {
        let projects = self.projects.read();
        let data = projects.get(id.project())?;
        match id.kind() {
            RenderableKind::Page => data.pages.get(id.key()).map(|content| Renderable {
                id: id.clone(),
                content: content.clone(),
                card: None,
            }),
            RenderableKind::Card => {
                let number = id.key().parse::<u64>().ok()?;
                data.cards.get(&number).map(|stored| Renderable {
                    id: id.clone(),
                    content: stored.description.clone(),
                    card: Some(stored.card.clone()),
                })
            }
        }
    }
}
