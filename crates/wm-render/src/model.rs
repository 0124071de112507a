//! Projects, project variables and renderable content

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use wm_cache::{ProjectId, RenderableId};

/// A project as seen by macros
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier, used in `project:` parameters and URLs
    pub identifier: ProjectId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Project variables keyed by name, in `{ text: R1 }` form
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub variables: IndexMap<String, PlvValue>,
}

impl Project {
    /// Create project with no variables
    #[must_use]
    pub fn new(identifier: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            variables: IndexMap::new(),
        }
    }

    /// With a project variable
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: PlvValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Look up a variable; names compare case-insensitively
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&PlvValue> {
        self.variables
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Value of a project variable (PLV)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlvValue {
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Team member, by login
    User(String),
    /// Reference to a card
    Card {
        /// Card number
        number: u64,
        /// Card name
        name: String,
    },
    /// Variable declared without a value
    NotSet,
}

impl PlvValue {
    /// Value substituted into macro parameters
    ///
    /// Cards substitute their number, dates their ISO form, unset
    /// variables become null (and so fail required checks).
    #[must_use]
    pub fn to_param_value(&self) -> Value {
        match self {
            Self::Text(text) | Self::User(text) => Value::String(text.clone()),
            Self::Number(n) => number_value(*n),
            Self::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
            Self::Card { number, .. } => Value::Number((*number).into()),
            Self::NotSet => Value::Null,
        }
    }

    /// Value shown to users
    #[must_use]
    pub fn display_value(&self) -> String {
        match self {
            Self::Text(text) | Self::User(text) => text.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(date) => date.format("%d %b %Y").to_string(),
            Self::Card { number, name } => format!("#{number} {name}"),
            Self::NotSet => "(not set)".to_string(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number((n as i64).into())
    } else {
        Value::Number(n.into())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// Card that `THIS CARD` refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContext {
    /// Card number
    pub number: u64,
    /// Card name
    #[serde(default)]
    pub name: String,
    /// Owning project
    pub project: ProjectId,
    /// Property values keyed by property name
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl CardContext {
    /// Create card context
    #[must_use]
    pub fn new(project: impl Into<ProjectId>, number: u64, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            project: project.into(),
            properties: IndexMap::new(),
        }
    }

    /// With a property value
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Property value; names compare case-insensitively
    ///
    /// `number` and `name` are always available.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("number") {
            return Some(self.number.to_string());
        }
        if name.eq_ignore_ascii_case("name") {
            return Some(self.name.clone());
        }
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

/// Where `THIS CARD` points during a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardScope {
    /// Rendering an existing card
    Card(CardContext),
    /// Rendering card defaults: the card does not exist yet
    Defaults {
        /// Project the card will be created in
        project: ProjectId,
    },
}

impl CardScope {
    /// Project owning the (future) card
    #[must_use]
    pub fn project(&self) -> &ProjectId {
        match self {
            Self::Card(card) => &card.project,
            Self::Defaults { project } => project,
        }
    }
}

/// Stored content of a page or card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderable {
    /// Identity
    pub id: RenderableId,
    /// Source text; `None` when the content could not be read
    pub content: Option<String>,
    /// Card details when the renderable is a card
    pub card: Option<CardContext>,
}
