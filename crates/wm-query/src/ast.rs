//! Abstract query structure

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate functions understood in `SELECT` lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    /// `COUNT(*)` or `COUNT(property)`
    Count,
    /// `SUM(property)`
    Sum,
    /// `AVG(property)`
    Avg,
    /// `MIN(property)`
    Min,
    /// `MAX(property)`
    Max,
}

impl AggregateFunction {
    /// Every aggregate function
    pub const ALL: [Self; 5] = [Self::Count, Self::Sum, Self::Avg, Self::Min, Self::Max];

    /// Look up a function by name, ignoring case
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }

    /// Upper-case SQL name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card attributes that are selectable but not backed by a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltInColumn {
    /// Card number
    Number,
    /// Card name
    Name,
    /// Creator login
    CreatedBy,
    /// Last modifier login
    ModifiedBy,
}

impl BuiltInColumn {
    /// Classify a column name, ignoring case and treating spaces as `_`
    #[must_use]
    pub fn classify(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "number" => Some(Self::Number),
            "name" => Some(Self::Name),
            "created_by" => Some(Self::CreatedBy),
            "modified_by" => Some(Self::ModifiedBy),
            _ => None,
        }
    }
}

/// One entry of a `SELECT` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    /// Property-backed column, name as written
    Property {
        /// Property name
        name: String,
    },
    /// Built-in card attribute
    BuiltIn {
        /// Which attribute
        column: BuiltInColumn,
        /// Name as written
        written: String,
    },
    /// Aggregate expression
    Aggregate {
        /// Function applied
        function: AggregateFunction,
        /// Aggregated property, `None` for `*`
        property: Option<String>,
    },
}

impl Column {
    /// Whether this column is an aggregate expression
    #[inline]
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate { .. })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property { name } => f.write_str(name),
            Self::BuiltIn { written, .. } => f.write_str(written),
            Self::Aggregate { function, property } => {
                write!(f, "{function}({})", property.as_deref().unwrap_or("*"))
            }
        }
    }
}

/// Parsed `SELECT` query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractQuery {
    /// Selected columns in order
    pub columns: Vec<Column>,
    /// `WHERE` clause text, unparsed
    pub condition: Option<String>,
    /// `ORDER BY` column names
    pub order_by: Vec<String>,
    /// Point-in-time modifier from `AS OF`
    pub as_of: Option<String>,
}

impl AbstractQuery {
    /// Create query selecting the given columns
    #[inline]
    #[must_use]
    pub fn select(columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// With `WHERE` clause
    #[inline]
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// With `AS OF` modifier
    #[inline]
    #[must_use]
    pub fn as_of(mut self, when: impl Into<String>) -> Self {
        self.as_of = Some(when.into());
        self
    }
}
