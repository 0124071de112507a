//! Property selection validation
//!
//! Charts read a query as "group by this property, aggregate that". The
//! validator checks the abstract structure only; it never touches storage.

use crate::ast::{AbstractQuery, AggregateFunction, Column};
use crate::error::QueryError;
use serde::{Deserialize, Serialize};

/// Aggregate functions a caller is willing to chart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedAggregates {
    /// Any aggregate function
    #[default]
    All,
    /// Only the listed functions
    Only(Vec<AggregateFunction>),
}

impl AllowedAggregates {
    /// Allow only the given functions
    #[must_use]
    pub fn only(functions: impl IntoIterator<Item = AggregateFunction>) -> Self {
        Self::Only(functions.into_iter().collect())
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, function: AggregateFunction) -> bool {
        match self {
            Self::All => true,
            Self::Only(allowed) => allowed.contains(&function),
        }
    }
}

/// A validated "one property, one aggregate" selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySelection {
    property: String,
    aggregate: AggregateFunction,
    aggregate_property: Option<String>,
}

impl PropertySelection {
    /// Validate the shape of a parsed query
    ///
    /// # Errors
    /// - [`QueryError::AsOfNotSupported`] if the query has an `AS OF` modifier
    /// - [`QueryError::IncorrectColumnCount`] unless exactly two columns are selected
    /// - [`QueryError::NotAProperty`] if the first column is not property-backed
    /// - [`QueryError::NotAnAggregate`] if the second column is not an aggregate
    /// - [`QueryError::UnsupportedAggregate`] if the aggregate is not allowed
    pub fn from_query(
        query: &AbstractQuery,
        allowed: &AllowedAggregates,
    ) -> Result<Self, QueryError> {
        if query.as_of.is_some() {
            return Err(QueryError::AsOfNotSupported);
        }

        let [first, second] = query.columns.as_slice() else {
            return Err(QueryError::IncorrectColumnCount {
                found: query.columns.len(),
            });
        };

        let Column::Property { name } = first else {
            return Err(QueryError::NotAProperty(first.to_string()));
        };

        let Column::Aggregate { function, property } = second else {
            return Err(QueryError::NotAnAggregate(second.to_string()));
        };

        if !allowed.contains(*function) {
            return Err(QueryError::UnsupportedAggregate(function.as_str().to_string()));
        }

        Ok(Self {
            property: name.to_lowercase(),
            aggregate: *function,
            aggregate_property: property.as_ref().map(|p| p.to_lowercase()),
        })
    }

    /// Grouping property, lower-cased
    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Aggregate function
    #[inline]
    #[must_use]
    pub fn aggregate(&self) -> AggregateFunction {
        self.aggregate
    }

    /// Property the aggregate is applied to, `None` for `COUNT(*)`
    #[inline]
    #[must_use]
    pub fn aggregate_property(&self) -> Option<&str> {
        self.aggregate_property.as_deref()
    }
}
