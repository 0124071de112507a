//! Error types for query parsing and property selection

/// Errors from parsing a query or validating its shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Text is not a well-formed query
    #[error("{0}")]
    Syntax(String),

    /// Selection is not exactly one property and one aggregate
    #[error("incorrect number of selected properties, must be one property and one aggregate")]
    IncorrectColumnCount {
        /// Number of columns actually selected
        found: usize,
    },

    /// First column is not property-backed
    #[error("{0} is not a property")]
    NotAProperty(String),

    /// Second column is not an aggregate expression
    #[error("{0} is not an aggregate")]
    NotAnAggregate(String),

    /// Aggregate function outside the caller's allow-list
    #[error("unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    /// Query carries an `AS OF` modifier
    #[error("AS OF is not supported")]
    AsOfNotSupported,
}

impl QueryError {
    /// Create syntax error
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    /// Whether the query parsed but has the wrong shape
    #[inline]
    #[must_use]
    pub fn is_shape_error(&self) -> bool {
        !matches!(self, Self::Syntax(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_classification() {
        assert!(!QueryError::syntax("unexpected end of query").is_shape_error());
        assert!(QueryError::AsOfNotSupported.is_shape_error());
        assert!(QueryError::IncorrectColumnCount { found: 3 }.is_shape_error());
    }

    #[test]
    fn unsupported_aggregate_display() {
        let err = QueryError::UnsupportedAggregate("MAX".to_string());
        assert_eq!(err.to_string(), "unsupported aggregate: MAX");
    }
}
