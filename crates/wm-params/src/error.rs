//! Error types for parameter validation

/// Errors found while validating supplied values against a schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    /// Required parameter absent or blank
    #[error("Parameter {name} is required")]
    Missing {
        /// Parameter name
        name: String,
    },

    /// Value outside the declared allowed set
    #[error("{value} is not a valid value for {name}, which is restricted to {}", allowed.join(", "))]
    NotAllowed {
        /// Parameter name
        name: String,
        /// Rejected value, as written
        value: String,
        /// Declared allowed values
        allowed: Vec<String>,
    },

    /// Only one half of a paired definition supplied
    #[error("Parameters {first} and {second} must be used together")]
    IncompletePair {
        /// First leaf name
        first: String,
        /// Second leaf name
        second: String,
    },
}

impl ParamError {
    /// Create missing-parameter error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }

    /// Name of the (first) parameter at fault
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::Missing { name } | Self::NotAllowed { name, .. } => name,
            Self::IncompletePair { first, .. } => first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_display() {
        let err = ParamError::missing("param");
        assert_eq!(err.to_string(), "Parameter param is required");
    }

    #[test]
    fn not_allowed_display_lists_choices() {
        let err = ParamError::NotAllowed {
            name: "chart-size".to_string(),
            value: "huge".to_string(),
            allowed: vec!["small".to_string(), "large".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "huge is not a valid value for chart-size, which is restricted to small, large"
        );
        assert_eq!(err.parameter(), "chart-size");
    }
}
