//! Schema-driven validation of resolved parameter maps
//!
//! Validation runs after variable substitution, so every value seen here
//! is final. Checks, in declaration order:
//! - required leaves are present and non-blank
//! - value-restricted leaves only carry allowed literals
//! - paired leaves are supplied together or not at all

use crate::definition::{ParamDef, ParamDefinitionSection, ParameterDefinition};
use crate::error::ParamError;
use crate::ParamMap;
use serde_yaml::Value;

/// Whether a value counts as "not supplied"
///
/// Null, whitespace-only strings, and empty sequences/mappings are blank.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_blank(&tagged.value),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Textual form of a scalar value, `None` for collections and null
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn is_supplied(params: &ParamMap, def: &ParameterDefinition) -> bool {
    params.get(def.name()).is_some_and(|v| !is_blank(v))
}

fn check_leaf(params: &ParamMap, def: &ParameterDefinition) -> Result<(), ParamError> {
    let Some(value) = params.get(def.name()).filter(|v| !is_blank(v)) else {
        return if def.is_required() {
            Err(ParamError::missing(def.name()))
        } else {
            Ok(())
        };
    };

    if def.values().is_empty() {
        return Ok(());
    }

    let reject = |written: String| ParamError::NotAllowed {
        name: def.name().to_string(),
        value: written,
        allowed: def.values().to_vec(),
    };

    match value {
        Value::Sequence(items) => {
            for item in items {
                let text = scalar_text(item).ok_or_else(|| reject(render_inline(item)))?;
                if !def.accepts(&text) {
                    return Err(reject(text));
                }
            }
            Ok(())
        }
        other => {
            let text = scalar_text(other).ok_or_else(|| reject(render_inline(other)))?;
            if def.accepts(&text) {
                Ok(())
            } else {
                Err(reject(text))
            }
        }
    }
}

fn render_inline(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default()
}

impl ParamDefinitionSection {
    /// Validate a resolved parameter map
    ///
    /// # Errors
    /// The first [`ParamError`] in declaration order.
    pub fn validate(&self, params: &ParamMap) -> Result<(), ParamError> {
        for def in self.defs() {
            match def {
                ParamDef::Simple(leaf) => check_leaf(params, leaf)?,
                ParamDef::Pair(pair) => {
                    let (first, second) = (pair.first(), pair.second());
                    if is_supplied(params, first) != is_supplied(params, second) {
                        return Err(ParamError::IncompletePair {
                            first: first.name().to_string(),
                            second: second.name().to_string(),
                        });
                    }
                    check_leaf(params, first)?;
                    check_leaf(params, second)?;
                }
                ParamDef::Group(group) => {
                    for leaf in group.members() {
                        check_leaf(params, leaf)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Fill omitted leaves from their initial values
    ///
    /// Leaves of a pair are only defaulted when neither half was supplied
    /// and both declare an initial value.
    pub fn apply_defaults(&self, params: &mut ParamMap) {
        for def in self.defs() {
            match def {
                ParamDef::Simple(leaf) => default_leaf(params, leaf),
                ParamDef::Pair(pair) => {
                    let untouched =
                        !is_supplied(params, pair.first()) && !is_supplied(params, pair.second());
                    let both_default =
                        pair.first().initial_value().is_some() && pair.second().initial_value().is_some();
                    if untouched && both_default {
                        default_leaf(params, pair.first());
                        default_leaf(params, pair.second());
                    }
                }
                ParamDef::Group(group) => {
                    for leaf in group.members() {
                        default_leaf(params, leaf);
                    }
                }
            }
        }
    }
}

fn default_leaf(params: &mut ParamMap, def: &ParameterDefinition) {
    if is_supplied(params, def) {
        return;
    }
    if let Some(initial) = def.initial_value() {
        params.insert(def.name().to_string(), initial.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{GroupedParameterDefinition, PairParameterDefinition};
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, Value)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn missing_required_parameter() {
        let section = ParamDefinitionSection::new().with(ParameterDefinition::required("param"));
        let err = section.validate(&ParamMap::new()).unwrap_err();
        assert!(err.to_string().contains("Parameter param is required"));
    }

    #[test]
    fn blank_string_counts_as_missing() {
        let section = ParamDefinitionSection::new().with(ParameterDefinition::required("param"));
        let err = section.validate(&map(&[("param", s("   "))])).unwrap_err();
        assert_eq!(err, ParamError::missing("param"));
    }

    #[test]
    fn disallowed_value_rejected() {
        let section = ParamDefinitionSection::new().with(
            ParameterDefinition::optional("chart-size").with_values(["small", "medium", "large"]),
        );
        assert!(section.validate(&map(&[("chart-size", s("small"))])).is_ok());

        let err = section.validate(&map(&[("chart-size", s("Small"))])).unwrap_err();
        assert!(matches!(err, ParamError::NotAllowed { ref value, .. } if value == "Small"));
    }

    #[test]
    fn sequence_values_checked_elementwise() {
        let section = ParamDefinitionSection::new()
            .with(ParameterDefinition::optional("colors").with_values(["red", "blue"]));
        let ok = Value::Sequence(vec![s("red"), s("blue")]);
        assert!(section.validate(&map(&[("colors", ok)])).is_ok());

        let bad = Value::Sequence(vec![s("red"), s("green")]);
        let err = section.validate(&map(&[("colors", bad)])).unwrap_err();
        assert!(matches!(err, ParamError::NotAllowed { ref value, .. } if value == "green"));
    }

    #[test]
    fn numbers_match_by_text() {
        let section = ParamDefinitionSection::new()
            .with(ParameterDefinition::optional("columns").with_values(["1", "2", "3"]));
        assert!(section
            .validate(&map(&[("columns", Value::Number(2.into()))]))
            .is_ok());
    }

    #[test]
    fn half_a_pair_is_rejected() {
        let section = ParamDefinitionSection::new().with(PairParameterDefinition::new(
            ParameterDefinition::optional("aggregate-type"),
            ParameterDefinition::optional("aggregate-property"),
        ));
        assert!(section.validate(&ParamMap::new()).is_ok());
        assert!(section
            .validate(&map(&[("aggregate-type", s("SUM")), ("aggregate-property", s("size"))]))
            .is_ok());

        let err = section
            .validate(&map(&[("aggregate-type", s("SUM"))]))
            .unwrap_err();
        assert_eq!(
            err,
            ParamError::IncompletePair {
                first: "aggregate-type".to_string(),
                second: "aggregate-property".to_string(),
            }
        );
    }

    #[test]
    fn grouped_members_validated() {
        let section = ParamDefinitionSection::new().with(GroupedParameterDefinition::new(
            "Styling",
            vec![ParameterDefinition::optional("legend-position").with_values(["right", "bottom"])],
        ));
        let err = section
            .validate(&map(&[("legend-position", s("left"))]))
            .unwrap_err();
        assert_eq!(err.parameter(), "legend-position");
    }

    #[test]
    fn defaults_fill_only_missing_leaves() {
        let section = ParamDefinitionSection::new()
            .with(ParameterDefinition::optional("chart-size").with_initial("medium"))
            .with(ParameterDefinition::optional("label-type").with_initial("percentage"));
        let mut params = map(&[("chart-size", s("large"))]);
        section.apply_defaults(&mut params);

        assert_eq!(params.get("chart-size"), Some(&s("large")));
        assert_eq!(params.get("label-type"), Some(&s("percentage")));
    }

    #[test]
    fn blank_helpers() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&Value::Sequence(vec![])));
        assert!(!is_blank(&Value::Bool(false)));
        assert_eq!(scalar_text(&Value::Bool(true)).as_deref(), Some("true"));
        assert_eq!(scalar_text(&Value::Sequence(vec![])), None);
    }
}
