//! Parameter definitions and their flattening into leaf lists

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Input widget used by editor tooling for a parameter
///
/// Opaque to validation: nothing in this crate branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// Free-form single line text
    #[default]
    Text,
    /// Data query (`SELECT ...`)
    Query,
    /// Numeric input
    Numeric,
    /// Colour picker
    Color,
    /// Choice among the declared allowed values
    Dropdown,
    /// Checkbox
    Boolean,
    /// Structured list (e.g. chart series)
    List,
}

/// A single leaf parameter accepted by a macro
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    name: String,
    required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_value: Option<Value>,
    #[serde(default)]
    input_type: InputType,
    #[serde(default)]
    ignore_case: bool,
}

impl ParameterDefinition {
    /// Create a required parameter
    #[inline]
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// Create an optional parameter
    #[inline]
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            values: Vec::new(),
            initial_value: None,
            input_type: InputType::Text,
            ignore_case: false,
        }
    }

    /// Restrict the parameter to a set of allowed literals
    ///
    /// Also switches the input type to a dropdown.
    #[must_use]
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self.input_type = InputType::Dropdown;
        self
    }

    /// Default used when the parameter is omitted
    #[inline]
    #[must_use]
    pub fn with_initial(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    /// Override the input widget type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    /// Match allowed values without regard to case
    #[inline]
    #[must_use]
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Parameter name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter must be supplied
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Allowed literal values, empty when unrestricted
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Default value
    #[inline]
    #[must_use]
    pub fn initial_value(&self) -> Option<&Value> {
        self.initial_value.as_ref()
    }

    /// Input widget type
    #[inline]
    #[must_use]
    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    /// Whether allowed-value matching ignores case
    #[inline]
    #[must_use]
    pub fn ignores_case(&self) -> bool {
        self.ignore_case
    }

    /// Check a literal against the allowed values
    ///
    /// Unrestricted parameters accept everything.
    #[must_use]
    pub fn accepts(&self, literal: &str) -> bool {
        if self.values.is_empty() {
            return true;
        }
        self.values.iter().any(|allowed| {
            if self.ignore_case {
                allowed.eq_ignore_ascii_case(literal)
            } else {
                allowed == literal
            }
        })
    }
}

/// Two parameters that only make sense together
///
/// e.g. `aggregate-type` + `aggregate-property`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairParameterDefinition {
    first: ParameterDefinition,
    second: ParameterDefinition,
}

impl PairParameterDefinition {
    /// Create pair from its two leaves, in declaration order
    #[inline]
    #[must_use]
    pub fn new(first: ParameterDefinition, second: ParameterDefinition) -> Self {
        Self { first, second }
    }

    /// First leaf
    #[inline]
    #[must_use]
    pub fn first(&self) -> &ParameterDefinition {
        &self.first
    }

    /// Second leaf
    #[inline]
    #[must_use]
    pub fn second(&self) -> &ParameterDefinition {
        &self.second
    }
}

/// Ordered group of parameters belonging to one logical concern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedParameterDefinition {
    label: String,
    members: Vec<ParameterDefinition>,
}

impl GroupedParameterDefinition {
    /// Create group with a display label
    #[must_use]
    pub fn new(label: impl Into<String>, members: Vec<ParameterDefinition>) -> Self {
        Self {
            label: label.into(),
            members,
        }
    }

    /// Display label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Group members in declaration order
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[ParameterDefinition] {
        &self.members
    }
}

/// One entry of a [`ParamDefinitionSection`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDef {
    /// Plain leaf
    Simple(ParameterDefinition),
    /// Leaves supplied together
    Pair(PairParameterDefinition),
    /// Leaves grouped for display
    Group(GroupedParameterDefinition),
}

impl ParamDef {
    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ParameterDefinition>) {
        match self {
            Self::Simple(def) => out.push(def),
            Self::Pair(pair) => {
                out.push(&pair.first);
                out.push(&pair.second);
            }
            Self::Group(group) => out.extend(group.members.iter()),
        }
    }
}

impl From<ParameterDefinition> for ParamDef {
    fn from(def: ParameterDefinition) -> Self {
        Self::Simple(def)
    }
}

impl From<PairParameterDefinition> for ParamDef {
    fn from(pair: PairParameterDefinition) -> Self {
        Self::Pair(pair)
    }
}

impl From<GroupedParameterDefinition> for ParamDef {
    fn from(group: GroupedParameterDefinition) -> Self {
        Self::Group(group)
    }
}

/// Ordered parameter schema of one macro
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamDefinitionSection {
    defs: Vec<ParamDef>,
}

impl ParamDefinitionSection {
    /// Create empty section
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition
    #[inline]
    #[must_use]
    pub fn with(mut self, def: impl Into<ParamDef>) -> Self {
        self.defs.push(def.into());
        self
    }

    /// Append a definition in place
    #[inline]
    pub fn push(&mut self, def: impl Into<ParamDef>) {
        self.defs.push(def.into());
    }

    /// Top-level definitions, unflattened
    #[inline]
    #[must_use]
    pub fn defs(&self) -> &[ParamDef] {
        &self.defs
    }

    /// All leaf definitions, depth-first in declaration order
    ///
    /// Pure structural unfold; values are never consulted.
    #[must_use]
    pub fn all_param_defs(&self) -> Vec<&ParameterDefinition> {
        let mut leaves = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            def.collect_leaves(&mut leaves);
        }
        leaves
    }

    /// Find a leaf by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ParameterDefinition> {
        self.all_param_defs().into_iter().find(|d| d.name() == name)
    }

    /// Check if the schema declares no parameters
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl FromIterator<ParamDef> for ParamDefinitionSection {
    fn from_iter<I: IntoIterator<Item = ParamDef>>(iter: I) -> Self {
        Self {
            defs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(section: &ParamDefinitionSection) -> Vec<&str> {
        section.all_param_defs().iter().map(|d| d.name()).collect()
    }

    #[test]
    fn flatten_mixed_section_preserves_order() {
        let section = ParamDefinitionSection::new()
            .with(ParameterDefinition::required("data"))
            .with(PairParameterDefinition::new(
                ParameterDefinition::optional("x-label-start"),
                ParameterDefinition::optional("x-label-end"),
            ))
            .with(GroupedParameterDefinition::new(
                "Styling",
                vec![
                    ParameterDefinition::optional("chart-size"),
                    ParameterDefinition::optional("label-type"),
                ],
            ))
            .with(ParameterDefinition::optional("project"));

        assert_eq!(
            names(&section),
            [
                "data",
                "x-label-start",
                "x-label-end",
                "chart-size",
                "label-type",
                "project"
            ]
        );
    }

    #[test]
    fn empty_group_contributes_nothing() {
        let section = ParamDefinitionSection::new()
            .with(GroupedParameterDefinition::new("Empty", vec![]))
            .with(ParameterDefinition::optional("only"));
        assert_eq!(names(&section), ["only"]);
    }

    #[test]
    fn accepts_respects_case_policy() {
        let exact = ParameterDefinition::optional("size").with_values(["small", "large"]);
        assert!(exact.accepts("small"));
        assert!(!exact.accepts("Small"));

        let loose = exact.clone().ignoring_case();
        assert!(loose.accepts("LARGE"));
        assert!(!loose.accepts("medium"));
    }

    #[test]
    fn unrestricted_accepts_anything() {
        let def = ParameterDefinition::required("label");
        assert!(def.accepts("whatever"));
        assert_eq!(def.input_type(), InputType::Text);
    }

    #[test]
    fn with_values_switches_to_dropdown() {
        let def = ParameterDefinition::optional("legend-position").with_values(["right", "bottom"]);
        assert_eq!(def.input_type(), InputType::Dropdown);
        assert_eq!(def.values(), ["right", "bottom"]);
    }

    #[test]
    fn find_reaches_into_pairs_and_groups() {
        let section = ParamDefinitionSection::new().with(PairParameterDefinition::new(
            ParameterDefinition::optional("a"),
            ParameterDefinition::optional("b").with_initial("x"),
        ));
        let b = section.find("b").unwrap();
        assert_eq!(b.initial_value(), Some(&Value::String("x".into())));
        assert!(section.find("c").is_none());
    }
}
