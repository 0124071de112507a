use proptest::prelude::*;
use wm_params::{
    GroupedParameterDefinition, PairParameterDefinition, ParamDef, ParamDefinitionSection,
    ParameterDefinition,
};

/// Shape of one top-level definition: 0 = simple, 1 = pair, 2.. = group of (n - 2) members
fn build(shapes: &[usize]) -> (ParamDefinitionSection, Vec<String>) {
    let mut counter = 0usize;
    let mut next = || {
        counter += 1;
        format!("p{counter}")
    };

    let mut expected = Vec::new();
    let mut section = ParamDefinitionSection::new();
    for &shape in shapes {
        let def: ParamDef = match shape {
            0 => {
                let name = next();
                expected.push(name.clone());
                ParameterDefinition::optional(name).into()
            }
            1 => {
                let (a, b) = (next(), next());
                expected.push(a.clone());
                expected.push(b.clone());
                PairParameterDefinition::new(
                    ParameterDefinition::optional(a),
                    ParameterDefinition::required(b),
                )
                .into()
            }
            n => {
                let members: Vec<_> = (0..n - 2)
                    .map(|_| {
                        let name = next();
                        expected.push(name.clone());
                        ParameterDefinition::optional(name)
                    })
                    .collect();
                GroupedParameterDefinition::new("group", members).into()
            }
        };
        section.push(def);
    }
    (section, expected)
}

proptest! {
    #[test]
    fn prop_flatten_is_depth_first_declaration_order(
        shapes in proptest::collection::vec(0..6usize, 0..12)
    ) {
        let (section, expected) = build(&shapes);
        let flattened: Vec<String> = section
            .all_param_defs()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        prop_assert_eq!(flattened, expected);
    }

    #[test]
    fn prop_flatten_is_stable(shapes in proptest::collection::vec(0..6usize, 0..12)) {
        let (section, _) = build(&shapes);
        let first: Vec<_> = section.all_param_defs().iter().map(|d| d.name().to_string()).collect();
        let second: Vec<_> = section.all_param_defs().iter().map(|d| d.name().to_string()).collect();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn flatten_does_not_resolve_values() {
    let section = ParamDefinitionSection::new()
        .with(ParameterDefinition::optional("project").with_initial("(current project)"));
    let leaves = section.all_param_defs();
    assert_eq!(leaves.len(), 1);
    assert_eq!(
        leaves[0].initial_value().and_then(|v| v.as_str()),
        Some("(current project)")
    );
}
