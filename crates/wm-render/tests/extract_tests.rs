use proptest::prelude::*;
use wm_render::{extract, ErrorKind};
use wm_test_utils::{page_context, world};

const PIE: &str = "{{ pie-chart data: SELECT Status, COUNT(*) }}";
const PROJECT: &str = "{{ project }}";

#[test]
fn extracts_the_requested_occurrence() {
    let world = world();
    let ctx = page_context(&world, "Home");
    let text = "{{ pie-chart data: SELECT Status, COUNT(*) }} {{ pie-chart data: SELECT Owner, SUM(Size) }}";

    let second = extract(Some(text), "pie-chart", 2, &ctx).unwrap();
    assert_eq!(second.occurrence, 2);
    assert_eq!(second.param_text("data").as_deref(), Some("SELECT Owner, SUM(Size)"));
    assert_eq!(&text[second.span.clone()], "{{ pie-chart data: SELECT Owner, SUM(Size) }}");
    assert_eq!(second.param_text("chart-size").as_deref(), Some("medium"));
    assert!(second.raw_params.get("chart-size").is_none());
}

#[test]
fn extraction_is_repeatable() {
    let world = world();
    let ctx = page_context(&world, "Home");
    let a = extract(Some(PIE), "pie-chart", 1, &ctx).unwrap();
    let b = extract(Some(PIE), "pie-chart", 1, &ctx).unwrap();
    assert_eq!(a, b);
}

#[test]
fn missing_text_is_fatal() {
    let world = world();
    let ctx = page_context(&world, "Home");
    let err = extract(None, "pie-chart", 1, &ctx).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn missing_occurrence_is_not_fatal() {
    let world = world();
    let ctx = page_context(&world, "Home");
    let err = extract(Some(PIE), "pie-chart", 2, &ctx).unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn unparseable_markup() {
    let world = world();
    let ctx = page_context(&world, "Home");
    let err = extract(Some("{{ pie-chart just words }}"), "pie-chart", 1, &ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        "Error in pie-chart macro: The macro markup has to be valid YAML syntax."
    );
}

#[test]
fn block_body_is_raw_text() {
    let world = world();
    let ctx = page_context(&world, "Home");
    let invocation = extract(
        Some("{% panel title: T %}a {{ project }} b{% panel %}"),
        "panel",
        1,
        &ctx,
    )
    .unwrap();
    assert_eq!(invocation.body.as_deref(), Some("a {{ project }} b"));
}

proptest! {
    #[test]
    fn occurrences_follow_document_order(pieces in prop::collection::vec(0u8..3, 0..12)) {
        let world = world();
        let ctx = page_context(&world, "Home");

        let mut text = String::new();
        let mut pie_starts = Vec::new();
        let mut project_starts = Vec::new();
        for piece in &pieces {
            match piece {
                0 => {
                    pie_starts.push(text.len());
                    text.push_str(PIE);
                }
                1 => {
                    project_starts.push(text.len());
                    text.push_str(PROJECT);
                }
                _ => text.push_str(" filler "),
            }
        }

        for (i, start) in pie_starts.iter().enumerate() {
            let invocation = extract(Some(&text), "pie-chart", i + 1, &ctx).unwrap();
            prop_assert_eq!(invocation.span.start, *start);
            prop_assert_eq!(invocation.occurrence, i + 1);
        }
        for (i, start) in project_starts.iter().enumerate() {
            let invocation = extract(Some(&text), "project", i + 1, &ctx).unwrap();
            prop_assert_eq!(invocation.span.start, *start);
        }
        prop_assert!(extract(Some(&text), "pie-chart", pie_starts.len() + 1, &ctx).is_err());
    }
}
