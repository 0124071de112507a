//! Property selection over parsed query text, end to end.

use wm_query::{
    AggregateFunction, AllowedAggregates, PropertySelection, QueryError, QueryParser, SelectParser,
};

fn select(text: &str, allowed: &AllowedAggregates) -> Result<PropertySelection, QueryError> {
    let query = SelectParser.parse(text)?;
    PropertySelection::from_query(&query, allowed)
}

#[test]
fn feature_count_selection() {
    let selection = select("SELECT Feature, Count(*)", &AllowedAggregates::All).unwrap();
    assert_eq!(selection.property(), "feature");
    assert_eq!(selection.aggregate(), AggregateFunction::Count);
}

#[test]
fn max_rejected_when_only_count_allowed() {
    let allowed = AllowedAggregates::only([AggregateFunction::Count]);
    let err = select("SELECT Feature, Max(Size)", &allowed).unwrap_err();
    assert_eq!(err.to_string(), "unsupported aggregate: MAX");
}

#[test]
fn three_columns_rejected() {
    let err = select("SELECT Feature, Size, Max(Size)", &AllowedAggregates::All).unwrap_err();
    assert!(err
        .to_string()
        .contains("incorrect number of selected properties"));
    assert_eq!(err, QueryError::IncorrectColumnCount { found: 3 });
}

#[test]
fn as_of_always_rejected() {
    for aggregate in ["COUNT(*)", "SUM(Size)", "MAX(Size)"] {
        let text = format!("SELECT Feature, {aggregate} AS OF 'Jan 31 2024'");
        for allowed in [
            AllowedAggregates::All,
            AllowedAggregates::only([AggregateFunction::Count]),
        ] {
            assert_eq!(select(&text, &allowed), Err(QueryError::AsOfNotSupported));
        }
    }
}

#[test]
fn builtin_column_is_not_a_property() {
    let err = select("SELECT Number, COUNT(*)", &AllowedAggregates::All).unwrap_err();
    assert_eq!(err.to_string(), "Number is not a property");
}

#[test]
fn aggregate_property_is_lowercased() {
    let selection = select(
        "SELECT 'Release Name', SUM(Estimate) WHERE Type = Story",
        &AllowedAggregates::only([AggregateFunction::Sum]),
    )
    .unwrap();
    assert_eq!(selection.property(), "release name");
    assert_eq!(selection.aggregate_property(), Some("estimate"));
}
