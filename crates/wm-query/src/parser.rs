//! Reference `SELECT` parser
//!
//! Grammar (keywords case-insensitive):
//!
//! ```text
//! query   := SELECT column ("," column)* [WHERE text] [ORDER BY name ("," name)*] [AS OF text]
//! column  := aggregate "(" ("*" | name) ")" | name
//! name    := word+ | quoted
//! quoted  := "'" ( [^'] | "''" )* "'" | '"' ( [^"] | '""' )* '"'
//! ```
//!
//! `WHERE` conditions are kept as source text; evaluating them is the job
//! of the storage layer. Clause keywords inside quotes or parentheses do
//! not end a condition.

use crate::ast::{AbstractQuery, AggregateFunction, BuiltInColumn, Column};
use crate::error::QueryError;
use crate::QueryParser;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{all_consuming, cut, map, map_opt, not, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{fold_many0, many0, many1, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

type Res<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Bundled [`QueryParser`] for the `SELECT` subset used by charts
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectParser;

impl QueryParser for SelectParser {
    fn parse(&self, text: &str) -> Result<AbstractQuery, QueryError> {
        let query = match all_consuming(query)(text) {
            Ok((_, query)) => query,
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => return Err(syntax_error(&e)),
            Err(nom::Err::Incomplete(_)) => {
                return Err(QueryError::syntax("expected end of query but the query ended"))
            }
        };

        // `*` only stands in for a property under COUNT
        for column in &query.columns {
            if let Column::Aggregate {
                function,
                property: None,
            } = column
            {
                if *function != AggregateFunction::Count {
                    return Err(QueryError::syntax(format!(
                        "{function}(*) is not allowed, {function} needs a property"
                    )));
                }
            }
        }
        Ok(query)
    }
}

/// Turn the innermost failure into "expected X but found Y"
fn syntax_error(e: &VerboseError<&str>) -> QueryError {
    let rest = e.errors.first().map_or("", |(rest, _)| *rest).trim_start();
    let expected = e
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(label) => Some(*label),
            _ => None,
        })
        .unwrap_or("end of query");

    if rest.is_empty() {
        return QueryError::syntax(format!("expected {expected} but the query ended"));
    }
    let found = match rest.find(|c: char| !is_word_char(c)) {
        Some(0) => rest.chars().next().map_or("", |c| &rest[..c.len_utf8()]),
        Some(end) => &rest[..end],
        None => rest,
    };
    QueryError::syntax(format!("expected {expected} but found '{found}'"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '#')
}

fn query(input: &str) -> Res<'_, AbstractQuery> {
    let (input, _) = multispace0(input)?;
    let (input, _) = context("SELECT", keyword("SELECT"))(input)?;
    let (input, columns) = cut(preceded(multispace0, separated_list1(comma, column)))(input)?;
    let (input, condition) = opt(preceded(
        pair(multispace0, keyword("WHERE")),
        cut(context("a condition", raw_text)),
    ))(input)?;
    let (input, order_by) = opt(preceded(multispace0, order_by_clause))(input)?;
    let (input, as_of) = opt(preceded(
        tuple((multispace0, keyword("AS"), multispace1, keyword("OF"))),
        cut(context("a date", raw_text)),
    ))(input)?;
    let (input, _) = multispace0(input)?;

    Ok((
        input,
        AbstractQuery {
            columns,
            condition: condition.map(|text| text.trim().to_string()),
            order_by: order_by.unwrap_or_default(),
            as_of: as_of.map(|text| {
                text.trim()
                    .trim_matches(|c| c == '\'' || c == '"')
                    .to_string()
            }),
        },
    ))
}

/// Case-insensitive keyword not followed by more word characters
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_word_char)))
}

fn comma(input: &str) -> Res<'_, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

/// `WHERE`, `ORDER BY` or `AS OF`
fn clause_start(input: &str) -> Res<'_, &str> {
    alt((
        keyword("WHERE"),
        recognize(tuple((keyword("ORDER"), multispace1, keyword("BY")))),
        recognize(tuple((keyword("AS"), multispace1, keyword("OF")))),
    ))(input)
}

fn column(input: &str) -> Res<'_, Column> {
    alt((
        aggregate,
        map(property_name, |name| match BuiltInColumn::classify(&name) {
            Some(column) => Column::BuiltIn {
                column,
                written: name,
            },
            None => Column::Property { name },
        }),
    ))(input)
}

fn aggregate(input: &str) -> Res<'_, Column> {
    let (input, function) = map_opt(take_while1(is_word_char), AggregateFunction::from_name)(input)?;
    let (input, _) = pair(multispace0, char('('))(input)?;
    let (input, property) = cut(delimited(
        multispace0,
        alt((value(None, char('*')), map(property_name, Some))),
        multispace0,
    ))(input)?;
    let (input, _) = cut(context("')'", char(')')))(input)?;
    Ok((input, Column::Aggregate { function, property }))
}

fn order_by_clause(input: &str) -> Res<'_, Vec<String>> {
    preceded(
        pair(keyword("ORDER"), multispace1),
        cut(preceded(
            pair(context("BY", keyword("BY")), multispace0),
            separated_list1(comma, property_name),
        )),
    )(input)
}

fn property_name(input: &str) -> Res<'_, String> {
    context("a property name", alt((quoted, words)))(input)
}

/// Space-separated words, stopping before a clause keyword
fn words(input: &str) -> Res<'_, String> {
    map(
        pair(name_word, many0(preceded(multispace1, name_word))),
        |(first, rest)| {
            let mut name = first.to_string();
            for word in rest {
                name.push(' ');
                name.push_str(word);
            }
            name
        },
    )(input)
}

fn name_word(input: &str) -> Res<'_, &str> {
    preceded(not(clause_start), take_while1(is_word_char))(input)
}

/// Quoted string with the quote doubled inside it
fn quoted(input: &str) -> Res<'_, String> {
    alt((quoted_with('\'', "''"), quoted_with('"', "\"\"")))(input)
}

fn quoted_with<'a>(
    quote: char,
    doubled: &'static str,
) -> impl FnMut(&'a str) -> Res<'a, String> {
    preceded(
        char(quote),
        cut(terminated(
            fold_many0(
                alt((value(quote, tag(doubled)), satisfy(move |c| c != quote))),
                String::new,
                |mut text, c| {
                    text.push(c);
                    text
                },
            ),
            context("closing quote", char(quote)),
        )),
    )
}

/// Source text up to the next clause keyword outside quotes and parentheses
fn raw_text(input: &str) -> Res<'_, &str> {
    let (rest, _) = multispace0(input)?;
    recognize(many1(alt((
        recognize(quoted),
        parenthesized,
        recognize(name_word),
        multispace1,
        recognize(satisfy(|c| !is_word_char(c) && !matches!(c, '(' | ')' | '\'' | '"'))),
    ))))(rest)
}

fn parenthesized(input: &str) -> Res<'_, &str> {
    recognize(delimited(
        char('('),
        many0(alt((
            recognize(quoted),
            parenthesized,
            take_while1(|c| !matches!(c, '(' | ')' | '\'' | '"')),
        ))),
        cut(context("')'", char(')'))),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> AbstractQuery {
        SelectParser.parse(text).unwrap()
    }

    #[test]
    fn property_and_count() {
        let query = parse("SELECT Feature, Count(*)");
        assert_eq!(
            query.columns,
            vec![
                Column::Property {
                    name: "Feature".into()
                },
                Column::Aggregate {
                    function: AggregateFunction::Count,
                    property: None
                },
            ]
        );
        assert_eq!(query.condition, None);
    }

    #[test]
    fn multi_word_and_quoted_names() {
        let query = parse("select Story Status, SUM('Estimate Points')");
        assert_eq!(
            query.columns[0],
            Column::Property {
                name: "Story Status".into()
            }
        );
        assert_eq!(
            query.columns[1],
            Column::Aggregate {
                function: AggregateFunction::Sum,
                property: Some("Estimate Points".into())
            }
        );
    }

    #[test]
    fn doubled_quotes_are_escapes() {
        let query = parse("SELECT 'Owner''s Team', COUNT( * )");
        assert_eq!(
            query.columns[0],
            Column::Property {
                name: "Owner's Team".into()
            }
        );
    }

    #[test]
    fn aggregate_name_without_parenthesis_is_a_property() {
        let query = parse("SELECT Count Type, MAX(Size)");
        assert_eq!(
            query.columns[0],
            Column::Property {
                name: "Count Type".into()
            }
        );
    }

    #[test]
    fn builtin_columns_are_classified() {
        let query = parse("SELECT Number, Name");
        assert!(matches!(
            query.columns[0],
            Column::BuiltIn {
                column: BuiltInColumn::Number,
                ..
            }
        ));
    }

    #[test]
    fn where_clause_kept_as_text() {
        let query = parse("SELECT Status, COUNT(*) WHERE Type = Story AND (Size > 3) ORDER BY Status");
        assert_eq!(query.condition.as_deref(), Some("Type = Story AND (Size > 3)"));
        assert_eq!(query.order_by, vec!["Status".to_string()]);
    }

    #[test]
    fn keywords_inside_quotes_do_not_end_condition() {
        let query = parse("SELECT Status, COUNT(*) WHERE Title = 'sort ORDER BY date' AND (x AS OF y)");
        assert_eq!(
            query.condition.as_deref(),
            Some("Title = 'sort ORDER BY date' AND (x AS OF y)")
        );
        assert_eq!(query.as_of, None);
    }

    #[test]
    fn as_of_modifier() {
        let query = parse("SELECT Status, COUNT(*) WHERE Type = Story AS OF '2024-01-31'");
        assert_eq!(query.as_of.as_deref(), Some("2024-01-31"));
        assert_eq!(query.condition.as_deref(), Some("Type = Story"));
    }

    #[test]
    fn count_star_only() {
        let err = SelectParser.parse("SELECT Status, SUM(*)").unwrap_err();
        assert!(!err.is_shape_error());
        assert_eq!(err.to_string(), "SUM(*) is not allowed, SUM needs a property");
    }

    #[test]
    fn missing_select_keyword() {
        let err = SelectParser.parse("Status, COUNT(*)").unwrap_err();
        assert_eq!(err, QueryError::syntax("expected SELECT but found 'Status'"));
    }

    #[test]
    fn empty_condition() {
        let err = SelectParser.parse("SELECT Status, COUNT(*) WHERE").unwrap_err();
        assert_eq!(err, QueryError::syntax("expected a condition but the query ended"));
    }

    #[test]
    fn unterminated_string_fails() {
        let err = SelectParser.parse("SELECT Status WHERE a = 'open").unwrap_err();
        assert_eq!(err, QueryError::syntax("expected closing quote but the query ended"));
    }

    #[test]
    fn trailing_garbage_rejected() {
        let err = SelectParser.parse("SELECT Status, COUNT(*) )").unwrap_err();
        assert_eq!(err, QueryError::syntax("expected end of query but found ')'"));
    }
}
