//! Directive extraction and parameter resolution
//!
//! Turns the Nth occurrence of a named directive into a
//! [`MacroInvocation`]. Resolution runs in fixed stages, each testable
//! on its own:
//! 1. parse the parameter markup
//! 2. substitute `THIS CARD` references (or defer, when rendering card defaults)
//! 3. resolve the target project
//! 4. substitute project variables written as `(name)`
//! 5. validate against the handler's schema, then apply defaults

use crate::context::RenderContext;
use crate::directive::{parse_params, Directive, Document};
use crate::error::{ProcessingError, Reason};
use crate::invocation::MacroInvocation;
use crate::model::{CardContext, CardScope, Project};
use crate::services::LookupError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;
use wm_cache::ProjectId;
use wm_params::{is_blank, scalar_text};

static PLV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\s*([^()]+?)\s*\)$").expect("variable reference regex is valid"));

static THIS_CARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bTHIS CARD\b(?:\.(?:'([^']*)'|"([^"]*)"|([A-Za-z0-9_-]+)))?"#)
        .expect("THIS CARD regex is valid")
});

/// Extract the `occurrence`-th (1-based) directive called `name`
///
/// A pure function of its inputs: the same text, name and occurrence
/// always yield the same invocation.
///
/// # Errors
/// - fatal `NotFound` when `text` is `None`
/// - `NotFound` when the occurrence does not exist or no handler is bound
/// - `Validation`, `Resolution` or `QueryShape` from resolution
pub fn extract(
    text: Option<&str>,
    name: &str,
    occurrence: usize,
    ctx: &RenderContext,
) -> Result<MacroInvocation, ProcessingError> {
    let text = text.ok_or_else(|| ProcessingError::missing_document(name, ctx.renderable()))?;
    let document = Document::parse(text);
    let directive = document.nth(name, occurrence).ok_or_else(|| {
        ProcessingError::not_found(
            name,
            Reason::new()
                .text("Occurrence ")
                .em(occurrence.to_string())
                .text(" of ")
                .em(name)
                .text(" not found in ")
                .em(ctx.renderable().to_string()),
        )
    })?;
    let body = directive
        .body
        .as_ref()
        .map(|b| text[b.range.clone()].to_string());
    tracing::debug!(macro_name = name, occurrence, renderable = %ctx.renderable(), "extracting macro");
    resolve(directive, occurrence, body, ctx)
}

/// Resolve one scanned directive
pub(crate) fn resolve(
    directive: &Directive,
    occurrence: usize,
    body: Option<String>,
    ctx: &RenderContext,
) -> Result<MacroInvocation, ProcessingError> {
    let name = directive.name.as_str();
    let handler = ctx.registry().lookup(name)?;

    if directive.nested {
        return Err(ProcessingError::validation(name, "Nested macros are not supported"));
    }
    if !directive.closed {
        return Err(ProcessingError::validation(
            name,
            Reason::new()
                .text("Missing closing tag ")
                .em(format!("{{% {name} %}}")),
        ));
    }

    let raw_params = parse_params(&directive.params).map_err(|e| {
        tracing::debug!(macro_name = name, error = %e, "unparseable parameters");
        ProcessingError::validation(name, "The macro markup has to be valid YAML syntax")
    })?;
    let mut params = raw_params.clone();

    let mut deferred = None;
    let this_card = match ctx.card_scope() {
        Some(CardScope::Card(card)) => Some(card.clone()),
        _ => None,
    };
    if params.values().any(mentions_this_card) {
        match ctx.card_scope() {
            None => {
                return Err(ProcessingError::resolution(
                    name,
                    Reason::new().em("THIS CARD").text(" is not supported on pages"),
                ))
            }
            Some(CardScope::Defaults { .. }) => {
                deferred = Some(
                    Reason::new()
                        .text("Macros using ")
                        .em("THIS CARD")
                        .text(" will be rendered when card is created."),
                );
            }
            Some(CardScope::Card(card)) => {
                for value in params.values_mut() {
                    substitute_strings(value, &mut |s| this_card_value(name, s, card))?;
                }
            }
        }
    }

    let project = target_project(name, &mut params, ctx)?;
    for value in params.values_mut() {
        substitute_strings(value, &mut |s| variable_value(name, s, &project.identifier, ctx))?;
    }

    if deferred.is_none() {
        handler.validate(&params)?;
        handler.schema().apply_defaults(&mut params);
    }

    Ok(MacroInvocation {
        name: name.to_string(),
        raw_params,
        params,
        project,
        host_project: ctx.host().identifier.clone(),
        this_card,
        source: ctx.renderable().clone(),
        occurrence,
        body,
        span: directive.span.clone(),
        deferred,
    })
}

fn lookup_error(name: &str, err: &LookupError) -> ProcessingError {
    let reason = match err {
        LookupError::NotFound(identifier) => Reason::new()
            .text("There is no project with identifier ")
            .em(identifier.as_str()),
        LookupError::Denied(identifier) => Reason::new()
            .text("Access to project ")
            .em(identifier.as_str())
            .text(" is denied"),
    };
    ProcessingError::resolution(name, reason)
}

/// Explicit `project:` parameter, else the card's project, else the host
fn target_project(
    name: &str,
    params: &mut wm_params::ParamMap,
    ctx: &RenderContext,
) -> Result<Project, ProcessingError> {
    let lookup = |identifier: &str| {
        ctx.services()
            .projects
            .resolve_project(identifier)
            .map_err(|e| lookup_error(name, &e))
    };

    if let Some(value) = params.get_mut("project").filter(|v| !is_blank(v)) {
        let host = ctx.host().identifier.clone();
        substitute_strings(value, &mut |s| variable_value(name, s, &host, ctx))?;
        let identifier = scalar_text(value).ok_or_else(|| {
            ProcessingError::validation(
                name,
                Reason::new()
                    .text("Parameter ")
                    .em("project")
                    .text(" must be a project identifier"),
            )
        })?;
        return lookup(identifier.trim());
    }

    match ctx.card_scope() {
        Some(scope) if scope.project() != &ctx.host().identifier => lookup(scope.project().as_str()),
        _ => Ok(ctx.host().clone()),
    }
}

/// Apply `f` to every string in `value`, replacing it when `f` returns a value
fn substitute_strings<F>(value: &mut Value, f: &mut F) -> Result<(), ProcessingError>
where
    F: FnMut(&str) -> Result<Option<Value>, ProcessingError>,
{
    let replacement = match value {
        Value::String(s) => f(s)?,
        Value::Sequence(items) => {
            for item in items {
                substitute_strings(item, f)?;
            }
            None
        }
        Value::Mapping(map) => {
            for item in map.values_mut() {
                substitute_strings(item, f)?;
            }
            None
        }
        Value::Tagged(tagged) => {
            substitute_strings(&mut tagged.value, f)?;
            None
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    };
    if let Some(new) = replacement {
        *value = new;
    }
    Ok(())
}

fn mentions_this_card(value: &Value) -> bool {
    match value {
        Value::String(s) => THIS_CARD.is_match(s),
        Value::Sequence(items) => items.iter().any(mentions_this_card),
        Value::Mapping(map) => map.values().any(mentions_this_card),
        Value::Tagged(tagged) => mentions_this_card(&tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Replace a whole `(name)` value with the project variable's value
fn variable_value(
    name: &str,
    text: &str,
    project: &ProjectId,
    ctx: &RenderContext,
) -> Result<Option<Value>, ProcessingError> {
    let Some(caps) = PLV_REF.captures(text.trim()) else {
        return Ok(None);
    };
    let variable = caps[1].trim();
    ctx.services()
        .variables
        .resolve_plv(project, variable)
        .map(|v| Some(v.to_param_value()))
        .ok_or_else(|| {
            ProcessingError::resolution(
                name,
                Reason::new()
                    .text("Project variable ")
                    .em(format!("({variable})"))
                    .text(" does not exist"),
            )
        })
}

fn card_property<'c>(caps: &'c Captures<'_>) -> Option<&'c str> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

fn property_value(name: &str, card: &CardContext, property: &str) -> Result<String, ProcessingError> {
    card.property(property).ok_or_else(|| {
        ProcessingError::resolution(
            name,
            Reason::new()
                .text("Card property ")
                .em(property)
                .text(" does not exist"),
        )
    })
}

/// Resolve `THIS CARD` and `THIS CARD.<property>` in a string
///
/// A value that is exactly one reference becomes the referenced value;
/// references embedded in longer text (e.g. a query condition) are
/// replaced in place, properties single-quoted.
fn this_card_value(
    name: &str,
    text: &str,
    card: &CardContext,
) -> Result<Option<Value>, ProcessingError> {
    if !THIS_CARD.is_match(text) {
        return Ok(None);
    }

    let trimmed = text.trim();
    if let Some(caps) = THIS_CARD.captures(trimmed) {
        if caps.get(0).is_some_and(|m| m.range() == (0..trimmed.len())) {
            return match card_property(&caps) {
                None => Ok(Some(Value::Number(card.number.into()))),
                Some(property) => property_value(name, card, property).map(|v| Some(Value::String(v))),
            };
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in THIS_CARD.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        match card_property(&caps) {
            None => out.push_str(&card.number.to_string()),
            Some(property) => {
                let value = property_value(name, card, property)?;
                out.push('\'');
                out.push_str(&value.replace('\'', "''"));
                out.push('\'');
            }
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(Some(Value::String(out)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CardContext {
        CardContext::new("demo", 12, "Checkout")
            .with_property("Owner", "bob")
            .with_property("Release Name", "R 1")
    }

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn bare_this_card_is_number() {
        assert_eq!(
            this_card_value("m", "THIS CARD", &card()).unwrap(),
            Some(Value::Number(12.into()))
        );
    }

    #[test]
    fn whole_property_reference() {
        assert_eq!(
            this_card_value("m", "this card.owner", &card()).unwrap(),
            Some(s("bob"))
        );
        assert_eq!(
            this_card_value("m", "THIS CARD.'Release Name'", &card()).unwrap(),
            Some(s("R 1"))
        );
    }

    #[test]
    fn embedded_references_are_quoted() {
        let out = this_card_value(
            "m",
            "SELECT Status, COUNT(*) WHERE Owner = THIS CARD.Owner AND Parent = THIS CARD",
            &card(),
        )
        .unwrap();
        assert_eq!(
            out,
            Some(s("SELECT Status, COUNT(*) WHERE Owner = 'bob' AND Parent = 12"))
        );
    }

    #[test]
    fn unknown_card_property() {
        let err = this_card_value("m", "THIS CARD.Estimate", &card()).unwrap_err();
        assert_eq!(err.to_html(), "Error in m macro: Card property <b>Estimate</b> does not exist.");
    }

    #[test]
    fn untouched_without_reference() {
        assert_eq!(this_card_value("m", "plain", &card()).unwrap(), None);
    }

    #[test]
    fn substitution_reaches_nested_values() {
        let mut value: Value = serde_yaml::from_str("[a, {x: b}, c]").unwrap();
        substitute_strings(&mut value, &mut |t| {
            Ok((t == "b").then(|| s("B")))
        })
        .unwrap();
        let expected: Value = serde_yaml::from_str("[a, {x: B}, c]").unwrap();
        assert_eq!(value, expected);
    }

    #[test]
    fn mentions_are_found_in_lists() {
        let value: Value = serde_yaml::from_str("[a, {x: THIS CARD.Owner}]").unwrap();
        assert!(mentions_this_card(&value));
        assert!(!mentions_this_card(&s("this cardinal")));
    }
}
