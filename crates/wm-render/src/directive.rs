//! Directive scanning
//!
//! Locates macro directives in document text:
//! - inline: `{{ name key: value key2: value2 }}`, or with the parameters
//!   as an indented YAML mapping on the following lines
//! - block: `{% name params %} body {% name %}`; a parameterless tag with
//!   the name of the innermost open block closes it, anything else opens
//!   a new block
//!
//! The scan is a pure function of the text: the same text always yields
//! the same tree, so a directive can be found again by position in a
//! later, independent pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::ops::Range;
use wm_params::{scalar_text, ParamMap};

static KEY_AT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):(?:\s+|$)").expect("key regex is valid")
});

static NEXT_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s[A-Za-z][A-Za-z0-9_-]*:(?:\s|$)").expect("key boundary regex is valid")
});

/// Syntactic form of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveForm {
    /// `{{ ... }}`
    Inline,
    /// `{% ... %} ... {% name %}`
    Block,
}

/// Body of a block directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Byte range of the body text
    pub range: Range<usize>,
    /// Parsed body content
    pub nodes: Vec<Node>,
}

/// One directive occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive name, exactly as written
    pub name: String,
    /// Inline or block
    pub form: DirectiveForm,
    /// Parameter text following the name, unparsed
    pub params: String,
    /// Byte range of the whole directive, closing tag included
    pub span: Range<usize>,
    /// Block body
    pub body: Option<Body>,
    /// `false` for a block whose closing tag never appears
    pub closed: bool,
    /// Parameter text contains another directive
    pub nested: bool,
}

/// Document content: literal text and directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text range
    Text(Range<usize>),
    /// Directive
    Directive(Directive),
}

/// Parsed document
#[derive(Debug, Clone)]
pub struct Document<'a> {
    text: &'a str,
    nodes: Vec<Node>,
}

impl<'a> Document<'a> {
    /// Scan text for directives
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        Self {
            text,
            nodes: scan(text),
        }
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Top-level nodes
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every directive in document order (block before its body)
    #[must_use]
    pub fn directives(&self) -> Vec<&Directive> {
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }

    /// Whether the text holds any directive
    #[must_use]
    pub fn has_directives(&self) -> bool {
        self.nodes.iter().any(|n| matches!(n, Node::Directive(_)))
    }

    /// The `occurrence`-th (1-based) directive called `name`
    #[must_use]
    pub fn nth(&self, name: &str, occurrence: usize) -> Option<&Directive> {
        if occurrence == 0 {
            return None;
        }
        self.directives()
            .into_iter()
            .filter(|d| d.name == name)
            .nth(occurrence - 1)
    }
}

fn collect<'d>(nodes: &'d [Node], out: &mut Vec<&'d Directive>) {
    for node in nodes {
        if let Node::Directive(directive) = node {
            out.push(directive);
            if let Some(body) = &directive.body {
                collect(&body.nodes, out);
            }
        }
    }
}

struct OpenBlock {
    name: String,
    params: String,
    start: usize,
    body_start: usize,
    nodes: Vec<Node>,
}

impl OpenBlock {
    fn finish(self, body_end: usize, end: usize, closed: bool) -> Directive {
        Directive {
            name: self.name,
            form: DirectiveForm::Block,
            params: self.params,
            span: self.start..end,
            body: Some(Body {
                range: self.body_start..body_end,
                nodes: self.nodes,
            }),
            closed,
            nested: false,
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, range: Range<usize>) {
    if !range.is_empty() {
        nodes.push(Node::Text(range));
    }
}

fn scan(text: &str) -> Vec<Node> {
    let mut root = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while let Some(offset) = find_opener(&text[pos..]) {
        let at = pos + offset;
        let current = match open.last_mut() {
            Some(block) => &mut block.nodes,
            None => &mut root,
        };

        if text[at..].starts_with("{{") {
            let Some((end, inner, nested)) = scan_inline(text, at) else {
                pos = at + 2;
                continue;
            };
            let Some((name, params)) = split_name(&text[inner]) else {
                pos = at + 2;
                continue;
            };
            push_text(current, text_start..at);
            current.push(Node::Directive(Directive {
                name: name.to_string(),
                form: DirectiveForm::Inline,
                params: params.to_string(),
                span: at..end,
                body: None,
                closed: true,
                nested,
            }));
            pos = end;
            text_start = end;
            continue;
        }

        let Some(close) = text[at + 2..].find("%}").map(|i| at + 2 + i) else {
            pos = at + 2;
            continue;
        };
        let Some((name, params)) = split_name(&text[at + 2..close]) else {
            pos = at + 2;
            continue;
        };
        let end = close + 2;
        push_text(current, text_start..at);

        let closes_innermost =
            params.trim().is_empty() && open.last().is_some_and(|b| b.name == name);
        if closes_innermost {
            if let Some(block) = open.pop() {
                let directive = block.finish(at, end, true);
                let parent = match open.last_mut() {
                    Some(b) => &mut b.nodes,
                    None => &mut root,
                };
                parent.push(Node::Directive(directive));
            }
        } else {
            open.push(OpenBlock {
                name: name.to_string(),
                params: params.to_string(),
                start: at,
                body_start: end,
                nodes: Vec::new(),
            });
        }
        pos = end;
        text_start = end;
    }

    let len = text.len();
    match open.last_mut() {
        Some(block) => push_text(&mut block.nodes, text_start..len),
        None => push_text(&mut root, text_start..len),
    }
    while let Some(block) = open.pop() {
        let directive = block.finish(len, len, false);
        match open.last_mut() {
            Some(b) => b.nodes.push(Node::Directive(directive)),
            None => root.push(Node::Directive(directive)),
        }
    }
    root
}

fn find_opener(text: &str) -> Option<usize> {
    match (text.find("{{"), text.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Balanced `{{ ... }}` starting at `at`: (end, inner range, nested)
fn scan_inline(text: &str, at: usize) -> Option<(usize, Range<usize>, bool)> {
    let mut depth = 1usize;
    let mut nested = false;
    let mut pos = at + 2;
    loop {
        let rest = &text[pos..];
        let open = rest.find("{{");
        let close = rest.find("}}")?;
        match open {
            Some(o) if o < close => {
                depth += 1;
                nested = true;
                pos += o + 2;
            }
            _ => {
                depth -= 1;
                pos += close + 2;
                if depth == 0 {
                    return Some((pos, at + 2..pos - 2, nested));
                }
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn split_name(inner: &str) -> Option<(&str, &str)> {
    let trimmed = inner.trim_start();
    let len = trimmed.find(|c: char| !is_name_char(c)).unwrap_or(trimmed.len());
    if len == 0 {
        return None;
    }
    let (name, rest) = trimmed.split_at(len);
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((name, rest))
}

/// Directive parameter text that is not valid markup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parameter markup: {message}")]
pub struct MarkupError {
    /// Parser detail
    pub message: String,
}

impl MarkupError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parse the parameter text of a directive
///
/// Single-line text is read as `key: value` pairs, each value a YAML
/// scalar or flow collection. Multi-line text is read as an indented
/// YAML mapping.
///
/// # Errors
/// [`MarkupError`] when the text is neither form.
pub fn parse_params(raw: &str) -> Result<ParamMap, MarkupError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok(ParamMap::new())
    } else if trimmed.contains('\n') {
        parse_mapping(raw)
    } else {
        parse_inline(trimmed)
    }
}

fn parse_mapping(raw: &str) -> Result<ParamMap, MarkupError> {
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let indent = lines
        .iter()
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let dedented: Vec<&str> = lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect();

    let value: Value =
        serde_yaml::from_str(&dedented.join("\n")).map_err(|e| MarkupError::new(e.to_string()))?;
    match value {
        Value::Null => Ok(ParamMap::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(k, v)| {
                scalar_text(&k)
                    .map(|key| (key.trim().to_string(), v))
                    .ok_or_else(|| MarkupError::new("parameter names must be scalars"))
            })
            .collect(),
        _ => Err(MarkupError::new("parameters must be a mapping")),
    }
}

fn parse_inline(text: &str) -> Result<ParamMap, MarkupError> {
    let mut params = ParamMap::new();
    let mut rest = text;

    while !rest.trim_start().is_empty() {
        rest = rest.trim_start();
        let caps = KEY_AT_START
            .captures(rest)
            .ok_or_else(|| MarkupError::new(format!("expected `name: value` at `{rest}`")))?;
        let key = caps[1].to_string();
        rest = &rest[caps[0].len()..];

        let value_len = match rest.chars().next() {
            Some(q @ ('\'' | '"')) => quoted_len(rest, q)
                .ok_or_else(|| MarkupError::new(format!("unterminated quote in `{key}`")))?,
            _ => NEXT_KEY.find(rest).map_or(rest.len(), |m| m.start()),
        };
        let (value, tail) = rest.split_at(value_len);
        params.insert(key, parse_scalar(value.trim())?);
        rest = tail;
    }
    Ok(params)
}

/// Length of a quoted scalar at the start of `text`, quotes included
fn quoted_len(text: &str, quote: char) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
        } else if c == quote {
            if quote == '\'' && chars.peek().is_some_and(|&(_, n)| n == '\'') {
                chars.next();
                continue;
            }
            return Some(i + c.len_utf8());
        }
    }
    None
}

fn parse_scalar(text: &str) -> Result<Value, MarkupError> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(|e| MarkupError::new(e.to_string()))
}
