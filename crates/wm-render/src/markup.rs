//! HTML fragments emitted by the renderer

use crate::error::ProcessingError;

/// Escape text for inclusion in HTML content or attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline marker left in place of a failed directive
#[must_use]
pub fn error_marker(err: &ProcessingError) -> String {
    format!("<div class=\"error macro\">{}</div>", err.to_html())
}

/// Notice left in place of a directive that renders once the card exists
#[must_use]
pub fn deferred_notice(macro_name: &str, notice: &str) -> String {
    format!(
        "<div class=\"info macro\" data-macro=\"{}\">{notice}</div>",
        escape_html(macro_name)
    )
}

/// Image placeholder pointing at a chart artifact
#[must_use]
pub fn chart_image(url: &str, chart_type: &str, position: usize) -> String {
    format!(
        "<img class=\"chart\" src=\"{}\" alt=\"{} {position}\" />",
        escape_html(url),
        escape_html(chart_type)
    )
}
