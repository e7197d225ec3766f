//! HTML escaping for `{{name}}` substitutions.

use std::borrow::Cow;

/// Escape `& " ' < > \` for HTML output.
///
/// An ampersand that already starts a named entity (`&name;`) is left
/// alone; a backslash is doubled. Every other character passes through.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '"', '\'', '<', '>', '\\']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for (i, c) in text.char_indices() {
        match c {
            '&' if starts_entity(&text[i + 1..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// `rest` begins with one or more word characters followed by `;`.
fn starts_entity(rest: &str) -> bool {
    let word_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    word_len > 0 && rest[word_len..].starts_with(';')
}
