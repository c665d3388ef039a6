//! HTML escaping helpers shared by the render pipeline.

/// Escapes the five HTML significant characters.
///
/// Apostrophes become `&#039;` so escaped source stays distinguishable
/// from the `&#39;` comrak emits for its own text.
///
/// # Arguments
///
/// * `text`: Plain text to escape
///
/// # Returns
///
/// Text safe to embed in markup or to feed to the Markdown parser
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Entities recognised by [`unescape_html`], longest first per prefix.
const ENTITIES: [(&str, char); 6] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#039;", '\''),
    ("&#39;", '\''),
];

/// Decodes the entities produced by [`escape_html`] in a single pass.
///
/// Decoding runs left to right and never re-reads its own output, so
/// `&amp;lt;` becomes `&lt;` rather than `<`. Unknown entities are kept
/// verbatim.
///
/// # Arguments
///
/// * `text`: Escaped text
///
/// # Returns
///
/// Text with one layer of escaping removed
pub fn unescape_html(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];

        match ENTITIES
            .iter()
            .find(|(entity, _)| rest.starts_with(entity))
        {
            Some((entity, ch)) => {
                decoded.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

/// Checks that `text` reads as the output of [`escape_html`]: no bare
/// special characters, and every `&` opens a recognised entity.
pub fn is_escaped(text: &str) -> bool {
    if text.contains(['<', '>', '"', '\'']) {
        return false;
    }
    text.match_indices('&').all(|(index, _)| {
        ENTITIES
            .iter()
            .any(|(entity, _)| text[index..].starts_with(entity))
    })
}

/// Returns the text content of markup that contains only tags and
/// escaped text, such as highlighter output.
pub fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    unescape_html(&text)
}
