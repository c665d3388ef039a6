//! Allow-list sanitizing renderer.
//!
//! Alternative to the viewer's escape-first policy: Markdown is rendered
//! with raw HTML enabled and the result is cleaned against a fixed
//! allow-list of tags and attributes, so authors keep simple inline markup.

use std::collections::{HashMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::Options;

const ALLOWED_TAGS: [&str; 33] = [
    "p",
    "br",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "strong",
    "em",
    "u",
    "del",
    "code",
    "pre",
    "blockquote",
    "ul",
    "ol",
    "li",
    "dl",
    "dt",
    "dd",
    "a",
    "img",
    "table",
    "thead",
    "tbody",
    "tr",
    "th",
    "td",
    "div",
    "span",
    "hr",
    "input",
];

/// Renders Markdown and strips everything outside the allow-list.
pub struct SanitizingRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
}

impl SanitizingRenderer {
    /// Creates renderer with fenced code, tables, strikethrough and task
    /// lists enabled.
    pub fn new() -> Self {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.tasklist = true;
        options.render.unsafe_ = true;

        Self {
            options,
            sanitizer: build_sanitizer(),
        }
    }

    /// Renders `markdown` to sanitized HTML. Empty input yields "".
    pub fn render(&self, markdown: &str) -> String {
        if markdown.is_empty() {
            return String::new();
        }

        let html = comrak::markdown_to_html(markdown, &self.options);
        self.sanitizer.clean(&html).to_string()
    }
}

impl Default for SanitizingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.tags(ALLOWED_TAGS.into_iter().collect::<HashSet<_>>());
    builder.generic_attributes(HashSet::new());

    let heading = HashSet::from(["id", "class"]);
    let classed = HashSet::from(["class"]);
    let aligned = HashSet::from(["align"]);
    let tag_attributes = HashMap::from([
        ("a", HashSet::from(["href", "title", "target"])),
        ("img", HashSet::from(["src", "alt", "title", "width", "height"])),
        ("code", classed.clone()),
        ("pre", classed.clone()),
        ("div", classed.clone()),
        ("span", classed),
        ("h1", heading.clone()),
        ("h2", heading.clone()),
        ("h3", heading.clone()),
        ("h4", heading.clone()),
        ("h5", heading.clone()),
        ("h6", heading),
        ("td", aligned.clone()),
        ("th", aligned),
        ("input", HashSet::from(["type", "checked", "disabled"])),
    ]);
    builder.tag_attributes(tag_attributes);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_markdown() {
        // Arrange
        let renderer = SanitizingRenderer::new();

        // Act
        let html = renderer.render("");

        // Assert
        assert_eq!(html, "");
    }

    #[test]
    fn test_render_keeps_allowed_inline_html() {
        // Arrange
        let renderer = SanitizingRenderer::new();

        // Act
        let html = renderer.render("Some <u>underlined</u> and **bold** text.");

        // Assert
        assert!(html.contains("<u>underlined</u>"), "{}", html);
        assert!(html.contains("<strong>bold</strong>"), "{}", html);
    }

    #[test]
    fn test_render_strips_script() {
        // Arrange
        let renderer = SanitizingRenderer::new();
        let markdown = "<script>alert('xss')</script>\n\nNormal text.";

        // Act
        let html = renderer.render(markdown);

        // Assert
        assert!(!html.contains("<script"), "{}", html);
        assert!(!html.contains("alert"), "Script content removed: {}", html);
        assert!(html.contains("Normal text"), "{}", html);
    }

    #[test]
    fn test_render_strips_disallowed_attributes() {
        // Arrange
        let renderer = SanitizingRenderer::new();
        let markdown = r#"<div class="note" onclick="steal()" style="color: red">hi</div>"#;

        // Act
        let html = renderer.render(markdown);

        // Assert
        assert!(html.contains(r#"<div class="note">"#), "{}", html);
        assert!(!html.contains("onclick"), "{}", html);
        assert!(!html.contains("style"), "{}", html);
    }

    #[test]
    fn test_render_keeps_link_target_and_drops_javascript() {
        // Arrange
        let renderer = SanitizingRenderer::new();
        let markdown = r#"<a href="https://example.com" target="_blank">ok</a> [bad](javascript:alert(1))"#;

        // Act
        let html = renderer.render(markdown);

        // Assert
        assert!(html.contains(r#"target="_blank""#), "{}", html);
        assert!(!html.contains("javascript:"), "{}", html);
    }

    #[test]
    fn test_render_gfm_features() {
        // Arrange
        let renderer = SanitizingRenderer::new();
        let markdown = "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n";

        // Act
        let html = renderer.render(markdown);

        // Assert
        assert!(html.contains("<table>"), "{}", html);
        assert!(html.contains("<del>gone</del>"), "{}", html);
        assert!(html.contains("type=\"checkbox\""), "{}", html);
    }

    #[test]
    fn test_render_fenced_code_keeps_language_class() {
        // Arrange
        let renderer = SanitizingRenderer::new();

        // Act
        let html = renderer.render("```rust\nfn main() {}\n```\n");

        // Assert
        assert!(
            html.contains("<pre><code class=\"language-rust\">"),
            "{}",
            html
        );
    }
}
