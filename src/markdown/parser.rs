//! Markdown parsing with GitHub Flavored Markdown support.

use comrak::{Arena, Options, format_html, parse_document};

use super::{HighlightHook, ParserOptions};
use crate::error::ParseError;
use crate::escape::unescape_html;

/// Markdown parsing capability consumed by the viewer.
pub trait MarkdownParser: Send + Sync {
    /// Applies named options. Later calls replace earlier configuration.
    fn configure(&mut self, options: ParserOptions);

    /// Parses Markdown into an HTML string.
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be rendered
    fn parse(&self, markdown: &str) -> Result<String, ParseError>;
}

const PRE_CODE_OPEN: &str = "<pre><code";
const CODE_CLOSE: &str = "</code></pre>";
const LANGUAGE_CLASS: &str = "class=\"language-";

/// Parses markdown to HTML with GitHub Flavored Markdown extensions.
///
/// Raw HTML stays disabled, so embedded tags are dropped and unsafe link
/// schemes such as `javascript:` are removed by comrak. Fenced code blocks
/// are handed to the configured highlight hook after formatting.
///
/// Only the named switches are stored; comrak options are built per parse
/// because they are not `Send`.
pub struct ComrakParser {
    options: ParserOptions,
}

impl ComrakParser {
    /// Creates parser configured with [`ParserOptions::default`].
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// Creates parser with explicit options.
    ///
    /// # Arguments
    ///
    /// * `options`: Parser switches and optional highlight hook
    pub fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Builds comrak options from the stored switches.
    fn comrak_options(&self) -> Options<'static> {
        let mut comrak = Options::default();

        if self.options.gfm {
            comrak.extension.strikethrough = true;
            comrak.extension.table = true;
            comrak.extension.autolink = true;
            comrak.extension.tasklist = true;
            comrak.extension.tagfilter = true;
        }

        // CommonMark list rules already keep ordered list start numbers and
        // split lists on marker changes, so smart_lists needs no switch.
        comrak.parse.smart = self.options.smartypants;
        comrak.render.hardbreaks = self.options.breaks;
        comrak.render.unsafe_ = false;

        comrak
    }

    /// Hands every `<pre><code>` block to the hook.
    ///
    /// Comrak emits code blocks as `<pre><code class="language-X">` with
    /// escaped text and no nested tags. The text is decoded before it
    /// reaches the hook; the hook's markup replaces the block content.
    /// Blocks the hook declines keep comrak's escaped text.
    ///
    /// # Arguments
    ///
    /// * `html`: Formatted HTML from comrak
    /// * `hook`: Highlight hook receiving text and language tag
    ///
    /// # Returns
    ///
    /// HTML with hooked code block content
    fn apply_hook(html: &str, hook: &HighlightHook) -> String {
        let mut result = String::with_capacity(html.len());
        let mut last_end = 0;
        let mut search_pos = 0;

        while let Some(found) = html[search_pos..].find(PRE_CODE_OPEN) {
            let block_start = search_pos + found;
            let tag_start = block_start + "<pre>".len();

            let content_start = match html[tag_start..].find('>') {
                Some(pos) => tag_start + pos + 1,
                None => break,
            };

            let content_end = match html[content_start..].find(CODE_CLOSE) {
                Some(pos) => content_start + pos,
                None => break,
            };

            let open_tag = &html[tag_start..content_start];
            let language = Self::language_of(open_tag).map(unescape_html);
            let code = unescape_html(&html[content_start..content_end]);

            if let Some(markup) = hook(&code, language.as_deref()) {
                result.push_str(&html[last_end..content_start]);
                result.push_str(&markup);
                result.push_str(CODE_CLOSE);
            } else {
                result.push_str(&html[last_end..content_end + CODE_CLOSE.len()]);
            }

            last_end = content_end + CODE_CLOSE.len();
            search_pos = last_end;
        }

        result.push_str(&html[last_end..]);
        result
    }

    /// Extracts `X` from a `<code class="language-X">` opening tag.
    fn language_of(open_tag: &str) -> Option<&str> {
        let start = open_tag.find(LANGUAGE_CLASS)? + LANGUAGE_CLASS.len();
        let len = open_tag[start..].find(['"', ' '])?;
        let language = &open_tag[start..start + len];
        (!language.is_empty()).then_some(language)
    }
}

impl MarkdownParser for ComrakParser {
    fn configure(&mut self, options: ParserOptions) {
        self.options = options;
    }

    fn parse(&self, markdown: &str) -> Result<String, ParseError> {
        let options = self.comrak_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);

        let mut buffer = Vec::with_capacity(markdown.len() * 2);
        format_html(root, &options, &mut buffer)
            .map_err(|err| ParseError::new(err.to_string()))?;
        let html = String::from_utf8(buffer).map_err(|err| ParseError::new(err.to_string()))?;

        Ok(match &self.options.highlight {
            Some(hook) => Self::apply_hook(&html, hook),
            None => html,
        })
    }
}

impl Default for ComrakParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_hook() -> (ParserOptions, Arc<Mutex<Vec<(String, Option<String>)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = ParserOptions::default().with_highlight(move |code, lang| {
            sink.lock()
                .expect("Hook log lock")
                .push((code.to_string(), lang.map(String::from)));
            Some(format!("<span class=\"hl\">{}</span>", code.len()))
        });
        (options, seen)
    }

    #[test]
    fn test_parse_basic_markdown() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "# Hello\n\nThis is **bold** text.";

        // Act
        let html = parser.parse(markdown).expect("Should parse markdown");

        // Assert
        assert!(html.contains("<h1>"), "Should contain h1 tag");
        assert!(html.contains("Hello"), "Should contain heading text");
        assert!(html.contains("<strong>"), "Should contain strong tag");
        assert!(html.contains("bold"), "Should contain bold text");
    }

    #[test]
    fn test_parse_gfm_tables() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = r#"
| Header 1 | Header 2 |
|----------|----------|
| Cell 1   | Cell 2   |
"#;

        // Act
        let html = parser.parse(markdown).expect("Should parse table");

        // Assert
        assert!(html.contains("<table>"), "Should contain table tag");
        assert!(html.contains("<th>"), "Should contain table header");
        assert!(html.contains("<td>"), "Should contain table cell");
        assert!(html.contains("Cell 1"), "Should contain cell text");
    }

    #[test]
    fn test_parse_without_gfm_skips_tables() {
        // Arrange
        let parser = ComrakParser::with_options(ParserOptions::plain());
        let markdown = "| a | b |\n|---|---|\n| 1 | 2 |\n";

        // Act
        let html = parser.parse(markdown).expect("Should parse");

        // Assert
        assert!(!html.contains("<table>"), "Tables need GFM: {}", html);
    }

    #[test]
    fn test_parse_gfm_strikethrough() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "This is ~~strikethrough~~ text.";

        // Act
        let html = parser.parse(markdown).expect("Should parse strikethrough");

        // Assert
        assert!(
            html.contains("<del>") || html.contains("<s>"),
            "Should contain strikethrough tag: {}",
            html
        );
    }

    #[test]
    fn test_parse_gfm_tasklist() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "- [ ] Unchecked task\n- [x] Checked task\n";

        // Act
        let html = parser.parse(markdown).expect("Should parse tasklist");

        // Assert
        assert!(
            html.contains("type=\"checkbox\""),
            "Should contain checkbox"
        );
        assert!(html.contains("disabled"), "Checkboxes should be disabled");
    }

    #[test]
    fn test_parse_autolinks() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "Visit https://example.com for more info.";

        // Act
        let html = parser.parse(markdown).expect("Should parse autolinks");

        // Assert
        assert!(
            html.contains("<a href=\"https://example.com\">"),
            "Should link bare URL: {}",
            html
        );
    }

    #[test]
    fn test_parse_line_breaks() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "first line\nsecond line";

        // Act
        let html = parser.parse(markdown).expect("Should parse");

        // Assert
        assert!(html.contains("<br"), "Newline should become <br>: {}", html);
    }

    #[test]
    fn test_parse_line_breaks_disabled() {
        // Arrange
        let options = ParserOptions {
            breaks: false,
            ..ParserOptions::default()
        };
        let parser = ComrakParser::with_options(options);

        // Act
        let html = parser.parse("first line\nsecond line").expect("Should parse");

        // Assert
        assert!(!html.contains("<br"), "Soft break expected: {}", html);
    }

    #[test]
    fn test_parse_smart_punctuation() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = r#"He said "Hello" -- it's nice."#;

        // Act
        let html = parser.parse(markdown).expect("Should parse smart quotes");

        // Assert
        assert!(
            html.contains('\u{201C}')
                || html.contains('\u{201D}')
                || html.contains("&ldquo;")
                || html.contains("&rdquo;"),
            "Should contain smart quotes (curly quotes): {}",
            html
        );
    }

    #[test]
    fn test_parse_ordered_list_keeps_start() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "3. three\n4. four\n";

        // Act
        let html = parser.parse(markdown).expect("Should parse list");

        // Assert
        assert!(
            html.contains("<ol start=\"3\">"),
            "Should keep list start: {}",
            html
        );
    }

    #[test]
    fn test_parse_drops_raw_html() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "<script>alert('xss')</script>\n\nNormal text.";

        // Act
        let html = parser.parse(markdown).expect("Should parse HTML");

        // Assert
        assert!(!html.contains("<script>"), "Raw HTML leaked: {}", html);
        assert!(html.contains("Normal text"), "Should contain safe text");
    }

    #[test]
    fn test_parse_drops_javascript_links() {
        // Arrange
        let parser = ComrakParser::new();
        let markdown = "[click](javascript:alert(1))";

        // Act
        let html = parser.parse(markdown).expect("Should parse link");

        // Assert
        assert!(!html.contains("javascript:"), "Unsafe URL kept: {}", html);
        assert!(html.contains("click"), "Link text should remain");
    }

    #[test]
    fn test_parse_empty_markdown() {
        // Arrange
        let parser = ComrakParser::new();

        // Act
        let html = parser.parse("").expect("Empty markdown should parse");

        // Assert
        assert!(html.is_empty(), "Empty input renders nothing: {:?}", html);
    }

    #[test]
    fn test_hook_receives_decoded_code_and_language() {
        // Arrange
        let (options, seen) = recording_hook();
        let parser = ComrakParser::with_options(options);
        let markdown = "```rust\nif a < b && c {}\n```\n";

        // Act
        let html = parser.parse(markdown).expect("Should parse code block");

        // Assert
        let seen = seen.lock().expect("Hook log lock");
        assert_eq!(seen.len(), 1, "Hook should run once");
        assert_eq!(seen[0].0, "if a < b && c {}\n");
        assert_eq!(seen[0].1.as_deref(), Some("rust"));
        assert!(
            html.contains("<pre><code class=\"language-rust\"><span class=\"hl\">"),
            "Hook markup should replace content: {}",
            html
        );
    }

    #[test]
    fn test_hook_receives_none_without_language() {
        // Arrange
        let (options, seen) = recording_hook();
        let parser = ComrakParser::with_options(options);

        // Act
        parser
            .parse("```\nplain\n```\n")
            .expect("Should parse code block");

        // Assert
        let seen = seen.lock().expect("Hook log lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, None);
    }

    #[test]
    fn test_hook_runs_for_every_block_but_not_inline_code() {
        // Arrange
        let (options, seen) = recording_hook();
        let parser = ComrakParser::with_options(options);
        let markdown = r#"
Inline `let x = 1;` code.

```rust
fn foo() {}
```

Second block:
```python
def bar():
    pass
```
"#;

        // Act
        let html = parser.parse(markdown).expect("Should parse");

        // Assert
        let seen = seen.lock().expect("Hook log lock");
        let languages: Vec<_> = seen.iter().map(|(_, lang)| lang.as_deref()).collect();
        assert_eq!(languages, vec![Some("rust"), Some("python")]);
        assert!(
            html.contains("<code>let x = 1;</code>"),
            "Inline code untouched: {}",
            html
        );
    }

    #[test]
    fn test_declined_hook_keeps_escaped_text() {
        // Arrange
        let options = ParserOptions::default().with_highlight(|_, _| None);
        let parser = ComrakParser::with_options(options);

        // Act
        let html = parser
            .parse("```unknownlang\na < b\n```\n")
            .expect("Should parse");

        // Assert
        assert!(
            html.contains("<code class=\"language-unknownlang\">a &lt; b\n</code>"),
            "Should keep escaped text: {}",
            html
        );
    }

    #[test]
    fn test_parser_shared_across_threads() {
        // Arrange
        let (options, seen) = recording_hook();
        let parser: Arc<dyn MarkdownParser> = Arc::new(ComrakParser::with_options(options));

        // Act
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = Arc::clone(&parser);
                std::thread::spawn(move || {
                    parser
                        .parse(&format!("# Part {i}\n\n```rust\nlet x = {i};\n```\n"))
                        .expect("Should parse on worker thread")
                })
            })
            .collect();
        let outputs: Vec<String> = handles
            .into_iter()
            .map(|handle| handle.join().expect("Worker should not panic"))
            .collect();

        // Assert
        assert_eq!(outputs.len(), 4);
        assert!(outputs.iter().all(|html| html.contains("<h1>")));
        assert_eq!(seen.lock().expect("Hook log lock").len(), 4);
    }

    #[test]
    fn test_configure_replaces_options() {
        // Arrange
        let mut parser = ComrakParser::new();

        // Act
        parser.configure(ParserOptions::plain());
        let html = parser.parse("one\ntwo ~~gone~~").expect("Should parse");

        // Assert
        assert!(!html.contains("<br"), "Breaks off: {}", html);
        assert!(!html.contains("<del>"), "GFM off: {}", html);
    }

    #[test]
    fn test_language_of_tag() {
        assert_eq!(
            ComrakParser::language_of("<code class=\"language-rust\">"),
            Some("rust")
        );
        assert_eq!(ComrakParser::language_of("<code>"), None);
        assert_eq!(ComrakParser::language_of("<code class=\"language-\">"), None);
    }

    #[test]
    fn test_parse_large_documentation() {
        // Arrange
        let (options, _) = recording_hook();
        let parser = ComrakParser::with_options(options);
        let section = "# Large Documentation\n\n\
            Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\n\
            ```rust\n\
            fn example() {}\n\
            ```\n\n";
        let large_markdown = section.repeat(2_000);

        // Act
        let html = parser
            .parse(&large_markdown)
            .expect("Should handle large documentation");

        // Assert
        assert_eq!(html.matches("<h1>").count(), 2_000);
        assert_eq!(html.matches("<span class=\"hl\">").count(), 2_000);
    }
}
