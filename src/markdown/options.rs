//! Parser configuration.

use std::fmt;
use std::sync::Arc;

/// Per code block highlight hook.
///
/// Receives the block's decoded text and its declared language tag and
/// returns replacement markup for the block content. `None` keeps the
/// parser's own escaped text.
pub type HighlightHook = Arc<dyn Fn(&str, Option<&str>) -> Option<String> + Send + Sync>;

/// Named options accepted by [`MarkdownParser::configure`](super::MarkdownParser::configure).
#[derive(Clone)]
pub struct ParserOptions {
    /// GitHub Flavored Markdown extensions.
    pub gfm: bool,
    /// Single newlines inside paragraphs render as `<br>`.
    pub breaks: bool,
    /// Ordered lists keep their start number and split on marker changes.
    pub smart_lists: bool,
    /// Straight quotes, dashes and ellipses become typographic punctuation.
    pub smartypants: bool,
    /// Hook run on every fenced or indented code block.
    pub highlight: Option<HighlightHook>,
}

impl ParserOptions {
    /// Options with every feature switched off.
    pub fn plain() -> Self {
        Self {
            gfm: false,
            breaks: false,
            smart_lists: false,
            smartypants: false,
            highlight: None,
        }
    }

    /// Attaches a code block highlight hook.
    pub fn with_highlight(
        mut self,
        hook: impl Fn(&str, Option<&str>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.highlight = Some(Arc::new(hook));
        self
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            breaks: true,
            smart_lists: true,
            smartypants: true,
            highlight: None,
        }
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserOptions")
            .field("gfm", &self.gfm)
            .field("breaks", &self.breaks)
            .field("smart_lists", &self.smart_lists)
            .field("smartypants", &self.smartypants)
            .field("highlight", &self.highlight.is_some())
            .finish()
    }
}
