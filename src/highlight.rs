//! Syntax highlighting with syntect.

use anyhow::{Context, Result};
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::dom::CodeBlock;
use crate::error::HighlightError;
use crate::escape::escape_html;

/// CSS class prefix shared by generated markup and stylesheets.
///
/// Matches the highlight.js naming used by existing markdown themes.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hljs-" };

/// Class added to every code element passed through [`Highlighter::highlight_element`].
pub const HIGHLIGHTED_CLASS: &str = "hljs";

/// Syntax highlighting capability consumed by the viewer.
pub trait Highlighter: Send + Sync {
    /// Returns true when `language` names a known syntax.
    fn supports_language(&self, language: &str) -> bool;

    /// Highlights `code` as `language`.
    ///
    /// # Returns
    ///
    /// Markup with escaped text wrapped in highlight spans
    ///
    /// # Errors
    ///
    /// Returns error if the language is unknown or highlighting fails
    fn highlight(&self, code: &str, language: &str) -> Result<String, HighlightError>;

    /// Highlights an already rendered code element in place.
    ///
    /// Re-reads the element's text content, so running it over a block the
    /// parser hook already highlighted yields the same markup. Blocks
    /// without a recognised `language-*` class become escaped plain text.
    /// On success the element carries the `hljs` class and
    /// `data-highlighted="yes"`.
    ///
    /// # Errors
    ///
    /// Returns error if highlighting fails; the element is left untouched
    fn highlight_element(&self, block: &mut CodeBlock) -> Result<(), HighlightError> {
        let text = block.text_content();
        let markup = match block.language() {
            Some(language) if self.supports_language(&language) => {
                self.highlight(&text, &language)?
            }
            _ => escape_html(&text),
        };

        block.set_inner_html(markup);
        block.add_class(HIGHLIGHTED_CLASS);
        block.set_attribute("data-highlighted", "yes");
        Ok(())
    }
}

/// Highlighter backed by syntect's bundled syntax definitions.
///
/// Emits CSS class names (`hljs-` prefix) instead of inline styles; pair
/// with [`stylesheet_for_theme`] for colours.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
}

impl SyntectHighlighter {
    /// Loads the default syntax set. This is the expensive step callers
    /// should keep off async executors.
    pub fn new() -> Self {
        Self::with_syntax_set(SyntaxSet::load_defaults_newlines())
    }

    pub fn with_syntax_set(syntax_set: SyntaxSet) -> Self {
        Self { syntax_set }
    }

    fn find_syntax(&self, token: &str) -> Option<&SyntaxReference> {
        let lowercase = token.to_ascii_lowercase();
        self.syntax_set
            .find_syntax_by_token(&lowercase)
            .or_else(|| self.syntax_set.find_syntax_by_name(token))
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lowercase))
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    fn supports_language(&self, language: &str) -> bool {
        !language.is_empty() && self.find_syntax(language).is_some()
    }

    fn highlight(&self, code: &str, language: &str) -> Result<String, HighlightError> {
        let syntax = self
            .find_syntax(language)
            .ok_or_else(|| HighlightError::UnsupportedLanguage(language.to_string()))?;

        if code.is_empty() {
            return Ok(String::new());
        }

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, CLASS_STYLE);

        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| HighlightError::Highlighting {
                    language: language.to_string(),
                    message: err.to_string(),
                })?;
        }

        Ok(generator.finalize())
    }
}

/// Generates the stylesheet for a bundled syntect theme.
///
/// # Arguments
///
/// * `theme`: Theme name (InspiredGitHub, base16-ocean.light, etc)
///
/// # Errors
///
/// Returns error if the theme is unknown or CSS generation fails
pub fn stylesheet_for_theme(theme: &str) -> Result<String> {
    let themes = ThemeSet::load_defaults();
    let selected = themes.themes.get(theme).with_context(|| {
        let mut known: Vec<_> = themes.themes.keys().map(String::as_str).collect();
        known.sort_unstable();
        format!("Unknown theme {:?}, expected one of {}", theme, known.join(", "))
    })?;

    css_for_theme_with_class_style(selected, CLASS_STYLE)
        .context("Failed to generate theme stylesheet")
}
