//! Markdown view renderer.
//!
//! Escapes Markdown source, parses it with comrak, highlights code blocks
//! with syntect and post processes links and images inside a caller owned
//! container.

mod config;
pub mod dom;
mod error;
mod escape;
mod highlight;
mod loader;
mod markdown;
pub mod page;
mod sanitize;
mod viewer;

pub use config::{Config, HtmlPolicy};
pub use dom::{Container, ElementSnapshot, HtmlContainer};
pub use error::{HighlightError, InitError, ParseError, RenderError};
pub use escape::{escape_html, unescape_html};
pub use highlight::{Highlighter, SyntectHighlighter, stylesheet_for_theme};
pub use loader::{BundledLoader, DEFAULT_THEME, Dependency, DependencyLoader};
pub use markdown::{ComrakParser, HighlightHook, MarkdownParser, ParserOptions};
pub use sanitize::SanitizingRenderer;
pub use viewer::{DEFAULT_LOAD_TIMEOUT, MarkdownViewer, MarkdownViewerBuilder, ViewerConfig};
