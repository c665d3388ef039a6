//! Markdown parsing with GitHub Flavored Markdown support.
//!
//! This module defines the parsing capability consumed by the viewer and a
//! comrak backed implementation with GFM extensions (tables,
//! strikethrough, autolinks, task lists) and a per code block highlight
//! hook.

mod options;
mod parser;

pub use options::{HighlightHook, ParserOptions};
pub use parser::{ComrakParser, MarkdownParser};
