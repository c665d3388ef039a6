//! Error types surfaced by the render pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::loader::Dependency;

/// Failure while bringing the viewer's dependencies up.
#[derive(Debug, Clone, Error)]
pub enum InitError {
    #[error("dependency unavailable: {dependency}: {reason}")]
    DependencyUnavailable {
        dependency: Dependency,
        reason: String,
    },
}

impl InitError {
    pub(crate) fn unavailable(dependency: Dependency, reason: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            dependency,
            reason: reason.into(),
        }
    }

    pub(crate) fn timed_out(dependency: Dependency, limit: Duration) -> Self {
        Self::unavailable(
            dependency,
            format!("load did not complete within {}ms", limit.as_millis()),
        )
    }

    /// Dependency that failed to load.
    pub fn dependency(&self) -> Dependency {
        match self {
            Self::DependencyUnavailable { dependency, .. } => *dependency,
        }
    }
}

/// Markdown parsing failed.
#[derive(Debug, Clone, Error)]
#[error("markdown parsing failed: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Highlighting a single code block failed.
#[derive(Debug, Clone, Error)]
pub enum HighlightError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

/// Errors returned by [`MarkdownViewer::render`](crate::MarkdownViewer::render).
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("document rewriting failed: {message}")]
    Document { message: String },
}
