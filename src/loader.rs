//! Dependency loading for the viewer.
//!
//! The viewer never probes global state for its parser or highlighter.
//! Whatever was not injected up front is requested from a
//! [`DependencyLoader`], and every request is bounded by a timeout.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task;
use tracing::debug;

use crate::error::InitError;
use crate::highlight::{Highlighter, SyntectHighlighter, stylesheet_for_theme};
use crate::markdown::{ComrakParser, MarkdownParser};

/// Theme used when none is configured.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Identifies a dependency the viewer may need to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Parser,
    Highlighter,
    Stylesheet,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dependency::Parser => "markdown parser",
            Dependency::Highlighter => "syntax highlighter",
            Dependency::Stylesheet => "highlight stylesheet",
        };
        f.write_str(name)
    }
}

/// Source of the capabilities the viewer did not receive up front.
#[async_trait]
pub trait DependencyLoader: Send + Sync {
    async fn load_parser(&self) -> Result<Box<dyn MarkdownParser>, InitError>;

    async fn load_highlighter(&self) -> Result<Arc<dyn Highlighter>, InitError>;

    /// CSS matching the markup produced by the loaded highlighter.
    async fn load_stylesheet(&self) -> Result<String, InitError>;
}

/// Loader that builds the bundled comrak parser and syntect highlighter.
///
/// Syntax and theme definitions are deserialised on the blocking pool so
/// the runtime keeps serving other tasks while they load.
#[derive(Debug, Clone)]
pub struct BundledLoader {
    theme: String,
}

impl BundledLoader {
    /// Creates loader for [`DEFAULT_THEME`].
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Creates loader whose stylesheet targets `theme`.
    ///
    /// # Arguments
    ///
    /// * `theme`: Name of a bundled syntect theme
    pub fn with_theme(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
        }
    }

    /// Theme name the stylesheet is generated from.
    pub fn theme(&self) -> &str {
        &self.theme
    }
}

impl Default for BundledLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DependencyLoader for BundledLoader {
    async fn load_parser(&self) -> Result<Box<dyn MarkdownParser>, InitError> {
        Ok(Box::new(ComrakParser::new()))
    }

    async fn load_highlighter(&self) -> Result<Arc<dyn Highlighter>, InitError> {
        let highlighter = task::spawn_blocking(SyntectHighlighter::new)
            .await
            .map_err(|err| InitError::unavailable(Dependency::Highlighter, err.to_string()))?;
        Ok(Arc::new(highlighter))
    }

    async fn load_stylesheet(&self) -> Result<String, InitError> {
        let theme = self.theme.clone();
        task::spawn_blocking(move || stylesheet_for_theme(&theme))
            .await
            .map_err(|err| InitError::unavailable(Dependency::Stylesheet, err.to_string()))?
            .map_err(|err| InitError::unavailable(Dependency::Stylesheet, format!("{err:#}")))
    }
}

/// Shared loaders delegate to the loader they wrap, so a caller can keep a
/// handle to a loader it hands to the viewer.
#[async_trait]
impl<T: DependencyLoader + ?Sized> DependencyLoader for Arc<T> {
    async fn load_parser(&self) -> Result<Box<dyn MarkdownParser>, InitError> {
        (**self).load_parser().await
    }

    async fn load_highlighter(&self) -> Result<Arc<dyn Highlighter>, InitError> {
        (**self).load_highlighter().await
    }

    async fn load_stylesheet(&self) -> Result<String, InitError> {
        (**self).load_stylesheet().await
    }
}

/// Awaits one dependency load, giving up after `limit`.
pub(crate) async fn load_within<T>(
    dependency: Dependency,
    limit: Duration,
    load: impl Future<Output = Result<T, InitError>>,
) -> Result<T, InitError> {
    debug!(%dependency, timeout = ?limit, "loading dependency");
    match tokio::time::timeout(limit, load).await {
        Ok(result) => result,
        Err(_) => Err(InitError::timed_out(dependency, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bundled_loader_builds_working_parser() {
        // Arrange
        let loader = BundledLoader::new();

        // Act
        let parser = loader.load_parser().await.expect("Parser should load");

        // Assert
        let html = parser.parse("# Title").expect("Should parse");
        assert!(html.contains("<h1>"));
    }

    #[tokio::test]
    async fn test_bundled_loader_builds_highlighter() {
        // Arrange
        let loader = BundledLoader::new();

        // Act
        let highlighter = loader
            .load_highlighter()
            .await
            .expect("Highlighter should load");

        // Assert
        assert!(highlighter.supports_language("rust"));
    }

    #[tokio::test]
    async fn test_bundled_loader_unknown_theme_is_unavailable() {
        // Arrange
        let loader = BundledLoader::with_theme("No-Such-Theme");

        // Act
        let err = loader
            .load_stylesheet()
            .await
            .expect_err("Unknown theme should fail");

        // Assert
        assert_eq!(err.dependency(), Dependency::Stylesheet);
        assert!(err.to_string().contains("No-Such-Theme"), "{}", err);
    }

    #[tokio::test]
    async fn test_shared_loader_delegates() {
        // Arrange
        let shared = Arc::new(BundledLoader::with_theme("No-Such-Theme"));
        let loader: Arc<dyn DependencyLoader> = Arc::new(Arc::clone(&shared));

        // Act
        let parser = loader.load_parser().await;
        let stylesheet = loader.load_stylesheet().await;

        // Assert
        assert!(parser.is_ok());
        let err = stylesheet.expect_err("Wrapped loader keeps its theme");
        assert_eq!(err.dependency(), Dependency::Stylesheet);
    }

    #[tokio::test]
    async fn test_load_within_times_out() {
        // Arrange
        let never = std::future::pending::<Result<(), InitError>>();

        // Act
        let err = load_within(Dependency::Parser, Duration::from_millis(20), never)
            .await
            .expect_err("Pending load should time out");

        // Assert
        assert_eq!(err.dependency(), Dependency::Parser);
        assert!(err.to_string().contains("within 20ms"), "{}", err);
    }

    #[tokio::test]
    async fn test_load_within_unbounded_limit() {
        // Arrange
        let ready = async { Ok::<_, InitError>("loaded") };

        // Act
        let value = load_within(Dependency::Stylesheet, Duration::MAX, ready)
            .await
            .expect("Ready load should complete");

        // Assert
        assert_eq!(value, "loaded");
    }

    #[test]
    fn test_dependency_display() {
        assert_eq!(Dependency::Parser.to_string(), "markdown parser");
        assert_eq!(Dependency::Highlighter.to_string(), "syntax highlighter");
        assert_eq!(Dependency::Stylesheet.to_string(), "highlight stylesheet");
    }
}
