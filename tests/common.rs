//! Shared test utilities for integration tests.
//!
//! Provides dependency loaders with controlled failure modes and helpers
//! for inspecting rendered markup.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use mdview::dom::for_each_code_block;
use mdview::{Dependency, DependencyLoader, Highlighter, InitError, MarkdownParser};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loader whose loads never complete.
pub struct PendingLoader;

#[async_trait]
impl DependencyLoader for PendingLoader {
    async fn load_parser(&self) -> Result<Box<dyn MarkdownParser>, InitError> {
        std::future::pending().await
    }

    async fn load_highlighter(&self) -> Result<Arc<dyn Highlighter>, InitError> {
        std::future::pending().await
    }

    async fn load_stylesheet(&self) -> Result<String, InitError> {
        std::future::pending().await
    }
}

/// Loader that fails every load and counts attempts.
#[derive(Default)]
pub struct FailingLoader {
    pub attempts: AtomicUsize,
}

impl FailingLoader {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependencyLoader for FailingLoader {
    async fn load_parser(&self) -> Result<Box<dyn MarkdownParser>, InitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(InitError::DependencyUnavailable {
            dependency: Dependency::Parser,
            reason: "blocked by test".to_string(),
        })
    }

    async fn load_highlighter(&self) -> Result<Arc<dyn Highlighter>, InitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(InitError::DependencyUnavailable {
            dependency: Dependency::Highlighter,
            reason: "blocked by test".to_string(),
        })
    }

    async fn load_stylesheet(&self) -> Result<String, InitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(InitError::DependencyUnavailable {
            dependency: Dependency::Stylesheet,
            reason: "blocked by test".to_string(),
        })
    }
}

/// Returns the text content of every `pre > code` block in `html`.
pub fn code_block_texts(html: &str) -> Vec<String> {
    let mut texts = Vec::new();
    for_each_code_block(html, |block| texts.push(block.text_content()));
    texts
}

/// Writes file below `dir`, creating parent directories as needed.
///
/// # Errors
///
/// Returns error if directory creation or file write fails
pub fn write_file(dir: &Path, path: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(path);
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}
