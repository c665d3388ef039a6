//! Command line configuration.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::loader::DEFAULT_THEME;
use crate::viewer::ViewerConfig;

/// How literal HTML inside the Markdown source is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HtmlPolicy {
    /// Escape the source before parsing; literal HTML shows as text
    Escape,
    /// Render raw HTML, then strip everything outside an allow-list
    Sanitize,
}

/// Command line configuration for mdview.
#[derive(Debug, Clone, Parser)]
#[command(name = "mdview", version, about, long_about = None)]
pub struct Config {
    /// Markdown file to render (stdin when omitted or "-")
    pub input: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Page title (defaults to the input file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Syntax highlighting theme (InspiredGitHub, base16-ocean.light, etc.)
    #[arg(long, default_value = DEFAULT_THEME)]
    pub theme: String,

    /// Treatment of literal HTML in the source
    #[arg(long, value_enum, default_value_t = HtmlPolicy::Escape)]
    pub policy: HtmlPolicy,

    /// Emit only the rendered markup instead of a full page
    #[arg(long)]
    pub fragment: bool,

    /// Seconds to wait for each renderer dependency to load
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Open the output file in the default browser
    #[arg(long)]
    pub open: bool,
}

impl Config {
    /// Parses configuration from command line arguments.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Returns the input path, or None when reading stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|path| path.as_os_str() != "-")
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the input file does not exist, the timeout is zero,
    /// or `--open` is requested without an output file.
    pub fn validate(&self) -> Result<()> {
        if let Some(input) = self.input_path()
            && !input.is_file()
        {
            bail!("Input file does not exist: {}", input.display());
        }

        if self.timeout_secs == 0 {
            bail!("Timeout must be at least one second");
        }

        if self.open && self.output.is_none() {
            bail!("--open requires --output");
        }

        Ok(())
    }

    /// Returns page title from configuration or input file name.
    ///
    /// # Errors
    ///
    /// Returns error if the input path has no name component or contains invalid UTF8.
    pub fn document_title(&self) -> Result<String> {
        if let Some(title) = &self.title {
            return Ok(title.clone());
        }

        let Some(input) = self.input_path() else {
            return Ok("Markdown".to_string());
        };

        input
            .file_stem()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Cannot extract title from path: {}", input.display()))
            .map(String::from)
    }

    /// Viewer settings derived from the command line.
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            load_timeout: Duration::from_secs(self.timeout_secs),
            theme: self.theme.clone(),
            ..ViewerConfig::default()
        }
    }
}
