use anyhow::{Context, Result};
use mdview::{Config, HtmlPolicy, MarkdownViewer, SanitizingRenderer, page};
use std::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "mdview=info";

/// Installs a stderr subscriber so stdout stays reserved for markup.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn read_source(config: &Config) -> Result<String> {
    match config.input_path() {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read markdown file: {}", path.display())),
        None => {
            let mut source = String::new();
            tokio::io::stdin()
                .read_to_string(&mut source)
                .await
                .context("Failed to read markdown from stdin")?;
            Ok(source)
        }
    }
}

/// Renders the source with the configured policy.
///
/// # Returns
///
/// Rendered markup and the highlight stylesheet, if one was loaded
async fn render(config: &Config, source: &str) -> Result<(String, Option<String>)> {
    match config.policy {
        HtmlPolicy::Escape => {
            let viewer = MarkdownViewer::with_config(config.viewer_config());
            let html = viewer
                .render_to_string(source)
                .await
                .context("Failed to render markdown")?;
            Ok((html, viewer.stylesheet().map(String::from)))
        }
        HtmlPolicy::Sanitize => Ok((SanitizingRenderer::new().render(source), None)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    let source = read_source(&config).await?;
    let (body, stylesheet) = render(&config, &source).await?;

    let output = if config.fragment {
        body
    } else {
        let title = config.document_title()?;
        page::document(&title, stylesheet.as_deref(), &body).into_string()
    };

    match &config.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            fs::write(path, &output)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!(path = %path.display(), bytes = output.len(), "wrote output");

            if config.open {
                open::that(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
            }
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(output.as_bytes())
                .await
                .context("Failed to write to stdout")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
