//! Markdown view renderer.
//!
//! [`MarkdownViewer`] escapes Markdown source, parses it, highlights code
//! blocks and post processes links and images inside a caller owned
//! [`Container`]. Its parser and highlighter are injected or loaded once on
//! first use.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::dom::{Container, HtmlContainer, for_each_code_block, rewrite_links_and_images};
use crate::error::{InitError, RenderError};
use crate::escape::{escape_html, is_escaped, unescape_html};
use crate::highlight::Highlighter;
use crate::loader::{BundledLoader, DEFAULT_THEME, Dependency, DependencyLoader, load_within};
use crate::markdown::{HighlightHook, MarkdownParser, ParserOptions};

/// Default bound for each dependency load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Viewer settings.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Parser switches. The viewer always installs its own highlight hook,
    /// so any hook set here is replaced.
    pub parser_options: ParserOptions,
    /// Upper bound for each dependency load.
    pub load_timeout: Duration,
    /// Highlight theme requested from the default loader.
    pub theme: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            parser_options: ParserOptions::default(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

/// Capabilities handed in before initialization.
#[derive(Default)]
struct Injected {
    parser: Option<Box<dyn MarkdownParser>>,
    highlighter: Option<Arc<dyn Highlighter>>,
    stylesheet: Option<String>,
}

/// Capabilities of an initialized viewer.
struct Ready {
    parser: Box<dyn MarkdownParser>,
    highlighter: Arc<dyn Highlighter>,
    stylesheet: Option<String>,
}

/// Renders Markdown into containers.
///
/// Starts uninitialized. The first [`initialize`](Self::initialize) or
/// [`render`](Self::render) obtains whatever parser, highlighter and
/// stylesheet were not injected, configures the parser and moves the
/// viewer to initialized for the rest of its life. Concurrent callers share
/// one in flight initialization. A failed initialization leaves the viewer
/// uninitialized.
pub struct MarkdownViewer {
    config: ViewerConfig,
    loader: Arc<dyn DependencyLoader>,
    injected: Mutex<Injected>,
    ready: OnceCell<Ready>,
}

impl MarkdownViewer {
    /// Creates viewer that loads the bundled parser and highlighter.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates viewer with explicit settings and the bundled loader.
    ///
    /// # Arguments
    ///
    /// * `config`: Parser switches, load timeout and theme
    pub fn with_config(config: ViewerConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts a builder for injecting capabilities or a custom loader.
    pub fn builder() -> MarkdownViewerBuilder {
        MarkdownViewerBuilder::default()
    }

    /// Settings the viewer was built with.
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Returns true once parser and highlighter are ready.
    ///
    /// Stays false after a failed initialization.
    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Highlight stylesheet, available once initialized.
    ///
    /// `None` before initialization, or when a highlighter was injected
    /// without a stylesheet.
    pub fn stylesheet(&self) -> Option<&str> {
        self.ready.get().and_then(|ready| ready.stylesheet.as_deref())
    }

    /// Brings the parser and highlighter up. No op once initialized.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::DependencyUnavailable`] if a load fails or does
    /// not finish within the configured timeout
    pub async fn initialize(&self) -> Result<(), InitError> {
        self.ready().await.map(|_| ())
    }

    /// Renders `markdown` into `container`, replacing its children.
    ///
    /// The source is HTML escaped before parsing, so literal markup in the
    /// Markdown shows up as text. After parsing, every `pre > code` element
    /// is highlighted in place, every anchor opens in a new browsing
    /// context without leaking the referrer, and every image becomes
    /// responsive.
    ///
    /// # Arguments
    ///
    /// * `markdown`: Markdown source, may be empty
    /// * `container`: Render target
    ///
    /// # Errors
    ///
    /// Returns error if initialization fails, the parser fails, or the
    /// rendered markup cannot be rewritten. Highlighting failures are
    /// logged and leave the block as plain text.
    pub async fn render<C>(&self, markdown: &str, container: &mut C) -> Result<(), RenderError>
    where
        C: Container + ?Sized,
    {
        let ready = self.ready().await?;

        let escaped = escape_html(markdown);
        let html = ready.parser.parse(&escaped)?;
        container.replace_children(restore_autolinks(&restore_inline_code(&html)));

        let highlighted = for_each_code_block(container.inner_html(), |block| {
            if let Err(err) = ready.highlighter.highlight_element(block) {
                let language = block.language().unwrap_or_default();
                warn!(language = %language, error = %err, "element highlighting failed");
            }
        });
        container.replace_children(highlighted);

        let rewritten = rewrite_links_and_images(container.inner_html())?;
        container.replace_children(rewritten);

        debug!(
            source_bytes = markdown.len(),
            html_bytes = container.inner_html().len(),
            "rendered markdown"
        );
        Ok(())
    }

    /// Renders into a fresh [`HtmlContainer`] and returns its markup.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render)
    pub async fn render_to_string(&self, markdown: &str) -> Result<String, RenderError> {
        let mut container = HtmlContainer::new();
        self.render(markdown, &mut container).await?;
        Ok(container.into_html())
    }

    async fn ready(&self) -> Result<&Ready, InitError> {
        self.ready.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<Ready, InitError> {
        let limit = self.config.load_timeout;
        let (has_parser, has_highlighter) = {
            let injected = self.injected();
            (injected.parser.is_some(), injected.highlighter.is_some())
        };

        let loaded_parser = if has_parser {
            None
        } else {
            Some(load_within(Dependency::Parser, limit, self.loader.load_parser()).await?)
        };

        let loaded_highlighter = if has_highlighter {
            None
        } else {
            let highlighter =
                load_within(Dependency::Highlighter, limit, self.loader.load_highlighter())
                    .await?;
            let stylesheet =
                load_within(Dependency::Stylesheet, limit, self.loader.load_stylesheet()).await?;
            Some((highlighter, stylesheet))
        };

        // Injected parts are taken only after every load succeeded.
        let mut injected = self.injected();
        let mut parser = match loaded_parser {
            Some(parser) => parser,
            None => injected.parser.take().ok_or_else(|| {
                InitError::unavailable(Dependency::Parser, "injected parser already consumed")
            })?,
        };
        let (highlighter, stylesheet) = match loaded_highlighter {
            Some((highlighter, stylesheet)) => (highlighter, Some(stylesheet)),
            None => {
                let highlighter = injected.highlighter.clone().ok_or_else(|| {
                    InitError::unavailable(Dependency::Highlighter, "injected highlighter missing")
                })?;
                (highlighter, injected.stylesheet.take())
            }
        };
        drop(injected);

        parser.configure(ParserOptions {
            highlight: Some(highlight_hook(Arc::clone(&highlighter))),
            ..self.config.parser_options.clone()
        });

        info!(
            loaded_parser = !has_parser,
            loaded_highlighter = !has_highlighter,
            "markdown viewer initialized"
        );

        Ok(Ready {
            parser,
            highlighter,
            stylesheet,
        })
    }

    fn injected(&self) -> MutexGuard<'_, Injected> {
        self.injected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MarkdownViewer {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`MarkdownViewer`].
#[derive(Default)]
pub struct MarkdownViewerBuilder {
    config: ViewerConfig,
    loader: Option<Arc<dyn DependencyLoader>>,
    injected: Injected,
}

impl MarkdownViewerBuilder {
    /// Replaces all settings at once.
    pub fn config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }

    /// Parser switches applied when the parser is configured.
    ///
    /// # Arguments
    ///
    /// * `options`: Switches; any highlight hook is replaced by the viewer's
    pub fn parser_options(mut self, options: ParserOptions) -> Self {
        self.config.parser_options = options;
        self
    }

    /// Upper bound for each dependency load.
    pub fn load_timeout(mut self, limit: Duration) -> Self {
        self.config.load_timeout = limit;
        self
    }

    /// Theme for the default loader. Ignored when a loader is supplied.
    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.config.theme = theme.into();
        self
    }

    /// Uses `parser` instead of loading one.
    pub fn parser(mut self, parser: impl MarkdownParser + 'static) -> Self {
        self.injected.parser = Some(Box::new(parser));
        self
    }

    /// Uses `highlighter` instead of loading one. No stylesheet is loaded
    /// either; supply one with [`stylesheet`](Self::stylesheet).
    pub fn highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.injected.highlighter = Some(highlighter);
        self
    }

    /// Stylesheet reported by [`MarkdownViewer::stylesheet`] when the
    /// highlighter is injected.
    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.injected.stylesheet = Some(css.into());
        self
    }

    /// Source for every capability not injected.
    ///
    /// # Arguments
    ///
    /// * `loader`: Loader replacing the bundled one
    pub fn loader(mut self, loader: impl DependencyLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Builds an uninitialized viewer.
    ///
    /// # Returns
    ///
    /// Viewer using the supplied loader, or a [`BundledLoader`] for the
    /// configured theme
    pub fn build(self) -> MarkdownViewer {
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(BundledLoader::with_theme(self.config.theme.clone())));

        MarkdownViewer {
            config: self.config,
            loader,
            injected: Mutex::new(self.injected),
            ready: OnceCell::new(),
        }
    }
}

/// Builds the parser hook backed by `highlighter`.
fn highlight_hook(highlighter: Arc<dyn Highlighter>) -> HighlightHook {
    Arc::new(move |code: &str, language: Option<&str>| {
        Some(highlight_block(highlighter.as_ref(), code, language))
    })
}

/// Highlights one parsed code block.
///
/// The parser saw escaped source, so its code text still carries that
/// escaping; it is undone before highlighting. The language tag arrives
/// with its entities already resolved and is used as given. Unknown
/// languages and highlighter failures fall back to escaped plain text.
fn highlight_block(highlighter: &dyn Highlighter, code: &str, language: Option<&str>) -> String {
    let source = unescape_html(code);

    match language {
        Some(language) if highlighter.supports_language(language) => {
            match highlighter.highlight(&source, language) {
                Ok(markup) => markup,
                Err(err) => {
                    warn!(language, error = %err, "code block highlighting failed");
                    escape_html(&source)
                }
            }
        }
        _ => escape_html(&source),
    }
}

const INLINE_CODE_OPEN: &str = "<code>";
const CODE_CLOSE: &str = "</code>";

/// Removes the source escaping from inline code spans.
///
/// Code spans keep their text verbatim, so an escaped `<` arrives as
/// `&amp;lt;`. Decoding one layer shows what the author typed while the
/// text stays escaped markup. Block code (`<pre><code`) is left to the
/// highlighter.
fn restore_inline_code(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut last_end = 0;
    let mut search_pos = 0;

    while let Some(found) = html[search_pos..].find(INLINE_CODE_OPEN) {
        let tag_start = search_pos + found;
        let content_start = tag_start + INLINE_CODE_OPEN.len();
        search_pos = content_start;

        if html[..tag_start].ends_with("<pre>") {
            continue;
        }

        let Some(content_len) = html[content_start..].find(CODE_CLOSE) else {
            break;
        };
        let content_end = content_start + content_len;

        result.push_str(&html[last_end..content_start]);
        result.push_str(&unescape_html(&html[content_start..content_end]));

        last_end = content_end;
        search_pos = content_end + CODE_CLOSE.len();
    }

    result.push_str(&html[last_end..]);
    result
}

const ANCHOR_OPEN: &str = "<a href=\"";
const ANCHOR_CLOSE: &str = "</a>";

/// Schemes the GFM autolinker puts in front of a bare `www.` or email text.
const AUTOLINK_SCHEMES: [&str; 3] = ["", "http://", "mailto:"];

/// Removes the source escaping from autolinked URLs.
///
/// Bare URLs are linked from the escaped source text, so `?a=1&b=2`
/// arrives as `?a=1&amp;amp;b=2` in both the href and the anchor text.
/// Anchors whose text is their href (less an added scheme) are decoded
/// one layer when the decoded form is still well formed escaped markup.
/// Written links already had their entities resolved by the parser and
/// decode to raw text, so they are left untouched.
fn restore_autolinks(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut last_end = 0;
    let mut search_pos = 0;

    while let Some(found) = html[search_pos..].find(ANCHOR_OPEN) {
        let href_start = search_pos + found + ANCHOR_OPEN.len();
        search_pos = href_start;

        let Some(href_len) = html[href_start..].find("\">") else {
            break;
        };
        let href_end = href_start + href_len;
        let text_start = href_end + 2;
        let Some(text_len) = html[text_start..].find(ANCHOR_CLOSE) else {
            break;
        };
        let text_end = text_start + text_len;

        let href = &html[href_start..href_end];
        let text = &html[text_start..text_end];
        let is_autolink = !text.is_empty()
            && !text.contains('<')
            && AUTOLINK_SCHEMES
                .iter()
                .any(|scheme| href.strip_prefix(scheme) == Some(text));
        if !is_autolink {
            continue;
        }

        let decoded_href = unescape_html(href);
        let decoded_text = unescape_html(text);
        if !is_escaped(&decoded_href) || !is_escaped(&decoded_text) {
            continue;
        }

        result.push_str(&html[last_end..href_start]);
        result.push_str(&decoded_href);
        result.push_str("\">");
        result.push_str(&decoded_text);
        last_end = text_end;
        search_pos = text_end + ANCHOR_CLOSE.len();
    }

    result.push_str(&html[last_end..]);
    result
}
