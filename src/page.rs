//! Standalone page wrapper for rendered markup.

use maud::{DOCTYPE, Markup, PreEscaped, html};

/// Layout rules for the rendered body, kept next to the highlight theme.
const BASE_STYLE: &str = "\
body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, \"Segoe UI\", Helvetica, Arial, sans-serif; line-height: 1.6; }
.markdown-body { box-sizing: border-box; max-width: 980px; margin: 0 auto; padding: 32px; }
.markdown-body pre { overflow: auto; padding: 16px; border-radius: 6px; background: #f6f8fa; }
.markdown-body table { border-collapse: collapse; }
.markdown-body th, .markdown-body td { border: 1px solid #d0d7de; padding: 6px 13px; }
.img-responsive { display: block; max-width: 100%; height: auto; }
";

/// Wraps rendered markup in a complete HTML document.
///
/// # Arguments
///
/// * `title`: Page title text
/// * `stylesheet`: Highlight CSS to inline, if any
/// * `body`: Rendered markup, inserted without escaping
///
/// # Returns
///
/// Complete HTML document with the markup inside `.markdown-body`
pub fn document(title: &str, stylesheet: Option<&str>, body: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(BASE_STYLE)) }
                @if let Some(css) = stylesheet {
                    style { (PreEscaped(css)) }
                }
            }
            body {
                article class="markdown-body" {
                    (PreEscaped(body))
                }
            }
        }
    }
}
