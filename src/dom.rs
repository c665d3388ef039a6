//! Render targets and markup walkers.
//!
//! A [`Container`] is the element the viewer renders into. The walkers in
//! this module apply the viewer's post processing to a container's markup:
//! code elements inside preformatted blocks, anchors and images.

use std::cell::RefCell;
use std::rc::Rc;

use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::error::RenderError;
use crate::escape::{escape_html, strip_tags, unescape_html};

/// Class added to every rendered image.
pub const RESPONSIVE_IMAGE_CLASS: &str = "img-responsive";

/// Inline declarations applied to every rendered image.
const RESPONSIVE_IMAGE_STYLE: [(&str, &str); 2] = [("max-width", "100%"), ("height", "auto")];

const LINK_TARGET: &str = "_blank";
const LINK_REL: &str = "noopener noreferrer";

/// Element the viewer renders into.
///
/// The caller owns the container; the viewer replaces its children and
/// then queries and mutates descendants through its markup.
pub trait Container {
    /// Current inner markup.
    fn inner_html(&self) -> &str;

    /// Replaces every child with `html`.
    fn replace_children(&mut self, html: String);

    /// Returns every descendant matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns error if the selector is invalid or the markup cannot be read
    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        select(self.inner_html(), selector)
    }

    /// Visible text of the container.
    fn text_content(&self) -> String {
        strip_tags(self.inner_html())
    }
}

/// In memory container holding rendered markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlContainer {
    html: String,
}

impl HtmlContainer {
    /// Creates empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates container with existing children.
    pub fn with_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Consumes the container, returning its markup.
    pub fn into_html(self) -> String {
        self.html
    }
}

impl Container for HtmlContainer {
    fn inner_html(&self) -> &str {
        &self.html
    }

    fn replace_children(&mut self, html: String) {
        self.html = html;
    }
}

/// Attributes of one element captured by [`Container::query_selector_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementSnapshot {
    /// Value of attribute `name` as written in the markup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// A `<code>` element inside a `<pre>` block.
///
/// Holds the element's attributes (decoded) and inner markup. Text inside
/// is always escaped; nested elements are highlight spans only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    attributes: Vec<(String, String)>,
    inner_html: String,
}

impl CodeBlock {
    /// Creates block from decoded attributes and escaped inner markup.
    ///
    /// # Arguments
    ///
    /// * `attributes`: Attribute name and decoded value pairs
    /// * `inner_html`: Escaped text, possibly wrapped in highlight spans
    pub fn new(attributes: Vec<(String, String)>, inner_html: String) -> Self {
        Self {
            attributes,
            inner_html,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets attribute `name`, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Appends `class` unless already present.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attribute("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute("class", &classes);
    }

    /// Language from the first `language-*` class.
    pub fn language(&self) -> Option<String> {
        self.attribute("class")?
            .split_whitespace()
            .find_map(|class| class.strip_prefix("language-"))
            .filter(|language| !language.is_empty())
            .map(String::from)
    }

    pub fn inner_html(&self) -> &str {
        &self.inner_html
    }

    pub fn set_inner_html(&mut self, html: String) {
        self.inner_html = html;
    }

    /// Decoded text with highlight markup removed.
    pub fn text_content(&self) -> String {
        strip_tags(&self.inner_html)
    }

    fn write_to(&self, out: &mut String) {
        out.push_str("<code");
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }
        out.push('>');
        out.push_str(&self.inner_html);
        out.push_str("</code>");
    }
}

const PRE_OPEN: &str = "<pre>";
const CODE_OPEN: &str = "<code";
const CODE_CLOSE: &str = "</code>";
const PRE_CLOSE: &str = "</pre>";

/// Visits every `pre > code` element of `html`.
///
/// The markup comes from the Markdown parser, whose code blocks are always
/// `<pre><code ...>text</code></pre>` with no nested `<code>`. Blocks that
/// do not follow that shape are copied unchanged.
///
/// # Arguments
///
/// * `html`: Rendered markup
/// * `visit`: Callback allowed to mutate each block
///
/// # Returns
///
/// Markup with visited blocks written back
pub fn for_each_code_block(html: &str, mut visit: impl FnMut(&mut CodeBlock)) -> String {
    let mut result = String::with_capacity(html.len());
    let mut last_end = 0;
    let mut search_pos = 0;

    while let Some(found) = html[search_pos..].find(PRE_OPEN) {
        let tag_start = search_pos + found + PRE_OPEN.len();
        search_pos = tag_start;

        if !html[tag_start..].starts_with(CODE_OPEN) {
            continue;
        }

        let Some(tag_len) = html[tag_start..].find('>') else {
            break;
        };
        let content_start = tag_start + tag_len + 1;

        let Some(content_len) = html[content_start..].find(CODE_CLOSE) else {
            break;
        };
        let content_end = content_start + content_len;
        if !html[content_end + CODE_CLOSE.len()..].starts_with(PRE_CLOSE) {
            continue;
        }

        let open_tag = &html[tag_start + CODE_OPEN.len()..content_start - 1];
        let mut block = CodeBlock::new(
            parse_attributes(open_tag),
            html[content_start..content_end].to_string(),
        );
        visit(&mut block);

        result.push_str(&html[last_end..tag_start]);
        block.write_to(&mut result);

        last_end = content_end + CODE_CLOSE.len();
        search_pos = last_end;
    }

    result.push_str(&html[last_end..]);
    result
}

/// Parses `name="value"` pairs from the inside of an opening tag.
fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = tag.trim_end_matches('/').trim();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            if let Some(quoted) = after_eq.strip_prefix('"') {
                let end = quoted.find('"').unwrap_or(quoted.len());
                rest = quoted.get(end + 1..).unwrap_or("").trim_start();
                unescape_html(&quoted[..end])
            } else {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                rest = after_eq[end..].trim_start();
                unescape_html(&after_eq[..end])
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attributes.push((name.to_ascii_lowercase(), value));
        }
    }

    attributes
}

/// Opens every anchor in a new browsing context and makes every image
/// responsive.
///
/// Anchors get `target="_blank"` and `rel="noopener noreferrer"` whatever
/// they carried before. Images get the responsive class and bounded width
/// declarations merged into their inline style.
///
/// # Errors
///
/// Returns error if the markup cannot be rewritten
pub fn rewrite_links_and_images(html: &str) -> Result<String, RenderError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("a", |el| {
                    el.set_attribute("target", LINK_TARGET)?;
                    el.set_attribute("rel", LINK_REL)?;
                    Ok(())
                }),
                element!("img", |el| {
                    let classes = merge_class(el.get_attribute("class"), RESPONSIVE_IMAGE_CLASS);
                    el.set_attribute("class", &classes)?;
                    let style = merge_style(el.get_attribute("style"), &RESPONSIVE_IMAGE_STYLE);
                    el.set_attribute("style", &style)?;
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })
}

fn merge_class(existing: Option<String>, class: &str) -> String {
    let existing = existing.unwrap_or_default();
    if existing.split_whitespace().any(|c| c == class) {
        return existing;
    }
    let trimmed = existing.trim();
    if trimmed.is_empty() {
        class.to_string()
    } else {
        format!("{trimmed} {class}")
    }
}

/// Sets each declaration in an inline style, keeping unrelated ones.
fn merge_style(existing: Option<String>, declarations: &[(&str, &str)]) -> String {
    let mut merged: Vec<(String, String)> = existing
        .unwrap_or_default()
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            (!property.is_empty()).then(|| (property, value.trim().to_string()))
        })
        .collect();

    for &(property, value) in declarations {
        match merged.iter_mut().find(|(existing, _)| existing == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => merged.push((property.to_string(), value.to_string())),
        }
    }

    merged
        .iter()
        .map(|(property, value)| format!("{property}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn select(html: &str, selector: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
    selector
        .parse::<lol_html::Selector>()
        .map_err(|err| RenderError::Document {
            message: format!("invalid selector {selector:?}: {err}"),
        })?;

    let found = Rc::new(RefCell::new(Vec::new()));
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(selector, {
                let found = Rc::clone(&found);
                move |el| {
                    found.borrow_mut().push(ElementSnapshot {
                        tag: el.tag_name(),
                        attributes: el
                            .attributes()
                            .iter()
                            .map(|attr| (attr.name(), attr.value()))
                            .collect(),
                    });
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    Ok(found.take())
}
