//! Rendering boundary: markdown body → HTML fragment → full page.
//!
//! The pipeline only ever talks to the [`Renderer`] trait. The stock
//! implementation is [`MarkdownRenderer`]: pulldown-cmark for the body and a
//! [`Template`] for the page around it.
//!
//! ## Templates
//!
//! Templates use Go template syntax via [gtmpl](https://docs.rs/gtmpl). The
//! context is an object with three string fields:
//!
//! | Field | Page template | Callout template |
//! |------|---------------|------------------|
//! | `{{ .content }}` | rendered body (required) | rendered callout text (required) |
//! | `{{ .title }}` | document name | callout title |
//! | `{{ .site_title }}` | `[config] title` | |
//!
//! Fields other than `content` are HTML-escaped before they reach the
//! template. Fields a template has no use for are empty strings.
//!
//! When `site.toml` names no template, a built-in one generated with
//! [maud](https://maud.lambda.xyz/) is used.
//!
//! ## Callouts
//!
//! A fenced block whose info string starts with `callout` or `warning` is
//! not rendered as code. Its text is rendered as markdown and dropped into
//! the callout template; the rest of the info string, if any, is the title:
//!
//! ````text
//! ```warning Mind the gap
//! Trains **do not** wait.
//! ```
//! ````

use crate::config::SiteConfig;
use crate::naming;
use gtmpl::Value;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html as md_html};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONTENT_SLOT: &str = "content";
pub const TITLE_SLOT: &str = "title";
pub const SITE_TITLE_SLOT: &str = "site_title";

const SLOTS: &[&str] = &[CONTENT_SLOT, TITLE_SLOT, SITE_TITLE_SLOT];

/// Stand-in value used to detect whether a template prints a field.
const SLOT_MARKER: &str = "\u{1}inkpress-slot\u{1}";

const CALLOUT_KINDS: &[&str] = &["callout", "warning"];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing template {name}: {message}")]
    Parse { name: String, message: String },
    #[error("executing template {name}: {message}")]
    Execute { name: String, message: String },
    #[error("template {name} never prints {{{{ .{slot} }}}}")]
    MissingSlot { name: String, slot: &'static str },
}

/// Per-page values for [`Renderer::wrap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageInfo<'a> {
    pub title: &'a str,
    pub site_title: &'a str,
}

/// Turns a document body into a finished page.
pub trait Renderer {
    /// Render a markdown body into an HTML fragment.
    fn render(&self, body: &str) -> Result<String, RenderError>;

    /// Place a rendered fragment into the page template.
    fn wrap(&self, fragment: &str, page: &PageInfo<'_>) -> Result<String, RenderError>;
}

/// A parsed gtmpl template with a name for error messages.
pub struct Template {
    name: String,
    inner: gtmpl::Template,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template").field("name", &self.name).finish()
    }
}

impl Template {
    /// Parse a template without requiring any field.
    pub fn parse(name: &str, source: &str) -> Result<Self, RenderError> {
        let mut inner = gtmpl::Template::default();
        inner.parse(source).map_err(|e| RenderError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    /// Parse a template that must print `{{ .content }}`.
    pub fn new(name: &str, source: &str) -> Result<Self, RenderError> {
        let template = Self::parse(name, source)?;
        if !template.uses(CONTENT_SLOT)? {
            return Err(RenderError::MissingSlot {
                name: name.to_string(),
                slot: CONTENT_SLOT,
            });
        }
        Ok(template)
    }

    /// Read a template from disk.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let source = fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(&path.display().to_string(), &source)
    }

    /// The built-in page template.
    pub fn builtin_page() -> Self {
        Self::new("built-in page", &builtin_page_markup().into_string())
            .expect("built-in page template should parse")
    }

    /// The built-in callout template.
    pub fn builtin_callout() -> Self {
        Self::new("built-in callout", &builtin_callout_markup().into_string())
            .expect("built-in callout template should parse")
    }

    /// Whether executing the template prints the given field.
    pub fn uses(&self, slot: &str) -> Result<bool, RenderError> {
        let output = self.fill(&[(slot, SLOT_MARKER)])?;
        Ok(output.contains(SLOT_MARKER))
    }

    /// Execute with the given field values. Fields not given are empty.
    pub fn fill(&self, values: &[(&str, &str)]) -> Result<String, RenderError> {
        let mut fields: HashMap<String, Value> = SLOTS
            .iter()
            .map(|slot| (slot.to_string(), Value::String(String::new())))
            .collect();
        for (slot, value) in values {
            fields.insert(slot.to_string(), Value::String(value.to_string()));
        }

        let execute_error = |message: String| RenderError::Execute {
            name: self.name.clone(),
            message,
        };
        let context =
            gtmpl::Context::from(Value::Object(fields)).map_err(|e| execute_error(e.to_string()))?;
        let mut out: Vec<u8> = Vec::new();
        self.inner
            .execute(&mut out, &context)
            .map_err(|e| execute_error(e.to_string()))?;
        String::from_utf8(out).map_err(|e| execute_error(e.to_string()))
    }
}

/// HTML-escape a field value.
pub fn escape_html(text: &str) -> String {
    html! { (text) }.into_string()
}

fn builtin_page_markup() -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (PreEscaped("{{ .title }}")) }
                script src="etc/menu.js" defer {}
            }
            body {
                data-menu data="etc/menu_data.json" {}
                main id="content" {
                    (PreEscaped("{{ .content }}"))
                }
            }
        }
    }
}

fn builtin_callout_markup() -> Markup {
    html! {
        aside.callout {
            p.callout-title { (PreEscaped("{{ .title }}")) }
            div.callout-body { (PreEscaped("{{ .content }}")) }
        }
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH
}

/// A callout block being collected.
struct Callout {
    title: String,
    text: String,
}

impl Callout {
    fn from_info(info: &str) -> Option<Self> {
        let info = info.trim();
        let (kind, rest) = info.split_once(char::is_whitespace).unwrap_or((info, ""));
        let kind = kind.to_ascii_lowercase();
        if !CALLOUT_KINDS.contains(&kind.as_str()) {
            return None;
        }
        let title = match rest.trim() {
            "" => naming::display_title(&kind),
            explicit => explicit.to_string(),
        };
        Some(Self {
            title,
            text: String::new(),
        })
    }
}

/// pulldown-cmark renderer with callout support.
#[derive(Debug)]
pub struct MarkdownRenderer {
    page: Template,
    callout: Template,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(Template::builtin_page(), Template::builtin_callout())
    }
}

impl MarkdownRenderer {
    pub fn new(page: Template, callout: Template) -> Self {
        Self { page, callout }
    }

    /// Build from config, resolving template paths against the content root.
    pub fn from_config(content_root: &Path, config: &SiteConfig) -> Result<Self, RenderError> {
        let page = match &config.template {
            Some(path) => Template::load(&content_root.join(path))?,
            None => Template::builtin_page(),
        };
        let callout = match &config.callout_template {
            Some(path) => Template::load(&content_root.join(path))?,
            None => Template::builtin_callout(),
        };
        Ok(Self::new(page, callout))
    }

    fn render_callout(&self, callout: &Callout) -> Result<String, RenderError> {
        let mut body = String::new();
        md_html::push_html(
            &mut body,
            Parser::new_ext(&callout.text, markdown_options()),
        );
        self.callout.fill(&[
            (CONTENT_SLOT, &body),
            (TITLE_SLOT, &escape_html(&callout.title)),
        ])
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, body: &str) -> Result<String, RenderError> {
        let mut events: Vec<Event> = Vec::new();
        let mut open: Option<Callout> = None;

        for event in Parser::new_ext(body, markdown_options()) {
            let starts_callout = match &event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if open.is_none() => {
                    Callout::from_info(info)
                }
                _ => None,
            };

            if starts_callout.is_some() {
                open = starts_callout;
            } else if let Some(callout) = open.as_mut() {
                match event {
                    Event::Text(text) => callout.text.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let html = self.render_callout(callout)?;
                        events.push(Event::Html(html.into()));
                        open = None;
                    }
                    _ => {}
                }
            } else {
                events.push(event);
            }
        }

        let mut out = String::new();
        md_html::push_html(&mut out, events.into_iter());
        Ok(out)
    }

    fn wrap(&self, fragment: &str, page: &PageInfo<'_>) -> Result<String, RenderError> {
        self.page.fill(&[
            (CONTENT_SLOT, fragment),
            (TITLE_SLOT, &escape_html(page.title)),
            (SITE_TITLE_SLOT, &escape_html(page.site_title)),
        ])
    }
}
