//! Markdown → HTML.
//!
//! pulldown-cmark does the parsing; this module rewrites the event stream for
//! the `[markdown]` switches before handing it to `push_html`:
//!
//! | Switch | Effect |
//! |---|---|
//! | `html = false` | raw HTML blocks and inline tags are escaped as text |
//! | `linkify` | bare `http(s)://` and `www.` URLs in text become links |
//! | `typographer` | smart quotes, dashes, ellipses |
//! | `math` | `$x$` / `$$x$$` become `<span class="math math-inline">` / `math-display` for KaTeX |
//!
//! Tables, footnotes, strikethrough and task lists are always on. Fenced code
//! blocks go through the [`Highlighter`] when highlighting is enabled.

use crate::config::{HighlightConfig, MarkdownConfig};
use crate::highlight::{HighlightError, Highlighter};
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, html::push_html,
};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>]+").expect("invalid bare URL regex")
});

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

/// Rendered HTML plus what the page layout needs to know about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    /// The document contains math that needs KaTeX on the page.
    pub has_math: bool,
}

pub struct MarkdownRenderer {
    config: MarkdownConfig,
    highlighter: Option<Highlighter>,
}

impl MarkdownRenderer {
    pub fn new(markdown: &MarkdownConfig, highlight: &HighlightConfig) -> Result<Self, MarkdownError> {
        let highlighter = if highlight.enabled {
            Some(Highlighter::new(&highlight.theme)?)
        } else {
            None
        };
        Ok(Self {
            config: markdown.clone(),
            highlighter,
        })
    }

    fn options(&self) -> Options {
        let mut options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        if self.config.typographer {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }
        if self.config.math {
            options |= Options::ENABLE_MATH;
        }
        options
    }

    pub fn render(&self, source: &str) -> Result<Rendered, MarkdownError> {
        let events = merge_text(Parser::new_ext(source, self.options()));

        let mut out: Vec<Event<'_>> = Vec::with_capacity(events.len());
        let mut has_math = false;
        // Nesting depth of links and images; text inside them is never linkified
        let mut link_depth = 0usize;
        let mut in_plain_code = false;
        let mut code: Option<(Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) if self.highlighter.is_some() => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().map(str::to_string)
                        }
                        CodeBlockKind::Indented => None,
                    };
                    code = Some((lang, String::new()));
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, body)) = code.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if code.is_some() => {
                    if let (Some((lang, body)), Some(highlighter)) =
                        (code.take(), self.highlighter.as_ref())
                    {
                        let html = highlighter.highlight(&body, lang.as_deref())?;
                        out.push(Event::Html(html.into()));
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    in_plain_code = true;
                    out.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_plain_code = false;
                    out.push(event);
                }
                Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                    link_depth += 1;
                    out.push(event);
                }
                Event::End(TagEnd::Link | TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1);
                    out.push(event);
                }
                Event::Text(text) if self.config.linkify && link_depth == 0 && !in_plain_code => {
                    linkify(text, &mut out);
                }
                Event::Html(raw) | Event::InlineHtml(raw) if !self.config.html => {
                    out.push(Event::Text(raw));
                }
                Event::InlineHtml(raw) => {
                    match raw_anchor(&raw) {
                        Some(true) => link_depth += 1,
                        Some(false) => link_depth = link_depth.saturating_sub(1),
                        None => {}
                    }
                    out.push(Event::InlineHtml(raw));
                }
                Event::InlineMath(_) | Event::DisplayMath(_) => {
                    has_math = true;
                    out.push(event);
                }
                other => out.push(other),
            }
        }

        let mut html = String::with_capacity(source.len() * 2);
        push_html(&mut html, out.into_iter());
        Ok(Rendered { html, has_math })
    }
}

/// Join adjacent text events. pulldown-cmark splits text at every
/// potential delimiter, which would cut URLs apart.
fn merge_text<'a>(parser: Parser<'a>) -> Vec<Event<'a>> {
    let mut events: Vec<Event<'a>> = Vec::new();
    for event in parser {
        if let Event::Text(text) = &event
            && let Some(Event::Text(prev)) = events.last_mut()
        {
            *prev = CowStr::from(format!("{prev}{text}"));
            continue;
        }
        events.push(event);
    }
    events
}

/// Split `text` around bare URLs, emitting autolinks for each URL.
fn linkify<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    let mut found = false;
    for m in BARE_URL.find_iter(&text) {
        let url = trim_url(m.as_str());
        if url.is_empty() {
            continue;
        }
        found = true;
        if m.start() > last {
            out.push(Event::Text(text[last..m.start()].to_string().into()));
        }
        let href = if url.to_ascii_lowercase().starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: href.into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(url.to_string().into()));
        out.push(Event::End(TagEnd::Link));
        last = m.start() + url.len();
    }
    if !found {
        out.push(Event::Text(text));
    } else if last < text.len() {
        out.push(Event::Text(text[last..].to_string().into()));
    }
}

/// Classify a raw inline tag: `Some(true)` opens an `<a>`, `Some(false)`
/// closes one.
fn raw_anchor(raw: &str) -> Option<bool> {
    let tag = raw.trim_start().to_ascii_lowercase();
    let ends_name = |rest: &str| rest.starts_with(|c: char| c == '>' || c.is_ascii_whitespace());
    if let Some(rest) = tag.strip_prefix("</a") {
        ends_name(rest).then_some(false)
    } else if let Some(rest) = tag.strip_prefix("<a") {
        ends_name(rest).then_some(true)
    } else {
        None
    }
}

/// Drop trailing sentence punctuation and an unbalanced closing paren.
fn trim_url(url: &str) -> &str {
    let mut url = url.trim_end_matches(['.', ',', ':', ';', '!', '?', '\'', '"']);
    while url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
        url = url[..url.len() - 1].trim_end_matches(['.', ',', ':', ';', '!', '?']);
    }
    url
}
