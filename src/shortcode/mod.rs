//! Shortcodes: named helpers callable from content.
//!
//! Shortcodes run on the markdown source before it is rendered. Their output
//! is HTML that must reach the page untouched, so [`Shortcodes::expand`]
//! swaps each invocation for an opaque placeholder and
//! [`Expanded::restore`] puts the markup back after rendering.
//!
//! Built-ins:
//!
//! | Name | Arguments | Output |
//! |---|---|---|
//! | `image` | `src, alt[, sizes]` | responsive `<picture>` (see [`image`]) |
//! | `year` | none | the build year |

pub mod image;
pub mod syntax;

use self::image::{ImageError, ImageShortcode};
use crate::imaging::ImageBackend;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

pub use self::syntax::{Invocation, Syntax};

#[derive(Error, Debug)]
pub enum ShortcodeError {
    #[error("line {line}: unknown shortcode '{name}'")]
    Unknown { name: String, line: usize },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("shortcode '{name}': {message}")]
    Arguments { name: String, message: String },
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// A registered shortcode function. Receives the positional arguments.
pub type ShortcodeFn = Box<dyn Fn(&[String]) -> Result<String, ShortcodeError> + Send + Sync>;

/// Registry of named shortcode functions.
#[derive(Default)]
pub struct Shortcodes(HashMap<String, ShortcodeFn>);

impl Shortcodes {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Registry with `image` bound to `images` and `year` fixed to `year`.
    pub fn with_builtins<B>(images: Arc<ImageShortcode<B>>, year: i32) -> Self
    where
        B: ImageBackend + Send + 'static,
    {
        let mut shortcodes = Self::new();
        shortcodes.register("image", move |args| images.call(args));
        shortcodes.register_year(year);
        shortcodes
    }

    /// Same names as [`with_builtins`](Self::with_builtins), but `image` only
    /// checks its arguments and source and produces no output. Each checked
    /// image bumps `checked`.
    pub fn for_validation<B>(images: Arc<ImageShortcode<B>>, checked: Arc<AtomicUsize>) -> Self
    where
        B: ImageBackend + Send + 'static,
    {
        let mut shortcodes = Self::new();
        shortcodes.register("image", move |args| {
            images.validate(args)?;
            checked.fetch_add(1, Ordering::Relaxed);
            Ok(String::new())
        });
        shortcodes.register_year(0);
        shortcodes
    }

    fn register_year(&mut self, year: i32) {
        self.register("year", move |args| {
            expect_no_args("year", args)?;
            Ok(year.to_string())
        });
    }

    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[String]) -> Result<String, ShortcodeError> + Send + Sync + 'static,
    {
        self.0.insert(name.to_string(), Box::new(func));
    }

    pub fn get(&self, name: &str) -> Option<&ShortcodeFn> {
        self.0.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run every invocation in `content`, leaving placeholders in its place.
    pub fn expand(&self, content: &str) -> Result<Expanded, ShortcodeError> {
        let invocations = syntax::find_invocations(content).map_err(|e| {
            ShortcodeError::Syntax {
                line: e.line,
                message: e.message,
            }
        })?;

        let mut text = String::with_capacity(content.len());
        let mut fragments = Vec::with_capacity(invocations.len());
        let mut last = 0;
        for inv in invocations {
            let func = self.get(&inv.name).ok_or_else(|| ShortcodeError::Unknown {
                name: inv.name.clone(),
                line: inv.line,
            })?;
            text.push_str(&content[last..inv.span.start]);
            text.push_str(&placeholder(fragments.len()));
            fragments.push(func(&inv.args)?);
            last = inv.span.end;
        }
        text.push_str(&content[last..]);
        Ok(Expanded { text, fragments })
    }
}

/// Content with shortcodes replaced by placeholders, plus their output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expanded {
    /// Source text ready for the markdown renderer.
    pub text: String,
    fragments: Vec<String>,
}

impl Expanded {
    /// Replace the placeholders in rendered HTML with the shortcode output.
    pub fn restore(&self, html: &str) -> String {
        let mut html = html.to_string();
        for (i, fragment) in self.fragments.iter().enumerate() {
            html = html.replace(&placeholder(i), fragment);
        }
        html
    }
}

// Plain ASCII letters and digits: left alone by markdown, HTML escaping and
// URL percent-encoding, so it survives inside link and image destinations.
fn placeholder(index: usize) -> String {
    format!("xQUIREx{index}x")
}

pub(crate) fn expect_no_args(name: &str, args: &[String]) -> Result<(), ShortcodeError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ShortcodeError::Arguments {
            name: name.to_string(),
            message: format!("takes no arguments, got {}", args.len()),
        })
    }
}
