//! Locating shortcode invocations in content.
//!
//! Three spellings reach the same registry:
//!
//! ```text
//! {% image "a.jpg", "Alt", "50vw" %}    Nunjucks tag (comma separated)
//! {% image "a.jpg" "Alt" %}             Liquid tag (space separated)
//! {{ image("a.jpg", "Alt") }}           function call
//! ```
//!
//! Arguments are single- or double-quoted strings (backslash escapes the
//! next character) or bare words. An invocation never spans lines, and
//! nothing inside fenced code blocks is treated as an invocation. A plain
//! `{{ name }}` without parentheses is not a call and is left alone.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static INVOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{%-?[ \t]*(?P<tag>[A-Za-z_]\w*)(?P<targs>[^\n]*?)[ \t]*-?%\}|\{\{-?[ \t]*(?P<call>[A-Za-z_]\w*)[ \t]*\((?P<cargs>[^\n]*?)\)[ \t]*-?\}\}",
    )
    .expect("invalid shortcode regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Nunjucks,
    Liquid,
    Call,
}

/// One shortcode use found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
    pub syntax: Syntax,
    /// Byte range of the whole invocation in the source.
    pub span: Range<usize>,
    /// 1-based line of the invocation.
    pub line: usize,
}

/// Malformed arguments, with the offending line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// Find every invocation outside fenced code blocks, in source order.
pub fn find_invocations(text: &str) -> Result<Vec<Invocation>, SyntaxError> {
    let fenced = fenced_blocks(text);
    let mut found = Vec::new();

    for caps in INVOCATION.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if fenced.iter().any(|block| block.contains(&whole.start())) {
            continue;
        }
        let line = line_of(text, whole.start());

        let (name, raw_args, call) = match (caps.name("tag"), caps.name("call")) {
            (Some(tag), _) => (tag.as_str(), caps.name("targs"), false),
            (None, Some(call)) => (call.as_str(), caps.name("cargs"), true),
            (None, None) => continue,
        };
        let raw_args = raw_args.map_or("", |m| m.as_str());
        let args = parse_args(raw_args).map_err(|message| SyntaxError { line, message })?;
        let syntax = if call {
            Syntax::Call
        } else if has_unquoted_comma(raw_args) {
            Syntax::Nunjucks
        } else {
            Syntax::Liquid
        };

        found.push(Invocation {
            name: name.to_string(),
            args,
            syntax,
            span: whole.range(),
            line,
        });
    }
    Ok(found)
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Byte ranges covered by ``` or ~~~ fenced code blocks. An unclosed fence
/// runs to the end of the text.
fn fenced_blocks(text: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut open: Option<(char, usize, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start_matches(' ');
        let indent = line.len() - trimmed.len();
        let fence_char = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let fence_len = fence_char.map_or(0, |c| trimmed.chars().take_while(|&x| x == c).count());

        match (open, fence_char) {
            (None, Some(c)) if indent <= 3 && fence_len >= 3 => {
                open = Some((c, fence_len, offset));
            }
            (Some((c, len, start)), Some(fc))
                if fc == c
                    && indent <= 3
                    && fence_len >= len
                    && trimmed[fence_len..].trim().is_empty() =>
            {
                blocks.push(start..offset + line.len());
                open = None;
            }
            _ => {}
        }
        offset += line.len();
    }
    if let Some((_, _, start)) = open {
        blocks.push(start..text.len());
    }
    blocks
}

fn has_unquoted_comma(raw: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in raw.chars() {
        match (quote, c) {
            (Some(_), _) if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => return true,
            _ => {}
        }
    }
    false
}

/// Split an argument list into values. Commas and whitespace both separate.
fn parse_args(raw: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        let Some(&first) = chars.peek() else { break };

        let mut value = String::new();
        if first == '"' || first == '\'' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    c if c == first => {
                        closed = true;
                        break;
                    }
                    c => value.push(c),
                }
            }
            if !closed {
                return Err(format!("unterminated string in `{}`", raw.trim()));
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != ',') {
                if c == '"' || c == '\'' {
                    return Err(format!("stray quote in `{}`", raw.trim()));
                }
                value.push(c);
            }
        }
        args.push(value);
    }
    Ok(args)
}
