//! Template engine for `{{ PLACEHOLDER }}` strings.
//!
//! A template is parsed once into literal and placeholder parts. The same parts
//! drive both directions:
//! - `render` substitutes values in a single pass, so inserted text is never
//!   scanned for placeholders again;
//! - `matcher` builds a regex that extracts placeholder values from a rendered line.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([^{}\s](?:[^{}]*?[^{}\s])?)\s*\}\}").expect("placeholder pattern is valid")
});

/// Double quotes an LLM may swap for one another (straight and CJK curly forms).
const QUOTE_CLASS: &str = "[\"“”]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder { name: String, raw: String },
}

/// How much of a line a matcher must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `^...$`: the template must account for the whole line.
    Line,
    /// `^...`: trailing content after the template is tolerated.
    Start,
}

#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    pub fn compile(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                parts.push(Part::Literal(source[last..whole.start()].to_string()));
            }
            parts.push(Part::Placeholder {
                name: caps[1].to_string(),
                raw: whole.as_str().to_string(),
            });
            last = whole.end();
        }
        if last < source.len() {
            parts.push(Part::Literal(source[last..].to_string()));
        }

        Self {
            source: source.to_string(),
            parts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::Placeholder { name: n, .. } if n == name))
    }

    /// Replaces each placeholder for which `lookup` returns a value.
    /// Placeholders without a value are kept verbatim.
    pub fn render<F, V>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<V>,
        V: AsRef<str>,
    {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder { name, raw } => match lookup(name) {
                    Some(value) => out.push_str(value.as_ref()),
                    None => out.push_str(raw),
                },
            }
        }
        out
    }

    /// Convenience over `render` for a fixed list of `(name, value)` pairs.
    pub fn render_with(&self, values: &[(&str, &str)]) -> String {
        self.render(|name| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        })
    }

    /// Builds an extraction regex. Returns `None` for an empty template.
    ///
    /// Leading/trailing whitespace of the template is ignored since parsed
    /// lines are trimmed. The first occurrence of each placeholder becomes a
    /// lazy capture group; repeats match without capturing. Under
    /// `Anchor::Start` the last placeholder captures greedily, so a value
    /// containing the literal that follows it is kept whole.
    pub fn matcher(&self, anchor: Anchor) -> Option<Matcher> {
        if self.is_empty() {
            return None;
        }

        let mut pattern = String::from("^");
        let mut groups: Vec<String> = Vec::new();
        let last = self.parts.len().saturating_sub(1);
        let last_placeholder = self
            .parts
            .iter()
            .rposition(|p| matches!(p, Part::Placeholder { .. }));

        for (i, part) in self.parts.iter().enumerate() {
            match part {
                Part::Literal(text) => {
                    let mut text = text.as_str();
                    if i == 0 {
                        text = text.trim_start();
                    }
                    if i == last {
                        text = text.trim_end();
                    }
                    push_literal(&mut pattern, text);
                }
                Part::Placeholder { name, .. } => {
                    let body = if Some(i) == last_placeholder && anchor == Anchor::Start {
                        ".+"
                    } else {
                        ".+?"
                    };
                    if groups.iter().any(|g| g == name) {
                        pattern.push_str("(?:");
                    } else {
                        groups.push(name.clone());
                        pattern.push('(');
                    }
                    pattern.push_str(body);
                    pattern.push(')');
                }
            }
        }

        if anchor == Anchor::Line {
            pattern.push('$');
        }

        match Regex::new(&pattern) {
            Ok(regex) => Some(Matcher { regex, groups }),
            Err(e) => {
                warn!("Template {:?} produced an invalid pattern: {e}", self.source);
                None
            }
        }
    }
}

fn push_literal(pattern: &mut String, text: &str) {
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        match ch {
            '"' | '“' | '”' => pattern.push_str(QUOTE_CLASS),
            _ => pattern.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
        }
    }
}

/// Compiled inverse of a template.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    groups: Vec<String>,
}

impl Matcher {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Matches `line` and returns every placeholder's captured value, trimmed.
    pub fn captures<'t>(&self, line: &'t str) -> Option<Vec<(&str, &'t str)>> {
        let caps = self.regex.captures(line)?;
        Some(
            self.groups
                .iter()
                .enumerate()
                .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.as_str(), m.as_str().trim())))
                .collect(),
        )
    }

    /// The trimmed value captured for `name`, or `None` if the line does not
    /// match or the capture is blank.
    pub fn extract<'t>(&self, line: &'t str, name: &str) -> Option<&'t str> {
        self.captures(line)?
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }
}

/// True when `value` is nothing but an unrendered placeholder token.
pub fn is_placeholder_token(value: &str) -> bool {
    PLACEHOLDER
        .find(value)
        .is_some_and(|m| m.start() == 0 && m.end() == value.len())
}
