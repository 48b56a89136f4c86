//! Comment composition: template choice, name substitution, emoji handling.
//!
//! Templates are minijinja strings with a `name` variable, e.g.
//! `"Nice shot, {{ name }}! :thumbsup:"`. One template is chosen uniformly at
//! random per comment. Before injection the text goes through a
//! demojize → emojize round trip so every pictograph reaches the input widget
//! in its canonical symbolic form; raw non-canonical sequences are rejected or
//! mis-rendered by some input widgets.

use anyhow::{Context, Result, anyhow};
use minijinja::{Environment, context};
use rand::seq::SliceRandom;

/// Picks and renders comment text for a target's display name.
#[derive(Debug, Clone)]
pub struct CommentComposer {
    templates: Vec<String>,
}

impl CommentComposer {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    /// Choose one template at random, substitute the display name, and
    /// normalize embedded emoji.
    pub fn compose(&self, display_name: &str) -> Result<String> {
        let template = self
            .templates
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| anyhow!("no comment templates configured"))?;
        let rendered = render_template(template, display_name)?;
        Ok(normalize_emoji(&rendered))
    }
}

fn render_template(template: &str, display_name: &str) -> Result<String> {
    let env = Environment::new();
    env.render_str(template, context! { name => display_name })
        .context("render comment template")
}

/// Canonical textual-then-symbolic round trip.
pub fn normalize_emoji(text: &str) -> String {
    emojize(&demojize(text))
}

/// Replace emoji glyphs with `:shortcode:` text.
///
/// Emoji sequences (flags, skin tones, ZWJ families) span several code
/// points, so each position probes the longest candidate slice first.
pub fn demojize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        let ends: Vec<usize> = rest
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take(8)
            .collect();
        let matched = ends
            .iter()
            .rev()
            .find_map(|&end| emojis::get(&rest[..end]).map(|emoji| (end, emoji)));
        match matched {
            Some((end, emoji)) => {
                match emoji.shortcode() {
                    Some(code) => {
                        out.push(':');
                        out.push_str(code);
                        out.push(':');
                    }
                    // No registered shortcode: keep the glyph as-is.
                    None => out.push_str(&rest[..end]),
                }
                rest = &rest[end..];
            }
            None => {
                let ch = rest.chars().next().expect("non-empty remainder");
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    out
}

/// Replace `:shortcode:` text with emoji glyphs. Unknown codes pass through.
pub fn emojize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(':') {
            Some(end) if end > 0 => {
                let code = &after[..end];
                if let Some(emoji) = emojis::get_by_shortcode(code) {
                    out.push_str(emoji.as_str());
                    rest = &after[end + 1..];
                } else {
                    // Not a shortcode; the closing colon may open the next one.
                    out.push(':');
                    rest = after;
                }
            }
            _ => {
                out.push(':');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
