#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Token substitution for generated scripts and configuration
//!
//! Templates carry `[[key]]` style tokens that are replaced from a
//! key/value source before the text is fed to the execution engine or
//! written to a generated file. Keys match case-insensitively; unknown
//! tokens pass through untouched so a template with holes stays inspectable
//! instead of silently losing text.

use dashmap::DashMap;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Default token opening delimiter
pub const DEFAULT_TOKEN_PREFIX: &str = "[[";
/// Default token closing delimiter
pub const DEFAULT_TOKEN_SUFFIX: &str = "]]";

/// Compiled token patterns, cached per delimiter pair so repeated renders
/// with the same delimiters skip recompilation.
static TOKEN_PATTERNS: LazyLock<DashMap<(String, String), Regex>> = LazyLock::new(DashMap::new);

fn token_pattern(prefix: &str, suffix: &str) -> Regex {
    let key = (prefix.to_string(), suffix.to_string());
    if let Some(pattern) = TOKEN_PATTERNS.get(&key) {
        return pattern.value().clone();
    }
    // Delimiters are escaped so they match as literal multi-character
    // strings: a lone `[` never opens a token when the prefix is `[[`.
    let pattern = Regex::new(&format!(
        "{}(\\w+){}",
        regex::escape(prefix),
        regex::escape(suffix)
    ))
    .expect("escaped delimiters always form a valid pattern");
    TOKEN_PATTERNS.insert(key, pattern.clone());
    pattern
}

/// Capability to enumerate replacement values as key/value pairs.
///
/// Implement this on a config struct to expose its fields as tokens; fields
/// without a value should be reported as empty strings, never omitted with
/// an error. Pre-built string maps implement it verbatim.
pub trait TokenSource {
    /// Key/value pairs in this source. Keys are matched case-insensitively
    /// by the renderer; values are substituted literally.
    fn token_pairs(&self) -> Vec<(String, String)>;
}

impl TokenSource for HashMap<String, String> {
    fn token_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl TokenSource for BTreeMap<String, String> {
    fn token_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl TokenSource for Vec<(String, String)> {
    fn token_pairs(&self) -> Vec<(String, String)> {
        self.clone()
    }
}

/// Render `template` with the default `[[` / `]]` delimiters.
#[must_use]
pub fn render(source: &dyn TokenSource, template: &str) -> String {
    render_with(source, template, DEFAULT_TOKEN_PREFIX, DEFAULT_TOKEN_SUFFIX)
}

/// Render `template`, substituting `prefix<key>suffix` tokens from `source`.
///
/// Keys are matched case-insensitively; the substituted value is the
/// literal value from the source. Tokens with no matching key are left
/// untouched, delimiters included. An empty template returns empty without
/// consulting the source, and an empty source returns the template without
/// scanning it.
#[must_use]
pub fn render_with(
    source: &dyn TokenSource,
    template: &str,
    prefix: &str,
    suffix: &str,
) -> String {
    if template.is_empty() {
        return String::new();
    }

    let lookup: HashMap<String, String> = source
        .token_pairs()
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();
    if lookup.is_empty() {
        return template.to_string();
    }

    token_pattern(prefix, suffix)
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = caps[1].to_lowercase();
            match lookup.get(&key) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Lazy sequence of the raw token key names in a template.
///
/// Yields keys in their original case without performing substitution;
/// validators use this to report unknown tokens before rendering. Cloning
/// the iterator restarts the scan from the beginning.
#[derive(Debug, Clone)]
pub struct Tokens {
    pattern: Regex,
    template: String,
    position: usize,
}

impl Iterator for Tokens {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position > self.template.len() {
            return None;
        }
        let caps = self.pattern.captures_at(&self.template, self.position)?;
        let full = caps.get(0)?;
        self.position = full.end();
        Some(caps[1].to_string())
    }
}

/// Scan `template` for `prefix<key>suffix` tokens.
#[must_use]
pub fn extract_tokens(template: &str, prefix: &str, suffix: &str) -> Tokens {
    Tokens {
        pattern: token_pattern(prefix, suffix),
        template: template.to_string(),
        position: 0,
    }
}

/// Scan `template` for tokens with the default delimiters.
#[must_use]
pub fn extract_default_tokens(template: &str) -> Tokens {
    extract_tokens(template, DEFAULT_TOKEN_PREFIX, DEFAULT_TOKEN_SUFFIX)
}
