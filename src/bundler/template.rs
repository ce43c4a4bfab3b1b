//! Output naming templates
//!
//! Resolves templates such as `[name].[chunkhash:8].js` against a chunk and the
//! build hash.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::chunk::Chunk;

/// Matches `[token]` and `[token:len]` placeholders
static TEMPLATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(name|id|hash|chunkhash|contenthash)(?::(\d+))?\]").unwrap()
});

/// Values a template is resolved against
#[derive(Debug, Clone, Copy)]
pub struct PathData<'a> {
    /// Build hash of the whole compilation
    pub hash: &'a str,

    /// Chunk the path is computed for
    pub chunk: Option<&'a Chunk>,
}

/// Whether a naming template contains any substitution
pub fn is_templated(template: &str) -> bool {
    TEMPLATE_REGEX.is_match(template)
}

/// Resolve a naming template to a concrete path.
///
/// Unknown tokens and chunk tokens without a chunk are left untouched.
pub fn asset_path(template: &str, data: &PathData<'_>) -> String {
    TEMPLATE_REGEX
        .replace_all(template, |caps: &Captures<'_>| {
            let value = match (&caps[1], data.chunk) {
                ("hash", _) => data.hash,
                ("name", Some(chunk)) => chunk.display_name(),
                ("id", Some(chunk)) => chunk.id.as_str(),
                ("chunkhash" | "contenthash", Some(chunk)) => chunk.hash.as_str(),
                _ => return caps[0].to_string(),
            };

            match caps.get(2).and_then(|len| len.as_str().parse::<usize>().ok()) {
                Some(len) => value.chars().take(len).collect(),
                None => value.to_string(),
            }
        })
        .into_owned()
}
