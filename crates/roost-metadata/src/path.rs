//! Request path cleaning and tokenization
//!
//! Pure functions over the URL path string. Cleaning is lexical: `.`,
//! `..`, and redundant separators are resolved before anything looks at
//! the filesystem, so a traversal sequence never survives to the resolver.

use crate::error::{MetadataError, Result};

/// Characters allowed in a path segment. Everything else rejects the
/// whole request.
fn is_valid_segment(segment: &str) -> bool {
    segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | ':'))
}

/// Lexically clean a URL path.
///
/// The path is treated as absolute (a missing leading `/` is supplied),
/// empty and `.` segments are dropped, and `..` pops the previous segment.
/// A `..` at the root is discarded, so the result can never climb above
/// `/`.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Clean a URL path and split it into validated segments.
///
/// Returns [`MetadataError::InvalidPath`] if any segment contains a
/// character outside `a-z0-9-_:`. Callers translate that into the same
/// not-found response as a missing resource, so a malformed path is
/// indistinguishable from an absent one.
pub fn tokenize(path: &str) -> Result<Vec<String>> {
    let cleaned = clean(path);
    let mut tokens = Vec::new();
    for segment in cleaned.split('/').filter(|s| !s.is_empty()) {
        if !is_valid_segment(segment) {
            return Err(MetadataError::InvalidPath(path.to_string()));
        }
        tokens.push(segment.to_string());
    }
    Ok(tokens)
}
