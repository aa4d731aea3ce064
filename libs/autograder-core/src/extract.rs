//! Bounded JSON extraction from free-text model output.
//!
//! Model responses may wrap JSON in prose or markdown fences, truncate it, or
//! omit it entirely. Extraction locates a balanced bracket span, parses it
//! strictly and returns `None` on anything else. Callers substitute their own
//! fallback value.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Candidate start positions tried before giving up
const MAX_CANDIDATES: usize = 16;

/// End index (exclusive) of the balanced span opening at `start`.
/// Brackets inside JSON string literals are ignored.
fn balanced_end(text: &str, start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(start + offset + ch.len_utf8());
            }
        }
    }
    None
}

/// First balanced `open`..`close` span that deserializes into `T`
fn extract_span<T: DeserializeOwned>(text: &str, open: char, close: char) -> Option<T> {
    text.match_indices(open)
        .take(MAX_CANDIDATES)
        .filter_map(|(start, _)| balanced_end(text, start, open, close).map(|end| &text[start..end]))
        .find_map(|span| serde_json::from_str::<T>(span).ok())
}

pub fn extract_object(text: &str) -> Option<Value> {
    extract_span(text, '{', '}')
}

pub fn extract_array(text: &str) -> Option<Value> {
    extract_span(text, '[', ']')
}

/// First JSON object in the text that deserializes into `T`
pub fn object_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract_span(text, '{', '}')
}

/// First JSON array in the text that deserializes into `T`
pub fn array_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract_span(text, '[', ']')
}
