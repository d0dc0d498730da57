//! Structured-output extraction from free-text AI responses
//!
//! AI responses are not guaranteed to be well-formed JSON: models wrap
//! objects in prose or markdown code fences. All callers share this single
//! parsing boundary, which locates the first balanced `{...}` substring and
//! deserializes it.

use crate::error::{DevpulseError, Result};
use serde::de::DeserializeOwned;

/// Extract and deserialize the first balanced JSON object in `text`
pub fn extract_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = first_json_object(text).ok_or_else(|| {
        DevpulseError::Parse("no JSON object found in AI response".to_string())
    })?;

    serde_json::from_str(json)
        .map_err(|e| DevpulseError::Parse(format!("invalid JSON object in AI response: {}", e)))
}

/// Locate the first balanced `{...}` substring, respecting string literals
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    // Braces are ASCII, so the slice ends on a char boundary
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
