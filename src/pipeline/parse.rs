//! Reply parsing: comma-separated model output → exactly nine fields.
//!
//! The prompt asks for nine bare values. Whatever comes back is split on
//! commas and forced to length nine: missing trailing values become blank,
//! extra values are dropped. A value that itself contains a comma therefore
//! shifts everything after it; that is accepted rather than guessed around.

use crate::output::ReportFields;
use crate::prompts::FIELD_COUNT;
use once_cell::sync::Lazy;
use regex::Regex;

/// Parse a model reply into report fields.
pub fn parse_reply(reply: &str) -> ReportFields {
    let body = strip_code_fence(reply.trim());
    let values = body.split(',').map(|v| v.trim().to_string()).collect();
    ReportFields::from_row(normalise_fields(values))
}

/// Pad with empty strings or truncate so exactly nine values remain.
pub fn normalise_fields(mut values: Vec<String>) -> [String; FIELD_COUNT] {
    values.resize(FIELD_COUNT, String::new());
    let mut out: [String; FIELD_COUNT] = Default::default();
    for (slot, v) in out.iter_mut().zip(values) {
        *slot = v;
    }
    out
}

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:[A-Za-z]+[ \t]*\n|\n)?(.*?)\n?```$").unwrap());

/// Remove a single code fence wrapping the whole reply.
fn strip_code_fence(reply: &str) -> &str {
    match RE_CODE_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => reply,
    }
}
