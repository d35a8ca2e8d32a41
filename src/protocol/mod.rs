//! Mini-parsers for the fixed textual protocol the vision model replies in.
//!
//! All of these are hand-rolled string scans rather than a regex dependency — the reply shapes
//! are small and fixed, so a dependency buys nothing a few string operations don't already do.

/// Result of `expect`: did the description match what's on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectResult {
    Match,
    NoMatch,
    Uncertain,
}

/// Result of locating an element by its screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateResult {
    Found { x: i64, y: i64 },
    NotFound { detail: String },
}

/// Result of an `extract` action's model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractResult {
    Value(String),
    Empty,
    NotFound,
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Parses the reply to an `expect` prompt.
pub fn parse_expect(text: &str) -> ExpectResult {
    match first_line(text).to_ascii_uppercase().as_str() {
        "MATCH" => ExpectResult::Match,
        "NO_MATCH" => ExpectResult::NoMatch,
        _ => ExpectResult::Uncertain,
    }
}

/// Parses the reply to a click/type/select coordinate-lookup prompt.
pub fn parse_coordinate(text: &str) -> CoordinateResult {
    if text.trim().is_empty() {
        return CoordinateResult::NotFound { detail: "Empty response".to_string() };
    }

    let line = first_line(text);
    if let Some(rest) = strip_prefix_ci(line, "NOT_FOUND") {
        let same_line = rest.trim_start_matches(':').trim();
        if !same_line.is_empty() {
            return CoordinateResult::NotFound { detail: same_line.to_string() };
        }
        let rest_lines: String = text.lines().skip(1).collect::<Vec<_>>().join(" ");
        let rest_lines = rest_lines.trim();
        if !rest_lines.is_empty() {
            return CoordinateResult::NotFound { detail: rest_lines.to_string() };
        }
        return CoordinateResult::NotFound { detail: "Element not found".to_string() };
    }

    match parse_xy(line) {
        Some((x, y)) => CoordinateResult::Found { x, y },
        None => CoordinateResult::NotFound {
            detail: format!("Could not parse coordinates from: {line}"),
        },
    }
}

fn parse_xy(line: &str) -> Option<(i64, i64)> {
    let (x_part, y_part) = line.split_once(',')?;
    let x_part = x_part.trim();
    let y_part = y_part.trim();
    if x_part.is_empty() || y_part.is_empty() {
        return None;
    }
    if !x_part.bytes().all(|b| b.is_ascii_digit()) || !y_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let x = x_part.parse().ok()?;
    let y = y_part.parse().ok()?;
    Some((x, y))
}

/// Parses the reply to an `extract` prompt.
pub fn parse_extract(text: &str) -> ExtractResult {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ExtractResult::NotFound;
    }
    if trimmed.eq_ignore_ascii_case("EMPTY") {
        return ExtractResult::Empty;
    }
    if strip_prefix_ci(trimmed, "NOT_FOUND").is_some() {
        return ExtractResult::NotFound;
    }
    ExtractResult::Value(trimmed.to_string())
}

/// Parses the reply to an `if screen shows` prompt.
pub fn parse_boolean(text: &str) -> bool {
    first_line(text).eq_ignore_ascii_case("YES")
}
