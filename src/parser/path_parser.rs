use crate::error::{AppError, AppResult};
use crate::parser::filter_parser::parse_filter;
use crate::path::Path;

/// Parse an attribute path (`attrPath` / `valuePath` in RFC 7644).
///
/// An optional schema URN is separated from the attribute names by its last
/// `:` before any value filter. Attribute names are dot-separated and each
/// may carry a `[filter]`.
pub fn parse_path(path_str: &str) -> AppResult<Path> {
    let trimmed = path_str.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidPath("Empty attribute path".to_string()));
    }

    let bracket = trimmed.find('[').unwrap_or(trimmed.len());
    let (mut path, body, offset) = match trimmed[..bracket].rfind(':') {
        Some(colon) => (
            Path::with_namespace(&trimmed[..colon])?,
            &trimmed[colon + 1..],
            colon + 1,
        ),
        None => (Path::root(), trimmed, 0),
    };
    if body.is_empty() {
        return Ok(path);
    }

    let bytes = body.as_bytes();
    let mut pos = 0;
    loop {
        let start = pos;
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        if pos == start {
            return Err(AppError::InvalidPath(format!(
                "Expected attribute name at position {} in: {}",
                offset + pos,
                trimmed
            )));
        }
        let name = &body[start..pos];

        if pos < bytes.len() && bytes[pos] == b'[' {
            let close = closing_bracket(body, pos).ok_or_else(|| {
                AppError::InvalidPath(format!(
                    "Unterminated '[' at position {} in: {}",
                    offset + pos,
                    trimmed
                ))
            })?;
            let filter = parse_filter(&body[pos + 1..close])?;
            path = path.attribute_with_filter(name, filter);
            pos = close + 1;
        } else {
            path = path.attribute(name);
        }

        if pos == bytes.len() {
            return Ok(path);
        }
        if bytes[pos] != b'.' {
            let unexpected = body[pos..].chars().next().unwrap_or('?');
            return Err(AppError::InvalidPath(format!(
                "Unexpected character '{}' at position {} in: {}",
                unexpected,
                offset + pos,
                trimmed
            )));
        }
        pos += 1;
    }
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'$')
}

/// Index of the `]` matching the `[` at `open`.
fn closing_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut in_quotes = false;
    let mut escape_next = false;
    for (i, ch) in text[open..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escape_next = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
