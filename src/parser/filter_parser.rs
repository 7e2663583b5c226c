use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::filter::{ComparisonOp, Filter, FilterType, ScalarValue, SubstringOp};
use crate::path::Path;

/// SCIM filter parser (RFC 7644 section 3.4.2.2)
///
/// Precedence from loosest to tightest is `or`, `and`, `not`; parentheses
/// group. Runs of the same logical operator become one n-ary node.
pub fn parse_filter(filter_str: &str) -> AppResult<Filter> {
    let trimmed = filter_str.trim();
    if trimmed.is_empty() {
        return Err(AppError::FilterParse("Empty filter expression".to_string()));
    }
    parse_or(trimmed)
}

fn parse_or(text: &str) -> AppResult<Filter> {
    let parts = split_top_level(text, "or")?;
    if parts.len() == 1 {
        return parse_and(text);
    }
    let filters = parts
        .into_iter()
        .map(|part| parse_and(operand(part, "or", text)?))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Filter::Or(filters))
}

fn parse_and(text: &str) -> AppResult<Filter> {
    let parts = split_top_level(text, "and")?;
    if parts.len() == 1 {
        return parse_unary(text);
    }
    let filters = parts
        .into_iter()
        .map(|part| parse_unary(operand(part, "and", text)?))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Filter::And(filters))
}

fn operand<'a>(part: &'a str, keyword: &str, text: &str) -> AppResult<&'a str> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return Err(AppError::FilterParse(format!(
            "Missing operand for '{}' in: {}",
            keyword, text
        )));
    }
    Ok(trimmed)
}

fn parse_unary(text: &str) -> AppResult<Filter> {
    let trimmed = text.trim();

    // Only remove outer parentheses if the first '(' matches the last ')'
    if let Some(inner) = strip_outer_parentheses(trimmed) {
        return parse_filter(inner);
    }

    if let Some(rest) = strip_not(trimmed) {
        let inner = rest.trim();
        if inner.is_empty() {
            return Err(AppError::FilterParse(format!("Missing operand for 'not' in: {}", text)));
        }
        return Ok(Filter::not(parse_unary(inner)?));
    }

    parse_attribute_expression(trimmed)
}

fn strip_outer_parentheses(text: &str) -> Option<&str> {
    if !(text.starts_with('(') && text.ends_with(')')) {
        return None;
    }

    let mut depth = 0;
    let mut in_quotes = false;
    let mut escape_next = false;
    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escape_next = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                // the opening parenthesis closed before the end
                if depth == 0 && i < text.len() - 1 {
                    return None;
                }
            }
            _ => {}
        }
    }

    if depth == 0 {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn strip_not(text: &str) -> Option<&str> {
    let keyword = text.get(..3)?;
    if !keyword.eq_ignore_ascii_case("not") {
        return None;
    }
    let rest = &text[3..];
    if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
        Some(rest)
    } else {
        None
    }
}

/// `attrPath op value`, `attrPath pr` or `attr[valFilter]`
fn parse_attribute_expression(text: &str) -> AppResult<Filter> {
    let (path_text, rest) = split_path_token(text)?;
    let rest = rest.trim();

    if rest.is_empty() {
        if path_text.ends_with(']') {
            if let Some(open) = path_text.find('[') {
                let path = parse_attribute_path(&path_text[..open])?;
                let inner = parse_filter(&path_text[open + 1..path_text.len() - 1])?;
                return Ok(Filter::complex_path(path, inner));
            }
        }
        return Err(AppError::FilterParse(format!("Missing operator in: {}", text)));
    }

    let path = parse_attribute_path(path_text)?;
    let (operator, value_str) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };

    let filter_type = FilterType::from_str(operator)?;
    if filter_type == FilterType::Pr {
        if !value_str.is_empty() {
            return Err(AppError::FilterParse(format!(
                "Unexpected value after 'pr': {}",
                value_str
            )));
        }
        return Ok(Filter::presence(path));
    }

    if value_str.is_empty() {
        return Err(AppError::FilterParse(format!(
            "Missing value for operator '{}' in: {}",
            operator, text
        )));
    }
    let value = parse_filter_value(value_str)?;

    let filter = match filter_type {
        FilterType::Eq => Filter::comparison(ComparisonOp::Eq, path, value),
        FilterType::Ne => Filter::not(Filter::comparison(ComparisonOp::Eq, path, value)),
        FilterType::Gt => Filter::comparison(ComparisonOp::Gt, path, value),
        FilterType::Ge => Filter::comparison(ComparisonOp::Ge, path, value),
        FilterType::Lt => Filter::comparison(ComparisonOp::Lt, path, value),
        FilterType::Le => Filter::comparison(ComparisonOp::Le, path, value),
        FilterType::Sw => Filter::substring(SubstringOp::StartsWith, path, value),
        FilterType::Ew => Filter::substring(SubstringOp::EndsWith, path, value),
        FilterType::Co => Filter::substring(SubstringOp::Contains, path, value),
        other => {
            return Err(AppError::FilterParse(format!(
                "Unexpected operator '{}' in: {}",
                other, text
            )))
        }
    };
    Ok(filter)
}

fn parse_attribute_path(text: &str) -> AppResult<Path> {
    Path::from(text).map_err(|e| match e {
        AppError::InvalidPath(message) => AppError::FilterParse(message),
        other => other,
    })
}

/// Split off the attribute path: everything up to the first whitespace
/// outside of a value filter.
fn split_path_token(text: &str) -> AppResult<(&str, &str)> {
    let mut depth = 0;
    let mut in_quotes = false;
    let mut escape_next = false;
    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escape_next = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => depth -= 1,
            c if c.is_whitespace() && depth == 0 && !in_quotes => {
                return Ok((&text[..i], &text[i..]));
            }
            _ => {}
        }
    }
    if depth != 0 || in_quotes {
        return Err(AppError::FilterParse(format!("Unterminated value filter in: {}", text)));
    }
    Ok((text, ""))
}

/// Splits `text` at every top-level occurrence of the logical `keyword`,
/// ignoring anything in quotes, parentheses or brackets.
fn split_top_level<'a>(text: &'a str, keyword: &str) -> AppResult<Vec<&'a str>> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth: i32 = 0;
    let mut in_quotes = false;
    let mut escape_next = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if escape_next {
            escape_next = false;
        } else if in_quotes {
            match b {
                b'\\' => escape_next = true,
                b'"' => in_quotes = false,
                _ => {}
            }
        } else {
            match b {
                b'"' => in_quotes = true,
                b'(' | b'[' => depth += 1,
                b')' | b']' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(AppError::FilterParse(format!(
                            "Unbalanced '{}' at position {} in: {}",
                            b as char, i, text
                        )));
                    }
                }
                _ if depth == 0 && b.is_ascii_whitespace() && keyword_at(text, i + 1, keyword) => {
                    parts.push(&text[start..i]);
                    start = i + 1 + keyword.len();
                    i = start;
                    continue;
                }
                _ => {}
            }
        }
        i += 1;
    }

    if in_quotes {
        return Err(AppError::FilterParse(format!("Unterminated string in: {}", text)));
    }
    if depth != 0 {
        return Err(AppError::FilterParse(format!("Unbalanced parentheses in: {}", text)));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn keyword_at(text: &str, pos: usize, keyword: &str) -> bool {
    let end = pos + keyword.len();
    match text.get(pos..end) {
        Some(word) if word.eq_ignore_ascii_case(keyword) => text[end..]
            .chars()
            .next()
            .map_or(false, |c| c.is_whitespace() || c == '('),
        _ => false,
    }
}

/// Parse a filter value: a JSON string, number, `true`, `false` or `null`
fn parse_filter_value(value_str: &str) -> AppResult<ScalarValue> {
    let trimmed = value_str.trim();

    // literals are case-insensitive in the ABNF
    if trimmed.eq_ignore_ascii_case("true") {
        return Ok(ScalarValue::Boolean(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Ok(ScalarValue::Boolean(false));
    }
    if trimmed.eq_ignore_ascii_case("null") {
        return Ok(ScalarValue::Null);
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|_| AppError::FilterParse(format!("Invalid value: {}", trimmed)))?;
    ScalarValue::from_json(&value).ok_or_else(|| {
        AppError::FilterParse(format!("Value must be a string, number, boolean or null: {}", trimmed))
    })
}
