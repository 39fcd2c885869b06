//! TSV field escaping
//!
//! This is the wire format of the table store's bulk-load endpoint and must be
//! reproduced exactly:
//!
//! - fields are joined with a tab
//! - a present value is wrapped in double quotes, with `"` doubled and `\` doubled
//! - an absent value is an empty span with no quotes
//!
//! Quoted values may contain tabs and newlines; [`decode_rows`] reads them back.

/// Escapes one field
pub fn escape_field(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(value) => {
            let mut escaped = String::with_capacity(value.len() + 2);
            escaped.push('"');
            for c in value.chars() {
                match c {
                    '"' => escaped.push_str("\"\""),
                    '\\' => escaped.push_str("\\\\"),
                    other => escaped.push(other),
                }
            }
            escaped.push('"');
            escaped
        }
    }
}

/// Encodes a row of values as one TSV line, without the line terminator
pub fn encode_row<S: AsRef<str>>(values: &[Option<S>]) -> String {
    values
        .iter()
        .map(|v| escape_field(v.as_ref().map(AsRef::as_ref)))
        .collect::<Vec<_>>()
        .join("\t")
}

/// Encodes the header line for the given column names
pub fn encode_header(column_names: &[String]) -> String {
    column_names
        .iter()
        .map(|name| escape_field(Some(name)))
        .collect::<Vec<_>>()
        .join("\t")
}

/// Decodes TSV text written with [`encode_row`] back into rows
///
/// A trailing line terminator does not start a new row.
///
/// # Errors
///
/// Returns an error on an unterminated quoted field or on text following a
/// closing quote.
pub fn decode_rows(text: &str) -> Result<Vec<Vec<Option<String>>>, String> {
    let mut rows = Vec::new();
    if text.is_empty() {
        return Ok(rows);
    }

    let mut row = Vec::new();
    let mut chars = text.chars().peekable();
    loop {
        let field = if chars.peek() == Some(&'"') {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        value.push('"');
                    }
                    Some('"') => break,
                    Some('\\') if chars.peek() == Some(&'\\') => {
                        chars.next();
                        value.push('\\');
                    }
                    Some(c) => value.push(c),
                    None => {
                        return Err(format!("Unterminated quoted field in row {}", rows.len() + 1))
                    }
                }
            }
            Some(value)
        } else {
            let mut value = String::new();
            while let Some(&c) = chars.peek() {
                if c == '\t' || c == '\n' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            (!value.is_empty()).then_some(value)
        };
        row.push(field);

        match chars.next() {
            Some('\t') => {}
            Some('\n') => {
                rows.push(std::mem::take(&mut row));
                if chars.peek().is_none() {
                    break;
                }
            }
            None => {
                rows.push(std::mem::take(&mut row));
                break;
            }
            Some(c) => {
                return Err(format!(
                    "Unexpected '{c}' after quoted field in row {}",
                    rows.len() + 1
                ))
            }
        }
    }
    Ok(rows)
}
