//! Raw table readers: delimited text and JSON record arrays
//!
//! Both readers produce the same [`Table`] of strings; column meaning is
//! resolved later by the roster loader.

use serde_json::Value;

use crate::roster::RosterError;

const BOM: char = '\u{feff}';

/// Header row plus data rows, all cells as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    /// Data rows with their 1-based source line (delimited) or record index (JSON)
    pub rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    /// Cell at `column` of `row`, empty when the row is short
    pub fn cell<'a>(row: &'a [String], column: Option<usize>) -> &'a str {
        column
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DELIMITED TEXT
// ═══════════════════════════════════════════════════════════════════════════

/// Parse delimited text with a header row.
///
/// Fields may be wrapped in double quotes; inside quotes the delimiter and
/// line breaks are literal and `""` is one quote. Blank lines are skipped.
pub fn parse_delimited(text: &str, delimiter: char) -> Result<Table, RosterError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut records: Vec<(usize, Vec<String>)> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record), record_line);
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(RosterError::Parse {
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record, record_line);
    }

    let mut records = records.into_iter();
    let Some((_, headers)) = records.next() else {
        return Ok(Table::default());
    };
    Ok(Table {
        headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
        rows: records.collect(),
    })
}

fn push_record(records: &mut Vec<(usize, Vec<String>)>, record: Vec<String>, line: usize) {
    if record.iter().all(|f| f.trim().is_empty()) {
        return;
    }
    records.push((line, record));
}

// ═══════════════════════════════════════════════════════════════════════════
// JSON
// ═══════════════════════════════════════════════════════════════════════════

/// Parse a JSON array of flat objects.
///
/// Headers are the union of keys in first-seen order. Numbers and booleans
/// become their text form, `null` becomes an empty cell.
pub fn parse_json(text: &str) -> Result<Table, RosterError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(RosterError::Parse {
            line: 1,
            reason: "expected a JSON array of participant objects".to_string(),
        });
    };

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(RosterError::Parse {
                line: index + 1,
                reason: "record is not an object".to_string(),
            });
        };
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push((index + 1, map));
    }

    let mut rows = Vec::with_capacity(objects.len());
    for (index, map) in objects {
        let mut row = Vec::with_capacity(headers.len());
        for header in &headers {
            row.push(match map.get(header) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                Some(_) => {
                    return Err(RosterError::Parse {
                        line: index,
                        reason: format!("field '{}' is not a plain value", header),
                    });
                }
            });
        }
        rows.push((index, row));
    }

    Ok(Table { headers, rows })
}
