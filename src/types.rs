//! SQL value model and per-dialect literal mapping.
//!
//! Pure functions only; the generic suite exercises these without a backend,
//! and the type-mapping module uses them to build round-trip queries.

use std::fmt;

use serde::Serialize;

use crate::descriptor::DialectFlag;

/// A value as it travels between a test and a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
}

/// One result row.
pub type Row = Vec<SqlValue>;

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_literal(self, None))
    }
}

/// Whether a dialect has a native boolean type. `None` is portable SQL,
/// which does not assume one.
pub fn has_native_bool(dialect: Option<DialectFlag>) -> bool {
    matches!(dialect, Some(DialectFlag::Postgresql | DialectFlag::Mysql))
}

/// Renders a value as a SQL literal in the given dialect.
pub fn render_literal(value: &SqlValue, dialect: Option<DialectFlag>) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(n) => n.to_string(),
        SqlValue::Real(x) => render_real(*x),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Bool(b) if has_native_bool(dialect) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        SqlValue::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        SqlValue::Bytes(bytes) => {
            let hex = hex::encode_upper(bytes);
            match dialect {
                Some(DialectFlag::Postgresql) => format!("'\\x{}'::bytea", hex),
                Some(DialectFlag::Oracle) => format!("HEXTORAW('{}')", hex),
                Some(DialectFlag::Db2) => format!("BX'{}'", hex),
                _ => format!("X'{}'", hex),
            }
        }
    }
}

fn render_real(x: f64) -> String {
    let text = format!("{:?}", x);
    if text.contains(['.', 'e', 'E']) || !x.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

/// The value a dialect hands back after `value` is sent as a literal.
/// Dialects without a boolean type read booleans back as integers.
pub fn expected_roundtrip(value: &SqlValue, dialect: Option<DialectFlag>) -> SqlValue {
    match value {
        SqlValue::Bool(b) if !has_native_bool(dialect) => SqlValue::Integer(i64::from(*b)),
        other => other.clone(),
    }
}

/// Parses any literal `render_literal` produces, in any dialect.
pub fn parse_literal(text: &str) -> Result<SqlValue, String> {
    let text = text.trim();
    let upper = text.to_ascii_uppercase();

    match upper.as_str() {
        "NULL" => return Ok(SqlValue::Null),
        "TRUE" => return Ok(SqlValue::Bool(true)),
        "FALSE" => return Ok(SqlValue::Bool(false)),
        _ => {}
    }

    if let Some(body) = strip_wrapped(text, "'\\x", "'::bytea") {
        return hex::decode(body).map(SqlValue::Bytes).map_err(|_| bad(text));
    }
    if let Some(body) = strip_wrapped(&upper, "HEXTORAW('", "')")
        .or_else(|| strip_wrapped(&upper, "BX'", "'"))
        .or_else(|| strip_wrapped(&upper, "X'", "'"))
    {
        return hex::decode(body).map(SqlValue::Bytes).map_err(|_| bad(text));
    }
    if let Some(body) = strip_wrapped(text, "'", "'") {
        return unquote(body).map(SqlValue::Text).ok_or_else(|| bad(text));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(SqlValue::Integer(n));
    }
    if text.contains(['.', 'e', 'E']) {
        if let Ok(x) = text.parse::<f64>() {
            return Ok(SqlValue::Real(x));
        }
    }
    Err(bad(text))
}

fn strip_wrapped<'t>(text: &'t str, prefix: &str, suffix: &str) -> Option<&'t str> {
    if text.len() < prefix.len() + suffix.len() {
        return None;
    }
    text.strip_prefix(prefix)?.strip_suffix(suffix)
}

/// Undoes `''` escaping; a lone quote inside the body is not a single literal.
fn unquote(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' && chars.next() != Some('\'') {
            return None;
        }
        out.push(ch);
    }
    Some(out)
}

fn bad(text: &str) -> String {
    format!("not a SQL literal: {}", text)
}

/// Splits a select list on top-level commas, respecting quoted strings and
/// parentheses.
pub fn split_select_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = list[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// A `SELECT` of literals that every dialect accepts.
pub fn select_literals_sql(values: &[SqlValue], dialect: Option<DialectFlag>) -> String {
    let list = values
        .iter()
        .map(|v| render_literal(v, dialect))
        .collect::<Vec<_>>()
        .join(", ");
    match dialect {
        Some(DialectFlag::Oracle) => format!("SELECT {} FROM DUAL", list),
        Some(DialectFlag::Db2) => format!("SELECT {} FROM SYSIBM.SYSDUMMY1", list),
        _ => format!("SELECT {}", list),
    }
}
