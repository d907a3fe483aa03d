//! Locale-aware value formatting (pt-BR).
//!
//! Pure functions mapping a raw row value and its field to a display
//! string. Dispatch is on the field's semantic type, with field-id
//! overrides for currency and percentage columns.
//!
//! Zero handling differs by kind and must stay that way: a missing or
//! unparseable currency value renders as `R$ 0,00`, while a zero or
//! unparseable percentage renders as the `-` placeholder.

use crate::catalog;
use crate::types::{FieldDescriptor, SemanticType};
use chrono::NaiveDate;
use serde_json::Value;

/// Shown for missing values everywhere except currency
pub const PLACEHOLDER: &str = "-";

const CURRENCY_PREFIX: &str = "R$ ";
const CURRENCY_FIELDS: &[&str] = &["desagio"];

/// How a value is rendered, after field-id overrides are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Currency,
    Percentage,
    Number,
    Date,
    Boolean,
    Text,
}

/// Resolve the rendering kind for a field.
pub fn value_kind(field: &FieldDescriptor) -> ValueKind {
    if field.id.starts_with("valor_") || CURRENCY_FIELDS.contains(&field.id) {
        return ValueKind::Currency;
    }
    if field.id.starts_with("percentual_") {
        return ValueKind::Percentage;
    }
    match field.semantic_type {
        SemanticType::Number => ValueKind::Number,
        SemanticType::Date => ValueKind::Date,
        SemanticType::Boolean => ValueKind::Boolean,
        SemanticType::Text | SemanticType::Enumerated => ValueKind::Text,
    }
}

/// Format a value for a catalog field.
pub fn format(value: &Value, field: &FieldDescriptor) -> String {
    format_as(value, value_kind(field))
}

/// Format a value by field id; ids outside the catalog render as text.
pub fn format_field(value: &Value, field_id: &str) -> String {
    match catalog::get_field(field_id) {
        Some(field) => format(value, field),
        None => format_text(value),
    }
}

pub fn format_as(value: &Value, kind: ValueKind) -> String {
    match kind {
        ValueKind::Currency => format_currency(value),
        ValueKind::Percentage => format_percentage(value),
        ValueKind::Number => format_number(value),
        ValueKind::Date => format_date(value),
        ValueKind::Boolean => format_boolean(value),
        ValueKind::Text => format_text(value),
    }
}

/// `1234.5` -> `R$ 1.234,50`. Never blank: missing input is `R$ 0,00`.
pub fn format_currency(value: &Value) -> String {
    let n = as_number(value).unwrap_or(0.0);
    let digits = decimal(n.abs(), 2);
    if is_negative_after_rounding(n, 2) {
        format!("-{}{}", CURRENCY_PREFIX, digits)
    } else {
        format!("{}{}", CURRENCY_PREFIX, digits)
    }
}

/// `12.5` -> `12,50%`; zero or unparseable -> `-`.
pub fn format_percentage(value: &Value) -> String {
    match as_number(value) {
        Some(n) if n != 0.0 => format!("{}%", signed_decimal(n, 2)),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Integers get thousands separators only, other values two decimals.
pub fn format_number(value: &Value) -> String {
    match as_number(value) {
        Some(n) if n.fract() == 0.0 && n.abs() < 1e15 => signed_decimal(n, 0),
        Some(n) => signed_decimal(n, 2),
        None => PLACEHOLDER.to_string(),
    }
}

/// Calendar date as `DD/MM/YYYY`.
///
/// Only the year-month-day prefix is read, so no time zone can shift the day.
pub fn format_date(value: &Value) -> String {
    let Some(raw) = value.as_str().map(str::trim) else {
        return PLACEHOLDER.to_string();
    };

    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d/%m/%Y"))
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| PLACEHOLDER.to_string())
}

/// `true` -> `Sim`; anything else, `false` included, is the placeholder.
pub fn format_boolean(value: &Value) -> String {
    let is_true = match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };
    if is_true { "Sim".to_string() } else { PLACEHOLDER.to_string() }
}

pub fn format_text(value: &Value) -> String {
    match value {
        Value::Null => PLACEHOLDER.to_string(),
        Value::String(s) if s.trim().is_empty() => PLACEHOLDER.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) if items.is_empty() => PLACEHOLDER.to_string(),
        Value::Array(items) => items.iter().map(format_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Read a number from JSON numbers or numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// pt-BR digits: `.` groups thousands, `,` separates decimals. Unsigned.
pub fn decimal(n: f64, places: usize) -> String {
    let fixed = format!("{:.*}", places, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let grouped = group_thousands(int_part);
    match frac_part {
        Some(f) => format!("{},{}", grouped, f),
        None => grouped,
    }
}

fn signed_decimal(n: f64, places: usize) -> String {
    if is_negative_after_rounding(n, places) {
        format!("-{}", decimal(n, places))
    } else {
        decimal(n, places)
    }
}

fn is_negative_after_rounding(n: f64, places: usize) -> bool {
    n < 0.0 && format!("{:.*}", places, n.abs()).chars().any(|c| c.is_ascii_digit() && c != '0')
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
