//! Statistics panel formatting.
//!
//! Statistic keys come straight from the backend (`valor_total_estimado`,
//! `totalProcessos`). Keys are humanized for display; values whose key
//! looks monetary render as currency, everything else as a plain number.

use crate::format;
use convert_case::{Case, Casing};
use serde_json::Value;
use std::collections::BTreeMap;

const MONETARY_MARKERS: &[&str] = &["valor", "montante", "economia", "desagio", "custo"];

/// One formatted line of the statistics panel
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatisticLine {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Whether a statistic key names a money amount.
pub fn is_monetary_key(key: &str) -> bool {
    let key = key.to_lowercase();
    MONETARY_MARKERS.iter().any(|marker| key.contains(marker))
}

/// `valor_total_estimado` / `valorTotalEstimado` -> `Valor Total Estimado`
pub fn humanize_key(key: &str) -> String {
    key.to_case(Case::Title)
}

pub fn format_statistic(key: &str, value: f64) -> String {
    let value = serde_json::Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null);
    if is_monetary_key(key) { format::format_currency(&value) } else { format::format_number(&value) }
}

pub fn statistic_lines(statistics: &BTreeMap<String, f64>) -> Vec<StatisticLine> {
    statistics
        .iter()
        .map(|(key, value)| StatisticLine {
            key: key.clone(),
            label: humanize_key(key),
            value: format_statistic(key, *value),
        })
        .collect()
}
