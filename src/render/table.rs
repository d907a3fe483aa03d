//! Shared ordering/formatting pipeline.
//!
//! Both the interactive preview and the print/export documents are built
//! from one [`ReportTable`], so they always agree on column order, display
//! names, cell formatting and the statistics panel.

use super::stats::{self, StatisticLine};
use crate::catalog;
use crate::columns;
use crate::format;
use crate::types::{GeneratedReport, SessionContext};
use chrono::{DateTime, Local};
use serde_json::Value;

/// Column hidden from viewers restricted to their own records
pub const RESPONSIBLE_COLUMN: &str = "responsavel_nome";

/// One output column
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Column {
    pub field_id: String,
    pub title: String,
}

/// Fully formatted report content, ready for any output surface
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReportTable {
    pub title: String,
    pub description: String,
    pub generated_at: String,
    /// Name shown in the "responsible party" banner, when one applies
    pub responsible_banner: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    pub statistics: Vec<StatisticLine>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Display title for a column: catalog name, else the humanized key.
pub fn column_title(field_id: &str) -> String {
    match catalog::get_field(field_id) {
        Some(field) => field.display_name.to_string(),
        None => stats::humanize_key(field_id),
    }
}

/// Whether output is restricted to the viewer's own records.
///
/// The session role decides; the backend's `userInfo` hint can also flag it.
pub fn restricted_view(report: &GeneratedReport, session: &SessionContext) -> bool {
    session.restricted_to_own_records() || report.user_info.as_ref().is_some_and(|u| u.restricted_to_own)
}

/// Run rows and statistics through the column order and value formatter.
pub fn build_table(report: &GeneratedReport, session: &SessionContext) -> ReportTable {
    let restricted = restricted_view(report, session);

    let order: Vec<String> = columns::resolve(&report.definition, report.rows.first())
        .into_iter()
        .filter(|field_id| !(restricted && field_id == RESPONSIBLE_COLUMN))
        .collect();

    let columns: Vec<Column> =
        order.iter().map(|field_id| Column { field_id: field_id.clone(), title: column_title(field_id) }).collect();

    let rows = report
        .rows
        .iter()
        .map(|row| {
            order
                .iter()
                .map(|field_id| format::format_field(row.get(field_id).unwrap_or(&Value::Null), field_id))
                .collect()
        })
        .collect();

    let responsible_banner = if restricted {
        report
            .user_info
            .as_ref()
            .and_then(|u| u.name.clone())
            .or_else(|| Some(session.user_name.clone()).filter(|n| !n.trim().is_empty()))
    } else {
        None
    };

    let generated_at: DateTime<Local> = report.fetched_at.with_timezone(&Local);

    ReportTable {
        title: report.definition.name.clone(),
        description: report.definition.description.clone(),
        generated_at: generated_at.format("%d/%m/%Y %H:%M").to_string(),
        responsible_banner,
        columns,
        rows,
        statistics: stats::statistic_lines(&report.statistics),
    }
}
