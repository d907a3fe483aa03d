//! Report rendering - turning a generated report into output.
//!
//! This module handles:
//! - Column ordering, display names and cell formatting (`table`)
//! - Statistics labels and monetary detection (`stats`)
//! - The interactive preview states (`preview`)
//! - The standalone print document (`print`)
//! - File exports (`export`)
//!
//! Console drawing is handled by the console_format module.

mod export;
mod preview;
mod print;
mod stats;
mod table;

pub use table::{Column, RESPONSIBLE_COLUMN, ReportTable, build_table, column_title, restricted_view};

pub use stats::{StatisticLine, format_statistic, humanize_key, is_monetary_key, statistic_lines};

pub use preview::{LOADING_MESSAGE, NO_DATA_MESSAGE, PreviewView, print_preview, write_preview};

pub use print::{escape_html, render_print_document, render_table_document, safe_color};

pub use export::{CSV_SEPARATOR, ExportFormat, export_report, file_stem, write_csv, write_json, write_markdown};
