//! Interactive preview states.
//!
//! "No data" and "error loading data" are distinct states: an empty result
//! is a successful fetch and must never be shown as a failure.

use super::table::{ReportTable, build_table};
use crate::console_format::TableWriter;
use crate::error::FetchError;
use crate::types::{GeneratedReport, SessionContext};
use std::io::{self, Write};

pub const NO_DATA_MESSAGE: &str = "Nenhum dado encontrado para os filtros selecionados";
pub const LOADING_MESSAGE: &str = "Carregando relatório...";

/// What the preview surface currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewView {
    Loading,
    Data(ReportTable),
    NoData(ReportTable),
    Error(String),
}

impl PreviewView {
    pub fn from_report(report: &GeneratedReport, session: &SessionContext) -> Self {
        let table = build_table(report, session);
        if table.is_empty() { PreviewView::NoData(table) } else { PreviewView::Data(table) }
    }

    pub fn from_result(result: &Result<GeneratedReport, FetchError>, session: &SessionContext) -> Self {
        match result {
            Ok(report) => Self::from_report(report, session),
            Err(e) => PreviewView::Error(format!("Erro ao carregar dados: {}", e)),
        }
    }

    /// Table backing this view, if any
    pub fn table(&self) -> Option<&ReportTable> {
        match self {
            PreviewView::Data(table) | PreviewView::NoData(table) => Some(table),
            PreviewView::Loading | PreviewView::Error(_) => None,
        }
    }
}

/// Draw a preview to any writer
pub fn write_preview<W: Write>(writer: &mut TableWriter<W>, view: &PreviewView) -> io::Result<()> {
    match view {
        PreviewView::Loading => writer.write_message(LOADING_MESSAGE, term::color::CYAN),
        PreviewView::Data(table) => {
            writer.write_heading(table)?;
            writer.write_table(table)?;
            writer.write_statistics(&table.statistics)
        }
        PreviewView::NoData(table) => {
            writer.write_heading(table)?;
            writer.write_message(NO_DATA_MESSAGE, term::color::YELLOW)?;
            writer.write_statistics(&table.statistics)
        }
        PreviewView::Error(message) => writer.write_message(message, term::color::BRIGHT_RED),
    }
}

/// Draw a preview to stdout
pub fn print_preview(view: &PreviewView, use_colors: bool) {
    let mut writer = TableWriter::new(io::stdout(), use_colors);
    let _ = write_preview(&mut writer, view);
}
