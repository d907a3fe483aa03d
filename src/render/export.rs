//! Report export to CSV, JSON, Markdown and the printable HTML document.
//!
//! The display formats work from an already built [`ReportTable`]; JSON
//! also carries the definition and raw values of the [`GeneratedReport`].
//! Exporting never re-fetches.

use super::print::render_table_document;
use super::table::{Column, ReportTable};
use crate::console_format::TableWriter;
use crate::types::{GeneratedReport, Record, ReportDefinition};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// CSV separator; `;` keeps comma decimals intact for pt-BR spreadsheets
pub const CSV_SEPARATOR: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
    /// Print document; "pdf" is an alias since PDF comes from the print dialog
    Html,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Markdown, ExportFormat::Html];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "html" | "pdf" | "print" => Some(ExportFormat::Html),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }
}

/// File stem derived from the report title: lowercase ASCII, `_` elsewhere.
pub fn file_stem(title: &str) -> String {
    let mut stem = String::new();
    for c in title.trim().chars() {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    if stem.is_empty() { "relatorio".to_string() } else { stem.to_string() }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' => 'a',
        'é' | 'ê' | 'è' | 'É' | 'Ê' => 'e',
        'í' | 'Í' => 'i',
        'ó' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ô' | 'Õ' => 'o',
        'ú' | 'ü' | 'Ú' => 'u',
        'ç' | 'Ç' => 'c',
        _ => c,
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Write the table as `;`-separated, fully quoted CSV
pub fn write_csv<W: Write>(writer: &mut W, table: &ReportTable) -> io::Result<()> {
    let sep = CSV_SEPARATOR.to_string();
    let header: Vec<String> = table.columns.iter().map(|c| csv_field(&c.title)).collect();
    writeln!(writer, "{}", header.join(&sep))?;
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| csv_field(c)).collect();
        writeln!(writer, "{}", cells.join(&sep))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    definition: &'a ReportDefinition,
    fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    responsible: Option<&'a str>,
    columns: &'a [Column],
    rows: Vec<Record>,
    statistics: &'a BTreeMap<String, f64>,
}

/// Write the definition, raw rows and statistics as pretty JSON.
///
/// Rows keep unformatted values but only the columns in `table`, so a
/// redacted column stays out of the file.
pub fn write_json<W: Write>(writer: &mut W, report: &GeneratedReport, table: &ReportTable) -> io::Result<()> {
    let rows = report
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .map(|c| (c.field_id.clone(), row.get(&c.field_id).cloned().unwrap_or(Value::Null)))
                .collect::<Record>()
        })
        .collect();

    let export = JsonExport {
        definition: &report.definition,
        fetched_at: report.fetched_at,
        responsible: table.responsible_banner.as_deref(),
        columns: &table.columns,
        rows,
        statistics: &report.statistics,
    };
    serde_json::to_writer_pretty(&mut *writer, &export)?;
    writeln!(writer)
}

fn markdown_escape(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Write the table as a Markdown document
pub fn write_markdown<W: Write>(writer: &mut W, table: &ReportTable) -> io::Result<()> {
    writeln!(writer, "# {}\n", markdown_escape(&table.title))?;
    if !table.description.is_empty() {
        writeln!(writer, "{}\n", markdown_escape(&table.description))?;
    }
    writeln!(writer, "**Gerado em**: {}", table.generated_at)?;
    if let Some(ref name) = table.responsible_banner {
        writeln!(writer, "**Responsável**: {}", markdown_escape(name))?;
    }
    writeln!(writer)?;

    if table.is_empty() {
        writeln!(writer, "_Nenhum dado encontrado_")?;
    } else {
        let header: Vec<String> = table.columns.iter().map(|c| markdown_escape(&c.title)).collect();
        writeln!(writer, "| {} |", header.join(" | "))?;
        writeln!(writer, "|{}", "---|".repeat(table.columns.len()))?;
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|c| markdown_escape(c)).collect();
            writeln!(writer, "| {} |", cells.join(" | "))?;
        }
        writeln!(writer, "\nTotal de registros: {}", table.rows.len())?;
    }

    if !table.statistics.is_empty() {
        writeln!(writer, "\n## Estatísticas\n")?;
        writeln!(writer, "```")?;
        let mut table_writer = TableWriter::with_width(&mut *writer, false, 100);
        table_writer.write_statistics(&table.statistics)?;
        writeln!(writer, "```")?;
    }
    Ok(())
}

/// Write one export file into `dir`, returning its path.
///
/// `table` is the view built from `report` for the current session.
pub fn export_report(
    report: &GeneratedReport,
    table: &ReportTable,
    format: ExportFormat,
    accent: &str,
    dir: &Path,
) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", file_stem(&table.title), format.extension()));
    let mut file = File::create(&path)?;

    match format {
        ExportFormat::Csv => write_csv(&mut file, table)?,
        ExportFormat::Json => write_json(&mut file, report, table)?,
        ExportFormat::Markdown => write_markdown(&mut file, table)?,
        ExportFormat::Html => file.write_all(render_table_document(table, accent).as_bytes())?,
    }

    info!("Exported {} report to {}", format.extension(), path.display());
    Ok(path)
}
