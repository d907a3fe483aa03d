//! Standalone print document.
//!
//! Produces a self-contained HTML page (inline styles, no external assets)
//! from an already generated report, so printing never re-fetches. The page
//! opens the browser's print dialog on load; "save as PDF" from that dialog
//! is the PDF export path.

use super::table::{ReportTable, build_table};
use crate::types::{GeneratedReport, SessionContext};
use std::fmt::Write as _;

const STYLE: &str = "\
body{font-family:Arial,Helvetica,sans-serif;font-size:12px;color:#111;margin:24px}\
h1{font-size:18px;margin:0 0 4px}\
.accent{height:4px;margin-bottom:12px}\
.meta{color:#555;margin:2px 0}\
.banner{border:1px solid #999;background:#f3f4f6;padding:6px 10px;margin:10px 0;font-weight:bold}\
table{border-collapse:collapse;width:100%;margin-top:12px}\
th,td{border:1px solid #bbb;padding:4px 6px;text-align:left}\
th{background:#e5e7eb}\
tr:nth-child(even) td{background:#fafafa}\
.empty{padding:16px;text-align:center;color:#555;border:1px dashed #bbb;margin-top:12px}\
.stats{margin-top:16px;width:auto}\
@media print{body{margin:0}.no-print{display:none}}";

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Accept only `#rgb` / `#rrggbb` colors, falling back to the default accent
pub fn safe_color(color: &str) -> &str {
    let hex = color.strip_prefix('#').unwrap_or("");
    if (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) { color } else { "#3b82f6" }
}

/// Render the print document for a generated report
pub fn render_print_document(report: &GeneratedReport, session: &SessionContext) -> String {
    let table = build_table(report, session);
    render_table_document(&table, safe_color(&report.definition.color))
}

/// Render the print document from an already built table
pub fn render_table_document(table: &ReportTable, accent: &str) -> String {
    let mut html = String::new();
    let title = escape_html(&table.title);

    // Writing to a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body onload=\"window.print()\">\n",
        title, STYLE
    );
    let _ = writeln!(html, "<h1>{}</h1>", title);
    let _ = writeln!(html, "<div class=\"accent\" style=\"background:{}\"></div>", accent);
    if !table.description.is_empty() {
        let _ = writeln!(html, "<p class=\"meta\">{}</p>", escape_html(&table.description));
    }
    let _ = writeln!(html, "<p class=\"meta\">Gerado em {}</p>", escape_html(&table.generated_at));
    if let Some(ref name) = table.responsible_banner {
        let _ = writeln!(html, "<div class=\"banner\">Responsável: {}</div>", escape_html(name));
    }

    if table.is_empty() {
        html.push_str("<div class=\"empty\">Nenhum dado encontrado</div>\n");
    } else {
        html.push_str("<table>\n<thead><tr>");
        for column in &table.columns {
            let _ = write!(html, "<th>{}</th>", escape_html(&column.title));
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for row in &table.rows {
            html.push_str("<tr>");
            for cell in row {
                let _ = write!(html, "<td>{}</td>", escape_html(cell));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
        let _ = writeln!(html, "<p class=\"meta\">Total de registros: {}</p>", table.rows.len());
    }

    if !table.statistics.is_empty() {
        html.push_str("<h2>Estatísticas</h2>\n<table class=\"stats\">\n");
        for stat in &table.statistics {
            let _ = writeln!(html, "<tr><th>{}</th><td>{}</td></tr>", escape_html(&stat.label), escape_html(&stat.value));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, ReportDefinition, UserRole};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn report(rows: Vec<Record>) -> GeneratedReport {
        let mut definition = ReportDefinition::blank();
        definition.name = "Relatório <Teste>".into();
        definition.description = "Processos & valores".into();
        definition.fields = vec!["nup".into(), "valor_estimado".into(), "responsavel_nome".into()];
        let mut statistics = BTreeMap::new();
        statistics.insert("valor_total".into(), 10.0);
        GeneratedReport { definition, rows, statistics, user_info: None, fetched_at: Utc::now() }
    }

    fn one_row() -> Record {
        let mut row = Record::new();
        row.insert("nup".into(), json!("0001"));
        row.insert("valor_estimado".into(), json!(99.9));
        row.insert("responsavel_nome".into(), json!("Ana"));
        row
    }

    #[test]
    fn test_document_is_standalone_and_escaped() {
        let html = render_print_document(&report(vec![one_row()]), &SessionContext::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("window.print()"));
        assert!(!html.contains("<script src") && !html.contains("<link"));
        assert!(html.contains("<h1>Relatório &lt;Teste&gt;</h1>"));
        assert!(html.contains("Processos &amp; valores"));
        assert!(html.contains("<td>R$ 99,90</td>"));
        assert!(html.contains("<th>Valor Total</th><td>R$ 10,00</td>"));
        assert!(!html.contains("class=\"banner\""));
    }

    #[test]
    fn test_restricted_document_has_banner_and_no_responsible_column() {
        let session = SessionContext::new("Ana", UserRole::Responsavel);
        let html = render_print_document(&report(vec![one_row()]), &session);
        assert!(html.contains("<div class=\"banner\">Responsável: Ana</div>"));
        assert!(!html.contains("<th>Responsável</th>"));
    }

    #[test]
    fn test_empty_document() {
        let html = render_print_document(&report(vec![]), &SessionContext::default());
        assert!(html.contains("Nenhum dado encontrado"));
        assert!(!html.contains("<tbody>"));
    }

    #[test]
    fn test_safe_color() {
        assert_eq!(safe_color("#abc"), "#abc");
        assert_eq!(safe_color("#12ab9F"), "#12ab9F");
        assert_eq!(safe_color("red;}</style>"), "#3b82f6");
    }
}
