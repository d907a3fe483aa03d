/// Console formatting module - Pure rendering concerns
///
/// This module handles all console output formatting including:
/// - Column width allocation against the terminal width
/// - Color terminal output
/// - Text truncation and padding
/// - The statistics panel and message boxes
///
/// It accepts pre-formatted data from the render module and draws it.
///
/// ## Output Flexibility
///
/// This module supports writing to any `std::io::Write` destination:
/// - Console (stdout) with optional colors
/// - String buffers (for tests and markdown code blocks)
/// - Files
use crate::render::{ReportTable, StatisticLine};
use std::io::{self, Write};
use std::sync::OnceLock;
use term::color::Color;
use terminal_size::{Width, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Narrowest a column is squeezed to before the table simply overflows
const MIN_COLUMN_WIDTH: usize = 6;

/// Writer for table output - configurable for color/plain text
pub struct TableWriter<W: Write> {
    writer: W,
    use_colors: bool,
    width: usize,
}

impl<W: Write> TableWriter<W> {
    /// Create a new table writer sized to the console
    pub fn new(writer: W, use_colors: bool) -> Self {
        Self { writer, use_colors, width: console_width() }
    }

    /// Create a writer with an explicit total width
    pub fn with_width(writer: W, use_colors: bool, width: usize) -> Self {
        Self { writer, use_colors, width }
    }

    /// Write formatted text, optionally with color
    fn write_colored(&mut self, text: &str, color: Color) -> io::Result<()> {
        if self.use_colors {
            if let Some(ref mut t) = term::stdout() {
                let _ = t.fg(color);
                let _ = t.write_all(text.as_bytes());
                let _ = t.reset();
                return Ok(());
            }
        }
        write!(self.writer, "{}", text)
    }

    fn border(&mut self, widths: &[usize], left: &str, mid: &str, right: &str) -> io::Result<()> {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        writeln!(self.writer, "{}{}{}", left, segments.join(mid), right)
    }

    fn row(&mut self, cells: &[String], widths: &[usize], color: Option<Color>) -> io::Result<()> {
        let padded: Vec<String> =
            cells.iter().zip(widths).map(|(cell, w)| truncate_with_padding(cell, w.saturating_sub(2))).collect();
        let line = format!("│ {} │", padded.join(" │ "));
        match color {
            Some(c) => self.write_colored(&line, c)?,
            None => write!(self.writer, "{}", line)?,
        }
        writeln!(self.writer)
    }

    /// Write the report heading (title, description, timestamp, banner)
    pub fn write_heading(&mut self, table: &ReportTable) -> io::Result<()> {
        self.write_colored(&table.title, term::color::BRIGHT_CYAN)?;
        writeln!(self.writer)?;
        if !table.description.is_empty() {
            writeln!(self.writer, "{}", table.description)?;
        }
        writeln!(self.writer, "Gerado em {}", table.generated_at)?;
        if let Some(ref name) = table.responsible_banner {
            writeln!(self.writer, "Responsável: {}", name)?;
        }
        writeln!(self.writer)
    }

    /// Write the data grid
    pub fn write_table(&mut self, table: &ReportTable) -> io::Result<()> {
        let headers: Vec<String> = table.columns.iter().map(|c| c.title.clone()).collect();
        let widths = column_widths(&headers, &table.rows, self.width);

        self.border(&widths, "┌", "┬", "┐")?;
        self.row(&headers, &widths, Some(term::color::BRIGHT_WHITE))?;
        self.border(&widths, "├", "┼", "┤")?;
        for row in &table.rows {
            self.row(row, &widths, None)?;
        }
        self.border(&widths, "└", "┴", "┘")?;
        writeln!(self.writer, "{} registro(s)", table.rows.len())
    }

    /// Write the statistics panel as a two-column table
    pub fn write_statistics(&mut self, statistics: &[StatisticLine]) -> io::Result<()> {
        if statistics.is_empty() {
            return Ok(());
        }

        let label_w = statistics.iter().map(|s| display_width(&s.label)).max().unwrap_or(0);
        let value_w = statistics.iter().map(|s| display_width(&s.value)).max().unwrap_or(0);
        let widths = [label_w + 2, value_w + 2];

        writeln!(self.writer)?;
        self.write_colored("Estatísticas", term::color::BRIGHT_CYAN)?;
        writeln!(self.writer)?;
        self.border(&widths, "┌", "┬", "┐")?;
        for stat in statistics {
            self.row(&[stat.label.clone(), stat.value.clone()], &widths, None)?;
        }
        self.border(&widths, "└", "┴", "┘")
    }

    /// Write a boxed one-line message (no data, errors)
    pub fn write_message(&mut self, message: &str, color: Color) -> io::Result<()> {
        let inner = display_width(message).min(self.width.saturating_sub(4)).max(1);
        let widths = [inner + 2];
        self.border(&widths, "┌", "", "┐")?;
        self.row(&[message.to_string()], &widths, Some(color))?;
        self.border(&widths, "└", "", "┘")
    }
}

/// Allocate column widths (cell padding included) within `total`.
///
/// Columns start at their natural width; while the table is too wide the
/// widest column gives up space, down to [`MIN_COLUMN_WIDTH`].
pub fn column_widths(headers: &[String], rows: &[Vec<String>], total: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let cells = rows.iter().filter_map(|r| r.get(i)).map(|c| display_width(c));
            cells.fold(display_width(h), usize::max) + 2
        })
        .collect();

    // one border char per column plus the closing one
    let budget = total.saturating_sub(widths.len() + 1);
    while widths.iter().sum::<usize>() > budget {
        let Some((idx, widest)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else {
            break;
        };
        if widest <= MIN_COLUMN_WIDTH {
            break;
        }
        widths[idx] = widest - 1;
    }
    widths
}

/// Get terminal width or default to 120
fn get_terminal_width() -> usize {
    if let Some((Width(w), _)) = terminal_size() { w as usize } else { 120 }
}

static CONSOLE_WIDTH: OnceLock<usize> = OnceLock::new();

/// Override the detected console width (for testing and `--console-width`)
pub fn set_console_width(width: usize) {
    let _ = CONSOLE_WIDTH.set(width); // Ignore error if already initialized
}

/// Console width, detected once
pub fn console_width() -> usize {
    *CONSOLE_WIDTH.get_or_init(get_terminal_width)
}

//
// Text Formatting Utilities
//

/// Count the display width of a string, accounting for wide Unicode characters
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate and pad string to exact width
pub fn truncate_with_padding(s: &str, width: usize) -> String {
    let display_w = display_width(s);

    if display_w > width {
        let mut result = String::new();
        let mut current_width = 0;

        // Reserve space for "..."
        let target_width = if width >= 3 { width - 3 } else { width };

        for c in s.chars() {
            let c_width = UnicodeWidthChar::width(c).unwrap_or(1);
            if current_width + c_width > target_width {
                break;
            }
            result.push(c);
            current_width += c_width;
        }

        if width >= 3 {
            result.push_str("...");
            current_width += 3;
        }

        if current_width < width {
            result.push_str(&" ".repeat(width - current_width));
        }

        result
    } else {
        format!("{}{}", s, " ".repeat(width - display_w))
    }
}

#[cfg(test)]
#[path = "console_format_test.rs"]
mod console_format_test;
