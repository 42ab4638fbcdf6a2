//! Plain-text table renderer

use std::io::Write;

use vigil_advisory::results::VulnerabilityResults;

use crate::output::{flatten_rows, Row};

const HEADERS: [&str; 5] = ["OSV URL", "Ecosystem", "Package", "Version", "Source"];

fn row_cells(row: &Row) -> [String; 5] {
    let urls: Vec<String> =
        row.ids.iter().map(|id| format!("https://osv.dev/{id}")).collect();

    [
        urls.join(", "),
        row.ecosystem.clone(),
        row.package.clone(),
        row.version.clone(),
        row.source.clone(),
    ]
}

/// Render one row per vulnerability group. A clean scan renders nothing.
pub fn render(results: &VulnerabilityResults, writer: &mut dyn Write) -> std::io::Result<()> {
    let rows = flatten_rows(results);
    if rows.is_empty() {
        return Ok(());
    }

    let cells: Vec<[String; 5]> = rows.iter().map(row_cells).collect();

    let mut widths: [usize; 5] = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let write_row = |writer: &mut dyn Write, cells: [&str; 5]| -> std::io::Result<()> {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(&format!("{cell:<width$}"));
        }
        writeln!(writer, "{}", line.trim_end())
    };

    write_row(writer, HEADERS)?;

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let separator: [&str; 5] = [
        &separator[0],
        &separator[1],
        &separator[2],
        &separator[3],
        &separator[4],
    ];
    write_row(writer, separator)?;

    for row in &cells {
        write_row(writer, [&row[0], &row[1], &row[2], &row[3], &row[4]])?;
    }

    Ok(())
}
