//! Markdown table renderer

use std::io::Write;

use vigil_advisory::results::VulnerabilityResults;

use crate::output::flatten_rows;

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

/// Render a GitHub-flavored markdown table. A clean scan renders nothing.
pub fn render(results: &VulnerabilityResults, writer: &mut dyn Write) -> std::io::Result<()> {
    let rows = flatten_rows(results);
    if rows.is_empty() {
        return Ok(());
    }

    writeln!(writer, "| OSV URL | Ecosystem | Package | Version | Source |")?;
    writeln!(writer, "| --- | --- | --- | --- | --- |")?;

    for row in rows {
        let links: Vec<String> = row
            .ids
            .iter()
            .map(|id| format!("[{id}](https://osv.dev/{id})"))
            .collect();

        writeln!(
            writer,
            "| {} | {} | {} | {} | {} |",
            links.join(", "),
            escape(&row.ecosystem),
            escape(&row.package),
            escape(&row.version),
            escape(&row.source),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::output::test_fixtures::sample_results;

    #[test]
    fn markdown_table_structure() {
        let mut buffer = Vec::new();
        render(&sample_results(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("| OSV URL |"));
        assert!(lines[1].starts_with("| --- |"));
        assert!(lines[2].contains("[GHSA-whgm-jr23-g3j9](https://osv.dev/GHSA-whgm-jr23-g3j9)"));
        assert!(lines[2].contains("| ansi-html |"));
    }

    #[test]
    fn clean_scan_renders_nothing() {
        let mut buffer = Vec::new();
        render(&VulnerabilityResults::default(), &mut buffer).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn pipes_in_cells_are_escaped() {
        let mut results = sample_results();
        results.results[0].packages[0].package.name = "weird|name".to_owned();

        let mut buffer = Vec::new();
        render(&results, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("weird\\|name"));
    }
}
