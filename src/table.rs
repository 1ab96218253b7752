use std::fmt::Write as _;

use crate::schema::InferredSchema;

/// Renders an inferred schema with the tag counts each column was resolved from.
pub fn render_schema(inferred: &InferredSchema) -> String {
    let headers = ["#", "header", "column", "type", "evidence"]
        .map(String::from)
        .to_vec();
    let rows = inferred
        .schema
        .columns
        .iter()
        .zip(&inferred.samples)
        .enumerate()
        .map(|(idx, (column, sample))| {
            let evidence = sample
                .counts()
                .iter()
                .map(|(tag, count)| format!("{tag}={count}"))
                .collect::<Vec<_>>()
                .join(" ");
            vec![
                (idx + 1).to_string(),
                column.source_name.clone().unwrap_or_default(),
                column.name.clone(),
                column.declared_type.to_string(),
                evidence,
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

pub fn print_schema(inferred: &InferredSchema) {
    print!("{}", render_schema(inferred));
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(sanitize_cell(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{:<width$}", sanitize_cell(value), width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn sanitize_cell(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
