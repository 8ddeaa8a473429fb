use crate::domain::model::TableProjection;
use crate::utils::error::{ExtractError, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
    Table,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Csv,
        OutputFormat::Tsv,
        OutputFormat::Json,
        OutputFormat::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Table => "txt",
            other => other.as_str(),
        }
    }

    pub fn render(&self, projection: &TableProjection) -> Result<String> {
        match self {
            OutputFormat::Csv => to_delimited(projection, b','),
            OutputFormat::Tsv => to_delimited(projection, b'\t'),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&to_json_rows(projection))?),
            OutputFormat::Table => Ok(to_text_table(projection)),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| ExtractError::InvalidConfigValueError {
                field: "output.output_formats".to_string(),
                value: s.to_string(),
                reason: "Unsupported format. Valid formats: csv, tsv, json, table".to_string(),
            })
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_formats(formats: &[String]) -> Result<Vec<OutputFormat>> {
    let mut parsed: Vec<OutputFormat> = Vec::with_capacity(formats.len());
    for raw in formats {
        let format = raw.parse()?;
        if !parsed.contains(&format) {
            parsed.push(format);
        }
    }
    Ok(parsed)
}

/// Header row of column names, then one record per row. Quoting is left to
/// the `csv` writer, so cells containing the delimiter or newlines survive.
pub fn to_delimited(projection: &TableProjection, delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    // csv refuses a zero-field record; an empty table is just an empty file
    if !projection.columns.is_empty() {
        writer.write_record(&projection.columns)?;
        for row in &projection.rows {
            writer.write_record(row)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExtractError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ExtractError::ValidationError {
        message: format!("rendered table is not UTF-8: {}", e),
    })
}

/// Rows as JSON objects keyed by column, in column order.
pub fn to_json_rows(projection: &TableProjection) -> Value {
    let rows = projection
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = projection
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.clone(), Value::String(cell.clone())))
                .collect();
            Value::Object(obj)
        })
        .collect();
    Value::Array(rows)
}

pub fn to_text_table(projection: &TableProjection) -> String {
    if projection.columns.is_empty() {
        // rows without any object record still count
        return match projection.rows.len() {
            0 => "(no results)\n".to_string(),
            n => format!("({} rows, no columns)\n", n),
        };
    }

    let mut widths: Vec<usize> = projection
        .columns
        .iter()
        .map(|c| c.chars().count())
        .collect();
    for row in &projection.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &projection.columns, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &projection.rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projector::project;
    use serde_json::json;

    fn sample() -> TableProjection {
        let records = match json!([
            {"name": "Alice", "note": "likes, commas"},
            {"name": "Bob"}
        ]) {
            Value::Array(items) => items,
            _ => unreachable!(),
        };
        project(&records)
    }

    #[test]
    fn test_csv_quotes_cells_with_delimiter() {
        let csv = to_delimited(&sample(), b',').unwrap();
        assert_eq!(csv, "name,note\nAlice,\"likes, commas\"\nBob,\n");
    }

    #[test]
    fn test_tsv_output() {
        let tsv = to_delimited(&sample(), b'\t').unwrap();
        assert_eq!(tsv, "name\tnote\nAlice\tlikes, commas\nBob\t\n");
    }

    #[test]
    fn test_empty_projection_renders_empty_csv() {
        let empty = TableProjection::default();
        assert_eq!(to_delimited(&empty, b',').unwrap(), "");
        assert_eq!(to_text_table(&empty), "(no results)\n");
        assert_eq!(to_json_rows(&empty), json!([]));
    }

    #[test]
    fn test_scalar_only_records_report_row_count() {
        let projection = crate::core::projector::project(&[json!(1), json!("two")]);
        assert_eq!(to_text_table(&projection), "(2 rows, no columns)\n");
        assert_eq!(to_delimited(&projection, b',').unwrap(), "");
    }

    #[test]
    fn test_json_rows_keep_column_order() {
        let rows = to_json_rows(&sample());
        let first = rows[0].as_object().unwrap();
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["name", "note"]);
        assert_eq!(rows[1]["note"], "");
    }

    #[test]
    fn test_text_table_alignment() {
        let table = to_text_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "name  | note");
        assert_eq!(lines[1], "----- | -------------");
        assert_eq!(lines[2], "Alice | likes, commas");
        assert_eq!(lines[3], "Bob   |");
    }

    #[test]
    fn test_parse_formats_dedupes_and_rejects_unknown() {
        let formats = parse_formats(&["CSV".to_string(), "json".to_string(), "csv".to_string()])
            .unwrap();
        assert_eq!(formats, vec![OutputFormat::Csv, OutputFormat::Json]);
        assert!(parse_formats(&["xlsx".to_string()]).is_err());
    }
}
