//! Output formatting.
//!
//! Commands produce a [`View`], one of three shapes (flat list, uniform rows,
//! key/value mapping). The session-wide [`Formatter`] renders it as a table,
//! JSON or CSV.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use milvus_client::Row;
use serde_json::{Map, Value};

use crate::error::{CliError, Result};

/// Rendered by the table format for empty input.
pub const NO_DATA: &str = "No data.";

/// Output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Bordered grid.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
    /// Comma separated values with a header row.
    Csv,
}

impl OutputFormat {
    /// Every format.
    pub const ALL: [Self; 3] = [Self::Table, Self::Json, Self::Csv];

    /// Parses `table`, `json` or `csv`, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured command result, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Confirmation text, printed as-is in every format.
    Message(String),
    /// Flat list of names.
    List {
        /// Column header.
        header: String,
        /// Items in order.
        items: Vec<String>,
    },
    /// Uniform records.
    Rows {
        /// Column order; empty means the union of keys in first-seen order.
        headers: Vec<String>,
        /// Records.
        rows: Vec<Row>,
    },
    /// Single mapping.
    KeyValue {
        /// Header of the key column.
        key_header: String,
        /// Header of the value column.
        value_header: String,
        /// Entries in display order.
        entries: Vec<(String, Value)>,
    },
}

impl View {
    /// Confirmation message.
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// List with a header.
    pub fn list(header: impl Into<String>, items: Vec<String>) -> Self {
        Self::List {
            header: header.into(),
            items,
        }
    }

    /// Rows with headers derived from the data.
    #[must_use]
    pub fn rows(rows: Vec<Row>) -> Self {
        Self::Rows {
            headers: Vec::new(),
            rows,
        }
    }

    /// Key/value mapping with `Property`/`Value` headers.
    #[must_use]
    pub fn details(entries: Vec<(String, Value)>) -> Self {
        Self::KeyValue {
            key_header: "Property".to_string(),
            value_header: "Value".to_string(),
            entries,
        }
    }
}

/// Union of row keys in first-seen order.
#[must_use]
pub fn collect_headers(rows: &[Row]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

fn cell_text(value: Option<&Value>, missing: &str) -> String {
    match value {
        None | Some(Value::Null) => missing.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn json_cell(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        primitive => primitive.clone(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn new_table(headers: &[String]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let header: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header);
    table
}

fn write_csv(headers: &[String], records: Vec<Vec<String>>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let map_err = |e: csv::Error| CliError::Format(e.to_string());
    writer.write_record(headers).map_err(map_err)?;
    for record in records {
        writer.write_record(&record).map_err(map_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CliError::Format(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| CliError::Format(e.to_string()))?;
    Ok(text.trim_end_matches('\n').to_string())
}

fn to_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Format(e.to_string()))
}

/// Session-global renderer.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a formatter with an initial format.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Current format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Switches the format for every subsequent render.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] unless `name` is `table`, `json` or `csv`.
    pub fn set_format(&mut self, name: &str) -> Result<OutputFormat> {
        let format = OutputFormat::parse(name).ok_or_else(|| {
            CliError::Config(format!(
                "unknown output format '{name}', accepted: [table, json, csv]"
            ))
        })?;
        self.format = format;
        Ok(format)
    }

    /// Renders any view.
    pub fn render(&self, view: &View) -> Result<String> {
        match view {
            View::Message(text) => Ok(text.clone()),
            View::List { header, items } => self.render_list(items, header),
            View::Rows { headers, rows } => {
                if headers.is_empty() {
                    self.render_rows(rows, &collect_headers(rows))
                } else {
                    self.render_rows(rows, headers)
                }
            }
            View::KeyValue {
                key_header,
                value_header,
                entries,
            } => self.render_key_value(entries, key_header, value_header),
        }
    }

    /// Renders a flat list under one header.
    pub fn render_list(&self, items: &[String], header: &str) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                if items.is_empty() {
                    return Ok(NO_DATA.to_string());
                }
                let mut table = new_table(&[header.to_string()]);
                for item in items {
                    table.add_row(vec![Cell::new(item)]);
                }
                Ok(table.to_string())
            }
            OutputFormat::Json => to_pretty(&Value::from(items.to_vec())),
            OutputFormat::Csv => write_csv(
                &[header.to_string()],
                items.iter().map(|i| vec![i.clone()]).collect(),
            ),
        }
    }

    /// Renders records in `headers` order. Missing keys render as empty cells.
    pub fn render_rows(&self, rows: &[Row], headers: &[String]) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(NO_DATA.to_string());
                }
                let mut table = new_table(headers);
                for row in rows {
                    let cells: Vec<Cell> = headers
                        .iter()
                        .map(|h| Cell::new(cell_text(row.get(h), "-")))
                        .collect();
                    table.add_row(cells);
                }
                Ok(table.to_string())
            }
            OutputFormat::Json => {
                let records: Vec<Value> = rows
                    .iter()
                    .map(|row| {
                        let record: Map<String, Value> = headers
                            .iter()
                            .filter_map(|h| row.get(h).map(|v| (h.clone(), json_cell(v))))
                            .collect();
                        Value::Object(record)
                    })
                    .collect();
                to_pretty(&Value::Array(records))
            }
            OutputFormat::Csv => write_csv(
                headers,
                rows.iter()
                    .map(|row| headers.iter().map(|h| cell_text(row.get(h), "")).collect())
                    .collect(),
            ),
        }
    }

    /// Renders a single mapping as two columns.
    pub fn render_key_value(
        &self,
        entries: &[(String, Value)],
        key_header: &str,
        value_header: &str,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                if entries.is_empty() {
                    return Ok(NO_DATA.to_string());
                }
                let mut table = new_table(&[key_header.to_string(), value_header.to_string()]);
                for (key, value) in entries {
                    table.add_row(vec![Cell::new(key), Cell::new(cell_text(Some(value), "-"))]);
                }
                Ok(table.to_string())
            }
            OutputFormat::Json => {
                let object: Map<String, Value> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), json_cell(v)))
                    .collect();
                to_pretty(&Value::Object(object))
            }
            OutputFormat::Csv => write_csv(
                &[key_header.to_string(), value_header.to_string()],
                entries
                    .iter()
                    .map(|(k, v)| vec![k.clone(), cell_text(Some(v), "")])
                    .collect(),
            ),
        }
    }
}

/// Converts untyped data into a view, checking its shape.
///
/// # Errors
///
/// Returns [`CliError::Format`] naming the received type unless `value`
/// is a mapping, a sequence of mappings or a sequence of sequences.
pub fn view_from_value(value: &Value) -> Result<View> {
    match value {
        Value::Object(map) => Ok(View::details(
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(View::rows(
            items
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
        )),
        Value::Array(items) if items.iter().all(Value::is_array) => {
            let width = items
                .iter()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let headers: Vec<String> = (0..width).map(|i| i.to_string()).collect();
            let rows = items
                .iter()
                .filter_map(Value::as_array)
                .map(|cols| {
                    cols.iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v.clone()))
                        .collect::<Row>()
                })
                .collect();
            Ok(View::Rows { headers, rows })
        }
        Value::Array(items) => {
            let offending = items
                .iter()
                .find(|v| !v.is_object() && !v.is_array())
                .map_or("value", type_name);
            Err(CliError::Format(format!(
                "expected a mapping, a sequence of mappings or a sequence of sequences, got array containing {offending}"
            )))
        }
        other => Err(CliError::Format(format!(
            "expected a mapping, a sequence of mappings or a sequence of sequences, got {}",
            type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_set_format_rejects_unknown() {
        let mut f = Formatter::default();
        let err = f.set_format("yaml").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(f.format(), OutputFormat::Table);
        assert_eq!(f.set_format("JSON").unwrap(), OutputFormat::Json);
    }

    #[test]
    fn test_empty_table_renders_sentinel() {
        let f = Formatter::default();
        assert_eq!(f.render_list(&[], "Collections").unwrap(), NO_DATA);
        assert_eq!(f.render_rows(&[], &[]).unwrap(), NO_DATA);
        assert_eq!(f.render_key_value(&[], "k", "v").unwrap(), NO_DATA);
    }

    #[test]
    fn test_table_contains_header_and_items() {
        let f = Formatter::default();
        let out = f
            .render_list(&["a".to_string(), "b".to_string()], "Names")
            .unwrap();
        assert!(out.contains("Names"));
        assert!(out.contains('a'));
        assert!(out.contains('b'));
    }

    #[test]
    fn test_json_rows_stringify_non_primitives() {
        let f = Formatter::new(OutputFormat::Json);
        let rows = vec![row(json!({"id": 1, "vec": [0.5, 1.0], "title": "é"}))];
        let out = f.render_rows(&rows, &collect_headers(&rows)).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["id"], json!(1));
        assert_eq!(parsed[0]["vec"], json!("[0.5,1.0]"));
        assert!(out.contains('é'));
        assert!(out.contains("\n  {"));
    }

    #[test]
    fn test_csv_missing_keys_are_empty_cells() {
        let f = Formatter::new(OutputFormat::Csv);
        let rows = vec![row(json!({"id": 1, "name": "x"})), row(json!({"id": 2}))];
        let out = f.render_rows(&rows, &["id".into(), "name".into()]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["id,name", "1,x", "2,"]);
    }

    #[test]
    fn test_key_value_json_keeps_order() {
        let f = Formatter::new(OutputFormat::Json);
        let out = f
            .render_key_value(
                &[("zeta".into(), json!(1)), ("alpha".into(), json!("x"))],
                "Property",
                "Value",
            )
            .unwrap();
        assert!(out.find("zeta").unwrap() < out.find("alpha").unwrap());
    }

    #[test]
    fn test_view_from_value_shape_checks() {
        let f = Formatter::new(OutputFormat::Csv);
        assert!(matches!(view_from_value(&json!({"a": 1})), Ok(View::KeyValue { .. })));
        assert!(matches!(
            view_from_value(&json!([{"a": 1}, {"b": 2}])),
            Ok(View::Rows { ref headers, .. }) if headers.is_empty()
        ));
        let out = f.render(&view_from_value(&json!([[1, 2], [3]])).unwrap()).unwrap();
        assert_eq!(out.lines().next(), Some("0,1"));

        let err = view_from_value(&json!("text")).unwrap_err();
        assert!(matches!(err, CliError::Format(_)));
        assert!(err.to_string().contains("string"));
        let err = view_from_value(&json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn test_message_is_format_independent() {
        let view = View::message("Create collection successfully!");
        for format in OutputFormat::ALL {
            assert_eq!(
                Formatter::new(format).render(&view).unwrap(),
                "Create collection successfully!"
            );
        }
    }
}
