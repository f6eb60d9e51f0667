//! Table layouts and row files for the `spintab` binary.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use spintab::{Alignment, CellStyle, Color, Column, Row, TableStyle};

/// Column layout loaded from a TOML file.
///
/// ```toml
/// style = "markdown"
///
/// [[columns]]
/// key = "status"
/// title = "Status"
/// max_width = 12
/// align = "center"
/// empty = "-"
/// transform = "upper"
/// highlight = [{ value = "OK", color = "green", bold = true }]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    /// Style preset name, overridden by `--style`.
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub key: String,
    /// Defaults to the key.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub max_width: Option<usize>,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub empty: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub highlight: Vec<Highlight>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Upper,
    Lower,
    Trim,
}

/// Style a cell whose final text equals `value`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Highlight {
    pub value: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub dim: bool,
}

const fn default_active() -> bool {
    true
}

impl From<Align> for Alignment {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => Self::Left,
            Align::Center => Self::Center,
            Align::Right => Self::Right,
        }
    }
}

impl Transform {
    fn apply(self, value: &str) -> String {
        match self {
            Self::Upper => value.to_uppercase(),
            Self::Lower => value.to_lowercase(),
            Self::Trim => value.trim().to_string(),
        }
    }
}

impl Layout {
    /// Load a layout from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout from {}", path.display()))?;
        let layout: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse layout {}", path.display()))?;
        Ok(layout)
    }

    /// Resolve the style preset, preferring `override_name` over the file's.
    pub fn style(&self, override_name: Option<&str>) -> Result<TableStyle> {
        override_name.or(self.style.as_deref()).map_or_else(
            || Ok(TableStyle::default()),
            |name| TableStyle::preset(name).with_context(|| format!("Unknown table style `{name}`")),
        )
    }

    /// Build the table columns. Without declared columns, every key found in
    /// the rows becomes a column titled by its key.
    pub fn columns(&self, keys: &[String]) -> Result<Vec<Column>> {
        if self.columns.is_empty() {
            return Ok(keys.iter().map(|key| Column::new(key, key)).collect());
        }
        self.columns.iter().map(ColumnSpec::to_column).collect()
    }
}

impl ColumnSpec {
    fn to_column(&self) -> Result<Column> {
        let title = self.title.clone().unwrap_or_else(|| self.key.clone());
        let mut column = Column::new(&self.key, title)
            .with_active(self.active)
            .with_alignment(self.align.into())
            .with_empty_string(&self.empty);

        if let Some(width) = self.max_width {
            column = column.with_max_width(width);
        }

        if let Some(transform) = self.transform {
            column = column.with_value_fn(move |value| transform.apply(value));
        }

        if !self.highlight.is_empty() {
            let rules = self
                .highlight
                .iter()
                .map(|h| -> Result<(String, Highlighter)> {
                    Ok((h.value.clone(), h.to_style(&self.key)?))
                })
                .collect::<Result<Vec<_>>>()?;
            column = column.with_style_fn(move |style, value| {
                rules
                    .iter()
                    .find(|(target, _)| target == value)
                    .into_iter()
                    .fold(style, |style, (_, rule)| rule.apply(style))
            });
        }

        Ok(column)
    }
}

/// Resolved form of a [`Highlight`].
#[derive(Debug, Clone, Copy)]
struct Highlighter {
    color: Option<Color>,
    bold: bool,
    dim: bool,
}

impl Highlighter {
    const fn apply(self, mut style: CellStyle) -> CellStyle {
        if let Some(color) = self.color {
            style = style.fg(color);
        }
        if self.bold {
            style = style.bold();
        }
        if self.dim {
            style = style.dim();
        }
        style
    }
}

impl Highlight {
    fn to_style(&self, key: &str) -> Result<Highlighter> {
        let color = self
            .color
            .as_deref()
            .map(|name| {
                parse_color(name).with_context(|| {
                    format!("Unknown color `{name}` in highlight for column `{key}`")
                })
            })
            .transpose()?;
        Ok(Highlighter {
            color,
            bold: self.bold,
            dim: self.dim,
        })
    }
}

/// Parse a color name (`red`, `dark_green`, ...) or an ANSI index (`0`-`255`).
pub fn parse_color(name: &str) -> Option<Color> {
    if let Ok(index) = name.parse::<u8>() {
        return Some(Color::AnsiValue(index));
    }

    let color = match name.to_ascii_lowercase().replace('-', "_").as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "grey" | "gray" => Color::Grey,
        "dark_grey" | "dark_gray" => Color::DarkGrey,
        "dark_red" => Color::DarkRed,
        "dark_green" => Color::DarkGreen,
        "dark_yellow" => Color::DarkYellow,
        "dark_blue" => Color::DarkBlue,
        "dark_magenta" => Color::DarkMagenta,
        "dark_cyan" => Color::DarkCyan,
        _ => return None,
    };
    Some(color)
}

/// Rows read from a file, plus every key in first-seen order.
#[derive(Debug, Default)]
pub struct RowSet {
    pub keys: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Load rows from a `.csv` file (header record required) or a JSON array
    /// of objects.
    pub fn load(path: &Path) -> Result<Self> {
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        if is_csv {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Self::from_csv(file).with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rows from {}", path.display()))?;
            Self::from_json(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        }
    }

    /// Parse a JSON array of objects. Non-string values are written as JSON,
    /// `null` as an empty string.
    pub fn from_json(contents: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let Some(items) = value.as_array() else {
            bail!("Expected a JSON array of objects");
        };

        let mut set = Self::default();
        for (idx, item) in items.iter().enumerate() {
            let Some(object) = item.as_object() else {
                bail!("Row {idx} is not an object");
            };
            let mut row = Row::new();
            for (key, value) in object {
                set.note_key(key);
                let text = match value {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                row.insert(key.clone(), text);
            }
            set.rows.push(row);
        }
        Ok(set)
    }

    pub fn from_csv(reader: impl std::io::Read) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let keys: Vec<String> = csv.headers()?.iter().map(String::from).collect();

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            rows.push(
                keys.iter()
                    .cloned()
                    .zip(record.iter().map(String::from))
                    .collect::<Row>(),
            );
        }
        Ok(Self { keys, rows })
    }

    fn note_key(&mut self, key: &str) {
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(key.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const LAYOUT: &str = r#"
style = "markdown"

[[columns]]
key = "id"
title = "ID"
align = "right"

[[columns]]
key = "status"
title = "Status"
empty = "-"
transform = "upper"
highlight = [{ value = "OK", color = "green", bold = true }]

[[columns]]
key = "secret"
active = false
"#;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn layout_parses_columns() {
        let layout: Layout = toml::from_str(LAYOUT).unwrap();
        assert_eq!(layout.style.as_deref(), Some("markdown"));
        assert_eq!(layout.columns.len(), 3);
        assert_eq!(layout.columns[0].align, Align::Right);
        assert_eq!(layout.columns[1].transform, Some(Transform::Upper));
        assert!(!layout.columns[2].active);
        assert!(layout.columns[0].active);
    }

    #[test]
    fn layout_builds_columns_with_rules() {
        let layout: Layout = toml::from_str(LAYOUT).unwrap();
        let columns = layout.columns(&[]).unwrap();

        assert_eq!(columns[0].alignment(), Alignment::Right);
        assert_eq!(columns[2].title(), "secret");

        let status = &columns[1];
        assert_eq!(status.cell_text(&row(&[("status", "ok")])), "OK");
        assert_eq!(status.cell_text(&row(&[])), "-");

        let highlighted = status.style_for(CellStyle::new(), "OK");
        assert!(highlighted.is_bold());
        assert_eq!(highlighted.foreground(), Some(Color::Green));
        assert_eq!(status.style_for(CellStyle::new(), "FAIL"), CellStyle::new());
    }

    #[test]
    fn empty_layout_uses_row_keys() {
        let columns = Layout::default()
            .columns(&["b".to_string(), "a".to_string()])
            .unwrap();
        let keys: Vec<&str> = columns.iter().map(Column::key).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(columns[0].title(), "b");
    }

    #[test]
    fn unknown_highlight_color_is_an_error() {
        let layout: Layout = toml::from_str(
            r#"
[[columns]]
key = "s"
highlight = [{ value = "x", color = "chartreuse" }]
"#,
        )
        .unwrap();
        let err = layout.columns(&[]).unwrap_err();
        assert!(err.to_string().contains("chartreuse"));
    }

    #[test]
    fn unknown_layout_fields_are_rejected() {
        let result: std::result::Result<Layout, _> = toml::from_str("colums = []");
        assert!(result.is_err());
    }

    #[test]
    fn style_override_wins() {
        let layout: Layout = toml::from_str(LAYOUT).unwrap();
        assert_eq!(layout.style(None).unwrap(), TableStyle::markdown());
        assert_eq!(layout.style(Some("rounded")).unwrap(), TableStyle::rounded());
        assert!(layout.style(Some("fancy")).is_err());
        assert_eq!(Layout::default().style(None).unwrap(), TableStyle::default());
    }

    #[test]
    fn parse_color_names_and_indices() {
        assert_eq!(parse_color("Red"), Some(Color::Red));
        assert_eq!(parse_color("dark-blue"), Some(Color::DarkBlue));
        assert_eq!(parse_color("208"), Some(Color::AnsiValue(208)));
        assert_eq!(parse_color("puce"), None);
    }

    #[test]
    fn json_rows_keep_key_order_and_stringify() {
        let set = RowSet::from_json(
            r#"[{"name": "a", "size": 3, "note": null}, {"extra": true, "name": "b"}]"#,
        )
        .unwrap();
        assert_eq!(set.keys, vec!["name", "size", "note", "extra"]);
        assert_eq!(set.rows[0]["size"], "3");
        assert_eq!(set.rows[0]["note"], "");
        assert_eq!(set.rows[1]["extra"], "true");
        assert!(!set.rows[1].contains_key("size"));
    }

    #[test]
    fn json_rows_must_be_objects() {
        assert!(RowSet::from_json("{}").is_err());
        assert!(RowSet::from_json("[1, 2]").is_err());
    }

    #[test]
    fn csv_rows_follow_header() {
        let set = RowSet::from_csv("id,status\n1,OK\n2,FAIL\n".as_bytes()).unwrap();
        assert_eq!(set.keys, vec!["id", "status"]);
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[1]["status"], "FAIL");
    }

    #[test]
    fn load_reads_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("rows.csv");
        std::fs::write(&csv_path, "a,b\n1,2\n").unwrap();
        assert_eq!(RowSet::load(&csv_path).unwrap().keys, vec!["a", "b"]);

        let json_path = dir.path().join("rows.json");
        std::fs::write(&json_path, r#"[{"x": "1"}]"#).unwrap();
        assert_eq!(RowSet::load(&json_path).unwrap().keys, vec!["x"]);
    }

    #[test]
    fn layout_load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "style = 5").unwrap();
        let err = Layout::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse layout"));

        let missing = Layout::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read layout"));
    }
}
