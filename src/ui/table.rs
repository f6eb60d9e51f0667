//! Column-driven tables for CLI output.
//!
//! A [`Table`] owns an ordered set of [`Column`]s and an ordered set of
//! [`Row`]s. Every cell goes through the same pipeline, for both the grid and
//! the CSV export:
//!
//! 1. look the value up by column key (missing keys read as `""`);
//! 2. run the column's value function;
//! 3. replace an empty result with the column's empty string;
//! 4. truncate to the column's max width, ending in `...`.
//!
//! # Example
//! ```text
//!  ID   Service        Status
//!  1    Index Builder  OK
//!  2    Link Checker   FAIL
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::sync::Arc;

use comfy_table::{Cell, CellAlignment, ContentArrangement, TableComponent};
use thiserror::Error;

use super::style::{CellStyle, TableStyle};

/// Suffix appended to truncated values.
pub const ELLIPSIS: &str = "...";

/// A row maps column keys to raw values.
pub type Row = HashMap<String, String>;

type ValueFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
type StyleFn = Arc<dyn Fn(CellStyle, &str) -> CellStyle + Send + Sync>;

/// Errors raised while assembling a table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("column `{key}` has max width {max_width}, which leaves no room for the ellipsis")]
    MaxWidthTooSmall { key: String, max_width: usize },

    #[error("column key `{0}` is declared more than once")]
    DuplicateKey(String),
}

/// Horizontal alignment of a column's cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl From<Alignment> for CellAlignment {
    fn from(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Left => Self::Left,
            Alignment::Center => Self::Center,
            Alignment::Right => Self::Right,
        }
    }
}

/// A column of a [`Table`] along with its formatting rules.
#[derive(Clone)]
pub struct Column {
    key: String,
    title: String,
    active: bool,
    max_width: Option<usize>,
    alignment: Alignment,
    empty: String,
    value_fn: ValueFn,
    style_fn: StyleFn,
}

impl Column {
    /// Create a visible, left-aligned column with no width limit.
    #[must_use]
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            active: true,
            max_width: None,
            alignment: Alignment::Left,
            empty: String::new(),
            value_fn: Arc::new(str::to_string),
            style_fn: Arc::new(|style: CellStyle, _: &str| style),
        }
    }

    /// Truncate values wider than `width`, keeping room for the ellipsis.
    #[must_use]
    pub const fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }

    #[must_use]
    pub const fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Show or hide the column.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Text shown in place of an empty value. Applied after the value function.
    #[must_use]
    pub fn with_empty_string(mut self, empty: impl Into<String>) -> Self {
        self.empty = empty.into();
        self
    }

    /// Transform every raw value of the column before it is shown.
    #[must_use]
    pub fn with_value_fn<F>(mut self, value_fn: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.value_fn = Arc::new(value_fn);
        self
    }

    /// Pick a style per cell from the table's row style and the final cell text.
    ///
    /// ```text
    /// Column::new("status", "Status").with_style_fn(|style, value| {
    ///     if value == "OK" { style.bold() } else { style }
    /// })
    /// ```
    #[must_use]
    pub fn with_style_fn<F>(mut self, style_fn: F) -> Self
    where
        F: Fn(CellStyle, &str) -> CellStyle + Send + Sync + 'static,
    {
        self.style_fn = Arc::new(style_fn);
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn max_width(&self) -> Option<usize> {
        self.max_width
    }

    #[must_use]
    pub const fn alignment(&self) -> Alignment {
        self.alignment
    }

    #[must_use]
    pub fn empty_string(&self) -> &str {
        &self.empty
    }

    /// Style for a body cell of this column.
    #[must_use]
    pub fn style_for(&self, base: CellStyle, value: &str) -> CellStyle {
        (self.style_fn)(base, value)
    }

    /// Run the cell pipeline for `row`.
    #[must_use]
    pub fn cell_text(&self, row: &Row) -> String {
        let raw = row.get(&self.key).map_or("", String::as_str);
        let mut value = (self.value_fn)(raw);

        if value.is_empty() {
            value.clone_from(&self.empty);
        }

        match self.max_width {
            Some(width) if console::measure_text_width(&value) > width => {
                console::truncate_str(&value, width, ELLIPSIS).into_owned()
            }
            _ => value,
        }
    }

    fn validate(&self) -> Result<(), TableError> {
        match self.max_width {
            Some(width) if width <= ELLIPSIS.len() => Err(TableError::MaxWidthTooSmall {
                key: self.key.clone(),
                max_width: width,
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("active", &self.active)
            .field("max_width", &self.max_width)
            .field("alignment", &self.alignment)
            .field("empty", &self.empty)
            .finish_non_exhaustive()
    }
}

/// A table of string rows under a fixed set of columns.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
    style: TableStyle,
}

impl Table {
    /// Create an empty table over `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateKey`] if two columns share a key, and
    /// [`TableError::MaxWidthTooSmall`] if a column's max width leaves no room
    /// for the ellipsis.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.key.as_str()) {
                return Err(TableError::DuplicateKey(column.key.clone()));
            }
            column.validate()?;
        }

        Ok(Self {
            columns,
            rows: Vec::new(),
            style: TableStyle::default(),
        })
    }

    #[must_use]
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    /// Replace the table's rows. Order is kept.
    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows = rows.into_iter().collect();
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub const fn style(&self) -> &TableStyle {
        &self.style
    }

    /// Titles of the active columns, in declared order.
    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.active_columns().map(Column::title).collect()
    }

    /// Final text of every cell, one inner vector per row.
    #[must_use]
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| self.active_columns().map(|col| col.cell_text(row)).collect())
            .collect()
    }

    /// Render the styled grid.
    #[must_use]
    pub fn render(&self) -> String {
        // Grid position -> declared column index.
        let visible: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, col)| col.active.then_some(idx))
            .collect();

        if visible.is_empty() {
            return String::new();
        }

        let cells = self.cells();
        tracing::debug!(
            columns = visible.len(),
            rows = cells.len(),
            "Rendering table"
        );

        let mut grid = comfy_table::Table::new();
        self.apply_borders(&mut grid);
        grid.set_content_arrangement(ContentArrangement::Disabled);
        if self.style.color.enabled() {
            grid.enforce_styling();
        } else {
            grid.force_no_tty();
        }

        let header: Vec<Cell> = visible
            .iter()
            .map(|&idx| {
                let column = &self.columns[idx];
                self.style
                    .header
                    .apply(Cell::new(&column.title))
                    .set_alignment(column.alignment.into())
            })
            .collect();
        grid.set_header(header);

        for row in &cells {
            let styled: Vec<Cell> = row
                .iter()
                .enumerate()
                .map(|(pos, value)| {
                    let column = &self.columns[visible[pos]];
                    column
                        .style_for(self.style.row.clone(), value)
                        .apply(Cell::new(value))
                        .set_alignment(column.alignment.into())
                })
                .collect();
            grid.add_row(styled);
        }

        for pos in 0..visible.len() {
            if let Some(column) = grid.column_mut(pos) {
                column.set_padding(self.style.padding);
            }
        }

        grid.to_string()
    }

    /// Render the table to stdout.
    pub fn print(&self) {
        println!("{self}");
    }

    /// Write the active headers and every row's cell text as CSV.
    ///
    /// Styling and alignment are not part of the export. With no active
    /// column, every record is a bare line terminator.
    ///
    /// # Errors
    ///
    /// Returns the writer's error if writing or flushing fails.
    pub fn export_csv<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        let headers = self.headers();
        let cells = self.cells();

        if headers.is_empty() {
            for _ in 0..=cells.len() {
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            tracing::debug!(rows = cells.len(), "Exported table without columns as CSV");
            return Ok(());
        }

        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&headers).map_err(into_io)?;
        for row in &cells {
            csv.write_record(row).map_err(into_io)?;
        }
        csv.flush()?;

        tracing::debug!(rows = cells.len(), "Exported table as CSV");
        Ok(())
    }

    fn active_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|col| col.active)
    }

    fn apply_borders(&self, grid: &mut comfy_table::Table) {
        use TableComponent as C;

        for component in TableComponent::iter() {
            grid.remove_style(component);
        }

        let s = &self.style;
        let b = &s.border;
        let mut set = |enabled: bool, component: TableComponent, glyph: char| {
            if enabled {
                grid.set_style(component, glyph);
            }
        };

        set(s.border_left, C::LeftBorder, b.left);
        set(s.border_right, C::RightBorder, b.right);
        set(s.border_column, C::VerticalLines, b.column);

        set(s.border_top, C::TopBorder, b.top);
        set(s.border_top && s.border_left, C::TopLeftCorner, b.top_left);
        set(s.border_top && s.border_right, C::TopRightCorner, b.top_right);
        set(s.border_top && s.border_column, C::TopBorderIntersections, b.middle_top);

        set(s.border_bottom, C::BottomBorder, b.bottom);
        set(s.border_bottom && s.border_left, C::BottomLeftCorner, b.bottom_left);
        set(s.border_bottom && s.border_right, C::BottomRightCorner, b.bottom_right);
        set(s.border_bottom && s.border_column, C::BottomBorderIntersections, b.middle_bottom);

        set(s.border_header, C::HeaderLines, b.middle);
        set(s.border_header && s.border_left, C::LeftHeaderIntersection, b.middle_left);
        set(s.border_header && s.border_right, C::RightHeaderIntersection, b.middle_right);
        set(s.border_header && s.border_column, C::MiddleHeaderIntersections, b.cross);
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Unwrap the writer's own error from a CSV error.
fn into_io(err: csv::Error) -> io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(err) => err,
        kind => io::Error::other(format!("{kind:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::style::ColorChoice;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn plain() -> TableStyle {
        TableStyle::default().with_color(ColorChoice::Never)
    }

    fn status_table() -> Table {
        let columns = vec![
            Column::new("id", "ID"),
            Column::new("status", "Status").with_style_fn(|style, value| {
                if value == "OK" { style.bold() } else { style }
            }),
        ];
        Table::new(columns)
            .unwrap()
            .with_rows(vec![
                row(&[("id", "1"), ("status", "OK")]),
                row(&[("id", "2"), ("status", "FAIL")]),
            ])
    }

    #[test]
    fn missing_key_reads_as_empty() {
        let column = Column::new("name", "Name").with_empty_string("-");
        assert_eq!(column.cell_text(&row(&[("other", "x")])), "-");
    }

    #[test]
    fn value_fn_runs_before_empty_substitution() {
        let column = Column::new("name", "Name")
            .with_value_fn(|v| v.trim().to_string())
            .with_empty_string("n/a");
        assert_eq!(column.cell_text(&row(&[("name", "   ")])), "n/a");
        assert_eq!(column.cell_text(&row(&[("name", " bob ")])), "bob");
    }

    #[test]
    fn empty_substitute_only_replaces_empty_values() {
        let column = Column::new("v", "V").with_empty_string("-");
        assert_eq!(column.cell_text(&row(&[("v", "0")])), "0");
        assert_eq!(column.cell_text(&row(&[("v", "")])), "-");
    }

    #[test]
    fn long_values_are_truncated_to_max_width() {
        let column = Column::new("v", "V").with_max_width(8);
        let text = column.cell_text(&row(&[("v", "abcdefghijklmnop")]));
        assert_eq!(text, "abcde...");
        assert_eq!(text.len(), 8);
    }

    #[test]
    fn values_at_max_width_are_untouched() {
        let column = Column::new("v", "V").with_max_width(5);
        assert_eq!(column.cell_text(&row(&[("v", "abcde")])), "abcde");
    }

    #[test]
    fn substitute_is_truncated_too() {
        let column = Column::new("v", "V")
            .with_empty_string("nothing here")
            .with_max_width(7);
        assert_eq!(column.cell_text(&Row::new()), "noth...");
    }

    #[test]
    fn max_width_must_exceed_ellipsis() {
        let err = Table::new(vec![Column::new("v", "V").with_max_width(3)]).unwrap_err();
        assert_eq!(
            err,
            TableError::MaxWidthTooSmall {
                key: "v".to_string(),
                max_width: 3
            }
        );
        assert!(Table::new(vec![Column::new("v", "V").with_max_width(4)]).is_ok());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = Table::new(vec![Column::new("a", "A"), Column::new("a", "Again")]).unwrap_err();
        assert_eq!(err, TableError::DuplicateKey("a".to_string()));
    }

    #[test]
    fn builders_return_independent_copies() {
        let base = Column::new("v", "V");
        let hidden = base.clone().with_active(false);
        assert!(base.is_active());
        assert!(!hidden.is_active());
    }

    #[test]
    fn inactive_columns_are_skipped_everywhere() {
        let table = Table::new(vec![
            Column::new("a", "Alpha"),
            Column::new("secret", "Secret").with_active(false),
            Column::new("b", "Beta"),
        ])
        .unwrap()
        .with_style(plain())
        .with_rows(vec![row(&[("a", "1"), ("secret", "hunter2"), ("b", "2")])]);

        assert_eq!(table.headers(), vec!["Alpha", "Beta"]);
        assert_eq!(table.cells(), vec![vec!["1".to_string(), "2".to_string()]]);

        let rendered = table.render();
        assert!(!rendered.contains("Secret"));
        assert!(!rendered.contains("hunter2"));

        let mut out = Vec::new();
        table.export_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert!(!csv.contains("Secret"));
        assert!(!csv.contains("hunter2"));
    }

    #[test]
    fn render_has_one_header_line_in_declared_order() {
        let table = status_table().with_style(plain());
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), vec!["ID", "Status"]);
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), vec!["1", "OK"]);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), vec!["2", "FAIL"]);
    }

    #[test]
    fn style_fn_bolds_matching_cells_only() {
        let table = status_table().with_style(TableStyle::default().with_color(ColorChoice::Always));
        let rendered = table.render();
        let ok = rendered.lines().find(|l| l.contains("OK")).unwrap();
        let fail = rendered.lines().find(|l| l.contains("FAIL")).unwrap();

        assert!(ok.contains("\u{1b}[1m"), "expected bold OK cell: {ok:?}");
        assert!(!fail.contains("\u{1b}[1m"), "FAIL cell should not be bold: {fail:?}");
    }

    #[test]
    fn style_fn_sees_base_row_style_and_final_text() {
        let column = Column::new("v", "V").with_style_fn(|style, value| {
            if value == "..." { style } else { style.dim() }
        });
        let base = CellStyle::new().bold();
        let style = column.style_for(base, "x");
        assert!(style.is_bold());
        assert!(style.is_dim());
    }

    #[test]
    fn never_color_renders_without_escapes() {
        let rendered = status_table().with_style(plain()).render();
        assert!(!rendered.contains('\u{1b}'));
    }

    #[test]
    fn right_alignment_pads_on_the_left() {
        let table = Table::new(vec![Column::new("n", "N").with_alignment(Alignment::Right)])
            .unwrap()
            .with_style(plain())
            .with_rows(vec![row(&[("n", "1")]), row(&[("n", "100")])]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().map(str::trim_end).collect();

        assert!(lines[1].ends_with(" 1"));
        assert_eq!(lines[1].len(), lines[2].len());
        assert_eq!(lines[0].len(), lines[2].len());
    }

    #[test]
    fn left_alignment_pads_on_the_right() {
        let table = Table::new(vec![Column::new("n", "N")])
            .unwrap()
            .with_style(plain())
            .with_rows(vec![row(&[("n", "1")]), row(&[("n", "100")])]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().map(str::trim_end).collect();

        assert!(lines[1].len() < lines[2].len());
    }

    #[test]
    fn markdown_style_draws_pipes_and_header_rule() {
        let table = status_table().with_style(TableStyle::markdown().with_color(ColorChoice::Never));
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with('|') && l.trim_end().ends_with('|')));
        assert!(lines[1].chars().all(|c| c == '|' || c == '-'));
    }

    #[test]
    fn rounded_style_boxes_the_table() {
        let table = status_table().with_style(TableStyle::rounded().with_color(ColorChoice::Never));
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        // top, header, rule, two rows, bottom
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with('╭'));
        assert!(lines[5].starts_with('╰'));
    }

    #[test]
    fn render_is_idempotent() {
        let table = status_table().with_style(plain());
        assert_eq!(table.render(), table.render());
        assert_eq!(table.to_string(), table.render());
    }

    #[test]
    fn no_active_columns_renders_nothing() {
        let table = Table::new(vec![Column::new("a", "A").with_active(false)])
            .unwrap()
            .with_rows(vec![row(&[("a", "1")])]);
        assert_eq!(table.render(), "");
        assert_eq!(table.cells(), vec![Vec::<String>::new()]);
    }

    #[test]
    fn csv_parses_back_to_headers_and_cells() {
        let table = Table::new(vec![
            Column::new("name", "Name").with_max_width(6),
            Column::new("note", "Note, quoted").with_empty_string("-"),
            Column::new("n", "N").with_value_fn(|v| format!("#{v}")),
        ])
        .unwrap()
        .with_rows(vec![
            row(&[("name", "Alexandria"), ("note", "says \"hi\""), ("n", "1")]),
            row(&[("name", "Bo"), ("n", "2")]),
        ]);

        let mut out = Vec::new();
        table.export_csv(&mut out).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, table.headers());

        let records: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(records, table.cells());
        assert_eq!(records[0][0], "Ale...");
        assert_eq!(records[1][1], "-");
    }

    #[test]
    fn csv_without_active_columns_has_no_fields() {
        let table = Table::new(vec![Column::new("id", "ID").with_active(false)])
            .unwrap()
            .with_rows(vec![row(&[("id", "1")]), row(&[("id", "2")])]);

        let mut out = Vec::new();
        table.export_csv(&mut out).unwrap();
        assert_eq!(out, b"\n\n\n");

        let mut reader = csv::Reader::from_reader(out.as_slice());
        assert!(reader.headers().unwrap().is_empty());
        assert!(table.headers().is_empty());
        assert!(reader.records().all(|r| r.unwrap().is_empty()));
        assert!(table.cells().iter().all(Vec::is_empty));
    }

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn csv_export_propagates_writer_errors() {
        let err = status_table().export_csv(BrokenPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
