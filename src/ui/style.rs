//! Cell styles, border glyphs and table style presets.

use std::str::FromStr;

use comfy_table::{Attribute, Cell};

pub use comfy_table::Color;

/// Color and weight applied to a single table cell.
///
/// Styles are plain values: every method consumes the style and returns a
/// modified copy, so a column's style function can start from the table's
/// row style and add to it.
///
/// ```text
/// CellStyle::new().fg(Color::Green).bold()
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CellStyle {
    fg: Option<Color>,
    bg: Option<Color>,
    bold: bool,
    dim: bool,
    italic: bool,
    underlined: bool,
}

impl CellStyle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    #[must_use]
    pub const fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub const fn dim(mut self) -> Self {
        self.dim = true;
        self
    }

    #[must_use]
    pub const fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub const fn underlined(mut self) -> Self {
        self.underlined = true;
        self
    }

    #[must_use]
    pub const fn foreground(&self) -> Option<Color> {
        self.fg
    }

    #[must_use]
    pub const fn background(&self) -> Option<Color> {
        self.bg
    }

    #[must_use]
    pub const fn is_bold(&self) -> bool {
        self.bold
    }

    #[must_use]
    pub const fn is_dim(&self) -> bool {
        self.dim
    }

    /// Attach this style to a layout cell.
    pub(crate) fn apply(&self, mut cell: Cell) -> Cell {
        if let Some(fg) = self.fg {
            cell = cell.fg(fg);
        }
        if let Some(bg) = self.bg {
            cell = cell.bg(bg);
        }
        let attributes = [
            (self.bold, Attribute::Bold),
            (self.dim, Attribute::Dim),
            (self.italic, Attribute::Italic),
            (self.underlined, Attribute::Underlined),
        ];
        for (enabled, attribute) in attributes {
            if enabled {
                cell = cell.add_attribute(attribute);
            }
        }
        cell
    }
}

/// Glyphs used to draw table borders.
///
/// Which of these are drawn is decided by the border toggles on
/// [`TableStyle`]; a glyph set on its own draws nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Border {
    pub top: char,
    pub bottom: char,
    pub left: char,
    pub right: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    /// Horizontal line under the header.
    pub middle: char,
    pub middle_left: char,
    pub middle_right: char,
    /// Column separator.
    pub column: char,
    pub middle_top: char,
    pub middle_bottom: char,
    /// Crossing of the header line and a column separator.
    pub cross: char,
}

impl Border {
    /// Spaces everywhere. Enabled edges keep their room but draw nothing.
    #[must_use]
    pub const fn hidden() -> Self {
        Self::uniform(' ', ' ', ' ')
    }

    /// Pipes and dashes, matching markdown table syntax.
    #[must_use]
    pub const fn markdown() -> Self {
        Self::uniform('-', '|', '|')
    }

    /// Plain ASCII box.
    #[must_use]
    pub const fn ascii() -> Self {
        Self::uniform('-', '|', '+')
    }

    /// Box drawing characters with square corners.
    #[must_use]
    pub const fn normal() -> Self {
        Self {
            top: '─',
            bottom: '─',
            left: '│',
            right: '│',
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
            middle: '─',
            middle_left: '├',
            middle_right: '┤',
            column: '│',
            middle_top: '┬',
            middle_bottom: '┴',
            cross: '┼',
        }
    }

    /// Box drawing characters with rounded corners.
    #[must_use]
    pub const fn rounded() -> Self {
        Self {
            top_left: '╭',
            top_right: '╮',
            bottom_left: '╰',
            bottom_right: '╯',
            ..Self::normal()
        }
    }

    const fn uniform(horizontal: char, vertical: char, joint: char) -> Self {
        Self {
            top: horizontal,
            bottom: horizontal,
            left: vertical,
            right: vertical,
            top_left: joint,
            top_right: joint,
            bottom_left: joint,
            bottom_right: joint,
            middle: horizontal,
            middle_left: joint,
            middle_right: joint,
            column: vertical,
            middle_top: joint,
            middle_bottom: joint,
            cross: joint,
        }
    }
}

/// Whether styled output should carry ANSI escapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Color when [`colors_enabled`] says so.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Resolve `Auto` against the environment.
    #[must_use]
    pub fn enabled(self) -> bool {
        match self {
            Self::Auto => colors_enabled(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown color choice `{other}` (expected auto, always or never)")),
        }
    }
}

/// Check if colors should be used based on environment.
#[must_use]
pub fn colors_enabled() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if let Ok(val) = std::env::var("CLICOLOR")
        && val == "0"
    {
        return false;
    }

    console::Term::stdout().is_term()
}

/// Complete visual configuration of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct TableStyle {
    pub header: CellStyle,
    /// Base style handed to each column's style function.
    pub row: CellStyle,
    pub border: Border,
    pub border_header: bool,
    pub border_column: bool,
    pub border_top: bool,
    pub border_left: bool,
    pub border_bottom: bool,
    pub border_right: bool,
    /// Spaces to the left and right of every cell.
    pub padding: (u16, u16),
    pub color: ColorChoice,
}

impl Default for TableStyle {
    /// Borderless, with a bold blue header.
    fn default() -> Self {
        Self {
            header: CellStyle::new().fg(Color::DarkBlue).bold(),
            row: CellStyle::new(),
            border: Border::hidden(),
            border_header: false,
            border_column: false,
            border_top: false,
            border_left: false,
            border_bottom: false,
            border_right: false,
            padding: (1, 1),
            color: ColorChoice::Auto,
        }
    }
}

impl TableStyle {
    /// Markdown table: pipes on the sides and between columns, dashes under the header.
    #[must_use]
    pub fn markdown() -> Self {
        Self {
            header: CellStyle::new().bold(),
            border: Border::markdown(),
            border_header: true,
            border_column: true,
            border_left: true,
            border_right: true,
            ..Self::default()
        }
    }

    /// Fully boxed table with rounded corners.
    #[must_use]
    pub fn rounded() -> Self {
        Self {
            border: Border::rounded(),
            border_header: true,
            border_column: true,
            border_top: true,
            border_left: true,
            border_bottom: true,
            border_right: true,
            ..Self::default()
        }
    }

    /// Fully boxed table drawn with ASCII only.
    #[must_use]
    pub fn ascii() -> Self {
        Self {
            border: Border::ascii(),
            ..Self::rounded()
        }
    }

    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Look up a preset by name: `default`, `markdown`, `rounded` or `ascii`.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" | "plain" => Some(Self::default()),
            "markdown" | "md" => Some(Self::markdown()),
            "rounded" => Some(Self::rounded()),
            "ascii" => Some(Self::ascii()),
            _ => None,
        }
    }
}
