//! Spinners and tables for command-line output.
//!
//! - [`Spinner`] runs one task on a background thread and animates a progress
//!   line until it finishes.
//! - [`Table`] renders rows under declared columns, with per-column
//!   truncation, alignment and styling, and exports the same text as CSV.

pub mod ui;

pub use ui::{
    Alignment, Border, CellStyle, Color, ColorChoice, Column, Frames, Outcome, Row, Spinner,
    SpinnerModel, SpinnerStyle, Table, TableError, TableStyle, Target,
};
