//! Terminal presentation helpers: a task spinner and a column-driven table.

pub mod spinner;
pub mod status;
pub mod style;
pub mod table;

pub use spinner::{Frames, Outcome, Spinner, SpinnerModel, SpinnerStyle, Target};
pub use style::{Border, CellStyle, Color, ColorChoice, TableStyle};
pub use table::{Alignment, Column, Row, Table, TableError};
