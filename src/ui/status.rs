//! Status indicators for CLI output.
//!
//! Provides `[ok]` and `[!!]` status prefixes.

use console::style;

/// Status indicator states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Success - green `[ok]`
    Ok,
    /// Error - red `[!!]`
    Error,
}

impl Status {
    /// Render the status indicator as a styled string.
    #[must_use]
    pub fn render(self) -> String {
        match self {
            Self::Ok => format!("[{}]", style("ok").green()),
            Self::Error => format!("[{}]", style("!!").red()),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A status line with indicator and message.
pub struct StatusLine {
    status: Status,
    message: String,
}

impl StatusLine {
    #[must_use]
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// Print the status line to stderr, keeping stdout for data.
    pub fn print(&self) {
        eprintln!("{self}");
    }
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

/// Print an error message with help text.
pub fn print_error(message: &str, help: Option<&str>) {
    StatusLine::error(message).print();

    if let Some(help_text) = help {
        for line in help_text.lines() {
            eprintln!("     {}", style(line).dim());
        }
    }
}
