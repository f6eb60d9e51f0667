//! CLI command handling for spintab.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spintab::ColorChoice;

pub use commands::{export, run, table};

#[derive(Parser)]
#[command(name = "spintab")]
#[command(about = "Render tables and run commands behind a spinner")]
#[command(version)]
pub struct Cli {
    /// When to use colors: auto, always or never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print rows as a table
    Table {
        /// JSON array of objects, or a .csv file with a header
        rows: PathBuf,
        /// TOML file describing the columns
        #[arg(long)]
        layout: Option<PathBuf>,
        /// Table style: default, markdown, rounded or ascii
        #[arg(long)]
        style: Option<String>,
    },
    /// Write rows as CSV, after the layout's transforms
    Export {
        rows: PathBuf,
        #[arg(long)]
        layout: Option<PathBuf>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a command with a spinner until it exits
    Run {
        /// Text shown next to the spinner
        title: String,
        /// Animation: line, dot, mini_dot, jump, pulse, points, meter or ellipsis
        #[arg(long, default_value = "line")]
        frames: String,
        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}
