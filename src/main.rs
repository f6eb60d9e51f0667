mod cli;
mod config;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

fn main() -> ExitCode {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    }

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            spintab::ui::status::print_error(&format!("Error: {e:#}"), None);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let colors = cli.color.enabled();
    console::set_colors_enabled(colors);
    console::set_colors_enabled_stderr(colors);

    match cli.command {
        Command::Table {
            rows,
            layout,
            style,
        } => {
            cli::table(&rows, layout.as_deref(), style.as_deref(), cli.color)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Export {
            rows,
            layout,
            output,
        } => {
            cli::export(&rows, layout.as_deref(), output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            title,
            frames,
            command,
        } => cli::run(&title, &frames, &command),
    }
}
