//! CLI commands.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::{Command, ExitCode};
use std::sync::mpsc;

use anyhow::{Context, Result, bail};
use spintab::ui::status::StatusLine;
use spintab::{ColorChoice, Frames, Spinner, Table};

use crate::config::{Layout, RowSet};

/// Build a table from a rows file and an optional layout.
fn load_table(rows: &Path, layout: Option<&Path>, style: Option<&str>) -> Result<Table> {
    let layout = layout.map(Layout::load).transpose()?.unwrap_or_default();
    let set = RowSet::load(rows)?;
    tracing::debug!(rows = set.rows.len(), keys = set.keys.len(), "Loaded rows");

    let table = Table::new(layout.columns(&set.keys)?)
        .context("Invalid column layout")?
        .with_style(layout.style(style)?)
        .with_rows(set.rows);
    Ok(table)
}

pub fn table(
    rows: &Path,
    layout: Option<&Path>,
    style: Option<&str>,
    color: ColorChoice,
) -> Result<()> {
    let table = load_table(rows, layout, style)?;
    let style = table.style().clone().with_color(color);
    table.with_style(style).print();
    Ok(())
}

pub fn export(rows: &Path, layout: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let table = load_table(rows, layout, None)?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            table
                .export_csv(BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            StatusLine::ok(format!("Wrote {}", path.display())).print();
        }
        None => {
            table
                .export_csv(io::stdout().lock())
                .context("Failed to write CSV to stdout")?;
        }
    }

    Ok(())
}

/// Run a command with its output captured, showing a spinner meanwhile.
///
/// The command's stdout is printed once it succeeds.
pub fn run(title: &str, frames: &str, command: &[String]) -> Result<ExitCode> {
    let Some((program, args)) = command.split_first() else {
        bail!("No command given");
    };
    let frames =
        Frames::preset(frames).with_context(|| format!("Unknown spinner frames `{frames}`"))?;

    let program = program.clone();
    let args = args.to_vec();
    let (out_tx, out_rx) = mpsc::channel();

    let result = Spinner::new(title)
        .with_frames(frames)
        .run(move || -> Result<()> {
            let output = Command::new(&program)
                .args(&args)
                .output()
                .with_context(|| format!("could not start `{program}`"))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                    Some(line) => bail!("{} ({})", output.status, line.trim()),
                    None => bail!("{}", output.status),
                }
            }

            let _ = out_tx.send(output.stdout);
            Ok(())
        });

    match result {
        Ok(()) => {
            if let Ok(stdout) = out_rx.try_recv() {
                io::stdout()
                    .write_all(&stdout)
                    .context("Failed to forward command output")?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::debug!("Command failed: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_table_applies_layout() {
        let dir = tempfile::tempdir().unwrap();
        let rows = dir.path().join("rows.json");
        std::fs::write(
            &rows,
            r#"[{"id": 1, "status": "ok", "secret": "x"}, {"id": 2, "status": ""}]"#,
        )
        .unwrap();
        let layout = dir.path().join("layout.toml");
        std::fs::write(
            &layout,
            r#"
[[columns]]
key = "id"
title = "ID"

[[columns]]
key = "status"
title = "Status"
transform = "upper"
empty = "?"
"#,
        )
        .unwrap();

        let table = load_table(&rows, Some(&layout), None).unwrap();
        assert_eq!(table.headers(), vec!["ID", "Status"]);
        assert_eq!(
            table.cells(),
            vec![vec!["1".to_string(), "OK".to_string()], vec!["2".to_string(), "?".to_string()]]
        );
    }

    #[test]
    fn load_table_rejects_narrow_columns() {
        let dir = tempfile::tempdir().unwrap();
        let rows = dir.path().join("rows.csv");
        std::fs::write(&rows, "a\n1\n").unwrap();
        let layout = dir.path().join("layout.toml");
        std::fs::write(&layout, "[[columns]]\nkey = \"a\"\nmax_width = 2\n").unwrap();

        let err = load_table(&rows, Some(&layout), None).unwrap_err();
        assert!(err.to_string().contains("Invalid column layout"));
    }

    #[test]
    fn export_writes_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let rows = dir.path().join("rows.csv");
        std::fs::write(&rows, "name,size\nalpha,1\nbeta,2\n").unwrap();
        let out = dir.path().join("out.csv");

        export(&rows, None, Some(&out)).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, "name,size\nalpha,1\nbeta,2\n");
    }

    #[test]
    fn run_rejects_unknown_frames() {
        let err = run("x", "spiral", &["true".to_string()]).unwrap_err();
        assert!(err.to_string().contains("spiral"));
    }
}
