//! Table and JSON output for block locations.

use std::io::Write;

use ofs_hcfs::BlockLocation;
use serde::Serialize;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Column-aligned table.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

/// A single row in a table output.
pub type OutputRow = Vec<String>;

pub struct Printer<W: Write = Box<dyn Write>> {
    out: W,
    format: OutputFormat,
}

impl Printer<Box<dyn Write>> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self {
            out: Box::new(std::io::stdout()),
            format,
        }
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print locations as a table with one row per location, or as a JSON
    /// array.
    pub fn print_locations(
        &mut self,
        path: &str,
        locations: &[BlockLocation],
    ) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => {
                let mut table = vec![header(&["OFFSET", "LENGTH", "HOSTS", "TOPOLOGY"])];
                table.extend(locations.iter().map(|loc| {
                    vec![
                        loc.offset.to_string(),
                        loc.length.to_string(),
                        join_or_dash(&loc.names),
                        join_or_dash(&loc.topology_paths),
                    ]
                }));
                self.print_table_aligned(&table)?;
                writeln!(self.out, "{}: {} block location(s)", path, locations.len())
            }
            OutputFormat::Json => self.print_value(&locations),
        }
    }

    pub fn print_value<T: Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(self.out, "{}", json)
    }

    fn print_table_aligned(&mut self, table: &[OutputRow]) -> std::io::Result<()> {
        const SEPARATOR: &str = "  ";

        let mut widths: Vec<usize> = Vec::new();
        for row in table {
            if widths.len() < row.len() {
                widths.resize(row.len(), 0);
            }
            for (col, cell) in row.iter().enumerate() {
                widths[col] = widths[col].max(cell.len() + SEPARATOR.len());
            }
        }

        for row in table {
            let mut line = String::new();
            for (col, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if col + 1 < row.len() {
                    let padding = widths[col].saturating_sub(cell.len());
                    line.extend(std::iter::repeat(' ').take(padding));
                }
            }
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }
}

fn header(names: &[&str]) -> OutputRow {
    names.iter().map(|h| h.to_string()).collect()
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(",")
    }
}
