pub mod fy;
pub mod process;
pub mod schedule;
pub mod schema;
pub mod summary;

use clap::ValueEnum;
use rsutax::core::{Cell, Table};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Which spreadsheet a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableKind {
    /// RSU vesting events
    Vesting,
    /// Share sales
    Sales,
}

/// Read a CSV table from a file (or stdin with "-")
pub fn read_table(path: &Path) -> anyhow::Result<Table> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
        Ok(Table::read_csv(BufReader::new(file))?)
    }
}

fn read_from_stdin() -> anyhow::Result<Table> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(Table::read_csv(io::Cursor::new(buffer))?)
}

/// Cell text for display: amounts at two decimal places
fn display_cell(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => format!("{:.2}", n),
        other => other.to_string(),
    }
}

/// Print a table with rounded borders
pub fn print_table(table: &Table) {
    if table.is_empty() {
        println!("No rows found");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(table.column_names().map(str::to_string));
    for i in 0..table.len() {
        builder.push_record(table.row(i).into_iter().map(display_cell));
    }

    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

/// Parse a marginal tax rate in percent
pub fn parse_rate(s: &str) -> Result<Decimal, String> {
    let rate = Decimal::from_str(s.trim().trim_end_matches('%'))
        .map_err(|e| format!("invalid rate '{}': {}", s, e))?;
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(format!("rate must be between 0 and 100, got {}", rate));
    }
    Ok(rate)
}

pub fn format_aud(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}
