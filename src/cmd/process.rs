//! Process command - enrich a vesting or sales spreadsheet with tax columns

use crate::cmd::{parse_rate, print_table, read_table, TableKind};
use clap::Args;
use rsutax::core::{normalize_and_process_sales, normalize_and_process_vesting};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProcessCommand {
    /// Kind of spreadsheet in the input file
    #[arg(short, long, value_enum)]
    kind: TableKind,

    /// CSV file to process (or "-" for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Marginal tax rate in percent, for rows without their own rate
    #[arg(short, long, default_value = "45", value_parser = parse_rate)]
    rate: Decimal,

    /// Output as CSV at full precision instead of a formatted table
    #[arg(long)]
    csv: bool,
}

impl ProcessCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let table = read_table(&self.input)?;
        let processed = match self.kind {
            TableKind::Vesting => normalize_and_process_vesting(&table, self.rate),
            TableKind::Sales => normalize_and_process_sales(&table, self.rate),
        };

        if self.csv {
            processed.write_csv(io::stdout())?;
        } else {
            print_table(&processed);
        }
        Ok(())
    }
}
