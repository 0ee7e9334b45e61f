//! Schema command - print expected input formats

use crate::cmd::TableKind;
use clap::Args;
use rsutax::core::schema::{ColumnSpec, SALES_COLUMNS, VESTING_COLUMNS};
use rsutax::core::BracketConfig;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,

    /// Spreadsheet to describe for the csv formats
    #[arg(short, long, value_enum, default_value = "vesting")]
    table: TableKind,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the tax bracket file
    JsonSchema,
    /// CSV header row with canonical column names
    CsvHeader,
    /// CSV column descriptions and accepted names in priority order
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        match self.table {
            TableKind::Vesting => VESTING_COLUMNS,
            TableKind::Sales => SALES_COLUMNS,
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(BracketConfig);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        let names: Vec<_> = self.columns().iter().map(|c| c.canonical).collect();
        println!("{}", names.join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        let title = match self.table {
            TableKind::Vesting => "Vesting CSV Format",
            TableKind::Sales => "Sales CSV Format",
        };
        println!("{}", title);
        println!("{}", "=".repeat(title.len()));
        println!();
        for column in self.columns() {
            println!("{:20}  {}", column.canonical, column.description);
            if column.names.len() > 1 {
                println!("{:20}  accepts: {}", "", column.names.join(", "));
            }
        }
        println!();
        println!("Every column is optional; missing values default to 0, today or the global rate.");
        println!("Column names are matched ignoring case and surrounding spaces.");
        println!("When several accepted names are present, the first listed wins.");
        Ok(())
    }
}
