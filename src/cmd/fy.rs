//! Fy command - financial year of a date

use chrono::{Local, NaiveDate};
use clap::Args;
use rsutax::core::{days_to_next_fy, FinancialYear};

#[derive(Args, Debug)]
pub struct FyCommand {
    /// Date to classify, YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    date: Option<NaiveDate>,
}

impl FyCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        let year = FinancialYear::from_date(date);

        println!("Financial year: {}", year);
        println!(
            "  {} to {}",
            year.start_date().format("%d %b %Y"),
            year.end_date().format("%d %b %Y")
        );
        println!("Days to next financial year: {}", days_to_next_fy(date));
        Ok(())
    }
}
