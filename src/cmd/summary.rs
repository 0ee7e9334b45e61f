//! Summary command - per financial year totals, estimated tax and ATO items

use crate::cmd::{format_aud, parse_rate, read_table};
use clap::Args;
use rsutax::core::{
    financial_years, normalize_and_process_sales, normalize_and_process_vesting,
    read_bracket_config, summarize_financial_year_with, BracketSchedule, FinancialYear,
    FinancialYearTaxSummary, SummaryStatus, Table,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SummaryCommand {
    /// CSV file of RSU vesting events
    #[arg(short, long)]
    vesting: Option<PathBuf>,

    /// CSV file of share sales
    #[arg(short, long)]
    sales: Option<PathBuf>,

    /// Marginal tax rate in percent, for rows without their own rate
    #[arg(short, long, default_value = "45", value_parser = parse_rate)]
    rate: Decimal,

    /// Financial year to report (e.g., 2024-2025 or 2024-25); all years if omitted
    #[arg(short, long)]
    year: Option<FinancialYear>,

    /// Other taxable income for the year (salary etc.)
    #[arg(short, long, default_value = "0")]
    other_income: Decimal,

    /// JSON file of tax brackets by financial year (see `schema json-schema`)
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Summary data for JSON output
#[derive(Debug, Serialize)]
struct SummaryData {
    financial_year: String,
    status: SummaryStatus,
    ordinary_income: String,
    capital_gains: String,
    cgt_discount: String,
    net_capital_gain: String,
    other_income: String,
    total_taxable_income: String,
    estimated_tax: String,
    tax_withheld: String,
    remaining_tax_payable: String,
    ato_items: Vec<AtoItemData>,
}

#[derive(Debug, Serialize)]
struct AtoItemData {
    code: &'static str,
    description: &'static str,
    amount: String,
}

impl From<&FinancialYearTaxSummary> for SummaryData {
    fn from(summary: &FinancialYearTaxSummary) -> Self {
        SummaryData {
            financial_year: summary.financial_year.clone(),
            status: summary.status.clone(),
            ordinary_income: format!("{:.2}", summary.ordinary_income),
            capital_gains: format!("{:.2}", summary.capital_gains),
            cgt_discount: format!("{:.2}", summary.cgt_discount),
            net_capital_gain: format!("{:.2}", summary.net_capital_gain),
            other_income: format!("{:.2}", summary.other_income),
            total_taxable_income: format!("{:.2}", summary.total_taxable_income()),
            estimated_tax: format!("{:.2}", summary.estimated_tax),
            tax_withheld: format!("{:.2}", summary.tax_withheld),
            remaining_tax_payable: format!("{:.2}", summary.remaining_tax_payable()),
            ato_items: summary
                .to_ato_items()
                .into_iter()
                .map(|item| AtoItemData {
                    code: item.code,
                    description: item.description,
                    amount: format!("{:.2}", item.amount),
                })
                .collect(),
        }
    }
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.vesting.is_none() && self.sales.is_none() {
            anyhow::bail!("Provide a vesting file (-v), a sales file (-s), or both");
        }

        let vesting = self.read_processed(self.vesting.as_deref(), normalize_and_process_vesting)?;
        let sales = self.read_processed(self.sales.as_deref(), normalize_and_process_sales)?;
        let schedule = self.bracket_schedule()?;

        let years = match self.year {
            Some(year) => vec![year.label()],
            None => financial_years(&vesting, &sales),
        };
        let summaries: Vec<_> = years
            .iter()
            .map(|year| {
                summarize_financial_year_with(&vesting, &sales, year, self.other_income, &schedule)
            })
            .collect();

        if self.json {
            let data: Vec<SummaryData> = summaries.iter().map(SummaryData::from).collect();
            println!("{}", serde_json::to_string_pretty(&data)?);
        } else if summaries.is_empty() {
            println!("No financial years found");
        } else {
            for summary in &summaries {
                print_summary(summary);
            }
        }
        Ok(())
    }

    fn read_processed(
        &self,
        path: Option<&Path>,
        process: fn(&Table, Decimal) -> Table,
    ) -> anyhow::Result<Table> {
        match path {
            Some(path) => Ok(process(&read_table(path)?, self.rate)),
            None => Ok(Table::new()),
        }
    }

    fn bracket_schedule(&self) -> anyhow::Result<BracketSchedule> {
        match &self.brackets {
            Some(path) => {
                let file = File::open(path)
                    .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
                let schedule = read_bracket_config(BufReader::new(file))?;
                log::info!("Loaded tax brackets from {}", path.display());
                Ok(schedule)
            }
            None => Ok(BracketSchedule::default()),
        }
    }
}

fn print_summary(summary: &FinancialYearTaxSummary) {
    println!();
    println!("TAX SUMMARY ({})", summary.financial_year);
    if let SummaryStatus::Degraded { reason } = &summary.status {
        println!("  WARNING: totals unavailable, {}", reason);
    }
    println!();

    println!("INCOME");
    println!("  RSU vesting: {}", format_aud(summary.ordinary_income));
    println!("  Other: {}", format_aud(summary.other_income));
    println!();

    println!("CAPITAL GAINS");
    println!(
        "  Gains: {} | Discounted (held > 12 months): {} | Net: {}",
        format_aud(summary.capital_gains),
        format_aud(summary.cgt_discount),
        format_aud(summary.net_capital_gain)
    );
    println!();

    let remaining = summary.remaining_tax_payable();
    println!("TAX");
    println!("  Taxable income: {}", format_aud(summary.total_taxable_income()));
    println!("  Estimated tax: {}", format_aud(summary.estimated_tax));
    println!("  Withheld at vesting: {}", format_aud(summary.tax_withheld));
    if remaining < Decimal::ZERO {
        println!("  Estimated refund: {}", format_aud(remaining.abs()));
    } else {
        println!("  Remaining payable: {}", format_aud(remaining));
    }
    println!();

    println!("ATO ITEMS");
    for item in summary.to_ato_items() {
        println!(
            "  {:16} {:16} {}",
            item.code,
            item.description,
            format_aud(item.amount)
        );
    }
    println!();
}
