use crate::core::brackets::{decimal_schema, BracketSchedule, BracketTable};
use crate::core::cgt::CGT_DISCOUNT_FACTOR;
use crate::core::schema::{
    CAPITAL_GAIN, FINANCIAL_YEAR, GROSS_VALUE, HELD_LONG_TERM, RAW_GAIN, TAX_PAYABLE,
};
use crate::core::table::{Cell, Table};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeSet;

/// A row that could not be aggregated
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("column '{column}' row {row}: expected a number, found '{value}'")]
    NotANumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("column '{column}' row {row}: expected true/false, found '{value}'")]
    NotAFlag {
        column: String,
        row: usize,
        value: String,
    },
    #[error("total of '{column}' is out of range")]
    Overflow { column: String },
}

/// Whether a summary was aggregated from every matching row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, JsonSchema)]
#[serde(tag = "state")]
pub enum SummaryStatus {
    #[default]
    Complete,
    /// Aggregation failed; every aggregated total is zero
    Degraded { reason: String },
}

/// ATO individual tax return item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtoItem {
    pub code: &'static str,
    pub description: &'static str,
    pub amount: Decimal,
}

/// Tax return shaped summary of one financial year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FinancialYearTaxSummary {
    pub financial_year: String,
    /// RSU vesting income
    #[schemars(schema_with = "decimal_schema")]
    pub ordinary_income: Decimal,
    /// Total capital gains before discount
    #[schemars(schema_with = "decimal_schema")]
    pub capital_gains: Decimal,
    /// Taxable gains of lots held more than 12 months
    #[schemars(schema_with = "decimal_schema")]
    pub cgt_discount: Decimal,
    /// Taxable gains after discount, negative for a net loss
    #[schemars(schema_with = "decimal_schema")]
    pub net_capital_gain: Decimal,
    /// Tax already withheld at vesting
    #[schemars(schema_with = "decimal_schema")]
    pub tax_withheld: Decimal,
    #[schemars(schema_with = "decimal_schema")]
    pub other_income: Decimal,
    #[schemars(schema_with = "decimal_schema")]
    pub estimated_tax: Decimal,
    pub status: SummaryStatus,
}

impl FinancialYearTaxSummary {
    fn new(financial_year: &str, other_income: Decimal) -> Self {
        FinancialYearTaxSummary {
            financial_year: financial_year.to_string(),
            ordinary_income: Decimal::ZERO,
            capital_gains: Decimal::ZERO,
            cgt_discount: Decimal::ZERO,
            net_capital_gain: Decimal::ZERO,
            tax_withheld: Decimal::ZERO,
            other_income,
            estimated_tax: Decimal::ZERO,
            status: SummaryStatus::Complete,
        }
    }

    /// Vesting income plus net capital gain plus other income
    pub fn total_taxable_income(&self) -> Decimal {
        self.ordinary_income
            .saturating_add(self.net_capital_gain)
            .saturating_add(self.other_income)
    }

    fn calculate_tax(&mut self, brackets: &BracketTable) {
        self.estimated_tax = brackets.tax(self.total_taxable_income());
    }

    /// Estimated tax less tax withheld; negative means a refund
    pub fn remaining_tax_payable(&self) -> Decimal {
        self.estimated_tax.saturating_sub(self.tax_withheld)
    }

    pub fn to_ato_items(&self) -> Vec<AtoItem> {
        vec![
            AtoItem {
                code: "1-Salary",
                description: "Salary or wages",
                amount: self.ordinary_income,
            },
            AtoItem {
                code: "18-CapitalGains",
                description: "Net capital gain",
                amount: self.net_capital_gain,
            },
        ]
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, SummaryStatus::Degraded { .. })
    }
}

/// Totals over the rows of one financial year
#[derive(Debug, Default)]
struct Totals {
    ordinary_income: Decimal,
    tax_withheld: Decimal,
    capital_gains: Decimal,
    cgt_discount: Decimal,
    net_capital_gain: Decimal,
}

fn number(cell: &Cell, column: &str, row: usize) -> Result<Decimal, AggregationError> {
    match cell {
        Cell::Empty => Ok(Decimal::ZERO),
        _ => cell.as_number().ok_or_else(|| AggregationError::NotANumber {
            column: column.to_string(),
            row: row + 1,
            value: cell.to_string(),
        }),
    }
}

fn flag(cell: &Cell, column: &str, row: usize) -> Result<bool, AggregationError> {
    match cell {
        Cell::Empty => Ok(false),
        _ => cell.as_bool().ok_or_else(|| AggregationError::NotAFlag {
            column: column.to_string(),
            row: row + 1,
            value: cell.to_string(),
        }),
    }
}

fn add(total: Decimal, amount: Decimal, column: &str) -> Result<Decimal, AggregationError> {
    total
        .checked_add(amount)
        .ok_or_else(|| AggregationError::Overflow {
            column: column.to_string(),
        })
}

/// Sum a column over the given rows; an absent column sums to zero
fn sum(table: &Table, column: &str, rows: &[usize]) -> Result<Decimal, AggregationError> {
    let Some(cells) = table.column(column) else {
        return Ok(Decimal::ZERO);
    };
    rows.iter().try_fold(Decimal::ZERO, |total, &row| {
        add(total, number(&cells[row], column, row)?, column)
    })
}

/// Rows whose financial year label equals `year`
fn rows_in_year(table: &Table, year: &str) -> Vec<usize> {
    table
        .column(FINANCIAL_YEAR)
        .map(|cells| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.to_string() == year)
                .map(|(row, _)| row)
                .collect()
        })
        .unwrap_or_default()
}

impl Totals {
    fn aggregate(
        vesting: &Table,
        sales: &Table,
        year: &str,
        other_income: Decimal,
    ) -> Result<Self, AggregationError> {
        let mut totals = Totals::default();

        let vesting_rows = rows_in_year(vesting, year);
        totals.ordinary_income = sum(vesting, GROSS_VALUE.canonical, &vesting_rows)?;
        totals.tax_withheld = sum(vesting, TAX_PAYABLE, &vesting_rows)?;

        let sale_rows = rows_in_year(sales, year);
        let gains = sales.column(CAPITAL_GAIN).unwrap_or_default();
        let raw_gains = sales.column(RAW_GAIN);
        let flags = sales.column(HELD_LONG_TERM.canonical);

        for &row in sale_rows.iter().filter(|&&row| row < gains.len()) {
            let taxable = number(&gains[row], CAPITAL_GAIN, row)?;
            let long_term = match flags {
                Some(flags) => flag(&flags[row], HELD_LONG_TERM.canonical, row)?,
                None => false,
            };

            totals.net_capital_gain = add(totals.net_capital_gain, taxable, CAPITAL_GAIN)?;
            if long_term {
                totals.cgt_discount = add(totals.cgt_discount, taxable, CAPITAL_GAIN)?;
            }
            let raw = match raw_gains.map(|cells| &cells[row]) {
                Some(raw) if !raw.is_empty() => number(raw, RAW_GAIN, row)?,
                // Undo the discount only on rows that received it
                _ if long_term && taxable > Decimal::ZERO => taxable
                    .checked_div(CGT_DISCOUNT_FACTOR)
                    .ok_or_else(|| AggregationError::Overflow {
                        column: RAW_GAIN.to_string(),
                    })?,
                _ => taxable,
            };
            totals.capital_gains = add(totals.capital_gains, raw, RAW_GAIN)?;
        }

        // Taxable income must stay representable for the bracket calculation
        add(totals.ordinary_income, totals.net_capital_gain, "taxable income")
            .and_then(|income| add(income, other_income, "taxable income"))?;

        log::debug!(
            "{}: {} vesting rows, {} sale rows",
            year,
            vesting_rows.len(),
            sale_rows.len()
        );
        Ok(totals)
    }
}

/// Summarize one financial year of processed vesting and sales tables using
/// Australian resident tax rates
pub fn summarize_financial_year(
    vesting: &Table,
    sales: &Table,
    year: &str,
    other_income: Decimal,
) -> FinancialYearTaxSummary {
    summarize_financial_year_with(vesting, sales, year, other_income, &BracketSchedule::default())
}

/// Summarize one financial year with a custom bracket schedule.
///
/// Never fails: a row that cannot be aggregated leaves every aggregated
/// total at zero and marks the summary as degraded.
pub fn summarize_financial_year_with(
    vesting: &Table,
    sales: &Table,
    year: &str,
    other_income: Decimal,
    schedule: &BracketSchedule,
) -> FinancialYearTaxSummary {
    let mut summary = FinancialYearTaxSummary::new(year, other_income);

    match Totals::aggregate(vesting, sales, year, other_income) {
        Ok(totals) => {
            summary.ordinary_income = totals.ordinary_income;
            summary.tax_withheld = totals.tax_withheld;
            summary.capital_gains = totals.capital_gains;
            summary.cgt_discount = totals.cgt_discount;
            summary.net_capital_gain = totals.net_capital_gain;
        }
        Err(err) => {
            log::warn!("Error generating {} summary: {}", year, err);
            summary.status = SummaryStatus::Degraded {
                reason: err.to_string(),
            };
        }
    }

    summary.calculate_tax(schedule.for_label(year));
    summary
}

/// Distinct financial year labels present in either table, in order
pub fn financial_years(vesting: &Table, sales: &Table) -> Vec<String> {
    [vesting, sales]
        .iter()
        .filter_map(|table| table.column(FINANCIAL_YEAR))
        .flatten()
        .filter(|cell| !cell.is_empty())
        .map(Cell::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One summary per financial year present in either table
pub fn summarize_all(
    vesting: &Table,
    sales: &Table,
    other_income: Decimal,
    schedule: &BracketSchedule,
) -> Vec<FinancialYearTaxSummary> {
    financial_years(vesting, sales)
        .iter()
        .map(|year| summarize_financial_year_with(vesting, sales, year, other_income, schedule))
        .collect()
}
