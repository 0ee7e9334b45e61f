//! Schema normalization - map spreadsheet column variants onto canonical columns

use crate::core::cgt::is_long_term_holding;
use crate::core::table::{Cell, Table};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A canonical column and every name it is known by, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub canonical: &'static str,
    /// Accepted names, highest priority first; includes `canonical`
    pub names: &'static [&'static str],
    pub description: &'static str,
}

impl ColumnSpec {
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> {
        self.names.iter().copied()
    }

    /// First candidate present in the table, returned as the table's own column name
    pub fn resolve(&self, table: &Table) -> Option<String> {
        self.candidates()
            .find_map(|name| table.column_name(name))
            .map(str::to_string)
    }

    fn is_candidate(&self, name: &str) -> bool {
        let name = name.trim();
        self.candidates().any(|c| c.eq_ignore_ascii_case(name))
    }
}

pub const VESTING_DATE: ColumnSpec = ColumnSpec {
    canonical: "Vesting Date",
    names: &["Vesting Date", "Vested Date"],
    description: "Date the units vested",
};

pub const RSUS_VESTED: ColumnSpec = ColumnSpec {
    canonical: "RSUs Vested",
    names: &["RSU Vested", "RSUs Vested"],
    description: "Units vested (fractional allowed)",
};

/// FMV column of a vesting table
pub const PRICE_AT_VESTING: ColumnSpec = ColumnSpec {
    canonical: "FMV at Vesting",
    names: &["Price at Vesting", "FMV at Vesting", "FMV at Vesting (AUD)"],
    description: "Fair market value per unit at vesting",
};

/// FMV column of a sales table, the cost base of the lot
pub const FMV_AT_VESTING: ColumnSpec = ColumnSpec {
    canonical: "FMV at Vesting",
    names: &["FMV at Vesting", "Price at Vesting", "FMV at Vesting (AUD)"],
    description: "Fair market value per share at vesting, the cost base of a sale",
};

/// Gross value of a vesting table. A supplied value is only adopted when units
/// and FMV are missing, and the user's own columns come before the output column.
pub const GROSS_VALUE: ColumnSpec = ColumnSpec {
    canonical: "Gross Value",
    names: &["GrossValue", "Gross Value (AUD)", "Gross Value"],
    description: "Units x FMV; recomputed whenever units and FMV are known",
};

pub const MARGINAL_TAX_RATE: ColumnSpec = ColumnSpec {
    canonical: "Marginal Tax Rate",
    names: &["Marginal Tax Rate", "Tax Rate"],
    description: "Per-row marginal rate in percent (0-100); blank uses the global rate",
};

pub const SELL_DATE: ColumnSpec = ColumnSpec {
    canonical: "Sell Date",
    names: &["Sell Date", "Sale Date", "Date Sold", "Sold Date"],
    description: "Date the shares were sold",
};

pub const SHARES_SOLD: ColumnSpec = ColumnSpec {
    canonical: "Shares Sold",
    names: &["Shares Sold", "RSUs Sold"],
    description: "Shares sold in this lot",
};

pub const SALE_PRICE: ColumnSpec = ColumnSpec {
    canonical: "Sale Price",
    names: &["Sale Price", "Selling Price", "Sale Price (AUD)"],
    description: "Sale price per share",
};

pub const HELD_LONG_TERM: ColumnSpec = ColumnSpec {
    canonical: "Held > 12 Months",
    names: &["Held > 12 Months", "Held Long Term", "Long Term"],
    description: "true if held more than 12 months; computed from Vesting Date when absent",
};

// Columns added by processing
pub const TAX_PAYABLE: &str = "Tax Payable";
pub const NET_VALUE: &str = "Net Value";
pub const RAW_GAIN: &str = "Raw Gain";
pub const CAPITAL_GAIN: &str = "Capital Gain";
pub const TAX_ON_CG: &str = "Tax on CG";
pub const NET_PROCEEDS: &str = "Net Proceeds";
pub const FINANCIAL_YEAR: &str = "Financial Year";

/// Recognised input columns of a vesting table
pub const VESTING_COLUMNS: &[ColumnSpec] = &[
    VESTING_DATE,
    RSUS_VESTED,
    PRICE_AT_VESTING,
    GROSS_VALUE,
    MARGINAL_TAX_RATE,
];

/// Recognised input columns of a sales table
pub const SALES_COLUMNS: &[ColumnSpec] = &[
    SELL_DATE,
    SHARES_SOLD,
    SALE_PRICE,
    FMV_AT_VESTING,
    HELD_LONG_TERM,
    MARGINAL_TAX_RATE,
    VESTING_DATE,
];

/// Vesting columns resolved against one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VestingColumns {
    pub date: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub gross: Option<String>,
    pub rate: Option<String>,
}

impl VestingColumns {
    pub fn resolve(table: &Table) -> Self {
        VestingColumns {
            date: VESTING_DATE.resolve(table),
            quantity: RSUS_VESTED.resolve(table),
            price: PRICE_AT_VESTING.resolve(table),
            gross: GROSS_VALUE.resolve(table),
            rate: MARGINAL_TAX_RATE.resolve(table),
        }
    }
}

/// Sales columns resolved against one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesColumns {
    pub date: Option<String>,
    pub shares: Option<String>,
    pub sale_price: Option<String>,
    pub cost_base: Option<String>,
    pub long_term: Option<String>,
    pub rate: Option<String>,
    pub vesting_date: Option<String>,
}

impl SalesColumns {
    pub fn resolve(table: &Table) -> Self {
        let mut columns = SalesColumns {
            date: SELL_DATE.resolve(table),
            shares: SHARES_SOLD.resolve(table),
            sale_price: SALE_PRICE.resolve(table),
            cost_base: FMV_AT_VESTING.resolve(table),
            long_term: HELD_LONG_TERM.resolve(table),
            rate: MARGINAL_TAX_RATE.resolve(table),
            vesting_date: VESTING_DATE.resolve(table),
        };
        if columns.date.is_none() {
            columns.date = columns.guess_date(table);
        }
        columns
    }

    /// Any other column naming a date, then any naming a sell, skipping
    /// columns that already play another role
    fn guess_date(&self, table: &Table) -> Option<String> {
        let taken = [
            &self.shares,
            &self.sale_price,
            &self.cost_base,
            &self.long_term,
            &self.rate,
            &self.vesting_date,
        ];
        let free: Vec<&str> = table
            .column_names()
            .filter(|name| !taken.iter().any(|t| t.as_deref() == Some(*name)))
            .filter(|name| !VESTING_DATE.is_candidate(name))
            .collect();
        ["date", "sell"]
            .iter()
            .find_map(|needle| {
                free.iter()
                    .find(|name| name.to_lowercase().contains(needle))
                    .copied()
            })
            .map(str::to_string)
    }
}

/// Numeric value of a cell, treating blanks and malformed values as zero
pub(crate) fn number_or_zero(cell: &Cell, column: &str, row: usize) -> Decimal {
    match cell.as_number() {
        Some(n) => n,
        None => {
            if !cell.is_empty() {
                log::warn!(
                    "{} row {}: '{}' is not a number, using 0",
                    column,
                    row + 1,
                    cell
                );
            }
            Decimal::ZERO
        }
    }
}

/// Per-row rate, falling back to the global rate for blank or malformed cells
pub(crate) fn rate_or_global(cell: &Cell, global_rate: Decimal, row: usize) -> Decimal {
    match cell.as_number() {
        Some(rate) => rate,
        None => {
            if !cell.is_empty() {
                log::warn!(
                    "{} row {}: '{}' is not a rate, using {}",
                    MARGINAL_TAX_RATE.canonical,
                    row + 1,
                    cell,
                    global_rate
                );
            }
            global_rate
        }
    }
}

fn cells<'t>(table: &'t Table, column: &Option<String>) -> Option<&'t [Cell]> {
    column.as_deref().and_then(|name| table.column(name))
}

/// Dates as `Date` cells; unparseable values are kept as they are
fn coerce_dates(cells: &[Cell]) -> Vec<Cell> {
    cells
        .iter()
        .map(|cell| cell.as_date().map(Cell::Date).unwrap_or_else(|| cell.clone()))
        .collect()
}

fn constant(table: &Table, cell: Cell) -> Vec<Cell> {
    vec![cell; table.len()]
}

fn rates(table: &Table, column: &Option<String>, global_rate: Decimal) -> Vec<Cell> {
    match cells(table, column) {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(row, cell)| Cell::Number(rate_or_global(cell, global_rate, row)))
            .collect(),
        None => constant(table, Cell::Number(global_rate)),
    }
}

fn products(table: &Table, left: &str, right: &str) -> Vec<Cell> {
    let (Some(a), Some(b)) = (table.column(left), table.column(right)) else {
        return constant(table, Cell::Number(Decimal::ZERO));
    };
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(row, (x, y))| {
            let product = number_or_zero(x, left, row).checked_mul(number_or_zero(y, right, row));
            Cell::Number(product.unwrap_or_else(|| {
                log::warn!("{} x {} row {} is out of range, using 0", left, right, row + 1);
                Decimal::ZERO
            }))
        })
        .collect()
}

/// Write `cells` to the canonical column. A resolved source column under
/// another name is renamed in place, so each role keeps a single column.
fn place(out: &mut Table, source: &Option<String>, canonical: &str, cells: Vec<Cell>) {
    if let Some(source) = source.as_deref() {
        if !source.trim().eq_ignore_ascii_case(canonical) {
            if out.has_column(canonical) {
                log::warn!(
                    "Column '{}' takes priority over '{}', which is dropped",
                    source,
                    canonical
                );
            }
            out.rename_column(source, canonical);
        }
    }
    out.set_column(canonical, cells);
}

/// Bring a vesting table onto the canonical vesting columns.
///
/// `today` fills the date column when the table has none. Units and FMV are
/// never synthesized: without both, an existing gross value is adopted.
pub fn normalize_vesting(table: &Table, global_rate: Decimal, today: NaiveDate) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let columns = VestingColumns::resolve(table);
    log::debug!("Vesting columns: {:?}", columns);
    let mut out = table.clone();

    let dates = match cells(table, &columns.date) {
        Some(cells) => coerce_dates(cells),
        None => constant(table, Cell::Date(today)),
    };
    place(&mut out, &columns.date, VESTING_DATE.canonical, dates);

    if let Some(cells) = cells(table, &columns.quantity) {
        place(&mut out, &columns.quantity, RSUS_VESTED.canonical, cells.to_vec());
    }
    if let Some(cells) = cells(table, &columns.price) {
        place(&mut out, &columns.price, PRICE_AT_VESTING.canonical, cells.to_vec());
    }

    if columns.quantity.is_some() && columns.price.is_some() {
        let gross = products(&out, RSUS_VESTED.canonical, PRICE_AT_VESTING.canonical);
        place(&mut out, &columns.gross, GROSS_VALUE.canonical, gross);
    } else if let Some(cells) = cells(table, &columns.gross) {
        place(&mut out, &columns.gross, GROSS_VALUE.canonical, cells.to_vec());
    } else {
        out.set_column(GROSS_VALUE.canonical, constant(table, Cell::Number(Decimal::ZERO)));
    }

    let rates = rates(table, &columns.rate, global_rate);
    place(&mut out, &columns.rate, MARGINAL_TAX_RATE.canonical, rates);
    out
}

/// Bring a sales table onto the canonical sales columns.
///
/// Missing numeric columns become zero, a missing holding flag is computed
/// from a vesting date column when there is one and is false otherwise.
pub fn normalize_sales(table: &Table, global_rate: Decimal, today: NaiveDate) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let columns = SalesColumns::resolve(table);
    log::debug!("Sales columns: {:?}", columns);
    let mut out = table.clone();

    let dates = match cells(table, &columns.date) {
        Some(cells) => coerce_dates(cells),
        None => constant(table, Cell::Date(today)),
    };
    place(&mut out, &columns.date, SELL_DATE.canonical, dates);

    for (spec, column) in [
        (SHARES_SOLD, &columns.shares),
        (SALE_PRICE, &columns.sale_price),
        (FMV_AT_VESTING, &columns.cost_base),
    ] {
        let values = match cells(table, column) {
            Some(cells) => cells.to_vec(),
            None => constant(table, Cell::Number(Decimal::ZERO)),
        };
        place(&mut out, column, spec.canonical, values);
    }

    let long_term = match (
        cells(table, &columns.long_term),
        cells(table, &columns.vesting_date),
    ) {
        (Some(flags), _) => flags
            .iter()
            .map(|flag| Cell::Bool(flag.as_bool().unwrap_or(false)))
            .collect(),
        (None, Some(vested)) => {
            let sold = out.column(SELL_DATE.canonical).unwrap_or_default();
            vested
                .iter()
                .zip(sold)
                .map(|(vested, sold)| {
                    let held = match (vested.as_date(), sold.as_date()) {
                        (Some(vested), Some(sold)) => is_long_term_holding(vested, sold),
                        _ => false,
                    };
                    Cell::Bool(held)
                })
                .collect()
        }
        (None, None) => constant(table, Cell::Bool(false)),
    };
    place(&mut out, &columns.long_term, HELD_LONG_TERM.canonical, long_term);

    let rates = rates(table, &columns.rate, global_rate);
    place(&mut out, &columns.rate, MARGINAL_TAX_RATE.canonical, rates);
    out
}
