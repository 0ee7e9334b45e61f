use crate::core::cgt::{amount_or_zero, calculate_capital_gain, CapitalGain};
use crate::core::fy::financial_year_label;
use crate::core::schema::{
    self, number_or_zero, rate_or_global, CAPITAL_GAIN, FINANCIAL_YEAR, FMV_AT_VESTING,
    GROSS_VALUE, HELD_LONG_TERM, MARGINAL_TAX_RATE, NET_PROCEEDS, NET_VALUE, PRICE_AT_VESTING,
    RAW_GAIN, RSUS_VESTED, SALE_PRICE, SELL_DATE, SHARES_SOLD, TAX_ON_CG, TAX_PAYABLE,
    VESTING_DATE,
};
use crate::core::table::{Cell, Table};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// A single RSU vesting event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VestingEvent {
    pub date: Option<NaiveDate>,
    pub quantity: Option<Decimal>,
    pub fmv: Option<Decimal>,
    /// Marginal tax rate in percent
    pub rate: Decimal,
    pub gross_value: Decimal,
}

impl VestingEvent {
    pub fn new(date: Option<NaiveDate>, quantity: Decimal, fmv: Decimal, rate: Decimal) -> Self {
        VestingEvent {
            date,
            quantity: Some(quantity),
            fmv: Some(fmv),
            rate,
            gross_value: amount_or_zero(quantity.checked_mul(fmv), "Vesting gross value"),
        }
    }

    /// Event known only by its gross value
    pub fn from_gross(date: Option<NaiveDate>, gross_value: Decimal, rate: Decimal) -> Self {
        VestingEvent {
            date,
            quantity: None,
            fmv: None,
            rate,
            gross_value,
        }
    }

    pub fn tax_payable(&self) -> Decimal {
        amount_or_zero(percent_of(self.gross_value, self.rate), "Vesting tax payable")
    }

    pub fn net_value(&self) -> Decimal {
        amount_or_zero(
            self.gross_value.checked_sub(self.tax_payable()),
            "Vesting net value",
        )
    }

    pub fn financial_year(&self) -> String {
        financial_year_label(self.date)
    }
}

/// A single lot of shares sold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleLot {
    pub date: Option<NaiveDate>,
    pub shares: Decimal,
    pub sale_price: Decimal,
    /// FMV per share at vesting
    pub cost_base: Decimal,
    pub held_long_term: bool,
    /// Marginal tax rate in percent
    pub rate: Decimal,
}

impl SaleLot {
    pub fn gross_proceeds(&self) -> Decimal {
        amount_or_zero(self.shares.checked_mul(self.sale_price), "Sale proceeds")
    }

    pub fn gain(&self) -> CapitalGain {
        calculate_capital_gain(
            self.sale_price,
            self.cost_base,
            self.shares,
            self.held_long_term,
        )
    }

    pub fn tax_on_gain(&self) -> Decimal {
        amount_or_zero(percent_of(self.gain().taxable_gain, self.rate), "Tax on capital gain")
    }

    pub fn net_proceeds(&self) -> Decimal {
        amount_or_zero(
            self.gross_proceeds().checked_sub(self.tax_on_gain()),
            "Net sale proceeds",
        )
    }

    pub fn financial_year(&self) -> String {
        financial_year_label(self.date)
    }
}

/// `rate` percent of `amount`, or None on overflow
fn percent_of(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    amount.checked_mul(rate).map(|scaled| scaled / dec!(100))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn column<'t>(table: &'t Table, name: &str) -> &'t [Cell] {
    table.column(name).unwrap_or_default()
}

fn numbers(table: &Table, name: &str) -> Vec<Decimal> {
    column(table, name)
        .iter()
        .enumerate()
        .map(|(row, cell)| number_or_zero(cell, name, row))
        .collect()
}

/// Vesting events from a normalized vesting table
pub fn vesting_events(table: &Table, global_rate: Decimal) -> Vec<VestingEvent> {
    let has_units =
        table.has_column(RSUS_VESTED.canonical) && table.has_column(PRICE_AT_VESTING.canonical);
    let units = numbers(table, RSUS_VESTED.canonical);
    let fmvs = numbers(table, PRICE_AT_VESTING.canonical);
    let gross = numbers(table, GROSS_VALUE.canonical);
    let dates = column(table, VESTING_DATE.canonical);
    let rates = column(table, MARGINAL_TAX_RATE.canonical);

    (0..table.len())
        .map(|row| {
            let date = dates.get(row).and_then(Cell::as_date);
            let rate = rates
                .get(row)
                .map_or(global_rate, |cell| rate_or_global(cell, global_rate, row));
            if has_units {
                VestingEvent::new(date, units[row], fmvs[row], rate)
            } else {
                VestingEvent::from_gross(date, gross.get(row).copied().unwrap_or_default(), rate)
            }
        })
        .collect()
}

/// Sale lots from a normalized sales table
pub fn sale_lots(table: &Table, global_rate: Decimal) -> Vec<SaleLot> {
    let shares = numbers(table, SHARES_SOLD.canonical);
    let prices = numbers(table, SALE_PRICE.canonical);
    let cost_bases = numbers(table, FMV_AT_VESTING.canonical);
    let dates = column(table, SELL_DATE.canonical);
    let flags = column(table, HELD_LONG_TERM.canonical);
    let rates = column(table, MARGINAL_TAX_RATE.canonical);

    (0..table.len())
        .map(|row| SaleLot {
            date: dates.get(row).and_then(Cell::as_date),
            shares: shares.get(row).copied().unwrap_or_default(),
            sale_price: prices.get(row).copied().unwrap_or_default(),
            cost_base: cost_bases.get(row).copied().unwrap_or_default(),
            held_long_term: flags.get(row).and_then(Cell::as_bool).unwrap_or(false),
            rate: rates
                .get(row)
                .map_or(global_rate, |cell| rate_or_global(cell, global_rate, row)),
        })
        .collect()
}

fn derived<T, F>(items: &[T], f: F) -> Vec<Cell>
where
    F: Fn(&T) -> Cell,
{
    items.iter().map(f).collect()
}

/// Normalize a vesting table and attach gross value, tax payable, net value
/// and financial year to every row
pub fn normalize_and_process_vesting(table: &Table, global_rate: Decimal) -> Table {
    normalize_and_process_vesting_as_of(table, global_rate, today())
}

/// As [`normalize_and_process_vesting`], with `today` as the default vesting date
pub fn normalize_and_process_vesting_as_of(
    table: &Table,
    global_rate: Decimal,
    today: NaiveDate,
) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let mut out = schema::normalize_vesting(table, global_rate, today);
    let events = vesting_events(&out, global_rate);

    out.set_column(GROSS_VALUE.canonical, derived(&events, |e| e.gross_value.into()));
    out.set_column(TAX_PAYABLE, derived(&events, |e| e.tax_payable().into()));
    out.set_column(NET_VALUE, derived(&events, |e| e.net_value().into()));
    out.set_column(FINANCIAL_YEAR, derived(&events, |e| e.financial_year().into()));

    log::info!("Processed {} vesting rows", events.len());
    out
}

/// Normalize a sales table and attach proceeds, capital gains, tax on the
/// gain, net proceeds and financial year to every row
pub fn normalize_and_process_sales(table: &Table, global_rate: Decimal) -> Table {
    normalize_and_process_sales_as_of(table, global_rate, today())
}

/// As [`normalize_and_process_sales`], with `today` as the default sell date
pub fn normalize_and_process_sales_as_of(
    table: &Table,
    global_rate: Decimal,
    today: NaiveDate,
) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let mut out = schema::normalize_sales(table, global_rate, today);
    let lots = sale_lots(&out, global_rate);

    out.set_column(GROSS_VALUE.canonical, derived(&lots, |l| l.gross_proceeds().into()));
    out.set_column(RAW_GAIN, derived(&lots, |l| l.gain().raw_gain.into()));
    out.set_column(CAPITAL_GAIN, derived(&lots, |l| l.gain().taxable_gain.into()));
    out.set_column(TAX_ON_CG, derived(&lots, |l| l.tax_on_gain().into()));
    out.set_column(NET_PROCEEDS, derived(&lots, |l| l.net_proceeds().into()));
    out.set_column(FINANCIAL_YEAR, derived(&lots, |l| l.financial_year().into()));

    log::info!(
        "Processed {} sale lots, {} held long term",
        lots.len(),
        lots.iter().filter(|l| l.held_long_term).count()
    );
    out
}
